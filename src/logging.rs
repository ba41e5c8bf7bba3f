//! Logger setup for applications using app_keeper.
//!
//! Lines look like `[TestApp] [07/07/2018 - 13:05:09]: INFO message`. When a
//! log directory is given, each run writes a new timestamped file there and
//! only the newest `MAX_LOG_FILES` files are kept.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::MAX_LOG_FILES;

/// Writes every line to a file and, in debug builds, to stderr.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if cfg!(debug_assertions) {
            let _ = io::stderr().write_all(buf);
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Deletes the oldest `.log` files in `log_dir` until at most `keep` remain.
pub fn rotate_logs(log_dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "log").unwrap_or(false))
        .collect();
    // Names are timestamps, so name order is creation order.
    log_files.sort_by_key(|e| e.file_name());
    while log_files.len() > keep {
        let oldest = log_files.remove(0);
        if let Err(e) = fs::remove_file(oldest.path()) {
            eprintln!("Could not remove old log {}: {}", oldest.path().display(), e);
        }
    }
}

fn open_log_file(log_dir: &Path) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(log_dir)?;
    // Leave room for the file about to be created.
    rotate_logs(log_dir, MAX_LOG_FILES.saturating_sub(1));
    let filename = Local::now().format("%Y-%m-%d_%H-%M-%S.log").to_string();
    let path = log_dir.join(filename);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Installs the global logger. `RUST_LOG` overrides the default `info` level.
/// Returns the log file path when file logging could be set up. Calling this
/// twice keeps the first logger.
pub fn init(product: &str, log_dir: Option<&Path>) -> Option<PathBuf> {
    let tag = product.to_string();
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(move |buf, record| {
        writeln!(
            buf,
            "[{}] {}: {} {}",
            tag,
            Local::now().format("[%m/%d/%Y - %H:%M:%S]"),
            record.level(),
            record.args()
        )
    });

    let mut log_path = None;
    if let Some(dir) = log_dir {
        match open_log_file(dir) {
            Ok((file, path)) => {
                builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
                log_path = Some(path);
            }
            Err(e) => eprintln!("File logging disabled ({}): {}", dir.display(), e),
        }
    }

    if builder.try_init().is_err() {
        return None;
    }
    if let Some(path) = &log_path {
        log::debug!("Logging to {}", path.display());
    }
    log_path
}
