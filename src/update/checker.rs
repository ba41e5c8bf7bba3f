//! Update check, download and install hand-off.
//!
//! Checks run on a worker thread with their own tokio runtime; the result
//! comes back over a channel that the UI thread polls. Downloads stream to
//! disk chunk by chunk and are verified against the descriptor's MD5 hash
//! when one is given.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use md5::{Digest, Md5};
use tokio::io::AsyncWriteExt;

use crate::config::USER_AGENT;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::process::ProcessControl;
use crate::update::descriptor::AppUpdateDescriptor;
use crate::version::AppVersion;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCheckResult {
    Successful {
        descriptor: AppUpdateDescriptor,
        /// The remote version is newer than the running one.
        newer: bool,
    },
    Failed(String),
}

impl UpdateCheckResult {
    pub fn is_successful(&self) -> bool {
        matches!(self, UpdateCheckResult::Successful { .. })
    }

    pub fn descriptor(&self) -> Option<&AppUpdateDescriptor> {
        match self {
            UpdateCheckResult::Successful { descriptor, .. } => Some(descriptor),
            UpdateCheckResult::Failed(_) => None,
        }
    }

    /// The descriptor, only when it announces a newer version.
    pub fn newer_version(&self) -> Option<&AppUpdateDescriptor> {
        match self {
            UpdateCheckResult::Successful {
                descriptor,
                newer: true,
            } => Some(descriptor),
            _ => None,
        }
    }
}

/// Pending background check. Poll it from the thread that started the check.
#[derive(Debug)]
pub struct UpdateCheckHandle {
    rx: Receiver<UpdateCheckResult>,
    finished: bool,
}

impl UpdateCheckHandle {
    /// Yields the result once; `None` while the check is still running and
    /// after the result has been taken.
    pub fn try_result(&mut self) -> Option<UpdateCheckResult> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(UpdateCheckResult::Failed(
                    "update check worker stopped without a result".into(),
                ))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Blocks up to `timeout` for the result.
    pub fn wait_timeout(mut self, timeout: Duration) -> Option<UpdateCheckResult> {
        if self.finished {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(UpdateCheckResult::Failed(
                "update check worker stopped without a result".into(),
            )),
        }
    }
}

/// What `apply_install` did with a downloaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAction {
    InstallerLaunched,
    Revealed,
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    client: reqwest::Client,
    current_version: AppVersion,
    download_dir: PathBuf,
}

impl UpdateChecker {
    pub fn new(current_version: &str, download_dir: impl Into<PathBuf>) -> Result<Self> {
        // Idle connections are not kept: each check runs on its own runtime.
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(UpdateChecker {
            client,
            current_version: AppVersion::parse(current_version)?,
            download_dir: download_dir.into(),
        })
    }

    pub fn from_context(ctx: &AppContext) -> Result<Self> {
        Self::new(&ctx.metadata().version, ctx.download_dir())
    }

    /// Replaces the HTTP client used for checks and async downloads, e.g. to
    /// set timeouts or a proxy.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn current_version(&self) -> &AppVersion {
        &self.current_version
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub async fn fetch_descriptor(&self, url: &str) -> Result<AppUpdateDescriptor> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        AppUpdateDescriptor::parse(&body)
    }

    /// Fetches and compares. Never fails: problems come back as `Failed`.
    pub async fn fetch_update(&self, url: &str) -> UpdateCheckResult {
        let outcome = match self.fetch_descriptor(url).await {
            Ok(descriptor) => descriptor.app_version().map(|remote| {
                let newer = remote.is_newer_than(&self.current_version);
                UpdateCheckResult::Successful { descriptor, newer }
            }),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(result) => {
                log::info!(
                    "Update check against {}: latest {:?}, newer: {}",
                    url,
                    result.descriptor().map(|d| d.version.as_str()),
                    result.newer_version().is_some()
                );
                result
            }
            Err(e) => {
                log::warn!("Update check against {} failed: {}", url, e);
                UpdateCheckResult::Failed(e.to_string())
            }
        }
    }

    /// Starts a check on a worker thread. `wake` runs on that thread once the
    /// result is ready, e.g. to request a UI repaint.
    pub fn check_for_updates<W>(&self, url: &str, wake: W) -> UpdateCheckHandle
    where
        W: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let checker = self.clone();
        let url = url.to_string();
        std::thread::spawn(move || {
            let result = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(checker.fetch_update(&url)),
                Err(e) => UpdateCheckResult::Failed(format!("could not start runtime: {}", e)),
            };
            // The handle may already be gone.
            let _ = tx.send(result);
            wake();
        });
        UpdateCheckHandle {
            rx,
            finished: false,
        }
    }

    pub async fn download_update(&self, update: &AppUpdateDescriptor) -> Option<PathBuf> {
        self.download_update_with_progress(update, |_| {}).await
    }

    /// Downloads into the download directory. Returns `None` on any failure,
    /// including a checksum mismatch, in which case the file is removed.
    pub async fn download_update_with_progress(
        &self,
        update: &AppUpdateDescriptor,
        mut progress: impl FnMut(f32) + Send,
    ) -> Option<PathBuf> {
        let dest = self.download_target(update)?;
        if let Err(e) = self.download_file(&update.download_url, &dest, &mut progress).await {
            log::warn!("Download of {} failed: {}", update.download_url, e);
            let _ = tokio::fs::remove_file(&dest).await;
            return None;
        }
        finish_download(update, dest)
    }

    /// Blocking download. Must not be called from inside a tokio runtime.
    pub fn download_update_blocking(&self, update: &AppUpdateDescriptor) -> Option<PathBuf> {
        let dest = self.download_target(update)?;
        let attempt = || -> Result<()> {
            let client = reqwest::blocking::Client::builder()
                .user_agent(USER_AGENT)
                .build()?;
            let mut response = client.get(&update.download_url).send()?.error_for_status()?;
            let mut file = std::fs::File::create(&dest).map_err(|e| Error::io(&dest, e))?;
            response.copy_to(&mut file)?;
            Ok(())
        };
        if let Err(e) = attempt() {
            log::warn!("Download of {} failed: {}", update.download_url, e);
            let _ = std::fs::remove_file(&dest);
            return None;
        }
        finish_download(update, dest)
    }

    fn download_target(&self, update: &AppUpdateDescriptor) -> Option<PathBuf> {
        let Some(file_name) = update.file_name() else {
            log::warn!("No file name for download {}", update.download_url);
            return None;
        };
        if let Err(e) = std::fs::create_dir_all(&self.download_dir) {
            log::warn!(
                "Cannot create download directory {}: {}",
                self.download_dir.display(),
                e
            );
            return None;
        }
        Some(self.download_dir.join(file_name))
    }

    async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut (impl FnMut(f32) + Send),
    ) -> Result<()> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total_size = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io(dest, e))?;
        let mut downloaded: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.map_err(|e| Error::io(dest, e))?;
            downloaded += chunk.len() as u64;
            if total_size > 0 {
                progress(downloaded as f32 / total_size as f32);
            }
        }
        file.flush().await.map_err(|e| Error::io(dest, e))?;
        Ok(())
    }
}

fn finish_download(update: &AppUpdateDescriptor, dest: PathBuf) -> Option<PathBuf> {
    if let Some(expected) = &update.md5 {
        if let Err(e) = verify_md5(&dest, expected) {
            log::warn!("Discarding {}: {}", dest.display(), e);
            let _ = std::fs::remove_file(&dest);
            return None;
        }
    }
    log::info!("Downloaded update {} to {}", update.version, dest.display());
    Some(dest)
}

/// Lowercase hex MD5 of a file.
pub fn file_md5(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Md5::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer).map_err(|e| Error::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compares case-insensitively.
pub fn verify_md5(path: &Path, expected: &str) -> Result<()> {
    let actual = file_md5(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected.trim().to_string(),
            actual,
        })
    }
}

pub fn is_installer_package(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("msi"))
        .unwrap_or(false)
}

/// Installer packages are handed to `msiexec` and the current process exits.
/// Anything else is revealed in the platform file manager.
pub fn apply_install(
    path: &Path,
    passive: bool,
    process: &dyn ProcessControl,
) -> Result<InstallAction> {
    if is_installer_package(path) {
        let msiexec = which::which("msiexec").unwrap_or_else(|_| PathBuf::from("msiexec.exe"));
        let mut args = vec!["/i".to_string(), path.display().to_string()];
        if passive {
            args.push("/passive".to_string());
        }
        log::info!("Launching installer {}", path.display());
        process
            .spawn(&msiexec, &args)
            .map_err(|e| Error::io(&msiexec, e))?;
        process.exit(0);
        return Ok(InstallAction::InstallerLaunched);
    }

    let (program, args) = reveal_command(path);
    process
        .spawn(&program, &args)
        .map_err(|e| Error::io(&program, e))?;
    Ok(InstallAction::Revealed)
}

#[cfg(windows)]
fn reveal_command(path: &Path) -> (PathBuf, Vec<String>) {
    (
        PathBuf::from("explorer.exe"),
        vec![format!("/select,{}", path.display())],
    )
}

#[cfg(target_os = "macos")]
fn reveal_command(path: &Path) -> (PathBuf, Vec<String>) {
    (
        PathBuf::from("open"),
        vec!["-R".to_string(), path.display().to_string()],
    )
}

#[cfg(all(unix, not(target_os = "macos")))]
fn reveal_command(path: &Path) -> (PathBuf, Vec<String>) {
    let opener = which::which("xdg-open").unwrap_or_else(|_| PathBuf::from("xdg-open"));
    let folder = path.parent().unwrap_or(path);
    (opener, vec![folder.display().to_string()])
}
