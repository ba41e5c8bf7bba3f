// Process launch and exit seam used by culture changes and installer hand-off.

use std::path::Path;
use std::process::Command;

/// Spawns replacement processes and ends the current one.
pub trait ProcessControl {
    fn spawn(&self, program: &Path, args: &[String]) -> std::io::Result<()>;

    /// Ends the current process. Test doubles may record the call and return.
    fn exit(&self, code: i32);

    /// Arguments of the current process, without the program name.
    fn current_args(&self) -> Vec<String> {
        std::env::args().skip(1).collect()
    }
}

/// The real process: `std::process` spawn and exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcess;

impl ProcessControl for SystemProcess {
    fn spawn(&self, program: &Path, args: &[String]) -> std::io::Result<()> {
        let mut command = Command::new(program);
        command.args(args);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            // DETACHED_PROCESS
            command.creation_flags(0x00000008);
        }
        command.spawn().map(|_| ())
    }

    fn exit(&self, code: i32) {
        log::info!("Exiting with code {}", code);
        log::logger().flush();
        std::process::exit(code);
    }
}
