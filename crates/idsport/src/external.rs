//! Delegated bulk conversion of array-of-structure subtrees.
//!
//! Split-time subtrees are not walked in-process: their timed branch is
//! handed to an external converter executable. The walker only sees the
//! narrow [`AosConverter`] trait, so the subprocess can be swapped for an
//! in-process implementation without touching migration logic.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::errors::MigrateError;

/// Converter binary location under the install prefix.
const CONVERTER_RELATIVE_PATH: &str = "models/convert_aos";

const POLL_SLEEP: Duration = Duration::from_millis(25);

/// Synchronous bulk conversion of one timed array-of-structure node.
pub trait AosConverter {
    /// Converts the subtree at `src_path` of pulse `src_pulse` into
    /// `dst_path` of pulse `dst_pulse`. A failure (including timeout) is
    /// ordinary: the caller logs it and omits the corresponding composite
    /// entry.
    fn convert(
        &self,
        src_pulse: i64,
        src_path: &str,
        dst_pulse: i64,
        dst_path: &str,
    ) -> Result<(), MigrateError>;
}

/// Runs the external converter executable with a bounded timeout and a
/// single retry. The legacy tool had no bound and could hang indefinitely;
/// here a timeout is reported like any other converter failure.
pub struct CommandAosConverter {
    program: PathBuf,
    timeout: Duration,
}

impl CommandAosConverter {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        CommandAosConverter { program, timeout }
    }

    /// Converter installed under `<prefix>/models/convert_aos`.
    pub fn from_prefix(prefix: &Path) -> Self {
        Self::new(prefix.join(CONVERTER_RELATIVE_PATH), Self::DEFAULT_TIMEOUT)
    }

    fn run_once(&self, args: &[String], path: &str) -> Result<(), MigrateError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MigrateError::ExternalTool {
                path: path.to_string(),
                reason: format!("spawn failed: {e}"),
            })?;

        let start = Instant::now();
        let status = loop {
            if start.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MigrateError::ExternalTool {
                    path: path.to_string(),
                    reason: format!("timed out after {:?}", self.timeout),
                });
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(POLL_SLEEP),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(MigrateError::ExternalTool {
                        path: path.to_string(),
                        reason: format!("wait failed: {e}"),
                    });
                }
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(MigrateError::ExternalTool {
                path: path.to_string(),
                reason: format!("exit status {status}"),
            })
        }
    }
}

impl AosConverter for CommandAosConverter {
    fn convert(
        &self,
        src_pulse: i64,
        src_path: &str,
        dst_pulse: i64,
        dst_path: &str,
    ) -> Result<(), MigrateError> {
        let args = [
            src_pulse.to_string(),
            src_path.to_string(),
            dst_pulse.to_string(),
            dst_path.to_string(),
        ];
        match self.run_once(&args, src_path) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!("converter failed for {src_path}, retrying once: {first}");
                self.run_once(&args, src_path)
            }
        }
    }
}
