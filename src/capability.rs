//! External capability processes.
//!
//! Segmentation and registration run as opaque external tools. Calls are
//! synchronous, bounded by a caller-supplied timeout, and never retried.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run an external tool to completion.
///
/// Returns an error string on spawn failure, non-zero exit, or timeout.
/// The child is killed when the timeout elapses.
pub fn run_tool(cmd: &[String], timeout: Duration) -> Result<(), String> {
    let (program, args) = cmd
        .split_first()
        .ok_or_else(|| "empty capability command".to_string())?;
    info!(program = %program, "external_tool_start");

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to spawn {program}: {e}"))?;

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    return Ok(());
                }
                return Err(format!("{program} exited with {status}"));
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!(
                        "{program} timed out after {}s",
                        timeout.as_secs()
                    ));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(format!("failed to wait on {program}: {e}")),
        }
    }
}
