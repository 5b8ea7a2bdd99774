//! Run external tools with captured output and an optional deadline.

use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::MediaError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STDERR_TAIL_LINES: usize = 12;

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// Stdout and stderr are drained on helper threads so a chatty tool can
/// never block on a full pipe. A non-zero exit becomes
/// [`MediaError::Failed`] carrying the tail of stderr.
pub fn run(mut cmd: Command, tool: &str, timeout: Option<Duration>) -> Result<Output, MediaError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log::debug!("Running {}: {:?}", tool, cmd);

    let mut child = cmd.spawn().map_err(|source| MediaError::Spawn {
        tool: tool.to_string(),
        source,
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MediaError::Timeout {
                    tool: tool.to_string(),
                    seconds: limit.as_secs_f64(),
                });
            }
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    if !status.success() {
        return Err(MediaError::Failed {
            tool: tool.to_string(),
            code: status.code().unwrap_or(-1),
            stderr: stderr_tail(&stderr),
        });
    }

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Last few non-empty lines of a tool's stderr.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
