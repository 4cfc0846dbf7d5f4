//! Run administration commands with a bounded wait

use std::error::Error as StdError;
use std::fmt;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wait_timeout::ChildExt;

#[derive(Debug)]
pub enum CommandError {
    /// The executable does not exist
    NotFound(PathBuf),
    /// Spawning, waiting on or reading from the child failed
    Io { command: String, source: io::Error },
    /// The child was still running when the timeout expired, and was killed
    TimedOut { command: String, timeout: Duration },
    /// The child exited unsuccessfully. `code` is `None` if it was killed
    /// by a signal
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// The child printed something that isn't UTF-8
    InvalidUtf8 { command: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::CommandError::*;
        match self {
            NotFound(path) => write!(f, "{} not found", path.display()),
            Io { command, source } => write!(f, "error running `{}`: {}", command, source),
            TimedOut { command, timeout } => write!(
                f,
                "`{}` did not finish within {}s",
                command,
                timeout.as_secs_f64()
            ),
            Failed {
                command,
                code: Some(code),
                stderr,
            } => {
                write!(f, "`{}` exited with status {}", command, code)?;
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            Failed {
                command,
                code: None,
                ..
            } => write!(f, "`{}` was killed by a signal", command),
            InvalidUtf8 { command } => write!(f, "`{}` printed invalid UTF-8", command),
        }
    }
}

impl StdError for CommandError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CommandError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

type Reader = mpsc::Receiver<io::Result<Vec<u8>>>;

/// Read a child's pipe to the end on its own thread, so a chatty child can
/// never block on a full pipe while we wait for it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Reader {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| ()),
            None => Ok(()),
        };
        // nobody is listening any more if the command timed out
        let _ = tx.send(result.map(|()| buf));
    });
    rx
}

/// Wait for a pipe to be drained, but not past `deadline`. Something the
/// child started in the background can keep the pipe open after the child
/// itself has exited.
fn collect(
    reader: &Reader,
    deadline: Instant,
    command: &str,
    timeout: Duration,
) -> Result<Vec<u8>, CommandError> {
    let left = deadline.saturating_duration_since(Instant::now());
    match reader.recv_timeout(left) {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(source)) => Err(CommandError::Io {
            command: command.to_owned(),
            source,
        }),
        Err(RecvTimeoutError::Timeout) => {
            warn!(%command, ?timeout, "output still open after exit, giving up");
            Err(CommandError::TimedOut {
                command: command.to_owned(),
                timeout,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(CommandError::Io {
            command: command.to_owned(),
            source: io::Error::new(ErrorKind::Other, "pipe reader panicked"),
        }),
    }
}

/// Run `program` with `args` and return its stdout
///
/// The child gets at most `timeout` to finish and close its output. The
/// same budget covers the pipes of anything it left running in the
/// background. Anything but a clean zero exit is an error, so an empty
/// stdout from a failed command is never mistaken for real output.
pub fn run(program: &Path, args: &[&str], timeout: Duration) -> Result<String, CommandError> {
    let command = if args.is_empty() {
        program.display().to_string()
    } else {
        format!("{} {}", program.display(), args.join(" "))
    };
    debug!(%command, ?timeout, "running");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            warn!(%command, error = %e, "unable to start");
            if e.kind() == ErrorKind::NotFound {
                CommandError::NotFound(program.to_path_buf())
            } else {
                CommandError::Io {
                    command: command.clone(),
                    source: e,
                }
            }
        })?;

    let deadline = Instant::now() + timeout;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!(%command, ?timeout, "timed out, killing");
            // The readers are abandoned: a grandchild may still hold the pipes
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::TimedOut { command, timeout });
        }
        Err(source) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::Io { command, source });
        }
    };

    let stdout = collect(&stdout, deadline, &command, timeout)?;
    let stderr = match collect(&stderr, deadline, &command, timeout) {
        Err(e @ CommandError::TimedOut { .. }) => return Err(e),
        result => result.unwrap_or_default(),
    };

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr).trim().to_owned();
        warn!(%command, code = ?status.code(), %stderr, "command failed");
        return Err(CommandError::Failed {
            command,
            code: status.code(),
            stderr,
        });
    }

    debug!(%command, bytes = stdout.len(), "finished");
    String::from_utf8(stdout).map_err(|_| CommandError::InvalidUtf8 { command })
}

#[cfg(test)]
mod unit {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> Result<String, CommandError> {
        run(Path::new("sh"), &["-c", script], timeout)
    }

    #[test]
    fn captures_stdout() {
        let out = sh("echo 'a:b:c'; echo '1:2:3'", Duration::from_secs(5)).unwrap();
        assert_eq!(out, "a:b:c\n1:2:3\n");
    }

    #[test]
    fn missing_executable() {
        match run(
            Path::new("/nonexistent/bin/mmgetstate"),
            &["-LY"],
            Duration::from_secs(1),
        ) {
            Err(CommandError::NotFound(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/bin/mmgetstate"))
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn nonzero_exit_is_not_trusted() {
        match sh("echo 'partial:output'; echo oops >&2; exit 4", Duration::from_secs(5)) {
            Err(CommandError::Failed { code, stderr, .. }) => {
                assert_eq!(code, Some(4));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn hung_child_times_out() {
        match sh("exec sleep 5", Duration::from_millis(200)) {
            Err(CommandError::TimedOut { timeout, .. }) => {
                assert_eq!(timeout, Duration::from_millis(200))
            }
            other => panic!("expected TimedOut, got {:?}", other),
        }
    }

    #[test]
    fn background_child_holding_stdout_times_out() {
        let started = Instant::now();
        match sh("sleep 5 & echo 'a:b:c'", Duration::from_millis(300)) {
            Err(CommandError::TimedOut { timeout, .. }) => {
                assert_eq!(timeout, Duration::from_millis(300))
            }
            other => panic!("expected TimedOut, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn background_child_with_closed_output_is_fine() {
        let out = sh(
            "sleep 5 >/dev/null 2>&1 & echo 'a:b:c'",
            Duration::from_secs(3),
        )
        .unwrap();
        assert_eq!(out, "a:b:c\n");
    }

    #[test]
    fn invalid_utf8() {
        match sh("printf '\\377\\376'", Duration::from_secs(5)) {
            Err(CommandError::InvalidUtf8 { .. }) => {}
            other => panic!("expected InvalidUtf8, got {:?}", other),
        }
    }

    #[test]
    fn messages() {
        let err = CommandError::Failed {
            command: "mmgetstate -LY".to_owned(),
            code: Some(1),
            stderr: "mmgetstate: GPFS is not running".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "`mmgetstate -LY` exited with status 1: mmgetstate: GPFS is not running"
        );
        let err = CommandError::TimedOut {
            command: "mmgetstate -LY".to_owned(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "`mmgetstate -LY` did not finish within 10s");
    }
}
