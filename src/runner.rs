//! Process runner – owns one renderer process from spawn to reap.
//!
//! stdin is fed, and stdout/stderr drained, on three separate threads so a
//! renderer that fills one pipe while we block on another cannot deadlock
//! the call. Each pump reports back over a channel, which lets the collection
//! step share the same deadline as the wait.

use std::io::{self, Read, Write};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::command::Invocation;
use crate::error::PdfError;

/// Everything captured from a finished renderer process.
#[derive(Debug)]
pub struct RunOutput {
    /// Raw stdout bytes, untouched.
    pub stdout: Vec<u8>,
    /// stderr decoded lossily as UTF-8.
    pub stderr: String,
    pub status: ExitStatus,
}

enum Pumped {
    Stdin(io::Result<()>),
    Stdout(io::Result<Vec<u8>>),
    Stderr(io::Result<Vec<u8>>),
}

/// Deadline bookkeeping for one call.
#[derive(Clone, Copy)]
struct Budget {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl Budget {
    /// A timeout too large to represent as an `Instant` means no deadline.
    fn start(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    fn expired(&self) -> PdfError {
        PdfError::Timeout {
            after: self.timeout.unwrap_or_default(),
        }
    }
}

/// Run `invocation`, feeding `input` on stdin.
///
/// With a `timeout`, the write, both drains and the wait must all finish in
/// time; otherwise the process (and on unix its whole process group) is
/// killed and [`PdfError::Timeout`] is returned with no partial output.
pub fn run(
    invocation: &Invocation,
    input: &[u8],
    timeout: Option<Duration>,
) -> Result<RunOutput, PdfError> {
    let budget = Budget::start(timeout);

    let mut command = invocation.to_command();
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own group, so a timeout also takes down anything prince forked.
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|source| PdfError::Spawn {
        program: invocation.program().to_path_buf(),
        source,
    })?;

    let (tx, rx) = mpsc::channel();
    let mut pumps = 0usize;

    if let Some(mut stdin) = child.stdin.take() {
        let buffer = input.to_vec();
        let tx = tx.clone();
        thread::spawn(move || {
            let result = stdin.write_all(&buffer).and_then(|()| stdin.flush());
            // Dropping stdin here closes the pipe: end of document.
            drop(stdin);
            let _ = tx.send(Pumped::Stdin(result));
        });
        pumps += 1;
    }
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, tx.clone(), Pumped::Stdout);
        pumps += 1;
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, tx.clone(), Pumped::Stderr);
        pumps += 1;
    }
    drop(tx);

    let status = match wait_for_exit(&mut child, budget) {
        Ok(status) => status,
        Err(err) => {
            terminate(&mut child);
            return Err(err);
        }
    };

    let collected = match collect(&rx, pumps, budget) {
        Ok(collected) => collected,
        Err(err) => {
            // The direct child is gone; this clears stragglers in its group
            // that still hold our pipes open.
            terminate(&mut child);
            return Err(err);
        }
    };

    Ok(RunOutput {
        stdout: collected.stdout,
        stderr: String::from_utf8_lossy(&collected.stderr).into_owned(),
        status,
    })
}

fn spawn_reader<R>(mut pipe: R, tx: Sender<Pumped>, wrap: fn(io::Result<Vec<u8>>) -> Pumped)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(wrap(result));
    });
}

fn wait_for_exit(child: &mut Child, budget: Budget) -> Result<ExitStatus, PdfError> {
    match budget.remaining() {
        None => Ok(child.wait()?),
        Some(remaining) => child.wait_timeout(remaining)?.ok_or_else(|| budget.expired()),
    }
}

#[derive(Default)]
struct Collected {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn collect(rx: &Receiver<Pumped>, pumps: usize, budget: Budget) -> Result<Collected, PdfError> {
    let mut out = Collected::default();
    for _ in 0..pumps {
        let message = match budget.remaining() {
            None => rx.recv().map_err(|_| pump_lost())?,
            Some(remaining) => match rx.recv_timeout(remaining) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => return Err(budget.expired()),
                Err(RecvTimeoutError::Disconnected) => return Err(pump_lost()),
            },
        };
        match message {
            Pumped::Stdin(Ok(())) => {}
            Pumped::Stdin(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                // prince stopped reading early; its diagnostics say why.
                log::debug!("prince closed stdin before the whole document was written");
            }
            Pumped::Stdin(Err(e)) => return Err(PdfError::Io(e)),
            Pumped::Stdout(result) => out.stdout = result?,
            Pumped::Stderr(result) => out.stderr = result?,
        }
    }
    Ok(out)
}

fn pump_lost() -> PdfError {
    PdfError::Io(io::Error::other("pipe pump thread exited without reporting"))
}

/// Kill the process (group) and reap it. Errors are logged, not returned.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain syscall on a group id we created at spawn.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    if let Err(e) = child.kill() {
        if e.kind() != io::ErrorKind::InvalidInput {
            log::warn!("failed to kill prince (pid {}): {e}", child.id());
        }
    }
    if let Err(e) = child.wait() {
        log::warn!("failed to reap prince (pid {}): {e}", child.id());
    }
}
