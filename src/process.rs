use crate::error::{OpsError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// What a long-lived child reports while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    /// The process could not be observed any more (wait failed).
    Failed(String),
    /// Exit code, `None` when terminated by a signal.
    Exited(Option<i32>),
}

pub trait Terminate: Send + Sync {
    fn terminate(&self);
}

/// An owned, long-lived child process and the stream of its events.
pub struct ProcessHandle {
    name: String,
    events: mpsc::UnboundedReceiver<ProcessEvent>,
    terminator: Arc<dyn Terminate>,
    terminated: AtomicBool,
}

impl ProcessHandle {
    pub fn new(
        name: impl Into<String>,
        events: mpsc::UnboundedReceiver<ProcessEvent>,
        terminator: Arc<dyn Terminate>,
    ) -> Self {
        ProcessHandle {
            name: name.into(),
            events,
            terminator,
            terminated: AtomicBool::new(false),
        }
    }

    /// Next event, or `None` once the process and its output streams are gone.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }

    /// Terminate the process. Only the first call has an effect; returns whether it was this one.
    pub fn terminate(&self) -> bool {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::debug!("terminating {}", self.name);
        self.terminator.terminate();
        true
    }
}

struct ProcessGroup {
    pid: Option<u32>,
    exited: Arc<AtomicBool>,
}

impl Terminate for ProcessGroup {
    fn terminate(&self) {
        if self.exited.load(Ordering::SeqCst) {
            return;
        }
        if let Some(pid) = self.pid {
            kill_process_group(pid);
        }
    }
}

#[cfg(unix)]
fn spawn_shell(script: &str, cwd: &Path) -> std::io::Result<Child> {
    let mut c = Command::new("sh");
    c.arg("-c")
        .arg(script)
        .current_dir(cwd)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    // Own process group, so terminal signals reach us and not the containers' CLI directly.
    unsafe {
        c.pre_exec(|| {
            nix::unistd::setpgid(nix::unistd::Pid::from_raw(0), nix::unistd::Pid::from_raw(0))
                .map_err(std::io::Error::from)?;
            Ok(())
        });
    }

    c.spawn()
}

#[cfg(not(unix))]
fn spawn_shell(script: &str, cwd: &Path) -> std::io::Result<Child> {
    let mut c = Command::new("cmd");
    c.arg("/C")
        .arg(script)
        .current_dir(cwd)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());
    c.spawn()
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let _ = nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(-(pid as i32)),
        nix::sys::signal::Signal::SIGTERM,
    );
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {
    // Windows needs Job Objects to reliably terminate process trees.
}

/// Run `script` through the shell as a long-lived child and stream its events.
/// The exit event is sent after both output streams have been drained.
pub fn spawn_process(name: &str, script: &str, cwd: &Path) -> Result<ProcessHandle> {
    tracing::debug!("[{name}] $ {script}");
    let mut child = spawn_shell(script, cwd).map_err(|e| {
        OpsError::infrastructure(format!("Failed to start the {name} process"), e)
    })?;

    let (tx, rx) = mpsc::unbounded_channel::<ProcessEvent>();
    let exited = Arc::new(AtomicBool::new(false));
    let pid = child.id();

    let stdout_task = child.stdout.take().map(|stdout| {
        tokio::spawn(forward_lines(
            stdout,
            name.to_string(),
            tx.clone(),
            ProcessEvent::Stdout,
        ))
    });
    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(forward_lines(
            stderr,
            name.to_string(),
            tx.clone(),
            ProcessEvent::Stderr,
        ))
    });

    let waiter_exited = exited.clone();
    let waiter_name = name.to_string();
    tokio::spawn(async move {
        let status = child.wait().await;
        waiter_exited.store(true, Ordering::SeqCst);
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }
        let event = match status {
            Ok(status) => {
                tracing::debug!("[{waiter_name}] exited: {status}");
                ProcessEvent::Exited(status.code())
            }
            Err(e) => ProcessEvent::Failed(e.to_string()),
        };
        let _ = tx.send(event);
    });

    Ok(ProcessHandle::new(
        name,
        rx,
        Arc::new(ProcessGroup { pid, exited }),
    ))
}

/// Send every line of `reader` as an event until EOF. Bytes that are not UTF-8
/// are replaced rather than ending the stream, so the pipe keeps draining.
async fn forward_lines<R>(
    reader: R,
    name: String,
    tx: mpsc::UnboundedSender<ProcessEvent>,
    event: fn(String) -> ProcessEvent,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(raw)) => {
                let line = decode_line(&raw);
                tracing::debug!("[{name}] {line}");
                let _ = tx.send(event(line));
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("[{name}] output stream failed: {e}");
                break;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Single-quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counter(AtomicUsize);

    impl Terminate for Counter {
        fn terminate(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn terminate_is_one_shot() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let handle = ProcessHandle::new("ops-api", rx, counter.clone());

        assert!(handle.terminate());
        assert!(!handle.terminate());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawned_process_streams_output_then_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut handle =
            spawn_process("echo", "echo hello; echo oops 1>&2; exit 3", dir.path()).unwrap();

        let mut events = Vec::new();
        while let Some(ev) = handle.next_event().await {
            events.push(ev);
        }

        assert!(events.contains(&ProcessEvent::Stdout("hello".to_string())));
        assert!(events.contains(&ProcessEvent::Stderr("oops".to_string())));
        assert_eq!(events.last(), Some(&ProcessEvent::Exited(Some(3))));
    }

    #[test]
    fn decode_line_replaces_invalid_bytes_and_strips_cr() {
        assert_eq!(decode_line(b"caf\xe9"), "caf\u{FFFD}");
        assert_eq!(decode_line(b"ready\r"), "ready");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_utf8_output_does_not_stop_the_stream() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = concat!(
            "printf 'caf\\351\\n'; ",
            "echo 'Running on http://localhost:8000'; ",
            "echo done 1>&2"
        );
        let mut handle = spawn_process("ops-api", script, dir.path()).unwrap();

        let mut events = Vec::new();
        while let Some(ev) = handle.next_event().await {
            events.push(ev);
        }

        assert!(events.contains(&ProcessEvent::Stdout("caf\u{FFFD}".to_string())));
        assert!(events.contains(&ProcessEvent::Stdout(
            "Running on http://localhost:8000".to_string()
        )));
        assert!(events.contains(&ProcessEvent::Stderr("done".to_string())));
        assert_eq!(events.last(), Some(&ProcessEvent::Exited(Some(0))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminating_a_running_process_ends_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut handle = spawn_process("sleeper", "sleep 30", dir.path()).unwrap();

        assert!(handle.terminate());
        let mut last = None;
        while let Some(ev) = handle.next_event().await {
            last = Some(ev);
        }
        assert_eq!(last, Some(ProcessEvent::Exited(None)));
    }
}
