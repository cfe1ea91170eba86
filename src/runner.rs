//! # Process Runner Module
//!
//! Questo modulo lancia un'invocazione del tool esterno e ne drena il canale
//! diagnostico riga per riga verso una coda consumata dal progress monitor.
//!
//! ## Responsabilità:
//! - Spawn del processo esterno con stderr in pipe (`tokio::process`)
//! - Task di drenaggio dedicato: legge riga per riga fino a end-of-stream,
//!   invia ogni riga trimmata sulla coda in ordine di arrivo
//! - Attende l'exit del processo e invia esattamente un evento terminale
//! - Cancellazione cooperativa: token esplicito + deadline opzionale,
//!   con kill del processo figlio
//!
//! ## Protocollo della coda:
//! - Zero o più `JobEvent::Line` in ordine di arrivo, seguiti da esattamente
//!   un evento terminale (`Completed`, `Cancelled` o `Failed`)
//! - Nessun evento viene mai inviato dopo un evento terminale
//! - Un fallimento di lancio produce `Failed`, così ogni job termina in modo
//!   osservabile
//!
//! ## Concorrenza:
//! - Un produttore (task di drenaggio) e un consumatore (monitor) per job;
//!   la coda è l'unica risorsa condivisa
//! - La chiamata di spawn ritorna immediatamente: il chiamante non blocca mai
//!   sull'I/O del processo

use crate::config::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

/// One element of a job's output queue. Raw diagnostic lines arrive in
/// order, followed by exactly one terminal variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// A trimmed diagnostic line from the external process
    Line(String),
    /// Process exited cleanly
    Completed,
    /// Job was cancelled (token or deadline); the child has been killed
    Cancelled,
    /// Launch failed or the process exited with a nonzero status
    Failed(String),
}

impl JobEvent {
    /// True for the variants that end the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Line(_))
    }
}

/// Cooperative cancellation token shared between the caller, the drain task
/// and the deadline timer. Cancelling kills the child process.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        loop {
            if self.is_cancelled() {
                return;
            }
            // Register as a waiter BEFORE re-checking the flag: a cancel()
            // landing between the check and the registration would otherwise
            // notify nobody and leave this future pending forever.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.inner.notify.notified());
        }
    }
}

/// Handle to one running job: the receiving half of the event queue plus
/// the timing facts the progress monitor needs. Owned by exactly one
/// monitor; dropped once the terminal event has been observed.
pub struct JobHandle {
    /// Event queue (FIFO, single producer / single consumer)
    pub events: UnboundedReceiver<JobEvent>,
    /// Total expected output duration in seconds (0 = unknown)
    pub total_duration_secs: f64,
    /// Monotonic start time, for elapsed computation
    pub started_at: Instant,
    /// Wall-clock start in Unix epoch seconds, for ETA display
    pub start_epoch: f64,
    /// Cancels the job and kills the child process
    pub cancel: CancellationToken,
}

/// Launches external-tool invocations and streams their diagnostic output
pub struct ProcessRunner {
    config: Config,
}

impl ProcessRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Spawn a transform invocation of the configured ffmpeg binary.
    pub fn spawn_transform(&self, args: Vec<String>, total_duration_secs: f64) -> JobHandle {
        self.spawn(&self.config.ffmpeg_command(), args, total_duration_secs)
    }

    /// Spawn `program` with `args`, draining its stderr into the returned
    /// handle's queue. Returns immediately; all I/O happens on a dedicated
    /// task.
    pub fn spawn(&self, program: &str, args: Vec<String>, total_duration_secs: f64) -> JobHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        debug!("Spawning: {} {}", program, args.join(" "));

        // The deadline lives inside the drain task, so it is torn down with
        // the job instead of firing on one that already finished
        let deadline = self
            .config
            .job_timeout_secs
            .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

        let drain_token = token.clone();
        let program = program.to_string();
        tokio::spawn(async move {
            drain_process(program, args, tx, drain_token, deadline).await;
        });

        JobHandle {
            events: rx,
            total_duration_secs,
            started_at: Instant::now(),
            start_epoch: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
            cancel: token,
        }
    }
}

/// Pending until the deadline expires; pends forever when no deadline is set.
async fn deadline_expired(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Split a chunk of diagnostic bytes into lines, treating BOTH `\n` and
/// `\r` as terminators: the external tool rewrites its live progress status
/// in place with bare carriage returns, so waiting for newlines would merge
/// an entire run of updates into one late string. Incomplete tails stay in
/// `pending` until the next chunk.
fn push_diagnostic_bytes(bytes: &[u8], pending: &mut Vec<u8>, tx: &UnboundedSender<JobEvent>) {
    for &byte in bytes {
        if byte == b'\n' || byte == b'\r' {
            send_segment(pending, tx);
        } else {
            pending.push(byte);
        }
    }
}

/// Send the buffered segment as one trimmed line; empty segments (e.g. the
/// gap inside a `\r\n` pair) produce no event.
fn send_segment(pending: &mut Vec<u8>, tx: &UnboundedSender<JobEvent>) {
    if pending.is_empty() {
        return;
    }
    let line = String::from_utf8_lossy(pending).trim().to_string();
    pending.clear();
    if !line.is_empty() {
        let _ = tx.send(JobEvent::Line(line));
    }
}

/// Producer side of the job queue: spawn, drain stderr line by line, wait
/// for exit, send exactly one terminal event.
async fn drain_process(
    program: String,
    args: Vec<String>,
    tx: UnboundedSender<JobEvent>,
    token: CancellationToken,
    deadline: Option<tokio::time::Instant>,
) {
    let mut child = match Command::new(&program)
        .args(&args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!("Failed to launch {}: {}", program, e);
            let _ = tx.send(JobEvent::Failed(format!("failed to launch {}: {}", program, e)));
            return;
        }
    };

    let Some(mut stderr) = child.stderr.take() else {
        let _ = child.kill().await;
        let _ = tx.send(JobEvent::Failed("diagnostic stream unavailable".to_string()));
        return;
    };

    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        tokio::select! {
            read = stderr.read(&mut chunk) => match read {
                Ok(0) => break,
                Ok(n) => push_diagnostic_bytes(&chunk[..n], &mut pending, &tx),
                Err(e) => {
                    warn!("Error reading diagnostic stream: {}", e);
                    break;
                }
            },
            _ = token.cancelled() => {
                warn!("Cancellation requested, killing {}", program);
                let _ = child.kill().await;
                let _ = child.wait().await;
                let _ = tx.send(JobEvent::Cancelled);
                return;
            }
            _ = deadline_expired(deadline) => {
                warn!("Job deadline reached, killing {}", program);
                let _ = child.kill().await;
                let _ = child.wait().await;
                let _ = tx.send(JobEvent::Cancelled);
                return;
            }
        }
    }

    // Unterminated tail at end-of-stream is still a line
    send_segment(&mut pending, &tx);

    // Stream exhausted; wait for process exit, still honoring cancellation
    tokio::select! {
        status = child.wait() => {
            let event = match status {
                Ok(status) if status.success() => JobEvent::Completed,
                Ok(status) => JobEvent::Failed(format!("process exited with {}", status)),
                Err(e) => JobEvent::Failed(format!("failed to wait for process: {}", e)),
            };
            let _ = tx.send(event);
        }
        _ = token.cancelled() => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            let _ = tx.send(JobEvent::Cancelled);
        }
        _ = deadline_expired(deadline) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            let _ = tx.send(JobEvent::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect_events(mut handle: JobHandle) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.events.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lines_arrive_in_order_then_completed() {
        let runner = ProcessRunner::new(Config::default());
        let handle = runner.spawn(
            "sh",
            vec!["-c".into(), "printf 'one\\ntwo\\nthree\\n' >&2".into()],
            0.0,
        );

        let events = collect_events(handle).await;
        assert_eq!(
            events,
            vec![
                JobEvent::Line("one".into()),
                JobEvent::Line("two".into()),
                JobEvent::Line("three".into()),
                JobEvent::Completed,
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_carriage_return_updates_arrive_individually() {
        // Live progress status lines are rewritten in place with bare `\r`;
        // each rewrite must surface as its own event, not one merged string
        let runner = ProcessRunner::new(Config::default());
        let script = "printf 'time=00:00:01.00 bitrate=1.0kbits/s speed=1.0x\\rtime=00:00:02.00 bitrate=1.0kbits/s speed=1.0x\\r' >&2";
        let handle = runner.spawn("sh", vec!["-c".into(), script.into()], 0.0);

        let events = collect_events(handle).await;
        assert_eq!(
            events,
            vec![
                JobEvent::Line("time=00:00:01.00 bitrate=1.0kbits/s speed=1.0x".into()),
                JobEvent::Line("time=00:00:02.00 bitrate=1.0kbits/s speed=1.0x".into()),
                JobEvent::Completed,
            ]
        );
    }

    #[test]
    fn test_diagnostic_bytes_split_on_cr_and_lf() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pending = Vec::new();

        // Chunk boundary in the middle of a line, mixed terminators
        push_diagnostic_bytes(b"one\rtwo\nthr", &mut pending, &tx);
        push_diagnostic_bytes(b"ee\r\n", &mut pending, &tx);
        send_segment(&mut pending, &tx);
        drop(tx);

        let mut lines = Vec::new();
        while let Ok(event) = rx.try_recv() {
            lines.push(event);
        }
        // The \r\n pair yields no empty line
        assert_eq!(
            lines,
            vec![
                JobEvent::Line("one".into()),
                JobEvent::Line("two".into()),
                JobEvent::Line("three".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_tail_is_flushed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pending = Vec::new();

        push_diagnostic_bytes(b"partial line", &mut pending, &tx);
        assert!(rx.try_recv().is_err());

        send_segment(&mut pending, &tx);
        assert_eq!(rx.try_recv().unwrap(), JobEvent::Line("partial line".into()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failed() {
        let runner = ProcessRunner::new(Config::default());
        let handle = runner.spawn("sh", vec!["-c".into(), "exit 3".into()], 0.0);

        let events = collect_events(handle).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], JobEvent::Failed(_)));
    }

    #[tokio::test]
    async fn test_launch_failure_is_failed_not_silence() {
        let runner = ProcessRunner::new(Config::default());
        let handle = runner.spawn("definitely-not-a-real-binary-9a7f", vec![], 0.0);

        let events = collect_events(handle).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], JobEvent::Failed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_kills_child() {
        let runner = ProcessRunner::new(Config::default());
        let handle = runner.spawn("sh", vec!["-c".into(), "sleep 30".into()], 0.0);

        let token = handle.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let start = Instant::now();
        let events = collect_events(handle).await;
        assert_eq!(events.last(), Some(&JobEvent::Cancelled));
        // Must not wait out the child's sleep
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_cancels_job() {
        let config = Config {
            job_timeout_secs: Some(1),
            ..Default::default()
        };
        let runner = ProcessRunner::new(config);
        let handle = runner.spawn("sh", vec!["-c".into(), "sleep 30".into()], 0.0);

        let events = collect_events(handle).await;
        assert_eq!(events.last(), Some(&JobEvent::Cancelled));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_idle_after_completion() {
        let config = Config {
            job_timeout_secs: Some(1),
            ..Default::default()
        };
        let runner = ProcessRunner::new(config);
        let handle = runner.spawn("sh", vec!["-c".into(), "printf 'ok\\n' >&2".into()], 0.0);
        let token = handle.cancel.clone();

        let events = collect_events(handle).await;
        assert_eq!(events.last(), Some(&JobEvent::Completed));

        // Nothing may fire the timeout once the job is done
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_never_loses_a_waiter() {
        // cancel() racing against a waiter that has not polled yet must
        // still wake it; run many rounds to shake the interleaving out
        for _ in 0..64 {
            let token = CancellationToken::new();
            let waiter = {
                let token = token.clone();
                tokio::spawn(async move { token.cancelled().await })
            };
            token.cancel();
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter missed the cancellation")
                .unwrap();
        }
    }

    #[test]
    fn test_token_is_idempotent() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
