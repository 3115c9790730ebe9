//! Cancellable stream draining
//!
//! A [`StreamReader`] drains one output stream on its own task so stdout and
//! stderr are consumed at the same time; a remote that blocks writing one
//! stream never stalls the other. [`DualStreamCapture`] scopes a pair of
//! readers to a single command.

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::transport::OutputStream;

/// Read buffer size per stream
const READ_CHUNK: usize = 8 * 1024;

/// Bytes drained from one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// Everything read before end of stream or stop
    pub bytes: Vec<u8>,
    /// True when the stream reached end of file
    pub complete: bool,
}

impl Captured {
    /// Lossy UTF-8 view of the captured bytes
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Drains one stream to completion on a background task
pub struct StreamReader {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<Captured>>,
    result: Option<Captured>,
}

impl StreamReader {
    /// Starts draining `stream`. `name` labels log lines.
    #[must_use]
    pub fn start(name: &'static str, mut stream: OutputStream) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut captured = Captured::default();
            let mut chunk = vec![0u8; READ_CHUNK];
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    read = stream.read(&mut chunk) => match read {
                        Ok(0) => {
                            captured.complete = true;
                            break;
                        }
                        Ok(n) => captured.bytes.extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            tracing::debug!(stream = name, error = %e, "Stream read failed");
                            break;
                        }
                    }
                }
            }
            captured
        });

        Self {
            name,
            stop_tx,
            task: Some(task),
            result: None,
        }
    }

    /// Asks the reader to stop. Safe to call after it already finished.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Waits for the reader to end, keeping what it drained.
    ///
    /// Cancel-safe: dropping this future leaves the reader running.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let captured = match task.await {
                Ok(captured) => captured,
                Err(e) => {
                    tracing::debug!(stream = self.name, error = %e, "Reader task failed");
                    Captured::default()
                }
            };
            self.task = None;
            self.result = Some(captured);
        }
    }

    /// Stops the reader if needed and returns what it captured
    pub async fn join(mut self) -> Captured {
        self.stop();
        self.finished().await;
        self.result.take().unwrap_or_default()
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Both streams of one command
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    /// Standard output
    pub stdout: Captured,
    /// Standard error
    pub stderr: Captured,
}

/// A stdout/stderr reader pair bound to one command.
///
/// Dropping the capture aborts both readers, so no reader outlives the call
/// that started it.
pub struct DualStreamCapture {
    stdout: Option<StreamReader>,
    stderr: Option<StreamReader>,
}

impl DualStreamCapture {
    /// Starts readers for whichever streams are present
    #[must_use]
    pub fn start(stdout: Option<OutputStream>, stderr: Option<OutputStream>) -> Self {
        Self {
            stdout: stdout.map(|s| StreamReader::start("stdout", s)),
            stderr: stderr.map(|s| StreamReader::start("stderr", s)),
        }
    }

    /// Signals both readers to stop
    pub fn stop(&self) {
        for reader in [&self.stdout, &self.stderr].into_iter().flatten() {
            reader.stop();
        }
    }

    /// Gives both readers up to `grace` to reach end of stream, then joins them
    pub async fn finish(mut self, grace: Duration) -> CapturedOutput {
        let drained = tokio::time::timeout(grace, async {
            if let Some(reader) = self.stdout.as_mut() {
                reader.finished().await;
            }
            if let Some(reader) = self.stderr.as_mut() {
                reader.finished().await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::debug!(
                grace_ms = grace.as_millis() as u64,
                "Readers did not finish within grace period"
            );
            self.stop();
        }
        self.join().await
    }

    /// Stops both readers and returns what they captured
    pub async fn join(mut self) -> CapturedOutput {
        let stdout = match self.stdout.take() {
            Some(reader) => reader.join().await,
            None => Captured::default(),
        };
        let stderr = match self.stderr.take() {
            Some(reader) => reader.join().await,
            None => Captured::default(),
        };
        CapturedOutput { stdout, stderr }
    }
}
