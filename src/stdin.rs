//! Acquiring standard input for a stdin-backed flag.
//!
//! Declaring a stdin source never reads anything. The read happens once,
//! when the command line is parsed, through a [`StdinSource`].

use std::io::{self, IsTerminal, Read};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crate::value::Value;

pub trait StdinSource {
    /// Everything available on the stream, or `None` when there is no data
    /// (interactive terminal, empty input, read failure, timeout).
    fn read_all(&self) -> Option<Vec<u8>>;
}

/// The process's standard input.
///
/// A terminal yields `None` without blocking. Redirected input is drained on
/// a helper thread; with a `timeout` the wait is bounded and an unfinished
/// read counts as no data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStdin {
    timeout: Option<Duration>,
}

impl ProcessStdin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl StdinSource for ProcessStdin {
    fn read_all(&self) -> Option<Vec<u8>> {
        if std::io::stdin().is_terminal() {
            tracing::debug!("stdin is a terminal; no data");
            return None;
        }

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let result = std::io::stdin().lock().read_to_end(&mut buf).map(|_| buf);
            // The receiver may have given up already.
            let _ = tx.send(result);
        });

        wait_for(&rx, self.timeout)
    }
}

/// Wait for the reader thread's result. Giving up on the timeout, a hung-up
/// reader, a read error and empty input all count as no data.
fn wait_for(rx: &Receiver<io::Result<Vec<u8>>>, timeout: Option<Duration>) -> Option<Vec<u8>> {
    let received = match timeout {
        Some(limit) => rx.recv_timeout(limit).map_err(|e| e.to_string()),
        None => rx.recv().map_err(|e| e.to_string()),
    };

    match received {
        Ok(Ok(buf)) if buf.is_empty() => None,
        Ok(Ok(buf)) => Some(buf),
        Ok(Err(e)) => {
            tracing::warn!("failed to read stdin: {e}");
            None
        }
        Err(e) => {
            tracing::warn!("no stdin data: {e}");
            None
        }
    }
}

/// Canned input, for tests.
#[derive(Debug, Clone, Default)]
pub struct FixedStdin(Option<Vec<u8>>);

impl FixedStdin {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Some(data.into()))
    }
}

impl StdinSource for FixedStdin {
    fn read_all(&self) -> Option<Vec<u8>> {
        self.0.clone().filter(|d| !d.is_empty())
    }
}

/// Text becomes a string value; anything else stays opaque bytes.
pub fn to_value(data: Vec<u8>) -> Value {
    match String::from_utf8(data) {
        Ok(text) => Value::String(text),
        Err(e) => Value::bytes(e.into_bytes()),
    }
}
