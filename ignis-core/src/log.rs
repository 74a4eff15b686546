// Copyright (c) 2024-present Ignis Engine Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Minimal engine-wide logger. The CLI tools and the host binary are free to
//! install their own sink (a CVars-driven log file, for instance); the core
//! only needs somewhere to record what it did without taking a hard
//! dependency on any particular logging framework.

use std::fmt::{Debug, Display};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageKind {
    Information,
    Warning,
    Error,
}

pub struct LogMessage {
    pub kind: MessageKind,
    pub content: String,
    pub time: Duration,
}

struct LogState {
    start: Instant,
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
}

lazy_static! {
    static ref LOG: Mutex<LogState> = Mutex::new(LogState {
        start: Instant::now(),
        verbosity: MessageKind::Information,
        listeners: Vec::new(),
    });
}

/// Central log sink. Every subsystem - memory, jobs, the asset registry, the
/// renderer - writes through this instead of printing directly, so a host
/// application can redirect output (to a file, to an editor console pane)
/// without the core knowing about it.
pub struct Log;

impl Log {
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    pub fn add_listener(sender: Sender<LogMessage>) {
        LOG.lock().listeners.push(sender);
    }

    fn write(kind: MessageKind, content: String) {
        let mut log = LOG.lock();
        if kind < log.verbosity {
            return;
        }
        let time = log.start.elapsed();
        let prefix = match kind {
            MessageKind::Information => "[INFO]",
            MessageKind::Warning => "[WARN]",
            MessageKind::Error => "[ERROR]",
        };
        eprintln!("{prefix} {content}");
        log.listeners
            .retain(|sender| sender.send(LogMessage { kind, content: content.clone(), time }).is_ok());
    }

    pub fn info<S: Display>(msg: S) {
        Self::write(MessageKind::Information, msg.to_string());
    }

    pub fn warn<S: Display>(msg: S) {
        Self::write(MessageKind::Warning, msg.to_string());
    }

    pub fn err<S: Display>(msg: S) {
        Self::write(MessageKind::Error, msg.to_string());
    }

    /// Logs `result` as an error if it is `Err`, otherwise is a no-op.
    /// Matches the "log-and-continue" shape used around watcher and
    /// hot-reload I/O, where failures are reported but don't abort the
    /// engine.
    pub fn verify<T, E: Debug>(result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                Self::err(format!("{err:?}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn verify_logs_and_returns_none_on_err() {
        let result: Result<(), &str> = Err("boom");
        assert!(Log::verify(result).is_none());
    }

    #[test]
    fn listener_receives_messages() {
        let (tx, rx) = channel();
        Log::add_listener(tx);
        Log::info("hello from the test suite");
        let msg = rx.recv().expect("listener should have received a message");
        assert_eq!(msg.kind, MessageKind::Information);
    }
}
