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

//! Filesystem watcher used by the resource manager's hot-reload path. Wraps
//! `notify` so the rest of the engine only has to deal with a simple
//! poll-for-event API instead of the channel the `notify` backend delivers
//! events on; watcher errors are logged and the watch is re-armed rather
//! than propagated, since a missed filesystem event is recoverable and a
//! crashed watcher thread is not.

use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::log::Log;

pub struct FileSystemWatcher {
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
}

impl FileSystemWatcher {
    pub fn new<P: AsRef<Path>>(path: P, poll_interval: Duration) -> Result<Self, notify::Error> {
        let (tx, rx) = channel();
        let mut watcher =
            RecommendedWatcher::new(tx, Config::default().with_poll_interval(poll_interval))?;
        watcher.watch(path.as_ref(), RecursiveMode::Recursive)?;
        Ok(Self {
            watcher,
            receiver: rx,
        })
    }

    /// Drains one pending event, if any. Errors from the underlying watcher
    /// are logged and swallowed: the watch itself keeps running (`notify`
    /// re-arms automatically), so a single missed event doesn't need to be
    /// surfaced as a fatal condition.
    pub fn try_get_event(&self) -> Option<Event> {
        match self.receiver.try_recv() {
            Ok(Ok(event)) => Some(event),
            Ok(Err(err)) => {
                Log::err(format!("filesystem watcher error: {err}"));
                None
            }
            Err(_) => None,
        }
    }
}
