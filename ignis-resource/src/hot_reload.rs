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

//! Wires [`FileSystemWatcher`] events to [`ResourceManager`] transitions.
//! Driven once per frame from the main thread - never from the watcher's own
//! background thread - so resource state transitions stay on the single
//! thread the spec requires (`SPEC_FULL.md` §5).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ignis_core::watcher::FileSystemWatcher;
use notify::EventKind;

use crate::resource::ResourceManager;

pub struct HotReloadWatcher {
    watcher: FileSystemWatcher,
    root: PathBuf,
}

impl HotReloadWatcher {
    pub fn new(root: impl AsRef<Path>, poll_interval: Duration) -> Result<Self, notify::Error> {
        let root = root.as_ref().to_path_buf();
        Ok(Self {
            watcher: FileSystemWatcher::new(&root, poll_interval)?,
            root,
        })
    }

    /// Drains every pending filesystem event and applies it to `manager`.
    /// Call once per frame from the main thread.
    pub fn pump(&self, manager: &Arc<ResourceManager>) {
        while let Some(event) = self.watcher.try_get_event() {
            for path in &event.paths {
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                match event.kind {
                    EventKind::Modify(_) => {
                        // The file's content UUID changes with its bytes, so
                        // the resource we need to reload must be found by its
                        // still-current registry path, not by rehashing.
                        if let Some(uuid) = manager.uuid_for_path(relative) {
                            manager.reload(uuid);
                        }
                    }
                    EventKind::Remove(_) => {
                        manager.mark_deleted_by_path(relative);
                    }
                    _ => {}
                }
            }
        }
    }
}
