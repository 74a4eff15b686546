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

//! The boundary between the engine and whatever embeds it. `ignis-core` and
//! every other crate in this workspace never call an OS API directly
//! (`SPEC_FULL.md` §6); a concrete host binary implements this trait and
//! hands an `Arc<dyn HostSurface>` to the engine root at `init` time.
//!
//! `create_thread`/`mutex`/`semaphore`/`load_dynamic_library` from the
//! original host-surface list aren't part of this trait: Rust's `std`
//! already provides a portable `thread::spawn` and `Mutex`, and the engine
//! builds its own counting semaphore internally, so wrapping any of it
//! behind a host capability would just be indirection with no second
//! implementation ever needed.

use std::path::{Path, PathBuf};

pub struct WindowHandle(pub u64);

pub trait HostSurface: Send + Sync {
    fn create_surface(&self, title: &str, width: u32, height: u32) -> WindowHandle;
    fn poll_events(&self) -> Vec<HostEvent>;
    fn open_file_dialog(&self, filter: &str) -> Option<PathBuf>;
    fn save_file_dialog(&self, filter: &str) -> Option<PathBuf>;
    fn watch_directory(&self, path: &Path) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub enum HostEvent {
    Resize { width: u32, height: u32 },
    DeviceLost,
    Close,
}
