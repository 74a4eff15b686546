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

//! Raw job parameter buffers.
//!
//! `JobSystem::execute_raw` copies its caller's bytes through a shared
//! [`FreeListAllocator`] instead of capturing them in a closure, matching the
//! source job system's "parameters block allocated on the heap, freed when
//! the job finishes" design. Most callers want `execute`'s ergonomic closure
//! API instead; this path exists for jobs whose parameters are produced by
//! code that does not know about Rust closures (e.g. data read straight off
//! disk into a byte buffer) and need the literal allocate/copy/free lifecycle
//! the spec describes.

use std::sync::Arc;

use ignis_core::memory::FreeListAllocator;
use ignis_core::memory::free_list::FreeListSlot;

pub(crate) struct RawParams {
    heap: Arc<FreeListAllocator>,
    slot: FreeListSlot,
}

impl RawParams {
    pub(crate) fn store(heap: Arc<FreeListAllocator>, bytes: &[u8]) -> Self {
        let slot = heap.allocate(bytes.len().max(1), 1);
        heap.write(slot, bytes);
        Self { heap, slot }
    }

    pub(crate) fn load(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.slot.size()];
        self.heap.read(self.slot, &mut out);
        out
    }
}

impl Drop for RawParams {
    fn drop(&mut self) {
        self.heap.free(self.slot);
    }
}
