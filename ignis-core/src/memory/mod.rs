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

//! The engine's memory system: a bump [`arena`], a per-thread [`scratch`]
//! arena built on top of it, and a coalescing [`free_list`] allocator used
//! as the long-lived heap for job parameter buffers and similar allocations.
//!
//! Allocation failure anywhere in this module is fatal: the engine has no
//! recovery path for running out of its own backing memory, so every
//! `allocate` aborts the process with a diagnostic rather than returning an
//! error the caller would have to remember to check.

pub mod arena;
pub mod free_list;
pub mod scratch;

pub use arena::{Arena, ArenaRole, Savepoint};
pub use free_list::FreeListAllocator;
pub use scratch::ScratchArena;

/// Rounds `address` up to the next multiple of `align` (`align` must be a
/// power of two), mirroring `get_number_of_bytes_to_align_address` from the
/// C engine this module is modeled on.
pub(crate) fn padding_to_align(address: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
    let modulo = address & (align - 1);
    if modulo == 0 {
        0
    } else {
        align - modulo
    }
}

/// Aborts the process with a diagnostic. Allocation exhaustion is the one
/// error condition in the memory system with no recovery locus (see
/// `SPEC_FULL.md` §7), so every allocator calls this instead of returning
/// `Result`.
#[cold]
#[track_caller]
pub(crate) fn out_of_memory(context: &str, requested: usize) -> ! {
    panic!("allocator exhausted ({context}): failed to satisfy a {requested}-byte request");
}
