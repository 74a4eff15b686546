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

//! Per-thread scratch arena.
//!
//! Every OS thread gets exactly one [`Arena`] of its own, looked up through a
//! `thread_local!`. No cross-thread access is possible because a
//! `thread_local` value can't be named from another thread - this is the
//! Rust-idiomatic replacement for the source engine's explicit
//! thread-id-keyed scratch table.

use std::cell::RefCell;

use super::arena::{Arena, ArenaRole, Savepoint};

const DEFAULT_SCRATCH_BLOCK_SIZE: usize = 1024 * 1024;

thread_local! {
    static SCRATCH: RefCell<Arena> = RefCell::new(Arena::new(ArenaRole::Scratch, DEFAULT_SCRATCH_BLOCK_SIZE));
}

/// RAII handle into the current thread's scratch arena. Allocations made
/// through it are valid for the lexical scope of the guard; dropping the
/// guard restores the arena to the savepoint it captured at creation,
/// exactly as if `Arena::restore` had been called by hand.
pub struct ScratchArena {
    save: Option<Savepoint>,
}

impl ScratchArena {
    /// Opens a new scratch scope on the calling thread.
    pub fn acquire() -> Self {
        let save = SCRATCH.with(|arena| arena.borrow_mut().savepoint());
        Self { save: Some(save) }
    }

    /// Runs `f` with mutable access to the calling thread's scratch arena.
    pub fn with<R>(&self, f: impl FnOnce(&mut Arena) -> R) -> R {
        SCRATCH.with(|arena| f(&mut arena.borrow_mut()))
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        if let Some(save) = self.save.take() {
            SCRATCH.with(|arena| arena.borrow_mut().restore(save));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scratch_scope_rewinds_on_drop() {
        let before = SCRATCH.with(|a| a.borrow().offset());
        {
            let scratch = ScratchArena::acquire();
            scratch.with(|arena| {
                arena.allocate(64, 1);
            });
            let during = SCRATCH.with(|a| a.borrow().offset());
            assert_eq!(during, before + 64);
        }
        let after = SCRATCH.with(|a| a.borrow().offset());
        assert_eq!(after, before);
    }

    #[test]
    fn scratch_is_not_shared_across_threads() {
        ScratchArena::acquire().with(|arena| {
            arena.allocate(128, 1);
        });
        let main_offset = SCRATCH.with(|a| a.borrow().offset());

        let handle = std::thread::spawn(|| SCRATCH.with(|a| a.borrow().offset()));
        let other_offset = handle.join().unwrap();

        assert_ne!(main_offset, 0);
        assert_eq!(other_offset, 0, "a fresh thread must see a fresh scratch arena");
    }
}
