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

//! Linear bump arena.
//!
//! An [`Arena`] never frees individual allocations; it only ever grows
//! (by chaining new blocks once the current one is exhausted) or rewinds in
//! bulk via [`Arena::restore`]. A [`Savepoint`] must be restored in the exact
//! reverse order it was taken in - restoring out of order is a programmer
//! error and is treated as fatal, matching the "temporary memory" stack
//! discipline of the allocator this is modeled on.

use bytemuck::Pod;

use super::{out_of_memory, padding_to_align};

/// Fixed role of one of the engine's process-wide arenas (see
/// `SPEC_FULL.md` §4.1). Carried purely for diagnostics - panics mention
/// which arena misbehaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaRole {
    /// Lives until engine shutdown; the only arena safe to touch from more
    /// than one thread, and then only append-only under a lock.
    Permanent,
    /// Reset at the end of every frame.
    Transient,
    /// Backs the debug log ring buffers.
    Debug,
    /// A per-thread scratch arena (see [`super::scratch`]).
    Scratch,
}

/// An opaque region inside an [`Arena`]. Slots are never freed individually;
/// the only way to reclaim their memory is [`Arena::restore`] (or resetting
/// the whole arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaSlot {
    block: usize,
    offset: usize,
    size: usize,
}

impl ArenaSlot {
    pub fn size(&self) -> usize {
        self.size
    }
}

/// A saved `(block, offset)` cursor. Must be restored in LIFO order relative
/// to every other outstanding savepoint on the same arena.
#[derive(Debug, Clone, Copy)]
pub struct Savepoint {
    block: usize,
    offset: usize,
    depth: usize,
}

struct Block {
    bytes: Box<[u8]>,
    cursor: usize,
}

impl Block {
    fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
        }
    }
}

/// Linear bump allocator that grows by chained blocks on exhaustion.
///
/// Allocations are addressed by [`ArenaSlot`], not by raw pointer: reads and
/// writes go through [`Arena::read`] / [`Arena::write`] /
/// [`Arena::write_val`], which keeps the whole allocator free of `unsafe`
/// while still giving callers O(1) bump allocation and bulk rewind.
pub struct Arena {
    role: ArenaRole,
    min_block_size: usize,
    blocks: Vec<Block>,
    /// Number of outstanding savepoints, used only to catch out-of-order
    /// restores.
    open_savepoints: usize,
}

impl Arena {
    pub fn new(role: ArenaRole, min_block_size: usize) -> Self {
        Self {
            role,
            min_block_size: min_block_size.max(1),
            blocks: vec![Block::new(min_block_size.max(1))],
            open_savepoints: 0,
        }
    }

    pub fn role(&self) -> ArenaRole {
        self.role
    }

    /// Total bytes bumped across every live block, excluding space rewound
    /// by a savepoint restore. Used by tests and by the debug arena's
    /// reporting.
    pub fn offset(&self) -> usize {
        self.blocks.iter().map(|b| b.cursor).sum()
    }

    /// Bumps the arena by `size` bytes aligned to `align`, growing by a new
    /// chained block of at least `min_block_size` if the current block can't
    /// fit the request. Allocation failure (the backing `Vec` itself failing
    /// to grow) is fatal, per `SPEC_FULL.md` §7.
    pub fn allocate(&mut self, size: usize, align: usize) -> ArenaSlot {
        if size == 0 {
            return ArenaSlot {
                block: self.blocks.len() - 1,
                offset: self.blocks.last().unwrap().cursor,
                size: 0,
            };
        }

        let last = self.blocks.len() - 1;
        let padding = padding_to_align(self.blocks[last].cursor, align);
        if self.blocks[last].cursor + padding + size <= self.blocks[last].bytes.len() {
            let offset = self.blocks[last].cursor + padding;
            self.blocks[last].cursor = offset + size;
            return ArenaSlot {
                block: last,
                offset,
                size,
            };
        }

        // Exhausted: chain a new block sized to fit both the request and the
        // arena's minimum growth increment.
        let capacity = self.min_block_size.max(size + align);
        if self.blocks.len() >= u32::MAX as usize {
            out_of_memory("arena chained-block limit", size);
        }
        self.blocks.push(Block::new(capacity));
        let new_last = self.blocks.len() - 1;
        let padding = padding_to_align(0, align);
        let offset = padding;
        self.blocks[new_last].cursor = offset + size;
        ArenaSlot {
            block: new_last,
            offset,
            size,
        }
    }

    pub fn write(&mut self, slot: ArenaSlot, bytes: &[u8]) {
        assert_eq!(bytes.len(), slot.size, "write size must match slot size");
        self.blocks[slot.block].bytes[slot.offset..slot.offset + slot.size].copy_from_slice(bytes);
    }

    pub fn read(&self, slot: ArenaSlot) -> &[u8] {
        &self.blocks[slot.block].bytes[slot.offset..slot.offset + slot.size]
    }

    /// Convenience for POD values: allocates a slot sized and aligned for
    /// `T` and writes `value` into it in one step.
    pub fn write_val<T: Pod>(&mut self, value: T) -> ArenaSlot {
        let slot = self.allocate(std::mem::size_of::<T>(), std::mem::align_of::<T>());
        self.write(slot, bytemuck::bytes_of(&value));
        slot
    }

    pub fn read_val<T: Pod>(&self, slot: ArenaSlot) -> T {
        *bytemuck::from_bytes(self.read(slot))
    }

    /// Takes a savepoint at the arena's current cursor. Must be closed with
    /// [`Arena::restore`] before any savepoint taken earlier than it.
    pub fn savepoint(&mut self) -> Savepoint {
        self.open_savepoints += 1;
        let last = self.blocks.len() - 1;
        Savepoint {
            block: last,
            offset: self.blocks[last].cursor,
            depth: self.open_savepoints,
        }
    }

    /// Rewinds the arena to `save`. Fatal if `save` is not the most recently
    /// taken still-open savepoint (out-of-order restore is a programmer
    /// error, per `SPEC_FULL.md` §4.1).
    pub fn restore(&mut self, save: Savepoint) {
        assert_eq!(
            save.depth, self.open_savepoints,
            "arena savepoints must be restored in LIFO order (out-of-order restore is fatal)"
        );
        self.blocks.truncate(save.block + 1);
        self.blocks[save.block].cursor = save.offset;
        self.open_savepoints -= 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arena_stack_matches_spec_scenario() {
        let mut arena = Arena::new(ArenaRole::Transient, 4096);
        let save_a = arena.savepoint();
        arena.allocate(128, 1);
        assert_eq!(arena.offset(), 128);

        let save_b = arena.savepoint();
        arena.allocate(256, 1);
        assert_eq!(arena.offset(), 384);

        arena.restore(save_b);
        assert_eq!(arena.offset(), 128);

        arena.restore(save_a);
        assert_eq!(arena.offset(), 0);
    }

    #[test]
    #[should_panic(expected = "LIFO order")]
    fn out_of_order_restore_is_fatal() {
        let mut arena = Arena::new(ArenaRole::Transient, 4096);
        let save_a = arena.savepoint();
        let save_b = arena.savepoint();
        let _ = save_b;
        arena.restore(save_a);
    }

    #[test]
    fn grows_by_chained_blocks_on_exhaustion() {
        let mut arena = Arena::new(ArenaRole::Transient, 64);
        let first = arena.allocate(32, 1);
        assert_eq!(first.block, 0);
        let second = arena.allocate(64, 1);
        assert_eq!(second.block, 1, "must chain a new block rather than overflow");
    }

    #[test]
    fn typed_roundtrip() {
        let mut arena = Arena::new(ArenaRole::Debug, 256);
        let slot = arena.write_val(1234u64);
        assert_eq!(arena.read_val::<u64>(slot), 1234);
    }
}
