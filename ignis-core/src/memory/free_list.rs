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

//! Coalescing free-list allocator, the long-lived heap used for job
//! parameter buffers and other allocations that outlive a single frame.
//!
//! Every live allocation is prefixed by a small header encoding the total
//! span it occupies (header + alignment padding + payload) and the padding
//! distance back to the start of that span, so [`FreeListAllocator::free`]
//! can reconstruct the block to give back to the free list without a side
//! table. The free list itself is kept in address order so neighbors are
//! always adjacent in the vector, which is what makes coalescing on `free`
//! a cheap look-left/look-right check.

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

use super::{out_of_memory, padding_to_align};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Header {
    /// Total bytes spanned by this allocation: header + padding + payload.
    total_span: u64,
    /// Distance from the start of the span to the start of this header.
    alignment_offset: u64,
}

const HEADER_SIZE: usize = std::mem::size_of::<Header>();
/// Minimum remainder worth splitting off as its own free block; anything
/// smaller is absorbed into the allocation instead, mirroring the source
/// allocator's `sizeof(Free_List_Node)` threshold.
const MIN_SPLIT: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FreeBlock {
    offset: usize,
    size: usize,
}

struct Inner {
    buffer: Vec<u8>,
    /// Address-ordered free blocks. Neighbors in this vector are neighbors
    /// in address space, which is the invariant coalescing relies on.
    free: Vec<FreeBlock>,
    used: usize,
}

/// A handle to a live allocation. Opaque outside this module; round-trips
/// through [`FreeListAllocator::allocate`], `read`/`write`, `reallocate` and
/// `free`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeListSlot {
    payload_offset: usize,
    payload_size: usize,
}

impl FreeListSlot {
    pub fn size(&self) -> usize {
        self.payload_size
    }
}

/// Doubly-linked (in spirit - here a sorted vector) coalescing free-list
/// allocator over a fixed-size backing buffer. All mutation is serialized
/// by an internal mutex, so a single [`FreeListAllocator`] can be shared
/// across threads (the job system's parameter heap does exactly this).
pub struct FreeListAllocator {
    inner: Mutex<Inner>,
}

impl FreeListAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: vec![0u8; capacity],
                free: vec![FreeBlock {
                    offset: 0,
                    size: capacity,
                }],
                used: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    pub fn used(&self) -> usize {
        self.inner.lock().used
    }

    /// Number of free blocks currently tracked; equals one whenever the
    /// allocator has coalesced everything back into a single run.
    pub fn free_block_count(&self) -> usize {
        self.inner.lock().free.len()
    }

    pub fn allocate(&self, size: usize, align: usize) -> FreeListSlot {
        let mut inner = self.inner.lock();
        let slot = Self::allocate_locked(&mut inner, size, align);
        match slot {
            Some(slot) => slot,
            None => out_of_memory("free-list allocator", size),
        }
    }

    fn allocate_locked(inner: &mut Inner, size: usize, align: usize) -> Option<FreeListSlot> {
        let align = align.max(1);
        for i in 0..inner.free.len() {
            let block = inner.free[i];
            let before_payload = HEADER_SIZE + padding_to_align(block.offset + HEADER_SIZE, align);
            let payload_offset = block.offset + before_payload;
            let total_needed = before_payload + size;
            if block.size < total_needed {
                continue;
            }

            let remaining = block.size - total_needed;
            let span = if remaining >= MIN_SPLIT {
                inner.free[i] = FreeBlock {
                    offset: block.offset + total_needed,
                    size: remaining,
                };
                total_needed
            } else {
                inner.free.remove(i);
                block.size
            };

            let header = Header {
                total_span: span as u64,
                alignment_offset: (payload_offset - HEADER_SIZE - block.offset) as u64,
            };
            let header_pos = payload_offset - HEADER_SIZE;
            inner.buffer[header_pos..header_pos + HEADER_SIZE]
                .copy_from_slice(bytemuck::bytes_of(&header));

            inner.used += span;
            return Some(FreeListSlot {
                payload_offset,
                payload_size: size,
            });
        }
        None
    }

    fn header_of(inner: &Inner, payload_offset: usize) -> Header {
        *bytemuck::from_bytes(&inner.buffer[payload_offset - HEADER_SIZE..payload_offset])
    }

    pub fn write(&self, slot: FreeListSlot, bytes: &[u8]) {
        assert!(bytes.len() <= slot.payload_size);
        let mut inner = self.inner.lock();
        inner.buffer[slot.payload_offset..slot.payload_offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn read(&self, slot: FreeListSlot, out: &mut [u8]) {
        let inner = self.inner.lock();
        let len = out.len().min(slot.payload_size);
        out[..len].copy_from_slice(&inner.buffer[slot.payload_offset..slot.payload_offset + len]);
    }

    /// Frees `slot`, inserting its full span back into the free list in
    /// address order and coalescing with the immediate left/right neighbor
    /// if either is contiguous.
    pub fn free(&self, slot: FreeListSlot) {
        let mut inner = self.inner.lock();
        let header = Self::header_of(&inner, slot.payload_offset);
        let block_start = slot.payload_offset - HEADER_SIZE - header.alignment_offset as usize;
        let block_size = header.total_span as usize;
        inner.used -= block_size;

        let insert_at = inner
            .free
            .partition_point(|b| b.offset < block_start);
        inner.free.insert(
            insert_at,
            FreeBlock {
                offset: block_start,
                size: block_size,
            },
        );

        // Coalesce with the following neighbor first so the index of the
        // preceding neighbor (if any) stays valid.
        if insert_at + 1 < inner.free.len() {
            let next = inner.free[insert_at + 1];
            let cur = inner.free[insert_at];
            if cur.offset + cur.size == next.offset {
                inner.free[insert_at].size += next.size;
                inner.free.remove(insert_at + 1);
            }
        }
        if insert_at > 0 {
            let prev = inner.free[insert_at - 1];
            let cur = inner.free[insert_at];
            if prev.offset + prev.size == cur.offset {
                inner.free[insert_at - 1].size += cur.size;
                inner.free.remove(insert_at);
            }
        }
    }

    /// Grows or shrinks `slot` in place when the adjacent tail block makes
    /// that possible, otherwise allocates fresh, copies, and frees the old
    /// slot.
    pub fn reallocate(&self, slot: FreeListSlot, new_size: usize, align: usize) -> FreeListSlot {
        if new_size <= slot.payload_size {
            return FreeListSlot {
                payload_offset: slot.payload_offset,
                payload_size: new_size,
            };
        }

        let grown_in_place = {
            let mut inner = self.inner.lock();
            let header = Self::header_of(&inner, slot.payload_offset);
            let span_end = slot.payload_offset - HEADER_SIZE
                - header.alignment_offset as usize
                + header.total_span as usize;
            let growth = new_size - slot.payload_size;

            let adjacent_idx = inner.free.iter().position(|b| b.offset == span_end);
            if let Some(idx) = adjacent_idx {
                let adjacent = inner.free[idx];
                if adjacent.size >= growth {
                    if adjacent.size == growth {
                        inner.free.remove(idx);
                    } else {
                        inner.free[idx] = FreeBlock {
                            offset: adjacent.offset + growth,
                            size: adjacent.size - growth,
                        };
                    }
                    let mut new_header = header;
                    new_header.total_span += growth as u64;
                    let header_pos = slot.payload_offset - HEADER_SIZE;
                    inner.buffer[header_pos..header_pos + HEADER_SIZE]
                        .copy_from_slice(bytemuck::bytes_of(&new_header));
                    inner.used += growth;
                    true
                } else {
                    false
                }
            } else {
                false
            }
        };

        if grown_in_place {
            return FreeListSlot {
                payload_offset: slot.payload_offset,
                payload_size: new_size,
            };
        }

        let new_slot = self.allocate(new_size, align);
        let mut buf = vec![0u8; slot.payload_size];
        self.read(slot, &mut buf);
        self.write(new_slot, &buf);
        self.free(slot);
        new_slot
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coalesce_scenario_from_spec() {
        // Three equal allocations with no room for a fourth: filling the
        // arena exactly means freeing any one of them leaves no leftover
        // "tail" free block to confuse the coalescing assertions below.
        let span = HEADER_SIZE + 128;
        let alloc = FreeListAllocator::new(span * 3);

        let a = alloc.allocate(128, 1);
        let b = alloc.allocate(128, 1);
        let c = alloc.allocate(128, 1);
        assert_eq!(alloc.free_block_count(), 0);

        alloc.free(b);
        assert_eq!(alloc.free_block_count(), 1, "freeing the middle block coalesces with nothing");

        alloc.free(a);
        assert_eq!(alloc.free_block_count(), 1, "freeing the first block merges into the middle's free run");

        alloc.free(c);
        assert_eq!(alloc.free_block_count(), 1, "freeing the last block merges everything back into one run");
        assert_eq!(alloc.used(), 0);
    }

    #[test]
    fn dealloc_then_same_size_alloc_reuses_address() {
        let alloc = FreeListAllocator::new(4096);
        let a = alloc.allocate(64, 8);
        let addr = a.payload_offset;
        alloc.free(a);
        let b = alloc.allocate(64, 8);
        assert_eq!(b.payload_offset, addr, "no intervening allocation must return the same address");
    }

    #[test]
    fn reallocate_grows_into_adjacent_tail() {
        let alloc = FreeListAllocator::new(4096);
        let a = alloc.allocate(64, 1);
        let grown = alloc.reallocate(a, 128, 1);
        assert_eq!(grown.payload_offset, a.payload_offset);
        assert_eq!(grown.size(), 128);
    }

    #[test]
    fn read_write_roundtrip() {
        let alloc = FreeListAllocator::new(256);
        let slot = alloc.allocate(16, 1);
        alloc.write(slot, b"0123456789012345");
        let mut out = [0u8; 16];
        alloc.read(slot, &mut out);
        assert_eq!(&out, b"0123456789012345");
    }
}
