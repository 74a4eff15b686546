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

//! Content-derived asset identity.
//!
//! `SPEC_FULL.md`'s Open Question on UUID derivation is resolved here in
//! favor of the content-based scheme: an asset's id is a hash of its file
//! bytes, not its path, so moving or renaming a file whose content didn't
//! change keeps the same id. Embedded children (a mesh baked out of an
//! imported model, say) don't have file bytes of their own, so their id is
//! derived from the parent id plus their local name - stable across
//! reruns without a central registry, per `SPEC_FULL.md` §4.3.

use std::hash::Hasher;

use fxhash::FxHasher64;

/// Content-derived identifier for an asset or resource. A 64-bit hash,
/// per `SPEC_FULL.md`'s data model (`uuid: u64`), not the 128-bit `uuid`
/// crate type used elsewhere for wire-format compatibility.
pub type AssetId = u64;

/// Derives an asset id from raw file content.
pub fn content_id(bytes: &[u8]) -> AssetId {
    let mut hasher = FxHasher64::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Derives an embedded child's id from its parent and its local name
/// (e.g. a model's embedded mesh named `"mesh_0"`).
pub fn embedded_child_id(parent: AssetId, local_name: &str) -> AssetId {
    let mut hasher = FxHasher64::default();
    hasher.write_u64(parent);
    hasher.write(local_name.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_content_same_id() {
        let a = content_id(b"hello world");
        let b = content_id(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_different_id() {
        assert_ne!(content_id(b"a"), content_id(b"b"));
    }

    #[test]
    fn embedded_children_are_stable_and_distinct() {
        let parent = content_id(b"model.fbx contents");
        let mesh = embedded_child_id(parent, "mesh_0");
        let material = embedded_child_id(parent, "material_0");
        assert_ne!(mesh, material);
        assert_eq!(mesh, embedded_child_id(parent, "mesh_0"));
    }
}
