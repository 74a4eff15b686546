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

//! The scene graph itself: a [`Pool`] of [`SceneNode`]s addressed by handle,
//! with parent/child/sibling links instead of owned child vectors. Replaces
//! the cyclic-reference-prone tree a naive port would produce (see
//! `SPEC_FULL.md` §9's "cyclic scene-node references" redesign note) with a
//! flat arena where subtree removal is just unlinking plus freeing handles.

use ignis_core::pool::Pool;
use nalgebra::Matrix4;

use crate::node::{NodeHandle, SceneNode};
use crate::transform::Transform;

pub struct Scene {
    nodes: Pool<SceneNode>,
    root: NodeHandle,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Spawns the scene with its root already in place at handle index 0,
    /// per `SPEC_FULL.md` §4.5 ("node index 0 is always the root").
    pub fn new() -> Self {
        let mut nodes = Pool::new();
        let root = nodes.spawn(SceneNode::new("root"));
        debug_assert_eq!(root.index(), 0);
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn node(&self, handle: NodeHandle) -> &SceneNode {
        self.nodes.borrow(handle)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> &mut SceneNode {
        self.nodes.borrow_mut(handle)
    }

    pub fn is_valid(&self, handle: NodeHandle) -> bool {
        self.nodes.is_valid_handle(handle)
    }

    /// Creates a detached node (no parent, no children) and returns its
    /// handle. Callers attach it with one of the `add_child_*` methods.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeHandle {
        self.nodes.spawn(SceneNode::new(name))
    }

    /// Sets `child`'s local transform and marks it dirty so the next
    /// [`Self::update_world_transforms`] recomputes its (and its subtree's)
    /// world matrix.
    pub fn set_local_transform(&mut self, handle: NodeHandle, transform: Transform) {
        let node = self.nodes.borrow_mut(handle);
        node.transform = transform;
        node.dirty = true;
    }

    /// Links `child` as `parent`'s first child. O(1): only `parent.first_child`
    /// and, if `parent` had no children yet, `parent.last_child` are touched.
    pub fn add_child_first(&mut self, parent: NodeHandle, child: NodeHandle) {
        self.detach(child);
        let old_first = self.nodes.borrow(parent).first_child;
        {
            let child_node = self.nodes.borrow_mut(child);
            child_node.parent = Some(parent);
            child_node.next_sibling = old_first;
        }
        let parent_node = self.nodes.borrow_mut(parent);
        parent_node.first_child = Some(child);
        if parent_node.last_child.is_none() {
            parent_node.last_child = Some(child);
        }
    }

    /// Links `child` as `parent`'s last child. O(1) because the parent keeps
    /// a `last_child` pointer rather than requiring a sibling-chain walk.
    pub fn add_child_last(&mut self, parent: NodeHandle, child: NodeHandle) {
        self.detach(child);
        let old_last = self.nodes.borrow(parent).last_child;
        self.nodes.borrow_mut(child).parent = Some(parent);

        match old_last {
            Some(last) => {
                self.nodes.borrow_mut(last).next_sibling = Some(child);
            }
            None => {
                self.nodes.borrow_mut(parent).first_child = Some(child);
            }
        }
        self.nodes.borrow_mut(parent).last_child = Some(child);
    }

    /// Links `child` immediately after `after` in `after`'s parent's sibling
    /// chain. O(1): we already hold a direct handle to `after`, no scan
    /// needed.
    pub fn add_child_after(&mut self, parent: NodeHandle, after: NodeHandle, child: NodeHandle) {
        self.detach(child);
        let next = self.nodes.borrow(after).next_sibling;
        self.nodes.borrow_mut(child).parent = Some(parent);
        self.nodes.borrow_mut(child).next_sibling = next;
        self.nodes.borrow_mut(after).next_sibling = Some(child);
        if self.nodes.borrow(parent).last_child == Some(after) {
            self.nodes.borrow_mut(parent).last_child = Some(child);
        }
    }

    /// Unlinks `handle` from its current parent's sibling chain, if any.
    /// Not `pub`: callers reach this indirectly through `add_child_*` (which
    /// re-parents) or [`Self::remove_subtree`].
    fn detach(&mut self, handle: NodeHandle) {
        let Some(parent) = self.nodes.borrow(handle).parent else {
            return;
        };
        let next = self.nodes.borrow(handle).next_sibling;

        let first = self.nodes.borrow(parent).first_child;
        if first == Some(handle) {
            self.nodes.borrow_mut(parent).first_child = next;
        } else {
            // Singly linked, so unlinking a non-head sibling costs a scan to
            // find its predecessor - the spec only requires O(1) *insertion*.
            let mut cursor = first;
            while let Some(current) = cursor {
                let current_next = self.nodes.borrow(current).next_sibling;
                if current_next == Some(handle) {
                    self.nodes.borrow_mut(current).next_sibling = next;
                    break;
                }
                cursor = current_next;
            }
        }
        if self.nodes.borrow(parent).last_child == Some(handle) {
            self.nodes.borrow_mut(parent).last_child = self.find_new_last_child(parent);
        }

        let node = self.nodes.borrow_mut(handle);
        node.parent = None;
        node.next_sibling = None;
    }

    fn find_new_last_child(&self, parent: NodeHandle) -> Option<NodeHandle> {
        let mut cursor = self.nodes.borrow(parent).first_child;
        let mut last = None;
        while let Some(current) = cursor {
            last = Some(current);
            cursor = self.nodes.borrow(current).next_sibling;
        }
        last
    }

    /// Removes `handle` and its entire subtree, freeing every handle in it.
    /// Removing the root is a programmer error (there is nothing to
    /// reparent the remaining scene to) and panics.
    pub fn remove_subtree(&mut self, handle: NodeHandle) {
        assert_ne!(handle, self.root, "cannot remove the scene root");
        self.detach(handle);
        self.free_subtree(handle);
    }

    fn free_subtree(&mut self, handle: NodeHandle) {
        let mut child = self.nodes.borrow(handle).first_child;
        while let Some(current) = child {
            let next = self.nodes.borrow(current).next_sibling;
            self.free_subtree(current);
            child = next;
        }
        self.nodes.free(handle);
    }

    pub fn children(&self, handle: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        let mut cursor = self.nodes.try_borrow(handle).and_then(|n| n.first_child);
        std::iter::from_fn(move || {
            let current = cursor?;
            cursor = self.nodes.borrow(current).next_sibling;
            Some(current)
        })
    }

    /// Recomputes every dirty node's world matrix, propagating dirtiness
    /// down from ancestors as it walks: a node recomputes if it is itself
    /// dirty *or* its parent just recomputed, so a single mutation near the
    /// root still invalidates the whole subtree without having to mark every
    /// descendant eagerly at edit time.
    pub fn update_world_transforms(&mut self) {
        self.update_node(self.root, Matrix4::identity(), false);
    }

    fn update_node(&mut self, handle: NodeHandle, parent_world: Matrix4<f32>, parent_dirty: bool) {
        let node = self.nodes.borrow_mut(handle);
        let dirty = node.dirty || parent_dirty;
        if dirty {
            node.world_matrix = parent_world * node.transform.matrix();
            node.dirty = false;
        }
        let world = node.world_matrix;

        let mut child = self.nodes.borrow(handle).first_child;
        while let Some(current) = child {
            let next = self.nodes.borrow(current).next_sibling;
            self.update_node(current, world, dirty);
            child = next;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn root_is_index_zero() {
        let scene = Scene::new();
        assert_eq!(scene.root().index(), 0);
    }

    #[test]
    fn add_child_last_preserves_insertion_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node("a");
        let b = scene.create_node("b");
        let c = scene.create_node("c");
        scene.add_child_last(root, a);
        scene.add_child_last(root, b);
        scene.add_child_last(root, c);

        let order: Vec<_> = scene.children(root).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn add_child_first_prepends() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node("a");
        let b = scene.create_node("b");
        scene.add_child_first(root, a);
        scene.add_child_first(root, b);

        let order: Vec<_> = scene.children(root).collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn add_child_after_splices_in_the_middle() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node("a");
        let b = scene.create_node("b");
        let c = scene.create_node("c");
        scene.add_child_last(root, a);
        scene.add_child_last(root, c);
        scene.add_child_after(root, a, b);

        let order: Vec<_> = scene.children(root).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn removing_a_node_removes_its_subtree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let parent = scene.create_node("parent");
        let child = scene.create_node("child");
        scene.add_child_last(root, parent);
        scene.add_child_last(parent, child);

        scene.remove_subtree(parent);

        assert!(!scene.is_valid(parent));
        assert!(!scene.is_valid(child));
        assert_eq!(scene.children(root).count(), 0);
    }

    #[test]
    fn freed_indices_are_reused() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.create_node("a");
        scene.add_child_last(root, a);
        let a_index = a.index();
        scene.remove_subtree(a);

        let b = scene.create_node("b");
        assert_eq!(b.index(), a_index, "the pool's free list must reuse the slot");
    }

    #[test]
    fn world_transform_reflects_parent_mutation_after_update() {
        let mut scene = Scene::new();
        let root = scene.root();
        let child = scene.create_node("child");
        scene.add_child_last(root, child);

        let mut root_transform = Transform::default();
        root_transform.position = nalgebra::Vector3::new(10.0, 0.0, 0.0);
        scene.set_local_transform(root, root_transform);

        scene.update_world_transforms();

        let world = scene.node(child).world_matrix();
        let p = world.transform_point(&nalgebra::Point3::origin());
        assert_eq!(p, nalgebra::Point3::new(10.0, 0.0, 0.0));
    }
}
