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

use ignis_core::pool::Handle;
use ignis_core::uuid_gen::AssetId;
use nalgebra::{Matrix4, Vector3};

use crate::transform::Transform;

pub type NodeHandle = Handle<SceneNode>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point { radius: f32 },
    Spot { radius: f32, cone_angle: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

/// A node in the flat scene graph, linked to its siblings and parent purely
/// by handle rather than by owning its children - removing a subtree is a
/// matter of unlinking and freeing handles, never dropping a `Vec`.
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<AssetId>,
    pub light: Option<Light>,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) first_child: Option<NodeHandle>,
    pub(crate) last_child: Option<NodeHandle>,
    pub(crate) next_sibling: Option<NodeHandle>,

    pub(crate) dirty: bool,
    pub(crate) world_matrix: Matrix4<f32>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            light: None,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            dirty: true,
            world_matrix: Matrix4::identity(),
        }
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeHandle> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeHandle> {
        self.next_sibling
    }

    /// World matrix as of the last [`crate::graph::Scene::update_world_transforms`]
    /// call; stale until that runs after a local transform edit.
    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.world_matrix
    }
}
