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

//! The per-frame list of draw commands, bucketed and sorted to minimize
//! state changes before a pass callback consumes them.

use ignis_core::pool::Handle;
use rayon::prelude::*;

use crate::resources::{MaterialHandle, MeshHandle, PipelineHandle};

#[derive(Debug, Clone, Copy)]
pub struct DrawCommand {
    pub pipeline: PipelineHandle,
    pub material: MaterialHandle,
    pub mesh: MeshHandle,
    pub instance_data_offset: u32,
    pub sub_mesh_index: u32,
}

fn handle_key<T>(h: Handle<T>) -> (u32, u32) {
    (h.index(), h.generation())
}

#[derive(Default)]
pub struct DrawList {
    pub entries: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.entries.push(command);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sorts entries by `(pipeline, material, mesh)` so consecutive draws
    /// share as much bound state as possible. Uses `rayon`'s parallel sort
    /// since a frame's draw list can run into the tens of thousands of
    /// entries on a dense scene.
    pub fn sort_for_minimal_state_changes(&mut self) {
        self.entries.par_sort_unstable_by_key(|entry| {
            (
                handle_key(entry.pipeline),
                handle_key(entry.material),
                handle_key(entry.mesh),
            )
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sort_groups_by_pipeline_then_material_then_mesh() {
        let mut list = DrawList::new();
        let p0: PipelineHandle = Handle::new(0, 1);
        let p1: PipelineHandle = Handle::new(1, 1);
        let m0: MaterialHandle = Handle::new(0, 1);
        let m1: MaterialHandle = Handle::new(1, 1);
        let mesh0: MeshHandle = Handle::new(0, 1);

        list.push(DrawCommand { pipeline: p1, material: m0, mesh: mesh0, instance_data_offset: 0, sub_mesh_index: 0 });
        list.push(DrawCommand { pipeline: p0, material: m1, mesh: mesh0, instance_data_offset: 0, sub_mesh_index: 0 });
        list.push(DrawCommand { pipeline: p0, material: m0, mesh: mesh0, instance_data_offset: 0, sub_mesh_index: 0 });

        list.sort_for_minimal_state_changes();

        assert_eq!(list.entries[0].pipeline, p0);
        assert_eq!(list.entries[0].material, m0);
        assert_eq!(list.entries[1].pipeline, p0);
        assert_eq!(list.entries[1].material, m1);
        assert_eq!(list.entries[2].pipeline, p1);
    }
}
