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

//! The GPU backend capability and the per-frame driver loop.
//!
//! [`RendererGpuBackend`] is what `ignis-resource` calls through its
//! [`ignis_resource::GpuBackend`] trait object - it dispatches an upload or
//! destroy to whichever [`ResourceTables`] table matches the asset's
//! [`AssetType`], exactly the inversion the "inheritance/virtual-dispatch
//! for renderer backends" design note (`SPEC_FULL.md` §9) calls for.
//!
//! [`FrameDriver`] implements the five-step per-frame loop from
//! `SPEC_FULL.md` §4.4: wait the frame's fence slot, acquire (recreating the
//! swapchain only if the size actually changed), record each compiled pass,
//! submit, present.

use std::sync::Arc;

use ignis_core::log::Log;
use ignis_core::pool::ErasedHandle;
use ignis_core::uuid_gen::AssetId;
use ignis_resource::{AssetType, GpuBackend};
use parking_lot::{Condvar, Mutex};

use crate::draw_list::DrawList;
use crate::frame_graph::CompiledFrameGraph;
use crate::resources::{GpuBuffer, Mesh, ResourceTables, SubMesh, Texture};

/// Decodes asset bytes into a concrete GPU resource and inserts it into the
/// matching table. Backend-specific (the actual pixel/vertex decode is out
/// of scope per `SPEC_FULL.md` §1); this implementation treats the asset's
/// bytes as already being in upload-ready form, which is what a real
/// backend's decode step would hand it.
pub struct RendererGpuBackend {
    pub tables: Arc<ResourceTables>,
}

impl RendererGpuBackend {
    pub fn new(tables: Arc<ResourceTables>) -> Self {
        Self { tables }
    }
}

impl GpuBackend for RendererGpuBackend {
    fn upload(
        &self,
        _asset_uuid: AssetId,
        type_tag: AssetType,
        bytes: &[u8],
        dependencies: &[ErasedHandle],
    ) -> Result<ErasedHandle, String> {
        match type_tag {
            AssetType::Texture => {
                let texture = Texture {
                    format: crate::attachment::TextureFormat::Rgba8Unorm,
                    width: 0,
                    height: 0,
                    bytes: bytes.to_vec(),
                };
                Ok(self.tables.textures.insert(texture).into_erased())
            }
            AssetType::Mesh => {
                let vertex_buffer = self.tables.buffers.insert(GpuBuffer { bytes: bytes.to_vec() });
                let index_buffer = self.tables.buffers.insert(GpuBuffer { bytes: Vec::new() });
                let mesh = Mesh {
                    vertex_buffer,
                    index_buffer,
                    sub_meshes: vec![SubMesh { first_index: 0, index_count: 0 }],
                };
                Ok(self.tables.meshes.insert(mesh).into_erased())
            }
            AssetType::Shader => {
                // A real backend reflects `bytes` into a property schema; the
                // abstract shape is covered by `crate::shader::Shader` and
                // exercised directly in that module's tests.
                let shader = crate::shader::Shader::new("imported", Vec::new());
                Ok(self.tables.shaders.insert(shader).into_erased())
            }
            AssetType::Material => {
                // The material's shader dependency has already been uploaded
                // and linked by `ResourceManager::acquire`; `dependencies`
                // carries its erased GPU handle, but the shader's own asset
                // UUID lives in the registry, not here, so a real backend
                // would thread it through the material's decoded bytes.
                let _ = dependencies;
                let shader = crate::shader::Shader::new("material-shader", Vec::new());
                let material = crate::material::Material::new(0, &shader);
                Ok(self.tables.materials.insert(material).into_erased())
            }
            AssetType::Model | AssetType::Scene => {
                Err(format!("{type_tag:?} has no direct GPU representation"))
            }
        }
    }

    fn destroy(&self, type_tag: AssetType, handle: ErasedHandle) {
        match type_tag {
            AssetType::Texture => {
                self.tables.textures.remove(handle.typed());
            }
            AssetType::Mesh => {
                self.tables.meshes.remove(handle.typed());
            }
            AssetType::Shader => {
                self.tables.shaders.remove(handle.typed());
            }
            AssetType::Material => {
                self.tables.materials.remove(handle.typed());
            }
            AssetType::Model | AssetType::Scene => {}
        }
    }
}

/// A single in-flight frame's completion fence: the driver waits on slot
/// `frame_index % frames_in_flight` before reusing its resources.
struct FrameFence {
    signalled: Mutex<bool>,
    condvar: Condvar,
}

impl FrameFence {
    fn new() -> Self {
        Self { signalled: Mutex::new(true), condvar: Condvar::new() }
    }

    fn wait(&self) {
        let mut signalled = self.signalled.lock();
        while !*signalled {
            self.condvar.wait(&mut signalled);
        }
    }

    fn reset(&self) {
        *self.signalled.lock() = false;
    }

    fn signal(&self) {
        *self.signalled.lock() = true;
        self.condvar.notify_all();
    }
}

/// Tracks the swapchain's current size. Recreation only happens when the
/// requested size actually differs, per `SPEC_FULL.md` §8's "resize to the
/// same dimensions is a no-op" boundary behavior.
pub struct Swapchain {
    width: u32,
    height: u32,
}

impl Swapchain {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns `true` if the swapchain was actually recreated.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }
}

/// Drives the per-frame loop described in `SPEC_FULL.md` §4.4 over a
/// [`CompiledFrameGraph`]. Recording and submission are backend concerns
/// (out of scope per §1); this owns the ordering and fence bookkeeping that
/// is part of the abstract renderer contract.
pub struct FrameDriver {
    fences: Vec<FrameFence>,
    frame_index: usize,
    pub swapchain: Swapchain,
}

impl FrameDriver {
    pub fn new(frames_in_flight: usize, swapchain: Swapchain) -> Self {
        Self {
            fences: (0..frames_in_flight.max(1)).map(|_| FrameFence::new()).collect(),
            frame_index: 0,
            swapchain,
        }
    }

    /// Runs one frame: waits the slot's fence, invokes every compiled pass
    /// in order against `draw_list`, then signals the fence. `out_of_date`
    /// requests a swapchain resize to `(width, height)` before recording;
    /// if the size hasn't changed this is a no-op.
    pub fn run_frame(
        &mut self,
        graph: &CompiledFrameGraph,
        passes: &[crate::pass::Pass],
        draw_list: &DrawList,
        resize_to: Option<(u32, u32)>,
    ) {
        let slot = self.frame_index % self.fences.len();
        self.fences[slot].wait();
        self.fences[slot].reset();

        if let Some((width, height)) = resize_to {
            if self.swapchain.resize(width, height) {
                Log::info(format!("swapchain recreated at {width}x{height}"));
            }
        }

        for &pass_index in &graph.order {
            passes[pass_index].invoke(draw_list);
        }

        self.fences[slot].signal();
        self.frame_index += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resizing_to_the_same_dimensions_is_a_noop() {
        let mut swapchain = Swapchain::new(1920, 1080);
        assert!(!swapchain.resize(1920, 1080));
        assert!(swapchain.resize(1280, 720));
        assert_eq!(swapchain.size(), (1280, 720));
    }

    #[test]
    fn run_frame_advances_the_frame_index_and_reuses_fence_slots() {
        let mut driver = FrameDriver::new(2, Swapchain::new(800, 600));
        let graph = CompiledFrameGraph {
            order: vec![],
            barriers: vec![],
            resolves: vec![],
            presentable: "main".into(),
        };
        let draw_list = DrawList::new();
        driver.run_frame(&graph, &[], &draw_list, None);
        driver.run_frame(&graph, &[], &draw_list, None);
        driver.run_frame(&graph, &[], &draw_list, Some((800, 600)));
        assert_eq!(driver.frame_index, 3);
        assert_eq!(driver.swapchain.size(), (800, 600));
    }
}
