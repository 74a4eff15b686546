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

//! Handle-pooled GPU resource tables. Every table is an [`ignis_core::pool::Pool`]
//! guarded by its own mutex, per `SPEC_FULL.md` §5 ("renderer resource tables:
//! internal mutex per table") - contention on the texture table never blocks
//! a mesh upload.
//!
//! Binding is bindless: a handle's pool index doubles as the descriptor
//! array slot pushed to the GPU inside a material's property buffer.

use ignis_core::pool::{Handle, Pool};
use parking_lot::Mutex;

use crate::attachment::TextureFormat;
use crate::material::Material;
use crate::shader::Shader;

pub struct Texture {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

pub struct Sampler {
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

pub struct SubMesh {
    pub first_index: u32,
    pub index_count: u32,
}

pub struct Mesh {
    pub vertex_buffer: GpuBufferHandle,
    pub index_buffer: GpuBufferHandle,
    pub sub_meshes: Vec<SubMesh>,
}

pub struct GpuBuffer {
    pub bytes: Vec<u8>,
}

pub struct PipelineState {
    pub shader: ShaderHandle,
    pub depth_test: bool,
    pub depth_write: bool,
}

pub type TextureHandle = Handle<Texture>;
pub type SamplerHandle = Handle<Sampler>;
pub type MaterialHandle = Handle<Material>;
pub type MeshHandle = Handle<Mesh>;
pub type ShaderHandle = Handle<Shader>;
pub type PipelineHandle = Handle<PipelineState>;
pub type GpuBufferHandle = Handle<GpuBuffer>;

macro_rules! resource_table {
    ($name:ident, $ty:ty) => {
        #[derive(Default)]
        pub struct $name {
            pool: Mutex<Pool<$ty>>,
        }

        impl $name {
            pub fn insert(&self, value: $ty) -> Handle<$ty> {
                self.pool.lock().spawn(value)
            }

            pub fn remove(&self, handle: Handle<$ty>) -> Option<$ty> {
                self.pool.lock().free(handle)
            }

            pub fn is_valid(&self, handle: Handle<$ty>) -> bool {
                self.pool.lock().is_valid_handle(handle)
            }

            pub fn with<R>(&self, handle: Handle<$ty>, f: impl FnOnce(&$ty) -> R) -> Option<R> {
                self.pool.lock().try_borrow(handle).map(f)
            }

            pub fn with_mut<R>(&self, handle: Handle<$ty>, f: impl FnOnce(&mut $ty) -> R) -> Option<R> {
                self.pool.lock().try_borrow_mut(handle).map(f)
            }

            pub fn len(&self) -> usize {
                self.pool.lock().len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }
        }
    };
}

resource_table!(TextureTable, Texture);
resource_table!(SamplerTable, Sampler);
resource_table!(MaterialTable, Material);
resource_table!(MeshTable, Mesh);
resource_table!(ShaderTable, Shader);
resource_table!(PipelineTable, PipelineState);
resource_table!(GpuBufferTable, GpuBuffer);

/// Every GPU-facing resource table the renderer owns, grouped so the engine
/// root can hold a single `Arc<ResourceTables>` and hand it to both the
/// resource manager's `GpuBackend` implementation and the draw-list
/// builder.
#[derive(Default)]
pub struct ResourceTables {
    pub textures: TextureTable,
    pub samplers: SamplerTable,
    pub materials: MaterialTable,
    pub meshes: MeshTable,
    pub shaders: ShaderTable,
    pub pipelines: PipelineTable,
    pub buffers: GpuBufferTable,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stale_handle_after_removal_fails_lookup() {
        let table = TextureTable::default();
        let handle = table.insert(Texture {
            format: TextureFormat::Rgba8Unorm,
            width: 4,
            height: 4,
            bytes: vec![0; 64],
        });
        assert!(table.is_valid(handle));
        table.remove(handle);
        assert!(!table.is_valid(handle));
    }
}
