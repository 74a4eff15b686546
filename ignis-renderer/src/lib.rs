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

//! Frame-graph renderer: declarative passes, handle-pooled GPU resource
//! tables, and the per-frame driver loop. See `SPEC_FULL.md` §4.4.

pub mod attachment;
pub mod device;
pub mod draw_list;
pub mod frame_graph;
pub mod material;
pub mod pass;
pub mod resources;
pub mod shader;

pub use attachment::{AttachmentDesc, AttachmentName, Op, TextureFormat};
pub use device::{FrameDriver, RendererGpuBackend, Swapchain};
pub use draw_list::{DrawCommand, DrawList};
pub use frame_graph::{Barrier, CompiledFrameGraph, FrameGraph, FrameGraphError, ResolveStep};
pub use material::{Material, MaterialError, PropertyValue};
pub use pass::Pass;
pub use resources::{
    GpuBuffer, GpuBufferHandle, Mesh, MeshHandle, MaterialHandle, PipelineHandle, PipelineState,
    ResourceTables, Sampler, SamplerHandle, ShaderHandle, SubMesh, Texture, TextureHandle, WrapMode,
};
pub use shader::{PropertyDataType, Shader, ShaderProperty};
