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

//! Logical render targets a [`crate::pass::Pass`] reads or writes.

pub type AttachmentName = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8Unorm,
    R32Sint,
    DepthF32StencilU8,
}

/// What a pass does with an attachment when it starts using it. A
/// multisample-to-singlesample resolve is tracked separately, via
/// `Pass::resolves`, not as a load op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    /// Scale relative to the swapchain's back-buffer size (1.0 = same size).
    pub size_scale: f32,
    pub resizable_with_swapchain: bool,
    pub sample_count: u32,
}

impl AttachmentDesc {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            size_scale: 1.0,
            resizable_with_swapchain: true,
            sample_count: 1,
        }
    }

    pub fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }
}
