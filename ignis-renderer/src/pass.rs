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

//! Declarative render passes, the frame graph's unit of work.
//!
//! Mirrors the three-pass pipeline `setup_render_passes` wires up in the
//! original engine (geometry -> opaque -> ui, with a multisample resolve
//! between geometry and the rest): a pass names the attachments it reads,
//! the ones it writes (with the op to apply when binding), and the resolves
//! it performs, and carries a callback the compiled frame graph invokes in
//! topological order.

use crate::attachment::{AttachmentName, Op};
use crate::draw_list::DrawList;

pub type PassCallback = Box<dyn Fn(&DrawList) + Send + Sync>;

pub struct Pass {
    pub name: String,
    pub reads: Vec<AttachmentName>,
    pub writes: Vec<(AttachmentName, Op)>,
    /// `(multisample_source, resolved_destination)` pairs this pass resolves
    /// as part of its work, e.g. `("ms_scene", "scene")`.
    pub resolves: Vec<(AttachmentName, AttachmentName)>,
    callback: PassCallback,
}

impl Pass {
    pub fn new(
        name: impl Into<String>,
        reads: Vec<AttachmentName>,
        writes: Vec<(AttachmentName, Op)>,
        callback: impl Fn(&DrawList) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reads,
            writes,
            resolves: Vec::new(),
            callback: Box::new(callback),
        }
    }

    pub fn with_resolve(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.resolves.push((source.into(), destination.into()));
        self
    }

    pub fn invoke(&self, draw_list: &DrawList) {
        (self.callback)(draw_list);
    }
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("resolves", &self.resolves)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn invoke_runs_the_callback_with_the_draw_list() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_callback = ran.clone();
        let pass = Pass::new("geometry", vec![], vec![("depth".into(), Op::Clear)], move |_list| {
            ran_in_callback.store(true, Ordering::SeqCst);
        });
        pass.invoke(&DrawList::new());
        assert!(ran.load(Ordering::SeqCst));
    }
}
