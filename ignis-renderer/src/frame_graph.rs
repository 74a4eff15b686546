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

//! Compiles a declared set of [`Pass`]es into an executable order.
//!
//! Compilation does three things, per `SPEC_FULL.md` §4.4: topologically
//! sorts passes so a writer always runs before its readers, infers the
//! barriers that ordering implies, and checks that the presentable
//! attachment actually ends up written by someone before it's handed to the
//! swapchain. Adapted from the three-pass setup in the original engine's
//! `setup_render_passes` (geometry writes the multisample scene target and
//! depth, a later pass resolves it and reads depth back, a final pass reads
//! the resolved color and writes the presentable target).

use ignis_core::FxHashMap;

use crate::attachment::{AttachmentDesc, AttachmentName};
use crate::pass::Pass;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameGraphError {
    PresentableAttachmentNotSet,
    PresentableAttachmentNeverWritten(AttachmentName),
    UnknownAttachment(AttachmentName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    pub from_pass: usize,
    pub to_pass: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveStep {
    pub after_pass: usize,
    pub source: AttachmentName,
    pub destination: AttachmentName,
}

/// The executable result of [`FrameGraph::compile`]: pass indices in the
/// order the per-frame driver must invoke them, the barriers that ordering
/// implies, and the resolves to emit right after the pass that produced
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFrameGraph {
    pub order: Vec<usize>,
    pub barriers: Vec<Barrier>,
    pub resolves: Vec<ResolveStep>,
    pub presentable: AttachmentName,
}

#[derive(Default)]
pub struct FrameGraph {
    pub attachments: FxHashMap<AttachmentName, AttachmentDesc>,
    pub passes: Vec<Pass>,
    presentable: Option<AttachmentName>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_attachment(&mut self, name: impl Into<String>, desc: AttachmentDesc) {
        self.attachments.insert(name.into(), desc);
    }

    pub fn add_pass(&mut self, pass: Pass) -> usize {
        self.passes.push(pass);
        self.passes.len() - 1
    }

    pub fn set_presentable(&mut self, name: impl Into<String>) {
        self.presentable = Some(name.into());
    }

    /// Topologically sorts passes (writer before readers, including
    /// resolves as writes of their destination), inferring a barrier for
    /// every such edge and collecting resolve steps positioned after the
    /// pass that performs them.
    pub fn compile(&self) -> Result<CompiledFrameGraph, FrameGraphError> {
        let presentable = self
            .presentable
            .clone()
            .ok_or(FrameGraphError::PresentableAttachmentNotSet)?;

        let n = self.passes.len();
        let mut last_writer: FxHashMap<AttachmentName, usize> = FxHashMap::default();
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];
        let mut resolves = Vec::new();

        let add_edge = |edges: &mut Vec<Vec<usize>>, in_degree: &mut Vec<usize>, from: usize, to: usize| {
            if from != to && !edges[from].contains(&to) {
                edges[from].push(to);
                in_degree[to] += 1;
            }
        };

        for (i, pass) in self.passes.iter().enumerate() {
            for read in &pass.reads {
                if let Some(&writer) = last_writer.get(read) {
                    add_edge(&mut edges, &mut in_degree, writer, i);
                }
            }
            for (source, destination) in &pass.resolves {
                if let Some(&writer) = last_writer.get(source) {
                    add_edge(&mut edges, &mut in_degree, writer, i);
                }
                last_writer.insert(destination.clone(), i);
                resolves.push(ResolveStep {
                    after_pass: i,
                    source: source.clone(),
                    destination: destination.clone(),
                });
            }
            for (attachment, _op) in &pass.writes {
                if let Some(&writer) = last_writer.get(attachment) {
                    add_edge(&mut edges, &mut in_degree, writer, i);
                }
                last_writer.insert(attachment.clone(), i);
            }
        }

        if !last_writer.contains_key(&presentable) {
            return Err(FrameGraphError::PresentableAttachmentNeverWritten(presentable));
        }

        // Stable Kahn's algorithm: among ready nodes, always pick the
        // lowest original index, so independent passes keep declaration
        // order instead of an arbitrary one.
        let mut order = Vec::with_capacity(n);
        let mut ready: std::collections::BTreeSet<usize> =
            (0..n).filter(|&i| in_degree[i] == 0).collect();
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(next);
            for &succ in &edges[next] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert(succ);
                }
            }
        }

        let barriers = (0..n)
            .flat_map(|from| edges[from].iter().map(move |&to| Barrier { from_pass: from, to_pass: to }))
            .collect();

        Ok(CompiledFrameGraph { order, barriers, resolves, presentable })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::attachment::{Op, TextureFormat};

    fn noop_pass(
        name: &str,
        reads: Vec<&str>,
        writes: Vec<(&str, Op)>,
        resolves: Vec<(&str, &str)>,
    ) -> Pass {
        let mut pass = Pass::new(
            name,
            reads.into_iter().map(String::from).collect(),
            writes.into_iter().map(|(n, op)| (n.to_string(), op)).collect(),
            |_list| {},
        );
        for (source, destination) in resolves {
            pass = pass.with_resolve(source, destination);
        }
        pass
    }

    #[test]
    fn compile_orders_geometry_resolve_and_final_pass_with_a_resolve_between_them() {
        let mut graph = FrameGraph::new();
        graph.add_attachment("color_ms", AttachmentDesc::new(TextureFormat::Rgba8Unorm).with_samples(4));
        graph.add_attachment("color", AttachmentDesc::new(TextureFormat::Rgba8Unorm));
        graph.add_attachment("depth", AttachmentDesc::new(TextureFormat::DepthF32StencilU8));

        // Pass A: writes depth + color_ms.
        graph.add_pass(noop_pass(
            "geometry",
            vec![],
            vec![("depth", Op::Clear), ("color_ms", Op::Clear)],
            vec![],
        ));
        // Pass B: resolves color_ms -> color, reads depth.
        graph.add_pass(noop_pass("resolve", vec!["depth"], vec![], vec![("color_ms", "color")]));
        // Pass C: reads color, writes the presentable target.
        graph.add_pass(noop_pass("present", vec!["color"], vec![("presentable", Op::Load)], vec![]));
        graph.set_presentable("presentable");

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.order, vec![0, 1, 2]);
        assert_eq!(compiled.resolves.len(), 1);
        assert_eq!(compiled.resolves[0].after_pass, 1);
        assert_eq!(compiled.resolves[0].source, "color_ms");
        assert_eq!(compiled.resolves[0].destination, "color");
        assert!(compiled.barriers.contains(&Barrier { from_pass: 0, to_pass: 1 }));
        assert!(compiled.barriers.contains(&Barrier { from_pass: 1, to_pass: 2 }));
    }

    #[test]
    fn compile_fails_if_presentable_is_never_written() {
        let mut graph = FrameGraph::new();
        graph.add_pass(noop_pass("ui", vec![], vec![], vec![]));
        graph.set_presentable("main");
        assert_eq!(
            graph.compile().unwrap_err(),
            FrameGraphError::PresentableAttachmentNeverWritten("main".into())
        );
    }

    #[test]
    fn compile_fails_if_presentable_was_never_set() {
        let graph = FrameGraph::new();
        assert_eq!(graph.compile().unwrap_err(), FrameGraphError::PresentableAttachmentNotSet);
    }
}
