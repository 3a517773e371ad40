#![forbid(unsafe_code)]

//! Rendering-backend adaptation for the neuroweave animation.
//!
//! The simulation core exposes plain attribute arrays; this crate reshapes
//! them into the forms a GPU backend consumes (interleaved `Pod` instance
//! and vertex records), carries the depth-fade configuration the backend's
//! shader applies, and owns the pointer-driven parallax camera rig. No GPU
//! API is touched here; upload policy stays with the backend.

pub mod camera;

use bytemuck::{Pod, Zeroable};
use neuroweave_core::{DirtyFlags, SceneBuffers};
use serde::{Deserialize, Serialize};

/// One point-cloud instance: position, color, and point size.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct NodeInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub size: f32,
}

/// One line-segment vertex; two consecutive vertices form an edge.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct EdgeVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Camera-distance planes for the backend's opacity falloff: fully opaque at
/// or before `near`, fully transparent at or past `far`.
///
/// The falloff itself runs in the backend's shader; [`DepthFade::opacity`]
/// is the reference curve (smoothstep between the planes) backends should
/// reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthFade {
    pub near: f32,
    pub far: f32,
}

impl Default for DepthFade {
    fn default() -> Self {
        Self {
            near: 20.0,
            far: 60.0,
        }
    }
}

impl DepthFade {
    /// Opacity for a fragment at `distance` from the camera.
    #[must_use]
    pub fn opacity(&self, distance: f32) -> f32 {
        let span = (self.far - self.near).max(f32::EPSILON);
        let t = ((distance - self.near) / span).clamp(0.0, 1.0);
        1.0 - t * t * (3.0 - 2.0 * t)
    }
}

/// Borrowed view over one frame of scene attributes, ready to hand to a
/// backend together with which buffers actually changed.
#[derive(Clone, Debug)]
pub struct SceneView<'a> {
    pub node_positions: &'a [[f32; 3]],
    pub node_colors: &'a [[f32; 3]],
    pub node_sizes: &'a [f32],
    pub edge_positions: &'a [[f32; 3]],
    pub edge_colors: &'a [[f32; 3]],
    pub dirty: DirtyFlags,
    pub fade: DepthFade,
}

impl<'a> SceneView<'a> {
    /// Capture a view over `buffers`. `dirty` should come from
    /// [`SceneBuffers::take_dirty`] so each change is uploaded exactly once.
    #[must_use]
    pub fn capture(buffers: &'a SceneBuffers, dirty: DirtyFlags, fade: DepthFade) -> Self {
        Self {
            node_positions: buffers.node_positions(),
            node_colors: buffers.node_colors(),
            node_sizes: buffers.node_sizes(),
            edge_positions: buffers.edge_positions(),
            edge_colors: buffers.edge_colors(),
            dirty,
            fade,
        }
    }

    /// Interleave the node attribute columns into instance records, reusing
    /// `out`'s allocation.
    pub fn collect_node_instances(&self, out: &mut Vec<NodeInstance>) {
        out.clear();
        out.reserve(self.node_positions.len());
        for index in 0..self.node_positions.len() {
            out.push(NodeInstance {
                position: self.node_positions[index],
                color: self.node_colors[index],
                size: self.node_sizes[index],
            });
        }
    }

    /// Interleave the edge attribute columns into vertex records, reusing
    /// `out`'s allocation.
    pub fn collect_edge_vertices(&self, out: &mut Vec<EdgeVertex>) {
        out.clear();
        out.reserve(self.edge_positions.len());
        for (position, color) in self.edge_positions.iter().zip(self.edge_colors) {
            out.push(EdgeVertex {
                position: *position,
                color: *color,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_fade_is_opaque_near_and_transparent_far() {
        let fade = DepthFade {
            near: 10.0,
            far: 50.0,
        };
        assert_eq!(fade.opacity(0.0), 1.0);
        assert_eq!(fade.opacity(10.0), 1.0);
        assert_eq!(fade.opacity(50.0), 0.0);
        assert_eq!(fade.opacity(80.0), 0.0);

        let mid = fade.opacity(30.0);
        assert!(mid > 0.0 && mid < 1.0);
        // monotone falloff between the planes
        assert!(fade.opacity(20.0) > mid);
        assert!(fade.opacity(40.0) < mid);
    }

    #[test]
    fn instance_records_interleave_all_columns() {
        let positions = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let colors = [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
        let sizes = [0.5, 0.75];
        let view = SceneView {
            node_positions: &positions,
            node_colors: &colors,
            node_sizes: &sizes,
            edge_positions: &positions,
            edge_colors: &colors,
            dirty: DirtyFlags::default(),
            fade: DepthFade::default(),
        };

        let mut nodes = Vec::new();
        view.collect_node_instances(&mut nodes);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].position, [4.0, 5.0, 6.0]);
        assert_eq!(nodes[1].size, 0.75);

        let mut edges = Vec::new();
        view.collect_edge_vertices(&mut edges);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].color, [0.1, 0.2, 0.3]);
    }
}
