//! Tessellation of chart frames into flat-colored triangles.

use crate::chart::ChartFrame;
use crate::chart::color::Rgba;
use crate::ui::render::common::{ClipTransform, SimpleVertex};
use crate::ui::theme::rgba_to_linear;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriangleStrip,
    TriangleList,
}

/// A contiguous vertex range drawn with one topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawBatch {
    pub topology: Topology,
    pub vertices: Range<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ChartMesh {
    pub vertices: Vec<SimpleVertex>,
    pub batches: Vec<DrawBatch>,
}

impl ChartMesh {
    fn push_batch(&mut self, topology: Topology, start: usize) {
        let end = self.vertices.len();
        if end > start {
            self.batches.push(DrawBatch {
                topology,
                vertices: start as u32..end as u32,
            });
        }
    }
}

/// Unit normal of the segment `a -> b`, or `None` for zero-length segments.
#[inline]
pub fn segment_normal(a: [f32; 2], b: [f32; 2]) -> Option<[f32; 2]> {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let length = (dx * dx + dy * dy).sqrt();
    (length > f32::EPSILON).then(|| [-dy / length, dx / length])
}

/// Area under `points` down to `baseline`, as a strip alternating curve and
/// baseline vertices.
pub fn fill_strip(
    points: &[[f32; 2]],
    baseline: f32,
    origin: [f32; 2],
    clip: ClipTransform,
    color: Rgba,
    out: &mut Vec<SimpleVertex>,
) {
    if points.len() < 2 {
        return;
    }
    let color = rgba_to_linear(color);
    out.reserve(points.len() * 2);
    for &[x, y] in points {
        let x = origin[0] + x;
        out.push(SimpleVertex {
            position: clip.to_clip(x, origin[1] + y),
            color,
        });
        out.push(SimpleVertex {
            position: clip.to_clip(x, origin[1] + baseline),
            color,
        });
    }
}

/// One quad (two triangles) per segment, offset by the segment normal times
/// half the line width.
pub fn stroke_quads(
    points: &[[f32; 2]],
    width: f32,
    origin: [f32; 2],
    clip: ClipTransform,
    color: Rgba,
    out: &mut Vec<SimpleVertex>,
) {
    if points.len() < 2 || !(width > 0.0) {
        return;
    }
    let color = rgba_to_linear(color);
    let half = width * 0.5;
    out.reserve((points.len() - 1) * 6);

    for segment in points.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let Some([nx, ny]) = segment_normal(a, b) else {
            continue;
        };
        let (ox, oy) = (nx * half, ny * half);
        let vertex = |x: f32, y: f32| SimpleVertex {
            position: clip.to_clip(origin[0] + x, origin[1] + y),
            color,
        };

        let a_left = vertex(a[0] + ox, a[1] + oy);
        let a_right = vertex(a[0] - ox, a[1] - oy);
        let b_left = vertex(b[0] + ox, b[1] + oy);
        let b_right = vertex(b[0] - ox, b[1] - oy);
        out.extend_from_slice(&[a_left, a_right, b_right, a_left, b_right, b_left]);
    }
}

/// Tessellates every layer of `frame`: fill, then line, then peak line.
/// `origin` is the top-left of the chart in logical window pixels.
pub fn build_mesh(frame: &ChartFrame, origin: [f32; 2], clip: ClipTransform) -> ChartMesh {
    let mut mesh = ChartMesh::default();

    for layer in &frame.layers {
        if let Some(fill) = layer.fill {
            let start = mesh.vertices.len();
            fill_strip(
                &layer.line.points,
                frame.baseline,
                origin,
                clip,
                fill,
                &mut mesh.vertices,
            );
            mesh.push_batch(Topology::TriangleStrip, start);
        }

        let start = mesh.vertices.len();
        stroke_quads(
            &layer.line.points,
            layer.line.width,
            origin,
            clip,
            layer.line.color,
            &mut mesh.vertices,
        );
        if let Some(peak) = &layer.peak {
            stroke_quads(
                &peak.points,
                peak.width,
                origin,
                clip,
                peak.color,
                &mut mesh.vertices,
            );
        }
        mesh.push_batch(Topology::TriangleList, start);
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{LayerFrame, Stroke};

    // A 2x2 viewport maps x to x - 1 and y to 1 - y.
    fn clip() -> ClipTransform {
        ClipTransform::new(2.0, 2.0)
    }

    fn unclip(vertex: &SimpleVertex) -> [f32; 2] {
        [vertex.position[0] + 1.0, 1.0 - vertex.position[1]]
    }

    #[test]
    fn fill_alternates_curve_and_baseline() {
        let points = [[0.0, 10.0], [5.0, 4.0], [9.0, 7.0]];
        let mut out = Vec::new();
        fill_strip(&points, 20.0, [0.0, 0.0], clip(), Rgba::WHITE, &mut out);

        assert_eq!(out.len(), 6);
        for (index, vertex) in out.iter().enumerate() {
            let [x, y] = unclip(vertex);
            let source = points[index / 2];
            assert!((x - source[0]).abs() < 1.0e-5);
            let expected_y = if index % 2 == 0 { source[1] } else { 20.0 };
            assert!((y - expected_y).abs() < 1.0e-5, "vertex {index} at y {y}");
        }
    }

    #[test]
    fn stroke_emits_one_quad_per_segment() {
        let points = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]];
        let mut out = Vec::new();
        stroke_quads(&points, 4.0, [0.0, 0.0], clip(), Rgba::BLACK, &mut out);
        assert_eq!(out.len(), 12);

        // Horizontal segment: vertices sit 2 px above and below the line.
        for vertex in &out[..6] {
            let [_, y] = unclip(vertex);
            assert!((y.abs() - 2.0).abs() < 1.0e-5, "y {y}");
        }
        // Vertical segment: offsets are horizontal.
        for vertex in &out[6..] {
            let [x, _] = unclip(vertex);
            assert!(((x - 10.0).abs() - 2.0).abs() < 1.0e-5, "x {x}");
        }
    }

    #[test]
    fn zero_length_segments_are_skipped() {
        let mut out = Vec::new();
        stroke_quads(&[[1.0, 1.0], [1.0, 1.0], [3.0, 1.0]], 2.0, [0.0, 0.0], clip(), Rgba::BLACK, &mut out);
        assert_eq!(out.len(), 6);
        assert!(segment_normal([0.0, 0.0], [0.0, 0.0]).is_none());
    }

    #[test]
    fn mesh_batches_follow_layer_order() {
        let stroke = |width| Stroke {
            points: vec![[0.0, 5.0], [4.0, 6.0], [8.0, 5.0]],
            color: Rgba::BLACK,
            width,
        };
        let frame = ChartFrame {
            plot: None,
            baseline: 10.0,
            layers: vec![
                LayerFrame {
                    id: "a".into(),
                    fill: Some(Rgba::WHITE),
                    line: stroke(2.0),
                    peak: Some(stroke(1.0)),
                },
                LayerFrame {
                    id: "b".into(),
                    fill: None,
                    line: stroke(2.0),
                    peak: None,
                },
            ],
        };

        let mesh = build_mesh(&frame, [0.0, 0.0], clip());
        let topologies: Vec<_> = mesh.batches.iter().map(|b| b.topology).collect();
        assert_eq!(
            topologies,
            [Topology::TriangleStrip, Topology::TriangleList, Topology::TriangleList]
        );
        assert_eq!(mesh.batches[0].vertices, 0..6);
        assert_eq!(mesh.batches[1].vertices, 6..30);
        assert_eq!(mesh.batches[2].vertices, 30..42);
        assert_eq!(mesh.vertices.len(), 42);
    }
}
