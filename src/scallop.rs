//! Scalloped border geometry: a closed outline of outward-bulging half
//! circles running clockwise around a `width` x `height` box, starting
//! from the box origin.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};
use tiny_skia::{Path, PathBuilder};

/// How the scallops along each edge are sized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum ScallopBorder {
    /// Fixed count per edge; radius shrinks with the box.
    Filled { scallops_per_side: u32 },
    /// Fixed radius; the count per edge follows the edge length.
    Stroked { scallop_radius: f32 },
}

impl ScallopBorder {
    /// Stroked borders are outline-only and never take a fill.
    pub fn takes_fill(&self) -> bool {
        matches!(self, ScallopBorder::Filled { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    /// Start and end angle of every arc on this edge. Arcs run clockwise in
    /// y-down space, so each one sweeps half a turn away from the box.
    pub fn angles(self) -> (f32, f32) {
        match self {
            Edge::Top => (PI, 0.0),
            Edge::Right => (PI * 1.5, FRAC_PI_2),
            Edge::Bottom => (0.0, PI),
            Edge::Left => (FRAC_PI_2, PI * 1.5),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScallopArc {
    pub edge: Edge,
    pub center: (f32, f32),
    pub radius: f32,
    pub start_angle: f32,
    pub end_angle: f32,
}

impl ScallopArc {
    /// Clockwise sweep from start to end, in `(0, TAU]`.
    pub fn sweep(&self) -> f32 {
        let mut sweep = self.end_angle - self.start_angle;
        while sweep <= 0.0 {
            sweep += TAU;
        }
        sweep
    }

    pub fn point_at(&self, angle: f32) -> (f32, f32) {
        (
            self.center.0 + self.radius * angle.cos(),
            self.center.1 + self.radius * angle.sin(),
        )
    }

    pub fn start_point(&self) -> (f32, f32) {
        self.point_at(self.start_angle)
    }

    pub fn end_point(&self) -> (f32, f32) {
        self.point_at(self.start_angle + self.sweep())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScallopPath {
    pub arcs: Vec<ScallopArc>,
}

/// Scallop count along an edge of `length` for a fixed radius.
pub fn scallops_for_edge(length: f32, radius: f32) -> u32 {
    if radius <= 0.0 {
        return 2;
    }
    ((length / (2.0 * radius)).floor() as u32).max(2)
}

pub fn scallop_path(width: f32, height: f32, border: ScallopBorder) -> ScallopPath {
    let (horizontal, vertical, radius) = match border {
        ScallopBorder::Filled { scallops_per_side } => {
            let n = scallops_per_side.max(1);
            (n, n, width.min(height) / (4 * n) as f32)
        }
        ScallopBorder::Stroked { scallop_radius } => (
            scallops_for_edge(width, scallop_radius),
            scallops_for_edge(height, scallop_radius),
            scallop_radius,
        ),
    };

    let mut arcs = Vec::with_capacity(2 * (horizontal + vertical) as usize);
    let mut push = |edge: Edge, center: (f32, f32)| {
        let (start_angle, end_angle) = edge.angles();
        arcs.push(ScallopArc {
            edge,
            center,
            radius,
            start_angle,
            end_angle,
        });
    };

    let h_step = width / horizontal as f32;
    let v_step = height / vertical as f32;

    for i in 0..horizontal {
        push(Edge::Top, (i as f32 * h_step + h_step / 2.0, 0.0));
    }
    for i in 0..vertical {
        push(Edge::Right, (width, i as f32 * v_step + v_step / 2.0));
    }
    for i in (0..horizontal).rev() {
        push(Edge::Bottom, (i as f32 * h_step + h_step / 2.0, height));
    }
    for i in (0..vertical).rev() {
        push(Edge::Left, (0.0, i as f32 * v_step + v_step / 2.0));
    }

    ScallopPath { arcs }
}

impl ScallopPath {
    pub fn radius(&self) -> f32 {
        self.arcs.first().map_or(0.0, |arc| arc.radius)
    }

    pub fn count_on(&self, edge: Edge) -> usize {
        self.arcs.iter().filter(|arc| arc.edge == edge).count()
    }

    /// Exact outline as cubic segments, each arc split into quarter turns.
    pub fn to_path(&self) -> Option<Path> {
        let mut pb = PathBuilder::new();
        pb.move_to(0.0, 0.0);
        for arc in &self.arcs {
            let (sx, sy) = arc.start_point();
            pb.line_to(sx, sy);
            let sweep = arc.sweep();
            let pieces = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
            let delta = sweep / pieces as f32;
            let k = 4.0 / 3.0 * (delta / 4.0).tan() * arc.radius;
            for piece in 0..pieces {
                let a0 = arc.start_angle + delta * piece as f32;
                let a1 = a0 + delta;
                let (x0, y0) = arc.point_at(a0);
                let (x1, y1) = arc.point_at(a1);
                pb.cubic_to(
                    x0 - k * a0.sin(),
                    y0 + k * a0.cos(),
                    x1 + k * a1.sin(),
                    y1 - k * a1.cos(),
                    x1,
                    y1,
                );
            }
        }
        pb.close();
        pb.finish()
    }

    /// Local bounding box including the bulges.
    pub fn bounds(&self, width: f32, height: f32) -> (f32, f32, f32, f32) {
        let r = self.radius();
        (-r, -r, width + r, height + r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn filled_square_has_four_arcs_per_edge() {
        let path = scallop_path(100.0, 100.0, ScallopBorder::Filled { scallops_per_side: 4 });
        assert_eq!(path.arcs.len(), 16);
        for edge in [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left] {
            assert_eq!(path.count_on(edge), 4);
        }
        assert!(path.arcs.iter().all(|arc| close(arc.radius, 6.25)));
    }

    #[test]
    fn centers_sit_on_segment_midpoints() {
        let path = scallop_path(100.0, 60.0, ScallopBorder::Filled { scallops_per_side: 2 });
        let centers: Vec<_> = path.arcs.iter().map(|arc| arc.center).collect();
        assert_eq!(
            centers,
            vec![
                (25.0, 0.0),
                (75.0, 0.0),
                (100.0, 15.0),
                (100.0, 45.0),
                (75.0, 60.0),
                (25.0, 60.0),
                (0.0, 45.0),
                (0.0, 15.0),
            ]
        );
        assert!(close(path.radius(), 60.0 / 8.0));
    }

    #[test]
    fn every_bulge_points_outward() {
        let path = scallop_path(80.0, 80.0, ScallopBorder::Filled { scallops_per_side: 3 });
        for arc in &path.arcs {
            assert!(close(arc.sweep(), PI));
            let (mx, my) = arc.point_at(arc.start_angle + arc.sweep() / 2.0);
            match arc.edge {
                Edge::Top => assert!(my < 0.0),
                Edge::Right => assert!(mx > 80.0),
                Edge::Bottom => assert!(my > 80.0),
                Edge::Left => assert!(mx < 0.0),
            }
        }
    }

    #[test]
    fn stroked_count_follows_edge_length() {
        let path = scallop_path(120.0, 30.0, ScallopBorder::Stroked { scallop_radius: 10.0 });
        assert_eq!(path.count_on(Edge::Top), 6);
        assert_eq!(path.count_on(Edge::Bottom), 6);
        assert_eq!(path.count_on(Edge::Left), 2);
        assert_eq!(path.count_on(Edge::Right), 2);
        assert!(close(path.radius(), 10.0));
    }

    #[test]
    fn stroked_count_never_below_two() {
        assert_eq!(scallops_for_edge(5.0, 10.0), 2);
        assert_eq!(scallops_for_edge(100.0, 0.0), 2);
    }

    #[test]
    fn arc_endpoints_sit_on_the_edge() {
        let path = scallop_path(100.0, 100.0, ScallopBorder::Filled { scallops_per_side: 4 });
        let first = path.arcs[0];
        let (x, y) = first.start_point();
        assert!(close(x, 12.5 - 6.25) && close(y, 0.0));
        let (x, y) = first.end_point();
        assert!(close(x, 12.5 + 6.25) && close(y, 0.0));
        let (x, y) = first.point_at(first.start_angle + first.sweep() / 2.0);
        assert!(close(x, 12.5) && close(y, -6.25));
    }

    #[test]
    fn cubic_path_builds() {
        let path = scallop_path(100.0, 100.0, ScallopBorder::Filled { scallops_per_side: 4 });
        let bounds = path.to_path().unwrap().bounds();
        assert!(bounds.top() < -6.0 && bounds.bottom() > 106.0);
    }
}
