use std::fmt;

use serde::{Deserialize, Serialize};
use tiny_skia::{Path, PathBuilder, Point, Rect, Transform};

use crate::config::EditorConfig;
use crate::scallop::{scallop_path, ScallopBorder};

// ── Color ───────────────────────────────────────────────────────────────────

/// Straight-alpha color; serialized as `#rrggbb` or `#rrggbbaa`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const BLACK: Color4 = Color4 {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }

    pub fn to_rgb(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            (self.a * 255.0).round() as u8,
        ]
    }

    pub fn to_egui(self) -> egui::Color32 {
        let [r, g, b, a] = self.to_rgba_u8();
        egui::Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let mut color = Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?);
        if hex.len() == 8 {
            color.a = channel(6)? as f32 / 255.0;
        }
        Some(color)
    }
}

impl fmt::Display for Color4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba_u8();
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl TryFrom<String> for Color4 {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color4::parse_hex(&value).ok_or_else(|| format!("invalid color `{value}`"))
    }
}

impl From<Color4> for String {
    fn from(color: Color4) -> Self {
        color.to_string()
    }
}

// ── Shapes ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub stroke: Color4,
    pub stroke_width: f32,
    pub fill: Option<Color4>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangle {
        width: f32,
        height: f32,
    },
    /// `points` is `[x0, y0, x1, y1]` relative to the shape position; the
    /// head sits at the second point.
    Arrow {
        points: [f32; 4],
        pointer_length: f32,
        pointer_width: f32,
    },
    ScallopedRectangle {
        width: f32,
        height: f32,
        border: ScallopBorder,
    },
    /// Positioned at its center.
    Circle {
        radius: f32,
    },
}

/// A markup annotation. `x`/`y` is the local origin; rotation (degrees) and
/// scale are applied around it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub style: ShapeStyle,
    pub kind: ShapeKind,
}

/// Partial update for a shape; unset fields are left alone and fields that
/// do not apply to the shape's kind are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShapePatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub rotation: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub radius: Option<f32>,
    pub points: Option<[f32; 4]>,
}

impl ShapePatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One drawable path in shape-local coordinates, stroked with the shape's
/// style and filled when `fill` is set.
#[derive(Clone, Debug)]
pub struct Outline {
    pub path: Path,
    pub fill: Option<Color4>,
}

/// Extra slop around strokes when hit testing, in stage pixels.
const HIT_TOLERANCE: f32 = 4.0;

impl Shape {
    fn placed(id: ShapeId, x: f32, y: f32, style: ShapeStyle, kind: ShapeKind) -> Self {
        Self {
            id,
            x,
            y,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            style,
            kind,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ShapeKind::Rectangle { .. } => "rectangle",
            ShapeKind::Arrow { .. } => "arrow",
            ShapeKind::ScallopedRectangle { .. } => "scalloped-rectangle",
            ShapeKind::Circle { .. } => "circle",
        }
    }

    pub fn apply(&mut self, patch: &ShapePatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(scale_x) = patch.scale_x {
            self.scale_x = scale_x;
        }
        if let Some(scale_y) = patch.scale_y {
            self.scale_y = scale_y;
        }
        match &mut self.kind {
            ShapeKind::Rectangle { width, height }
            | ShapeKind::ScallopedRectangle { width, height, .. } => {
                if let Some(w) = patch.width {
                    *width = w;
                }
                if let Some(h) = patch.height {
                    *height = h;
                }
            }
            ShapeKind::Arrow { points, .. } => {
                if let Some(p) = patch.points {
                    *points = p;
                }
            }
            ShapeKind::Circle { radius } => {
                if let Some(r) = patch.radius {
                    *radius = r;
                }
            }
        }
    }

    /// Local to stage: translate, then rotate, then scale.
    pub fn local_transform(&self) -> Transform {
        Transform::from_translate(self.x, self.y)
            .pre_concat(Transform::from_rotate(self.rotation))
            .pre_concat(Transform::from_scale(self.scale_x, self.scale_y))
    }

    pub fn to_stage(&self, local: (f32, f32)) -> (f32, f32) {
        map_point(&self.local_transform(), local)
    }

    /// `None` when the shape is collapsed to zero scale.
    pub fn to_local(&self, stage: (f32, f32)) -> Option<(f32, f32)> {
        let inverse = self.local_transform().invert()?;
        Some(map_point(&inverse, stage))
    }

    /// Unscaled local bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn local_bounds(&self) -> (f32, f32, f32, f32) {
        match &self.kind {
            ShapeKind::Rectangle { width, height } => (0.0, 0.0, *width, *height),
            ShapeKind::ScallopedRectangle {
                width,
                height,
                border,
            } => scallop_path(*width, *height, *border).bounds(*width, *height),
            ShapeKind::Circle { radius } => (-radius, -radius, *radius, *radius),
            ShapeKind::Arrow {
                points,
                pointer_width,
                ..
            } => {
                let pad = pointer_width / 2.0;
                (
                    points[0].min(points[2]) - pad,
                    points[1].min(points[3]) - pad,
                    points[0].max(points[2]) + pad,
                    points[1].max(points[3]) + pad,
                )
            }
        }
    }

    /// Bounding box corners in stage space, clockwise from top-left.
    pub fn stage_corners(&self) -> [(f32, f32); 4] {
        let (x0, y0, x1, y1) = self.local_bounds();
        let t = self.local_transform();
        [
            map_point(&t, (x0, y0)),
            map_point(&t, (x1, y0)),
            map_point(&t, (x1, y1)),
            map_point(&t, (x0, y1)),
        ]
    }

    pub fn outlines(&self) -> Vec<Outline> {
        let fill = self.style.fill;
        match &self.kind {
            ShapeKind::Rectangle { width, height } => Rect::from_xywh(0.0, 0.0, *width, *height)
                .map(|rect| Outline {
                    path: PathBuilder::from_rect(rect),
                    fill,
                })
                .into_iter()
                .collect(),
            ShapeKind::ScallopedRectangle {
                width,
                height,
                border,
            } => scallop_path(*width, *height, *border)
                .to_path()
                .map(|path| Outline {
                    path,
                    fill: fill.filter(|_| border.takes_fill()),
                })
                .into_iter()
                .collect(),
            ShapeKind::Circle { radius } => PathBuilder::from_circle(0.0, 0.0, *radius)
                .map(|path| Outline { path, fill })
                .into_iter()
                .collect(),
            ShapeKind::Arrow {
                points,
                pointer_length,
                pointer_width,
            } => {
                let start = (points[0], points[1]);
                let tip = (points[2], points[3]);
                let mut outlines = Vec::with_capacity(2);
                let mut shaft = PathBuilder::new();
                shaft.move_to(start.0, start.1);
                shaft.line_to(tip.0, tip.1);
                if let Some(path) = shaft.finish() {
                    outlines.push(Outline { path, fill: None });
                }
                if let Some([tip, left, right]) =
                    arrow_head(start, tip, *pointer_length, *pointer_width)
                {
                    let mut head = PathBuilder::new();
                    head.move_to(tip.0, tip.1);
                    head.line_to(left.0, left.1);
                    head.line_to(right.0, right.1);
                    head.close();
                    if let Some(path) = head.finish() {
                        outlines.push(Outline {
                            path,
                            fill: Some(fill.unwrap_or(self.style.stroke)),
                        });
                    }
                }
                outlines
            }
        }
    }

    /// Whether a stage-space point lands on the shape. Closed shapes hit on
    /// their whole area, arrows along the shaft and head.
    pub fn hit_test(&self, stage: (f32, f32)) -> bool {
        let Some((lx, ly)) = self.to_local(stage) else {
            return false;
        };
        let scale = self.scale_x.abs().max(self.scale_y.abs()).max(f32::EPSILON);
        let slop = (self.style.stroke_width / 2.0) + HIT_TOLERANCE / scale;
        match &self.kind {
            ShapeKind::Rectangle { .. } | ShapeKind::ScallopedRectangle { .. } => {
                let (x0, y0, x1, y1) = self.local_bounds();
                lx >= x0 - slop && lx <= x1 + slop && ly >= y0 - slop && ly <= y1 + slop
            }
            ShapeKind::Circle { radius } => (lx * lx + ly * ly).sqrt() <= radius + slop,
            ShapeKind::Arrow {
                points,
                pointer_width,
                ..
            } => {
                let dist = point_to_segment_dist(
                    (lx, ly),
                    (points[0], points[1]),
                    (points[2], points[3]),
                );
                dist <= slop.max(pointer_width / 2.0)
            }
        }
    }
}

/// Tip, then the two base corners of an arrow head.
pub fn arrow_head(
    start: (f32, f32),
    tip: (f32, f32),
    length: f32,
    width: f32,
) -> Option<[(f32, f32); 3]> {
    let dx = tip.0 - start.0;
    let dy = tip.1 - start.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f32::EPSILON || length <= 0.0 {
        return None;
    }
    let dir = (dx / len, dy / len);
    let perp = (-dir.1, dir.0);
    let base = (tip.0 - dir.0 * length, tip.1 - dir.1 * length);
    let half = width / 2.0;
    Some([
        tip,
        (base.0 + perp.0 * half, base.1 + perp.1 * half),
        (base.0 - perp.0 * half, base.1 - perp.1 * half),
    ])
}

pub fn map_point(t: &Transform, p: (f32, f32)) -> (f32, f32) {
    let mut pts = [Point::from_xy(p.0, p.1)];
    t.map_points(&mut pts);
    (pts[0].x, pts[0].y)
}

fn point_to_segment_dist(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (p.0 - a.0, p.1 - a.1);
    let len2 = ab.0 * ab.0 + ab.1 * ab.1;
    let t = if len2 > 0.0 {
        ((ap.0 * ab.0 + ap.1 * ab.1) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = (a.0 + ab.0 * t, a.1 + ab.1 * t);
    ((p.0 - closest.0).powi(2) + (p.1 - closest.1).powi(2)).sqrt()
}

// ── Toolbar presets ─────────────────────────────────────────────────────────

/// Shapes the markup toolbar can add.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeTool {
    Arrow,
    Rectangle,
    Cloud,
    Callout,
    Circle,
}

impl ShapeTool {
    pub const ALL: [ShapeTool; 5] = [
        ShapeTool::Arrow,
        ShapeTool::Rectangle,
        ShapeTool::Cloud,
        ShapeTool::Callout,
        ShapeTool::Circle,
    ];

    pub fn id_prefix(self) -> &'static str {
        match self {
            ShapeTool::Arrow => "arrow",
            ShapeTool::Rectangle => "rectangle",
            ShapeTool::Cloud => "cloud",
            ShapeTool::Callout => "callout",
            ShapeTool::Circle => "circle",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShapeTool::Arrow => "Arrow",
            ShapeTool::Rectangle => "Rectangle",
            ShapeTool::Cloud => "Cloud",
            ShapeTool::Callout => "Callout",
            ShapeTool::Circle => "Circle",
        }
    }

    /// New shape at the tool's default spot, stroked with the current
    /// toolbar color and width.
    pub fn create(self, id: ShapeId, stroke: Color4, stroke_width: f32, config: &EditorConfig) -> Shape {
        let style = ShapeStyle {
            stroke,
            stroke_width,
            fill: None,
        };
        match self {
            ShapeTool::Arrow => Shape::placed(
                id,
                200.0,
                250.0,
                ShapeStyle {
                    fill: Some(stroke),
                    ..style
                },
                ShapeKind::Arrow {
                    points: [0.0, 0.0, 100.0, 100.0],
                    pointer_length: 20.0,
                    pointer_width: 20.0,
                },
            ),
            ShapeTool::Rectangle => Shape::placed(
                id,
                100.0,
                100.0,
                style,
                ShapeKind::Rectangle {
                    width: 100.0,
                    height: 100.0,
                },
            ),
            ShapeTool::Cloud => Shape::placed(
                id,
                10.0,
                10.0,
                style,
                ShapeKind::ScallopedRectangle {
                    width: 100.0,
                    height: 100.0,
                    border: ScallopBorder::Filled {
                        scallops_per_side: config.scallops_per_side,
                    },
                },
            ),
            ShapeTool::Callout => Shape::placed(
                id,
                40.0,
                40.0,
                style,
                ShapeKind::ScallopedRectangle {
                    width: 120.0,
                    height: 80.0,
                    border: ScallopBorder::Stroked {
                        scallop_radius: config.scallop_radius,
                    },
                },
            ),
            ShapeTool::Circle => Shape::placed(id, 150.0, 150.0, style, ShapeKind::Circle { radius: 50.0 }),
        }
    }
}
