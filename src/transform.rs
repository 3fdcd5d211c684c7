//! Resize/rotate gestures on a selected shape.
//!
//! While a handle is dragged only the shape's scale, rotation and position
//! change. When the gesture ends, [`TransformNormalizer`] folds any scale
//! into the shape's own dimensions and resets it to 1, so width/height stay
//! the source of truth and scale never compounds across gestures.

use crate::shape::{Shape, ShapeKind, ShapePatch};

/// Smallest width/height/radius a folded scale can produce.
pub const MIN_DIMENSION: f32 = 5.0;
/// Smallest magnitude a handle drag can set a scale factor to.
pub const MIN_SCALE: f32 = 0.01;
/// Distance from the top edge to the rotation handle, in stage pixels.
pub const ROTATE_HANDLE_OFFSET: f32 = 24.0;

const EPSILON: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
}

impl NodeTransform {
    pub fn of(shape: &Shape) -> Self {
        Self {
            scale_x: shape.scale_x,
            scale_y: shape.scale_y,
            rotation: shape.rotation,
        }
    }

    fn scale_differs(&self, other: &NodeTransform) -> bool {
        (self.scale_x - other.scale_x).abs() > EPSILON
            || (self.scale_y - other.scale_y).abs() > EPSILON
    }

    fn rotation_differs(&self, other: &NodeTransform) -> bool {
        (self.rotation - other.rotation).abs() > EPSILON
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformChange {
    Scaled {
        scale_x: f32,
        scale_y: f32,
        rotation: f32,
    },
    Rotated {
        rotation: f32,
    },
    Unchanged,
}

/// Remembers the last committed scale/rotation of one shape.
#[derive(Clone, Copy, Debug)]
pub struct TransformNormalizer {
    previous: NodeTransform,
}

impl TransformNormalizer {
    pub fn begin(shape: &Shape) -> Self {
        Self {
            previous: NodeTransform::of(shape),
        }
    }

    pub fn classify(&self, current: NodeTransform) -> TransformChange {
        if current.scale_differs(&self.previous) {
            TransformChange::Scaled {
                scale_x: current.scale_x,
                scale_y: current.scale_y,
                rotation: current.rotation,
            }
        } else if current.rotation_differs(&self.previous) {
            TransformChange::Rotated {
                rotation: current.rotation,
            }
        } else {
            TransformChange::Unchanged
        }
    }

    /// Patch that commits the shape's current transform, or `None` when
    /// nothing moved since the last commit.
    pub fn commit(&mut self, shape: &Shape) -> Option<ShapePatch> {
        let current = NodeTransform::of(shape);
        let patch = match self.classify(current) {
            TransformChange::Scaled {
                scale_x,
                scale_y,
                rotation,
            } => {
                self.previous = NodeTransform {
                    scale_x: 1.0,
                    scale_y: 1.0,
                    rotation,
                };
                fold_scale(shape, scale_x, scale_y, rotation)
            }
            TransformChange::Rotated { rotation } => {
                self.previous = current;
                ShapePatch {
                    rotation: Some(rotation),
                    ..Default::default()
                }
            }
            TransformChange::Unchanged => return None,
        };
        Some(patch)
    }
}

/// Move `scale_x`/`scale_y` into the shape's dimensions and reset the
/// scale to 1.
pub fn fold_scale(shape: &Shape, scale_x: f32, scale_y: f32, rotation: f32) -> ShapePatch {
    let mut patch = ShapePatch {
        rotation: Some(rotation),
        scale_x: Some(1.0),
        scale_y: Some(1.0),
        ..Default::default()
    };
    match &shape.kind {
        ShapeKind::Rectangle { width, height }
        | ShapeKind::ScallopedRectangle { width, height, .. } => {
            patch.width = Some((width * scale_x).max(MIN_DIMENSION));
            patch.height = Some((height * scale_y).max(MIN_DIMENSION));
        }
        ShapeKind::Circle { radius } => {
            let scale = scale_x.abs().max(scale_y.abs());
            patch.radius = Some((radius * scale).max(MIN_DIMENSION));
        }
        ShapeKind::Arrow { points, .. } => {
            patch.points = Some([
                points[0] * scale_x,
                points[1] * scale_y,
                points[2] * scale_x,
                points[3] * scale_y,
            ]);
        }
    }
    patch
}

// ── Gestures ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformHandle {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    Rotate,
}

impl TransformHandle {
    fn corner_index(self) -> Option<usize> {
        match self {
            TransformHandle::TopLeft => Some(0),
            TransformHandle::TopRight => Some(1),
            TransformHandle::BottomRight => Some(2),
            TransformHandle::BottomLeft => Some(3),
            TransformHandle::Rotate => None,
        }
    }
}

fn local_corners(shape: &Shape) -> [(f32, f32); 4] {
    let (x0, y0, x1, y1) = shape.local_bounds();
    [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
}

fn rotate_vec(v: (f32, f32), degrees: f32) -> (f32, f32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (v.0 * cos - v.1 * sin, v.0 * sin + v.1 * cos)
}

/// Where each transform handle sits in stage space.
pub fn handle_positions(shape: &Shape) -> [(TransformHandle, (f32, f32)); 5] {
    let corners = shape.stage_corners();
    let (x0, y0, x1, _) = shape.local_bounds();
    let top_center = shape.to_stage(((x0 + x1) / 2.0, y0));
    let up = rotate_vec((0.0, -ROTATE_HANDLE_OFFSET), shape.rotation);
    [
        (TransformHandle::TopLeft, corners[0]),
        (TransformHandle::TopRight, corners[1]),
        (TransformHandle::BottomRight, corners[2]),
        (TransformHandle::BottomLeft, corners[3]),
        (
            TransformHandle::Rotate,
            (top_center.0 + up.0, top_center.1 + up.1),
        ),
    ]
}

pub fn handle_at(shape: &Shape, point: (f32, f32), radius: f32) -> Option<TransformHandle> {
    handle_positions(shape)
        .into_iter()
        .find(|(_, (hx, hy))| (hx - point.0).powi(2) + (hy - point.1).powi(2) <= radius * radius)
        .map(|(handle, _)| handle)
}

/// A drag on one transform handle, measured against the shape as it was
/// when the drag began.
#[derive(Clone, Debug)]
pub struct TransformGesture {
    pub handle: TransformHandle,
    start: Shape,
    /// Local point that stays fixed on screen: the opposite corner when
    /// scaling, the box center when rotating.
    pivot_local: (f32, f32),
    pivot_stage: (f32, f32),
    /// Local vector from the pivot to the dragged corner.
    reach_local: (f32, f32),
}

impl TransformGesture {
    pub fn begin(shape: &Shape, handle: TransformHandle) -> Self {
        let corners = local_corners(shape);
        let (pivot_local, reach_local) = match handle.corner_index() {
            Some(i) => {
                let pivot = corners[(i + 2) % 4];
                let corner = corners[i];
                (pivot, (corner.0 - pivot.0, corner.1 - pivot.1))
            }
            None => {
                let (x0, y0, x1, y1) = shape.local_bounds();
                (((x0 + x1) / 2.0, (y0 + y1) / 2.0), (0.0, 0.0))
            }
        };
        Self {
            handle,
            start: shape.clone(),
            pivot_local,
            pivot_stage: shape.to_stage(pivot_local),
            reach_local,
        }
    }

    /// Live scale/rotation/position for the pointer at `pointer`.
    pub fn update(&self, pointer: (f32, f32)) -> ShapePatch {
        let (scale_x, scale_y, rotation) = match self.handle {
            TransformHandle::Rotate => {
                let dx = pointer.0 - self.pivot_stage.0;
                let dy = pointer.1 - self.pivot_stage.1;
                // The handle sits straight above the center at rotation 0.
                let mut rotation = dy.atan2(dx).to_degrees() + 90.0;
                if rotation > 180.0 {
                    rotation -= 360.0;
                }
                (self.start.scale_x, self.start.scale_y, rotation)
            }
            _ => {
                let offset = (pointer.0 - self.pivot_stage.0, pointer.1 - self.pivot_stage.1);
                let local = rotate_vec(offset, -self.start.rotation);
                let axis = |reach: f32, along: f32, current: f32| {
                    if reach.abs() > EPSILON {
                        (along / reach).max(MIN_SCALE)
                    } else {
                        current
                    }
                };
                (
                    axis(self.reach_local.0, local.0, self.start.scale_x),
                    axis(self.reach_local.1, local.1, self.start.scale_y),
                    self.start.rotation,
                )
            }
        };

        let scaled_pivot = (self.pivot_local.0 * scale_x, self.pivot_local.1 * scale_y);
        let turned = rotate_vec(scaled_pivot, rotation);
        ShapePatch {
            x: Some(self.pivot_stage.0 - turned.0),
            y: Some(self.pivot_stage.1 - turned.1),
            rotation: Some(rotation),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            ..Default::default()
        }
    }
}
