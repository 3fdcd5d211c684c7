//! Editor state shared by the crop and markup stages.

use crate::crop::CroppedImage;
use crate::shape::{Shape, ShapeId, ShapePatch};

/// Which screen the editor shows; derived from whether a crop exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Crop,
    Markup,
}

#[derive(Clone, Debug, Default)]
pub struct EditorState {
    cropped_image: Option<CroppedImage>,
    shapes: Vec<Shape>,
    selected_shape_id: Option<ShapeId>,
    /// Bumped on every mutation so views know when to redraw.
    revision: u64,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        if self.cropped_image.is_some() {
            Stage::Markup
        } else {
            Stage::Crop
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ── Cropped image ──────────────────────────────────────────────────────

    pub fn cropped_image(&self) -> Option<&CroppedImage> {
        self.cropped_image.as_ref()
    }

    pub fn set_cropped_image(&mut self, image: CroppedImage) {
        log::info!("cropped image set ({}x{})", image.width, image.height);
        self.cropped_image = Some(image);
        self.touch();
    }

    /// Back to the crop stage. Shapes are kept.
    pub fn clear_cropped_image(&mut self) {
        self.cropped_image = None;
        self.touch();
    }

    // ── Shapes ─────────────────────────────────────────────────────────────

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|shape| &shape.id == id)
    }

    pub fn add_shape(&mut self, shape: Shape) {
        log::debug!("add {} {}", shape.kind_name(), shape.id);
        self.shapes.push(shape);
        self.touch();
    }

    /// Patch the shape with `id`; unknown ids are ignored.
    pub fn update_shape(&mut self, id: &ShapeId, patch: &ShapePatch) {
        if let Some(shape) = self.shapes.iter_mut().find(|shape| &shape.id == id) {
            shape.apply(patch);
            self.touch();
        }
    }

    pub fn remove_shape(&mut self, id: &ShapeId) {
        let before = self.shapes.len();
        self.shapes.retain(|shape| &shape.id != id);
        if self.shapes.len() != before {
            log::debug!("removed {id}");
            if self.selected_shape_id.as_ref() == Some(id) {
                self.selected_shape_id = None;
            }
            self.touch();
        }
    }

    pub fn reset_shapes(&mut self) {
        self.shapes.clear();
        self.selected_shape_id = None;
        self.touch();
    }

    /// Timestamp-derived id (`<prefix>-<unix millis>`), suffixed when two
    /// shapes are added within the same millisecond.
    pub fn next_shape_id(&self, prefix: &str) -> ShapeId {
        let base = format!("{prefix}-{}", chrono::Utc::now().timestamp_millis());
        let mut id = ShapeId::new(base.clone());
        let mut n = 1;
        while self.shape(&id).is_some() {
            id = ShapeId::new(format!("{base}-{n}"));
            n += 1;
        }
        id
    }

    /// Topmost shape under a stage-space point.
    pub fn shape_at(&self, point: (f32, f32)) -> Option<&Shape> {
        self.shapes.iter().rev().find(|shape| shape.hit_test(point))
    }

    // ── Selection ──────────────────────────────────────────────────────────

    pub fn selected_shape_id(&self) -> Option<&ShapeId> {
        self.selected_shape_id.as_ref()
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selected_shape_id.as_ref().and_then(|id| self.shape(id))
    }

    pub fn is_selected(&self, id: &ShapeId) -> bool {
        self.selected_shape_id.as_ref() == Some(id)
    }

    pub fn select_shape(&mut self, id: Option<ShapeId>) {
        if self.selected_shape_id != id {
            log::debug!("select {:?}", id.as_ref().map(ShapeId::as_str));
            self.selected_shape_id = id;
            self.touch();
        }
    }

    /// Move the selected shape's origin to `(x, y)`. Only the selected shape
    /// is draggable; returns whether anything moved.
    pub fn drag_selected_to(&mut self, x: f32, y: f32) -> bool {
        let Some(id) = self.selected_shape_id.clone() else {
            return false;
        };
        if self.shape(&id).is_none() {
            return false;
        }
        self.update_shape(&id, &ShapePatch::position(x, y));
        true
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_shape_id.take() {
            self.remove_shape(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::shape::{Color4, ShapeTool};

    fn add(state: &mut EditorState, tool: ShapeTool) -> ShapeId {
        let id = state.next_shape_id(tool.id_prefix());
        let shape = tool.create(id.clone(), Color4::BLACK, 4.0, &EditorConfig::default());
        state.add_shape(shape);
        id
    }

    #[test]
    fn stage_follows_cropped_image() {
        let mut state = EditorState::new();
        assert_eq!(state.stage(), Stage::Crop);
        state.set_cropped_image(CroppedImage {
            png: Vec::new(),
            width: 1,
            height: 1,
        });
        assert_eq!(state.stage(), Stage::Markup);
        add(&mut state, ShapeTool::Circle);
        state.clear_cropped_image();
        assert_eq!(state.stage(), Stage::Crop);
        assert_eq!(state.shapes().len(), 1);
    }

    #[test]
    fn ids_are_unique_within_a_millisecond() {
        let mut state = EditorState::new();
        let a = add(&mut state, ShapeTool::Rectangle);
        let b = add(&mut state, ShapeTool::Rectangle);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("rectangle-"));
    }

    #[test]
    fn unknown_id_is_a_silent_miss() {
        let mut state = EditorState::new();
        add(&mut state, ShapeTool::Rectangle);
        let before = state.shapes().to_vec();
        let rev = state.revision();
        state.update_shape(&ShapeId::new("missing"), &ShapePatch::position(1.0, 1.0));
        state.remove_shape(&ShapeId::new("missing"));
        assert_eq!(state.shapes(), &before[..]);
        assert_eq!(state.revision(), rev);
    }

    #[test]
    fn removing_selected_shape_clears_selection() {
        let mut state = EditorState::new();
        let id = add(&mut state, ShapeTool::Arrow);
        state.select_shape(Some(id.clone()));
        state.remove_shape(&id);
        assert!(state.selected_shape_id().is_none());
    }

    #[test]
    fn only_selected_shape_drags() {
        let mut state = EditorState::new();
        let id = add(&mut state, ShapeTool::Rectangle);
        assert!(!state.drag_selected_to(5.0, 5.0));
        state.select_shape(Some(id.clone()));
        assert!(state.drag_selected_to(5.0, 6.0));
        let shape = state.shape(&id).unwrap();
        assert_eq!((shape.x, shape.y), (5.0, 6.0));
    }

    #[test]
    fn delete_selected_removes_and_deselects() {
        let mut state = EditorState::new();
        let keep = add(&mut state, ShapeTool::Circle);
        let gone = add(&mut state, ShapeTool::Rectangle);
        state.select_shape(Some(gone));
        state.delete_selected();
        assert_eq!(state.shapes().len(), 1);
        assert_eq!(state.shapes()[0].id, keep);
        assert!(state.selected_shape().is_none());
    }

    #[test]
    fn delete_selected_bumps_revision_once() {
        let mut state = EditorState::new();
        let id = add(&mut state, ShapeTool::Rectangle);
        state.select_shape(Some(id.clone()));
        let rev = state.revision();
        state.delete_selected();
        assert_eq!(state.revision(), rev + 1);

        // A selection naming no shape is dropped without a redraw.
        state.select_shape(Some(id));
        let rev = state.revision();
        state.delete_selected();
        assert_eq!(state.revision(), rev);
        assert!(state.selected_shape_id().is_none());
    }

    #[test]
    fn shape_at_prefers_topmost() {
        let mut state = EditorState::new();
        let _below = add(&mut state, ShapeTool::Rectangle);
        let above = add(&mut state, ShapeTool::Circle);
        // (150, 150) is inside both the rectangle and the circle.
        assert_eq!(state.shape_at((150.0, 150.0)).map(|s| &s.id), Some(&above));
        assert!(state.shape_at((590.0, 10.0)).is_none());
    }
}
