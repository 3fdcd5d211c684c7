//! Crop an image, then mark up the result with vector shapes.

pub mod config;
pub mod crop;
pub mod editor;
pub mod render;
pub mod scallop;
pub mod shape;
pub mod transform;

pub use config::EditorConfig;
pub use crop::{CropHandle, CropRegion, CropSelection, CroppedImage, StageSize};
pub use editor::{EditorState, Stage};
pub use shape::{Color4, Shape, ShapeId, ShapeKind, ShapePatch, ShapeTool};
