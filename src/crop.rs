//! Crop stage: the selection rectangle, its handles, and rasterizing the
//! region under it.

use std::io::Cursor;
use std::path::Path;

use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageSize {
    pub width: f32,
    pub height: f32,
}

/// Crop rectangle in stage pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CropHandle {
    pub const ALL: [CropHandle; 4] = [
        CropHandle::TopLeft,
        CropHandle::TopRight,
        CropHandle::BottomLeft,
        CropHandle::BottomRight,
    ];

    /// The corner that stays put while this handle is dragged.
    pub fn opposite(self) -> CropHandle {
        match self {
            CropHandle::TopLeft => CropHandle::BottomRight,
            CropHandle::TopRight => CropHandle::BottomLeft,
            CropHandle::BottomLeft => CropHandle::TopRight,
            CropHandle::BottomRight => CropHandle::TopLeft,
        }
    }
}

impl CropRegion {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Same rectangle resized to `[min_size, stage]` on each axis, then
    /// moved onto the stage.
    pub fn fit_to(&self, stage: StageSize, min_size: f32) -> CropRegion {
        let mut fitted = CropRegion::new(
            self.x,
            self.y,
            self.width.max(min_size).min(stage.width),
            self.height.max(min_size).min(stage.height),
        );
        fitted.drag_to(self.x, self.y, stage);
        fitted
    }

    /// Move the rectangle so its top-left lands at `(x, y)`, clamped so the
    /// whole rectangle stays on the stage.
    pub fn drag_to(&mut self, x: f32, y: f32, stage: StageSize) {
        self.x = x.min(stage.width - self.width).max(0.0);
        self.y = y.min(stage.height - self.height).max(0.0);
    }

    /// Resize from a corner handle dragged to `pos`. The opposite corner is
    /// the pivot; both axes are floored at `min_size`.
    pub fn resize(&mut self, handle: CropHandle, pos: (f32, f32), stage: StageSize, min_size: f32) {
        let (px, py) = pos;
        let right = self.right();
        let bottom = self.bottom();

        let free_width = (px - self.x).min(stage.width - self.x).max(min_size);
        let free_height = (py - self.y).min(stage.height - self.y).max(min_size);
        let anchored_x = px.min(right - min_size).max(0.0);
        let anchored_y = py.min(bottom - min_size).max(0.0);

        match handle {
            CropHandle::BottomRight => {
                self.width = free_width;
                self.height = free_height;
            }
            CropHandle::BottomLeft => {
                self.x = anchored_x;
                self.width = right - anchored_x;
                self.height = free_height;
            }
            CropHandle::TopRight => {
                self.y = anchored_y;
                self.width = free_width;
                self.height = bottom - anchored_y;
            }
            CropHandle::TopLeft => {
                self.x = anchored_x;
                self.y = anchored_y;
                self.width = right - anchored_x;
                self.height = bottom - anchored_y;
            }
        }
    }

    pub fn handle_position(&self, handle: CropHandle) -> (f32, f32) {
        match handle {
            CropHandle::TopLeft => (self.x, self.y),
            CropHandle::TopRight => (self.right(), self.y),
            CropHandle::BottomLeft => (self.x, self.bottom()),
            CropHandle::BottomRight => (self.right(), self.bottom()),
        }
    }

    pub fn handle_at(&self, px: f32, py: f32, radius: f32) -> Option<CropHandle> {
        CropHandle::ALL.into_iter().find(|&handle| {
            let (hx, hy) = self.handle_position(handle);
            (hx - px).powi(2) + (hy - py).powi(2) <= radius * radius
        })
    }

    /// Pixel rectangle at `ratio`, kept inside a `max_w` x `max_h` raster.
    fn pixel_rect(&self, ratio: f32, max_w: u32, max_h: u32) -> (u32, u32, u32, u32) {
        let x = ((self.x * ratio).round().max(0.0) as u32).min(max_w.saturating_sub(1));
        let y = ((self.y * ratio).round().max(0.0) as u32).min(max_h.saturating_sub(1));
        let w = ((self.width * ratio).round().max(1.0) as u32).min(max_w - x);
        let h = ((self.height * ratio).round().max(1.0) as u32).min(max_h - y);
        (x, y, w, h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CropDrag {
    /// Pointer offset from the rectangle's top-left when the drag began.
    Move { grab: (f32, f32) },
    Resize(CropHandle),
}

/// Crop rectangle plus the gesture currently acting on it.
#[derive(Clone, Debug)]
pub struct CropSelection {
    pub region: CropRegion,
    pub stage: StageSize,
    pub min_size: f32,
    pub handle_radius: f32,
    drag: Option<CropDrag>,
}

impl CropSelection {
    pub fn new(region: CropRegion, stage: StageSize, min_size: f32, handle_radius: f32) -> Self {
        Self {
            region,
            stage,
            min_size,
            handle_radius,
            drag: None,
        }
    }

    /// Begin a gesture at a stage position. Handles win over the body.
    pub fn start_drag(&mut self, px: f32, py: f32) -> bool {
        if let Some(handle) = self.region.handle_at(px, py, self.handle_radius + 2.0) {
            self.drag = Some(CropDrag::Resize(handle));
        } else if self.region.contains(px, py) {
            self.drag = Some(CropDrag::Move {
                grab: (px - self.region.x, py - self.region.y),
            });
        }
        self.drag.is_some()
    }

    pub fn update_drag(&mut self, px: f32, py: f32) {
        match self.drag {
            Some(CropDrag::Move { grab }) => {
                self.region.drag_to(px - grab.0, py - grab.1, self.stage);
            }
            Some(CropDrag::Resize(handle)) => {
                self.region.resize(handle, (px, py), self.stage, self.min_size);
            }
            None => {}
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

/// PNG-encoded crop result handed from the crop stage to the markup stage.
#[derive(Clone, Debug, PartialEq)]
pub struct CroppedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CroppedImage {
    pub fn from_rgba(img: &RgbaImage) -> anyhow::Result<Self> {
        Ok(Self {
            png: encode_png(img)?,
            width: img.width(),
            height: img.height(),
        })
    }

    pub fn decode(&self) -> anyhow::Result<RgbaImage> {
        let img = image::load_from_memory_with_format(&self.png, ImageFormat::Png)
            .context("decoding cropped image")?;
        Ok(img.to_rgba8())
    }
}

/// Render the pixels under `region` as the stage shows them: the source is
/// stretched to the stage size, scaled by `pixel_ratio`, then cut out.
pub fn rasterize_crop(
    source: &DynamicImage,
    stage: StageSize,
    region: CropRegion,
    pixel_ratio: f32,
) -> RgbaImage {
    let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
    let stage_w = (stage.width * ratio).round().max(1.0) as u32;
    let stage_h = (stage.height * ratio).round().max(1.0) as u32;

    let rgba = source.to_rgba8();
    let staged = if rgba.dimensions() == (stage_w, stage_h) {
        rgba
    } else {
        imageops::resize(&rgba, stage_w, stage_h, FilterType::Triangle)
    };

    let (x, y, w, h) = region.pixel_rect(ratio, stage_w, stage_h);
    imageops::crop_imm(&staged, x, y, w, h).to_image()
}

pub fn encode_png(img: &RgbaImage) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("encoding PNG")?;
    Ok(buf)
}

pub fn save_png(img: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("writing {}", path.display()))
}
