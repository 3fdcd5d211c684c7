use std::path::{Path, PathBuf};

use anyhow::Context;
use eframe::egui;
use image::{DynamicImage, RgbaImage};

use crop_markup::crop::{self, CropSelection};
use crop_markup::render;
use crop_markup::transform::{self, TransformGesture, TransformHandle, TransformNormalizer};
use crop_markup::{Color4, CroppedImage, EditorConfig, EditorState, ShapeTool, Stage};

const SELECTION_BLUE: egui::Color32 = egui::Color32::from_rgb(0, 120, 255);

// ── Interaction State ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum DragState {
    None,
    /// Dragging the selected shape; `grab` is the pointer offset from its
    /// origin.
    Moving { grab: (f32, f32) },
    Transforming {
        gesture: TransformGesture,
        normalizer: TransformNormalizer,
    },
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct CropMarkupApp {
    config: EditorConfig,
    image_path: Option<PathBuf>,
    raw_image: Option<DynamicImage>,
    source_texture: Option<egui::TextureHandle>,
    crop: CropSelection,

    editor: EditorState,
    markup_base: Option<RgbaImage>,
    scene_texture: Option<egui::TextureHandle>,
    scene_revision: Option<u64>,

    color: [f32; 3],
    stroke_width: f32,
    drag: DragState,
}

fn load_image(path: &Path) -> anyhow::Result<DynamicImage> {
    let img = image::open(path).with_context(|| format!("opening {}", path.display()))?;
    log::info!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

fn color_image(img: &RgbaImage) -> egui::ColorImage {
    let size = [img.width() as usize, img.height() as usize];
    let pixels = img.as_flat_samples();
    egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice())
}

fn to_stage(origin: egui::Pos2, pos: egui::Pos2) -> (f32, f32) {
    (pos.x - origin.x, pos.y - origin.y)
}

fn to_screen(origin: egui::Pos2, p: (f32, f32)) -> egui::Pos2 {
    origin + egui::vec2(p.0, p.1)
}

fn full_uv() -> egui::Rect {
    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0))
}

impl CropMarkupApp {
    pub fn new(config: EditorConfig, image_path: Option<PathBuf>) -> Self {
        let raw_image = image_path.as_deref().and_then(|path| match load_image(path) {
            Ok(img) => Some(img),
            Err(err) => {
                log::error!("{err:#}");
                None
            }
        });
        let crop = CropSelection::new(
            config.initial_crop,
            config.stage(),
            config.min_crop_size,
            config.handle_radius,
        );

        Self {
            color: config.stroke_color.to_rgb(),
            stroke_width: config.stroke_width,
            config,
            image_path,
            raw_image,
            source_texture: None,
            crop,
            editor: EditorState::new(),
            markup_base: None,
            scene_texture: None,
            scene_revision: None,
            drag: DragState::None,
        }
    }

    fn output_name(&self, suffix: &str) -> String {
        let stem = self
            .image_path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        format!("{stem}_{suffix}.png")
    }

    fn save_dialog(&self, suffix: &str) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(self.output_name(suffix));
        if let Some(dir) = self.image_path.as_deref().and_then(Path::parent) {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file()
    }

    // ── Crop stage ─────────────────────────────────────────────────────────

    fn open_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "gif", "webp"])
            .pick_file()
        else {
            return;
        };
        match load_image(&path) {
            Ok(img) => {
                self.raw_image = Some(img);
                self.image_path = Some(path);
                self.source_texture = None;
            }
            Err(err) => log::error!("{err:#}"),
        }
    }

    fn ensure_source_texture(&mut self, ctx: &egui::Context) {
        if self.source_texture.is_some() {
            return;
        }
        if let Some(ref img) = self.raw_image {
            self.source_texture = Some(ctx.load_texture(
                "source",
                color_image(&img.to_rgba8()),
                egui::TextureOptions::LINEAR,
            ));
        }
    }

    fn rasterize_crop(&self) -> Option<RgbaImage> {
        let raw = self.raw_image.as_ref()?;
        Some(crop::rasterize_crop(
            raw,
            self.config.stage(),
            self.crop.region,
            self.config.pixel_ratio,
        ))
    }

    fn confirm_crop(&mut self) {
        let Some(out) = self.rasterize_crop() else {
            return;
        };
        match CroppedImage::from_rgba(&out) {
            Ok(cropped) => {
                self.markup_base = Some(out);
                self.editor.select_shape(None);
                self.editor.set_cropped_image(cropped);
                self.drag = DragState::None;
            }
            Err(err) => log::error!("{err:#}"),
        }
    }

    fn save_crop(&self) {
        let Some(out) = self.rasterize_crop() else {
            return;
        };
        let Some(path) = self.save_dialog("cropped") else {
            return;
        };
        match crop::save_png(&out, &path) {
            Ok(()) => log::info!("saved crop to {}", path.display()),
            Err(err) => log::error!("{err:#}"),
        }
    }

    fn draw_crop_overlay(&self, painter: &egui::Painter, origin: egui::Pos2) {
        let region = self.crop.region;
        let rect = egui::Rect::from_min_size(
            to_screen(origin, (region.x, region.y)),
            egui::vec2(region.width, region.height),
        );
        let color = self.config.crop_color.to_egui();
        painter.rect_filled(rect, 0.0, color.gamma_multiply(0.3));
        let outline = [
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
            rect.left_top(),
        ];
        painter.extend(egui::Shape::dashed_line(
            &outline,
            egui::Stroke::new(2.0, color),
            5.0,
            5.0,
        ));
        for handle in crop::CropHandle::ALL {
            painter.circle(
                to_screen(origin, region.handle_position(handle)),
                self.config.handle_radius,
                color,
                egui::Stroke::new(2.0, egui::Color32::WHITE),
            );
        }
    }

    fn crop_stage(&mut self, ctx: &egui::Context) {
        self.ensure_source_texture(ctx);
        let has_image = self.raw_image.is_some();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open…").clicked() {
                    self.open_image();
                }
                ui.separator();
                let region = self.crop.region;
                let label = format!(
                    "Crop Image ({}×{})",
                    region.width.round(),
                    region.height.round()
                );
                if ui.add_enabled(has_image, egui::Button::new(label)).clicked() {
                    self.confirm_crop();
                }
                if ui
                    .add_enabled(has_image, egui::Button::new("Save crop…"))
                    .clicked()
                {
                    self.save_crop();
                }
                ui.separator();
                ui.label(format!(
                    "Crop position: x: {}, y: {}   Crop size: {} × {} pixels",
                    region.x.round(),
                    region.y.round(),
                    region.width.round(),
                    region.height.round()
                ));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let stage = self.config.stage();
            let (response, painter) = ui.allocate_painter(
                egui::vec2(stage.width, stage.height),
                egui::Sense::click_and_drag(),
            );
            let origin = response.rect.min;

            painter.rect_filled(response.rect, 0.0, egui::Color32::from_gray(40));
            if let Some(ref tex) = self.source_texture {
                painter.image(tex.id(), response.rect, full_uv(), egui::Color32::WHITE);
            }
            self.draw_crop_overlay(&painter, origin);

            if response.drag_started_by(egui::PointerButton::Primary) {
                if let Some(pos) = ctx.input(|i| i.pointer.press_origin()) {
                    let (x, y) = to_stage(origin, pos);
                    self.crop.start_drag(x, y);
                }
            }
            if response.dragged_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    let (x, y) = to_stage(origin, pos);
                    self.crop.update_drag(x, y);
                }
            }
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                self.crop.end_drag();
            }
        });
    }

    // ── Markup stage ───────────────────────────────────────────────────────

    fn back_to_crop(&mut self) {
        self.editor.clear_cropped_image();
        self.markup_base = None;
        self.scene_texture = None;
        self.scene_revision = None;
        self.drag = DragState::None;
    }

    fn add_shape(&mut self, tool: ShapeTool) {
        let id = self.editor.next_shape_id(tool.id_prefix());
        let shape = tool.create(id, Color4::from_rgb(self.color), self.stroke_width, &self.config);
        self.editor.add_shape(shape);
    }

    fn export_markup(&self) {
        let img = match render::export_markup(&self.editor) {
            Ok(Some(img)) => img,
            Ok(None) => return,
            Err(err) => {
                log::error!("{err:#}");
                return;
            }
        };
        let Some(path) = self.save_dialog("markup") else {
            return;
        };
        match crop::save_png(&img, &path) {
            Ok(()) => log::info!("exported markup to {}", path.display()),
            Err(err) => log::error!("{err:#}"),
        }
    }

    fn ensure_markup_base(&mut self) {
        if self.markup_base.is_some() {
            return;
        }
        if let Some(cropped) = self.editor.cropped_image() {
            match cropped.decode() {
                Ok(img) => self.markup_base = Some(img),
                Err(err) => log::error!("{err:#}"),
            }
        }
    }

    fn ensure_scene_texture(&mut self, ctx: &egui::Context) {
        let revision = self.editor.revision();
        if self.scene_revision == Some(revision) {
            return;
        }
        let Some(ref base) = self.markup_base else {
            return;
        };
        let scene = color_image(&render::rasterize_scene(base, self.editor.shapes()));
        match self.scene_texture {
            Some(ref mut tex) => tex.set(scene, egui::TextureOptions::LINEAR),
            None => {
                self.scene_texture = Some(ctx.load_texture("scene", scene, egui::TextureOptions::LINEAR));
            }
        }
        self.scene_revision = Some(revision);
    }

    fn draw_selection(&self, painter: &egui::Painter, origin: egui::Pos2) {
        let Some(shape) = self.editor.selected_shape() else {
            return;
        };
        let corners: Vec<egui::Pos2> = shape
            .stage_corners()
            .iter()
            .map(|&p| to_screen(origin, p))
            .collect();
        let stroke = egui::Stroke::new(1.5, SELECTION_BLUE);
        painter.add(egui::Shape::closed_line(corners.clone(), stroke));

        let top_mid = corners[0] + (corners[1] - corners[0]) * 0.5;
        for (handle, pos) in transform::handle_positions(shape) {
            let pos = to_screen(origin, pos);
            if handle == TransformHandle::Rotate {
                painter.line_segment([top_mid, pos], stroke);
            }
            painter.circle(pos, self.config.handle_radius, egui::Color32::WHITE, stroke);
        }
    }

    fn select_at(&mut self, point: (f32, f32)) {
        let id = self.editor.shape_at(point).map(|shape| shape.id.clone());
        self.editor.select_shape(id);
    }

    fn begin_markup_drag(&mut self, point: (f32, f32)) {
        if let Some(shape) = self.editor.selected_shape() {
            if let Some(handle) = transform::handle_at(shape, point, self.config.handle_radius + 2.0) {
                self.drag = DragState::Transforming {
                    gesture: TransformGesture::begin(shape, handle),
                    normalizer: TransformNormalizer::begin(shape),
                };
                return;
            }
        }

        let hit = self
            .editor
            .shape_at(point)
            .map(|shape| (shape.id.clone(), shape.x, shape.y));
        self.drag = DragState::None;
        match hit {
            Some((id, x, y)) if self.editor.is_selected(&id) => {
                self.drag = DragState::Moving {
                    grab: (point.0 - x, point.1 - y),
                };
            }
            // Unselected shapes are not draggable; pressing one selects it.
            Some((id, ..)) => self.editor.select_shape(Some(id)),
            None => self.editor.select_shape(None),
        }
    }

    fn continue_markup_drag(&mut self, point: (f32, f32)) {
        match &self.drag {
            DragState::Moving { grab } => {
                self.editor.drag_selected_to(point.0 - grab.0, point.1 - grab.1);
            }
            DragState::Transforming { gesture, .. } => {
                let patch = gesture.update(point);
                if let Some(id) = self.editor.selected_shape_id().cloned() {
                    self.editor.update_shape(&id, &patch);
                }
            }
            DragState::None => {}
        }
    }

    fn end_markup_drag(&mut self) {
        if let DragState::Transforming { mut normalizer, .. } =
            std::mem::replace(&mut self.drag, DragState::None)
        {
            let commit = self.editor.selected_shape().and_then(|shape| {
                normalizer
                    .commit(shape)
                    .map(|patch| (shape.id.clone(), patch))
            });
            if let Some((id, patch)) = commit {
                log::debug!("commit transform on {id}");
                self.editor.update_shape(&id, &patch);
            }
        }
    }

    fn markup_stage(&mut self, ctx: &egui::Context) {
        self.ensure_markup_base();
        self.ensure_scene_texture(ctx);

        // Keyboard shortcuts
        let delete = ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace));
        if delete && !ctx.wants_keyboard_input() {
            self.editor.delete_selected();
            self.drag = DragState::None;
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Back to Crop Image screen").clicked() {
                    self.back_to_crop();
                    return;
                }
                ui.separator();
                ui.label("Shape:");
                for tool in ShapeTool::ALL {
                    if ui.button(tool.label()).clicked() {
                        self.add_shape(tool);
                    }
                }
                ui.separator();
                ui.label("Stroke width:");
                ui.add(egui::DragValue::new(&mut self.stroke_width).range(1.0..=50.0));
                ui.label("Stroke color:");
                ui.color_edit_button_rgb(&mut self.color);
                ui.separator();
                let has_selection = self.editor.selected_shape().is_some();
                if ui.add_enabled(has_selection, egui::Button::new("Delete")).clicked() {
                    self.editor.delete_selected();
                }
                if ui
                    .add_enabled(!self.editor.shapes().is_empty(), egui::Button::new("Clear"))
                    .clicked()
                {
                    self.editor.reset_shapes();
                }
                ui.separator();
                if ui.button("Export…").clicked() {
                    self.export_markup();
                }
            });
        });

        if self.editor.stage() != Stage::Markup {
            return;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                let size = self
                    .markup_base
                    .as_ref()
                    .map(|img| egui::vec2(img.width() as f32, img.height() as f32))
                    .unwrap_or(egui::vec2(1.0, 1.0));
                let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
                let origin = response.rect.min;

                if let Some(ref tex) = self.scene_texture {
                    painter.image(tex.id(), response.rect, full_uv(), egui::Color32::WHITE);
                }
                self.draw_selection(&painter, origin);

                if response.clicked() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        self.select_at(to_stage(origin, pos));
                    }
                }
                if response.drag_started_by(egui::PointerButton::Primary) {
                    if let Some(pos) = ctx.input(|i| i.pointer.press_origin()) {
                        self.begin_markup_drag(to_stage(origin, pos));
                    }
                }
                if response.dragged_by(egui::PointerButton::Primary) {
                    if let Some(pos) = response.interact_pointer_pos() {
                        self.continue_markup_drag(to_stage(origin, pos));
                    }
                }
                if response.drag_stopped_by(egui::PointerButton::Primary) {
                    self.end_markup_drag();
                }
            });
        });
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for CropMarkupApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.editor.stage() {
            Stage::Crop => self.crop_stage(ctx),
            Stage::Markup => self.markup_stage(ctx),
        }
    }
}
