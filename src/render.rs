//! Scene rasterization with tiny-skia.
//!
//! The markup scene is always rebuilt from state: the cropped image, then
//! every shape in list order. The same raster feeds the on-screen texture
//! and PNG export, so selection chrome never ends up in either.

use image::RgbaImage;
use tiny_skia::{ColorU8, FillRule, LineCap, LineJoin, Paint, Pixmap, Stroke};

use crate::editor::EditorState;
use crate::shape::{Color4, Shape};

/// Run `f` on a pixmap copy of `img`, then copy the pixels back. `img` is
/// straight alpha and tiny-skia works premultiplied, so pixels are converted
/// both ways.
fn with_pixmap(img: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) {
    let Some(mut pixmap) = Pixmap::new(img.width(), img.height()) else {
        return;
    };
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }

    f(&mut pixmap);

    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
}

fn paint_for(color: Color4) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba_u8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

pub fn draw_shape(pixmap: &mut Pixmap, shape: &Shape) {
    let transform = shape.local_transform();
    let stroke = Stroke {
        width: shape.style.stroke_width.max(0.0),
        line_cap: LineCap::Butt,
        line_join: LineJoin::Miter,
        ..Default::default()
    };
    let stroke_paint = paint_for(shape.style.stroke);

    for outline in shape.outlines() {
        if let Some(fill) = outline.fill {
            pixmap.fill_path(&outline.path, &paint_for(fill), FillRule::Winding, transform, None);
        }
        if stroke.width > 0.0 {
            pixmap.stroke_path(&outline.path, &stroke_paint, &stroke, transform, None);
        }
    }
}

/// `base` with every shape drawn over it, in list order.
pub fn rasterize_scene(base: &RgbaImage, shapes: &[Shape]) -> RgbaImage {
    let mut img = base.clone();
    if shapes.is_empty() {
        return img;
    }
    with_pixmap(&mut img, |pixmap| {
        for shape in shapes {
            draw_shape(pixmap, shape);
        }
    });
    img
}

/// The markup result: the decoded crop with all shapes drawn on it.
pub fn export_markup(state: &EditorState) -> anyhow::Result<Option<RgbaImage>> {
    let Some(cropped) = state.cropped_image() else {
        return Ok(None);
    };
    let base = cropped.decode()?;
    Ok(Some(rasterize_scene(&base, state.shapes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::shape::{ShapeId, ShapeTool};

    const WHITE: image::Rgba<u8> = image::Rgba([255, 255, 255, 255]);

    #[test]
    fn rectangle_strokes_its_edges_only() {
        let base = RgbaImage::from_pixel(300, 300, WHITE);
        let rect = ShapeTool::Rectangle.create(
            ShapeId::new("r"),
            Color4::BLACK,
            4.0,
            &EditorConfig::default(),
        );
        let out = rasterize_scene(&base, &[rect]);

        assert_eq!(out.get_pixel(150, 100).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(100, 150).0, [0, 0, 0, 255]);
        assert_eq!(*out.get_pixel(150, 150), WHITE);
        assert_eq!(*out.get_pixel(20, 20), WHITE);
    }

    #[test]
    fn arrow_head_is_filled() {
        let base = RgbaImage::from_pixel(400, 400, WHITE);
        let arrow = ShapeTool::Arrow.create(
            ShapeId::new("a"),
            Color4::from_rgb8(255, 0, 0),
            2.0,
            &EditorConfig::default(),
        );
        let out = rasterize_scene(&base, &[arrow]);
        // A point inside the head triangle, just short of the tip (300, 350).
        assert_eq!(out.get_pixel(292, 340).0, [255, 0, 0, 255]);
    }

    fn near(actual: [u8; 4], expected: [u8; 4]) -> bool {
        actual
            .iter()
            .zip(expected)
            .all(|(&a, e)| (a as i16 - e as i16).abs() <= 3)
    }

    #[test]
    fn translucent_base_blends_in_straight_alpha() {
        let base = RgbaImage::from_pixel(300, 300, image::Rgba([255, 255, 255, 128]));
        let half_black = Color4 {
            a: 0.5,
            ..Color4::BLACK
        };
        let rect = ShapeTool::Rectangle.create(
            ShapeId::new("r"),
            half_black,
            4.0,
            &EditorConfig::default(),
        );
        let out = rasterize_scene(&base, &[rect]);

        // Source-over of 50% black onto 50% white.
        let edge = out.get_pixel(150, 100).0;
        assert!(near(edge, [85, 85, 85, 192]), "edge pixel {edge:?}");
        // Untouched pixels keep their straight-alpha color.
        let inside = out.get_pixel(150, 150).0;
        assert!(near(inside, [255, 255, 255, 128]), "inside pixel {inside:?}");
    }

    #[test]
    fn empty_scene_is_the_base() {
        let base = RgbaImage::from_pixel(10, 10, WHITE);
        assert_eq!(rasterize_scene(&base, &[]), base);
    }
}
