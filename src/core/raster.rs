//! SVG parsing and rasterization with resvg.
//!
//! Produces `egui::ColorImage`s that the view uploads as textures.

use egui::ColorImage;
use once_cell::sync::Lazy;
use resvg::{tiny_skia, usvg};
use std::sync::Arc;

/// Largest texture side we ask the GPU for.
pub const MAX_TEXTURE_SIDE: u32 = 8192;

/// System fonts, loaded once and shared by every parse.
static FONTDB: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    log::debug!("Loaded {} font faces from system", db.len());
    Arc::new(db)
});

/// Parse SVG bytes into a render tree.
///
/// `high_quality` selects geometric-precision antialiasing; otherwise shapes
/// are drawn with crisp edges.
pub fn parse_svg(data: &[u8], high_quality: bool) -> Result<usvg::Tree, usvg::Error> {
    let options = usvg::Options {
        fontdb: FONTDB.clone(),
        shape_rendering: if high_quality {
            usvg::ShapeRendering::GeometricPrecision
        } else {
            usvg::ShapeRendering::CrispEdges
        },
        ..usvg::Options::default()
    };
    usvg::Tree::from_data(data, &options)
}

/// Pixel size for a logical size, clamped to what a texture can hold.
pub fn pixel_size(width: f32, height: f32) -> Option<[u32; 2]> {
    if !(width.is_finite() && height.is_finite()) {
        return None;
    }
    let w = width.ceil().clamp(0.0, MAX_TEXTURE_SIDE as f32) as u32;
    let h = height.ceil().clamp(0.0, MAX_TEXTURE_SIDE as f32) as u32;
    if w == 0 || h == 0 {
        return None;
    }
    Some([w, h])
}

/// Rasterize `tree` into an image of `size` pixels.
///
/// `scale` and `translate` map tree coordinates to image pixels. Returns
/// `None` for an empty image.
pub fn rasterize(
    tree: &usvg::Tree,
    size: [u32; 2],
    scale: f32,
    translate: [f32; 2],
) -> Option<ColorImage> {
    let mut pixmap = tiny_skia::Pixmap::new(size[0], size[1])?;
    let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, translate[0], translate[1]);
    resvg::render(tree, transform, &mut pixmap.as_mut());

    Some(ColorImage::from_rgba_premultiplied(
        [size[0] as usize, size[1] as usize],
        pixmap.data(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">
        <rect x="0" y="0" width="20" height="10" fill="red"/>
    </svg>"#;

    #[test]
    fn test_parse_reports_natural_size() {
        let tree = parse_svg(RED_SQUARE.as_bytes(), true).unwrap();
        assert_eq!(tree.size().width(), 20.0);
        assert_eq!(tree.size().height(), 10.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_svg(b"digraph { a -> b }", true).is_err());
    }

    #[test]
    fn test_pixel_size() {
        assert_eq!(pixel_size(10.2, 3.0), Some([11, 3]));
        assert_eq!(pixel_size(0.0, 3.0), None);
        assert_eq!(pixel_size(f32::NAN, 3.0), None);
        assert_eq!(pixel_size(1.0e6, 1.0), Some([MAX_TEXTURE_SIDE, 1]));
    }

    #[test]
    fn test_rasterize_fills_pixels() {
        let tree = parse_svg(RED_SQUARE.as_bytes(), true).unwrap();
        let image = rasterize(&tree, [20, 10], 1.0, [0.0, 0.0]).unwrap();
        assert_eq!(image.size, [20, 10]);
        let center = image.pixels[5 * 20 + 10];
        assert_eq!(center.r(), 255);
        assert_eq!(center.a(), 255);
    }

    #[test]
    fn test_rasterize_with_transform() {
        let tree = parse_svg(RED_SQUARE.as_bytes(), true).unwrap();
        // Shifted right by 30px in a 40px wide image: the left half stays empty
        let image = rasterize(&tree, [40, 10], 0.5, [30.0, 0.0]).unwrap();
        assert_eq!(image.pixels[2 * 40 + 5].a(), 0);
        assert_eq!(image.pixels[2 * 40 + 35].a(), 255);
    }
}
