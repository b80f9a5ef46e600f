//! Pannable, zoomable SVG view.
//!
//! Holds at most one SVG item. Reloading replaces it and resets the view
//! transform. Painting goes through one of three drawing modes:
//!
//! - `DirectVector` rasterizes the visible viewport from the tree every frame.
//! - `Accelerated` uploads the whole scene once and lets the GPU scale it.
//! - `OffscreenBitmap` keeps a viewport-sized bitmap and blits it until the
//!   viewport, the content or the transform changes.

use super::raster;
use egui::{Color32, ColorImage, Pos2, Rect, Stroke, TextureHandle, TextureOptions, Vec2};
use resvg::usvg;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Wheel units per notch (eighths of a degree).
pub const WHEEL_UNITS_PER_NOTCH: f32 = 120.0;

/// egui scroll points per wheel notch on desktop.
const POINTS_PER_NOTCH: f32 = 40.0;

/// Highest power-of-two oversampling for the accelerated texture.
const MAX_ACCELERATED_LEVEL: i32 = 3;

const CHECKER_SIZE: f32 = 16.0;

/// Errors raised while loading SVG content.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid SVG in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: usvg::Error,
    },
}

/// Strategy used to paint the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingMode {
    DirectVector,
    #[default]
    Accelerated,
    OffscreenBitmap,
}

impl DrawingMode {
    pub const ALL: [DrawingMode; 3] = [
        DrawingMode::DirectVector,
        DrawingMode::Accelerated,
        DrawingMode::OffscreenBitmap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DrawingMode::DirectVector => "Native",
            DrawingMode::Accelerated => "OpenGL",
            DrawingMode::OffscreenBitmap => "Image",
        }
    }

    /// Mode actually used for painting. Accelerated falls back to direct
    /// drawing when the host has no GPU context.
    pub fn effective(self, accelerated_available: bool) -> Self {
        match self {
            DrawingMode::Accelerated if !accelerated_available => DrawingMode::DirectVector,
            mode => mode,
        }
    }
}

/// Observable view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Empty,
    Loaded,
}

/// Result of a `load` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file did not exist; nothing changed.
    Missing,
    Loaded,
}

/// Convert egui scroll points into wheel units.
pub fn wheel_units_from_points(points: f32) -> f32 {
    points * WHEEL_UNITS_PER_NOTCH / POINTS_PER_NOTCH
}

/// Multiplicative zoom for a wheel delta: 1.2 per two notches.
pub fn wheel_zoom_factor(delta: f32) -> f64 {
    1.2f64.powf(f64::from(delta) / 240.0)
}

/// Uniform scale plus pan offset, measured from the viewport centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset: Vec2,
}

impl ViewTransform {
    pub const IDENTITY: ViewTransform = ViewTransform {
        scale: 1.0,
        offset: Vec2::ZERO,
    };

    /// Scale by `factor` keeping the point at `anchor` (relative to the
    /// viewport centre) fixed on screen.
    pub fn zoom_at(&mut self, factor: f64, anchor: Vec2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.scale *= factor;
        self.offset = anchor - (anchor - self.offset) * factor as f32;
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Screen rectangle covered by content of `content_size` in `viewport`.
    pub fn content_rect(&self, viewport: Rect, content_size: Vec2) -> Rect {
        let size = content_size * self.scale as f32;
        Rect::from_min_size(viewport.center() + self.offset - size / 2.0, size)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The single displayed SVG document.
struct SvgItem {
    data: Vec<u8>,
    tree: usvg::Tree,
    size: Vec2,
    source: PathBuf,
    generation: u64,
}

/// Identity of an offscreen bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitmapKey {
    pub size: [u32; 2],
    pub generation: u64,
    pub transform: ViewTransform,
}

/// Bitmap reused across frames until its key changes.
#[derive(Default)]
pub struct BitmapCache {
    key: Option<BitmapKey>,
    texture: Option<TextureHandle>,
}

impl BitmapCache {
    /// Whether a bitmap for `key` has to be rendered.
    pub fn is_stale(&self, key: &BitmapKey) -> bool {
        self.key.as_ref() != Some(key)
    }

    fn invalidate(&mut self) {
        self.key = None;
    }
}

/// Texture holding the whole scene at a fixed oversampling level.
struct SceneTexture {
    generation: u64,
    level: i32,
    pixels_per_point: f32,
    texture: TextureHandle,
}

/// SVG view with pan, zoom and selectable drawing mode.
pub struct RenderView {
    mode: DrawingMode,
    item: Option<SvgItem>,
    transform: ViewTransform,
    next_generation: u64,
    high_quality_antialiasing: bool,
    show_background: bool,
    show_outline: bool,

    direct_texture: Option<TextureHandle>,
    scene_texture: Option<SceneTexture>,
    offscreen: BitmapCache,
}

impl RenderView {
    pub fn new(mode: DrawingMode) -> Self {
        Self {
            mode,
            item: None,
            transform: ViewTransform::IDENTITY,
            next_generation: 0,
            high_quality_antialiasing: true,
            show_background: false,
            show_outline: false,
            direct_texture: None,
            scene_texture: None,
            offscreen: BitmapCache::default(),
        }
    }

    pub fn with_high_quality_antialiasing(mut self, enabled: bool) -> Self {
        self.high_quality_antialiasing = enabled;
        self
    }

    pub fn drawing_mode(&self) -> DrawingMode {
        self.mode
    }

    /// Switch painting strategy. The loaded item is kept as is.
    pub fn set_drawing_mode(&mut self, mode: DrawingMode) {
        if self.mode != mode {
            log::debug!("Drawing mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.offscreen.invalidate();
        }
    }

    pub fn state(&self) -> ViewState {
        if self.item.is_some() {
            ViewState::Loaded
        } else {
            ViewState::Empty
        }
    }

    /// Number of items in the scene, never more than one.
    pub fn item_count(&self) -> usize {
        usize::from(self.item.is_some())
    }

    /// Raw SVG of the displayed item.
    pub fn current_svg(&self) -> Option<&[u8]> {
        self.item.as_ref().map(|item| item.data.as_slice())
    }

    pub fn generation(&self) -> Option<u64> {
        self.item.as_ref().map(|item| item.generation)
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn reset_transform(&mut self) {
        self.transform = ViewTransform::IDENTITY;
    }

    /// Natural size of the loaded content, zero when empty.
    pub fn size_hint(&self) -> Vec2 {
        self.item.as_ref().map_or(Vec2::ZERO, |item| item.size)
    }

    /// Replace the scene with the SVG at `svg_file`.
    ///
    /// A missing file is ignored. The file is parsed before anything is
    /// cleared, so a parse error leaves the previous item on screen.
    pub fn load(&mut self, svg_file: &Path) -> Result<LoadOutcome, ViewError> {
        if !svg_file.exists() {
            return Ok(LoadOutcome::Missing);
        }

        let data = std::fs::read(svg_file).map_err(|source| ViewError::Read {
            path: svg_file.to_path_buf(),
            source,
        })?;
        let tree = raster::parse_svg(&data, self.high_quality_antialiasing).map_err(|source| {
            ViewError::Parse {
                path: svg_file.to_path_buf(),
                source,
            }
        })?;

        let size = Vec2::new(tree.size().width(), tree.size().height());
        let generation = self.bump_generation();
        self.item = Some(SvgItem {
            data,
            tree,
            size,
            source: svg_file.to_path_buf(),
            generation,
        });
        self.reset_transform();
        log::debug!("Loaded {}x{} scene, generation {}", size.x, size.y, generation);

        Ok(LoadOutcome::Loaded)
    }

    /// Apply a wheel delta, anchored at the viewport centre.
    pub fn zoom(&mut self, wheel_delta: f32) {
        self.zoom_at(wheel_delta, Vec2::ZERO);
    }

    /// Apply a wheel delta, keeping the point at `anchor` (relative to the
    /// viewport centre) fixed.
    pub fn zoom_at(&mut self, wheel_delta: f32, anchor: Vec2) {
        self.transform.zoom_at(wheel_zoom_factor(wheel_delta), anchor);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.transform.pan(delta);
    }

    pub fn high_quality_antialiasing(&self) -> bool {
        self.high_quality_antialiasing
    }

    /// Toggle antialiasing. The current item is re-parsed in place; the
    /// transform is kept. On a parse error nothing changes.
    pub fn set_high_quality_antialiasing(&mut self, enabled: bool) -> Result<(), ViewError> {
        if self.high_quality_antialiasing == enabled {
            return Ok(());
        }

        if let Some(item) = &self.item {
            let tree = raster::parse_svg(&item.data, enabled).map_err(|source| ViewError::Parse {
                path: item.source.clone(),
                source,
            })?;
            let generation = self.bump_generation();
            if let Some(item) = &mut self.item {
                item.tree = tree;
                item.generation = generation;
            }
        }
        self.high_quality_antialiasing = enabled;
        Ok(())
    }

    pub fn show_background(&self) -> bool {
        self.show_background
    }

    pub fn set_show_background(&mut self, enabled: bool) {
        self.show_background = enabled;
    }

    pub fn show_outline(&self) -> bool {
        self.show_outline
    }

    pub fn set_show_outline(&mut self, enabled: bool) {
        self.show_outline = enabled;
    }

    fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Lay out, handle input for and paint the view in the remaining space.
    pub fn show(&mut self, ui: &mut egui::Ui, accelerated_available: bool) -> egui::Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        self.handle_input(ui, &response, rect);

        let painter = ui.painter_at(rect);
        if self.show_background {
            paint_checkerboard(&painter, rect);
        }

        let Some(content_size) = self.item.as_ref().map(|item| item.size) else {
            return response;
        };
        let content_rect = self.transform.content_rect(rect, content_size);
        let ctx = ui.ctx().clone();

        match self.mode.effective(accelerated_available) {
            DrawingMode::DirectVector => self.paint_direct(&ctx, &painter, rect, content_rect),
            DrawingMode::Accelerated => self.paint_accelerated(&ctx, &painter, content_rect),
            DrawingMode::OffscreenBitmap => self.paint_offscreen(&ctx, &painter, rect, content_rect),
        }

        if self.show_outline {
            paint_outline(&painter, content_rect);
        }

        if response.dragged() {
            response.on_hover_cursor(egui::CursorIcon::Grabbing)
        } else {
            response.on_hover_cursor(egui::CursorIcon::Grab)
        }
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect) {
        if response.dragged_by(egui::PointerButton::Primary) {
            self.pan(response.drag_delta());
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let anchor = ui
                    .input(|i| i.pointer.hover_pos())
                    .map_or(Vec2::ZERO, |pos| pos - rect.center());
                self.zoom_at(wheel_units_from_points(scroll), anchor);
            }
        }
    }

    /// Rasterize the visible part of the scene into a viewport-sized image.
    fn render_viewport(&self, pixels_per_point: f32, viewport: Rect, content_rect: Rect) -> Option<ColorImage> {
        let item = self.item.as_ref()?;
        let size = raster::pixel_size(viewport.width() * pixels_per_point, viewport.height() * pixels_per_point)?;
        let origin = (content_rect.min - viewport.min) * pixels_per_point;
        raster::rasterize(
            &item.tree,
            size,
            self.transform.scale as f32 * pixels_per_point,
            [origin.x, origin.y],
        )
    }

    fn paint_direct(&mut self, ctx: &egui::Context, painter: &egui::Painter, viewport: Rect, content_rect: Rect) {
        let Some(image) = self.render_viewport(ctx.pixels_per_point(), viewport, content_rect) else {
            return;
        };
        upload(ctx, &mut self.direct_texture, "svg-view-direct", image);
        if let Some(texture) = &self.direct_texture {
            paint_texture(painter, texture, viewport);
        }
    }

    fn paint_accelerated(&mut self, ctx: &egui::Context, painter: &egui::Painter, content_rect: Rect) {
        let Some(item) = self.item.as_ref() else {
            return;
        };
        let pixels_per_point = ctx.pixels_per_point();
        let level = oversampling_level(self.transform.scale);

        let fresh = self.scene_texture.as_ref().is_some_and(|t| {
            t.generation == item.generation && t.level == level && t.pixels_per_point == pixels_per_point
        });
        if !fresh {
            let mut scale = pixels_per_point * (1 << level) as f32;
            let largest = item.size.x.max(item.size.y) * scale;
            if largest > raster::MAX_TEXTURE_SIDE as f32 {
                scale *= raster::MAX_TEXTURE_SIDE as f32 / largest;
            }
            let image = raster::pixel_size(item.size.x * scale, item.size.y * scale)
                .and_then(|size| raster::rasterize(&item.tree, size, scale, [0.0, 0.0]));
            let Some(image) = image else {
                self.scene_texture = None;
                return;
            };
            log::debug!("Scene texture {:?} at level {}", image.size, level);
            let texture = ctx.load_texture("svg-view-accelerated", image, TextureOptions::LINEAR);
            self.scene_texture = Some(SceneTexture {
                generation: item.generation,
                level,
                pixels_per_point,
                texture,
            });
        }

        if let Some(scene) = &self.scene_texture {
            paint_texture(painter, &scene.texture, content_rect);
        }
    }

    fn paint_offscreen(&mut self, ctx: &egui::Context, painter: &egui::Painter, viewport: Rect, content_rect: Rect) {
        let Some(generation) = self.generation() else {
            return;
        };
        let pixels_per_point = ctx.pixels_per_point();
        let Some(size) =
            raster::pixel_size(viewport.width() * pixels_per_point, viewport.height() * pixels_per_point)
        else {
            return;
        };
        let key = BitmapKey {
            size,
            generation,
            transform: self.transform,
        };

        if self.offscreen.is_stale(&key) {
            if let Some(image) = self.render_viewport(pixels_per_point, viewport, content_rect) {
                log::debug!("Offscreen bitmap rebuilt at {:?}", size);
                upload(ctx, &mut self.offscreen.texture, "svg-view-offscreen", image);
                self.offscreen.key = Some(key);
            }
        }

        if let Some(texture) = &self.offscreen.texture {
            paint_texture(painter, texture, viewport);
        }
    }
}

impl Default for RenderView {
    fn default() -> Self {
        Self::new(DrawingMode::default())
    }
}

/// Power-of-two oversampling so zooming in stays sharp without
/// re-rasterizing on every wheel step.
fn oversampling_level(scale: f64) -> i32 {
    (scale.log2().ceil() as i32).clamp(0, MAX_ACCELERATED_LEVEL)
}

fn upload(ctx: &egui::Context, slot: &mut Option<TextureHandle>, name: &str, image: ColorImage) {
    match slot {
        Some(texture) => texture.set(image, TextureOptions::LINEAR),
        None => *slot = Some(ctx.load_texture(name, image, TextureOptions::LINEAR)),
    }
}

fn paint_texture(painter: &egui::Painter, texture: &TextureHandle, rect: Rect) {
    let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
    painter.image(texture.id(), rect, uv, Color32::WHITE);
}

fn paint_checkerboard(painter: &egui::Painter, rect: Rect) {
    let light = Color32::from_gray(200);
    let dark = Color32::from_gray(160);
    painter.rect_filled(rect, 0.0, light);

    let columns = (rect.width() / CHECKER_SIZE).ceil() as usize;
    let rows = (rect.height() / CHECKER_SIZE).ceil() as usize;
    for row in 0..rows {
        for column in (row % 2..columns).step_by(2) {
            let min = rect.min + Vec2::new(column as f32, row as f32) * CHECKER_SIZE;
            let tile = Rect::from_min_size(min, Vec2::splat(CHECKER_SIZE)).intersect(rect);
            painter.rect_filled(tile, 0.0, dark);
        }
    }
}

fn paint_outline(painter: &egui::Painter, rect: Rect) {
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ];
    painter.extend(egui::Shape::dashed_line(
        &corners,
        Stroke::new(1.0, Color32::from_gray(128)),
        4.0,
        4.0,
    ));
}
