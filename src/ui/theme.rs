//! Dracula chrome for the viewer.
//!
//! Menus, status bar and dialogs stay muted so the rendered graph is the
//! brightest thing on screen. The canvas behind the graph is darker than the
//! panels to frame it.

use egui::style::WidgetVisuals;
use egui::{Color32, Rounding, Stroke, Visuals};

const BACKGROUND: Color32 = Color32::from_rgb(40, 42, 54); // #282a36
const CANVAS: Color32 = Color32::from_rgb(30, 31, 41);
const CURRENT_LINE: Color32 = Color32::from_rgb(68, 71, 90); // #44475a
const FOREGROUND: Color32 = Color32::from_rgb(248, 248, 242); // #f8f8f2
const COMMENT: Color32 = Color32::from_rgb(98, 114, 164); // #6272a4
const CYAN: Color32 = Color32::from_rgb(139, 233, 253); // #8be9fd
const GREEN: Color32 = Color32::from_rgb(80, 250, 123); // #50fa7b
const PINK: Color32 = Color32::from_rgb(255, 121, 198); // #ff79c6
const PURPLE: Color32 = Color32::from_rgb(189, 147, 249); // #bd93f9
const RED: Color32 = Color32::from_rgb(255, 85, 85); // #ff5555

const WIDGET_ROUNDING: f32 = 4.0;

fn paint(widget: &mut WidgetVisuals, fill: Color32, text: Color32) {
    widget.bg_fill = fill;
    widget.weak_bg_fill = fill;
    widget.fg_stroke = Stroke::new(1.0, text);
    widget.rounding = Rounding::same(WIDGET_ROUNDING);
}

/// Visuals for menus, the status bar and dialogs.
pub fn dracula_visuals() -> Visuals {
    let mut visuals = Visuals::dark();

    paint(&mut visuals.widgets.noninteractive, BACKGROUND, FOREGROUND);
    paint(&mut visuals.widgets.inactive, CURRENT_LINE, FOREGROUND);
    paint(&mut visuals.widgets.hovered, COMMENT, Color32::WHITE);
    // Pressed menu entries and checked radios
    paint(&mut visuals.widgets.active, PURPLE, BACKGROUND);
    paint(&mut visuals.widgets.open, CURRENT_LINE, FOREGROUND);

    visuals.selection.bg_fill = PINK;
    visuals.selection.stroke = Stroke::new(1.0, BACKGROUND);

    visuals.window_fill = BACKGROUND;
    visuals.panel_fill = BACKGROUND;
    visuals.extreme_bg_color = CANVAS;
    visuals.hyperlink_color = CYAN;
    visuals.error_fg_color = RED;
    visuals.warn_fg_color = PINK;

    visuals
}

pub fn apply_dracula_theme(ctx: &egui::Context) {
    ctx.set_visuals(dracula_visuals());
}

/// Color for the "watching" indicator.
pub fn success_color() -> Color32 {
    GREEN
}

pub fn error_color() -> Color32 {
    RED
}

/// Secondary status text and hints.
pub fn dim_color() -> Color32 {
    COMMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_darker_than_panels() {
        let visuals = dracula_visuals();
        assert!(visuals.dark_mode);
        assert_eq!(visuals.panel_fill, BACKGROUND);
        assert_eq!(visuals.extreme_bg_color, CANVAS);
        let luma = |c: Color32| u32::from(c.r()) + u32::from(c.g()) + u32::from(c.b());
        assert!(luma(visuals.extreme_bg_color) < luma(visuals.panel_fill));
    }

    #[test]
    fn test_errors_use_red() {
        assert_eq!(dracula_visuals().error_fg_color, error_color());
    }
}
