//! Error dialogs.
//!
//! A blocking dialog disables the rest of the window until dismissed; a
//! non-blocking one floats over it.

use super::theme;

/// Whether the dialog locks out the rest of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Blocking,
    NonBlocking,
}

/// A single error message waiting to be acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDialog {
    pub title: String,
    pub message: String,
    pub modality: Modality,
}

impl ErrorDialog {
    pub fn blocking(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            modality: Modality::Blocking,
        }
    }

    pub fn non_blocking(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            modality: Modality::NonBlocking,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.modality == Modality::Blocking
    }

    /// Draw the dialog. Returns true once the user dismissed it.
    pub fn show(&self, ctx: &egui::Context) -> bool {
        let mut dismissed = false;

        egui::Window::new(self.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.set_max_width(420.0);
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("⚠").size(24.0).color(theme::error_color()));
                    ui.label(self.message.as_str());
                });
                ui.add_space(8.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if self.is_blocking() && ctx.input(|i| i.key_pressed(egui::Key::Escape) || i.key_pressed(egui::Key::Enter)) {
            dismissed = true;
        }

        dismissed
    }
}
