use crate::config::Config;
use crate::core::layout::{GraphvizCli, LayoutService};
use crate::core::output::RenderedOutput;
use crate::core::view::{DrawingMode, LoadOutcome, RenderView, ViewState, WHEEL_UNITS_PER_NOTCH};
use crate::core::watch::{WatchError, WatchLoop};
use crate::ui::dialogs::ErrorDialog;
use crate::ui::theme;
use crate::utils::file_helper;
use anyhow::Context as _;
use eframe::egui;
use rfd::FileDialog;
use std::path::{Path, PathBuf};
use std::time::Instant;

const APP_TITLE: &str = "Graphviz Viewer";

const OPEN_SHORTCUT: egui::KeyboardShortcut =
    egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::O);
const EXIT_SHORTCUT: egui::KeyboardShortcut =
    egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Q);
const RELOAD_SHORTCUT: egui::KeyboardShortcut =
    egui::KeyboardShortcut::new(egui::Modifiers::NONE, egui::Key::F5);
const ACTUAL_SIZE_SHORTCUT: egui::KeyboardShortcut =
    egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Num0);

/// Window size that fits `content` plus the margin and the menu bar.
pub fn fit_window_size(content: egui::Vec2, margin: f32, menu_bar_height: f32) -> egui::Vec2 {
    egui::vec2(content.x + margin, content.y + margin + menu_bar_height)
}

/// Main application state.
pub struct GraphvizViewerApp<L = GraphvizCli> {
    config: Config,
    watch: WatchLoop<L>,
    view: RenderView,

    dialog: Option<ErrorDialog>,
    status: String,
    status_is_error: bool,

    menu_bar_height: f32,
    pending_fit: bool,
    pending_title: Option<String>,
}

impl GraphvizViewerApp<GraphvizCli> {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: Config,
        initial_dot_file: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        theme::apply_dracula_theme(&cc.egui_ctx);

        let layout = GraphvizCli::new(config.layout_command.clone())
            .with_engine(config.layout_engine.clone());
        log::info!("Layout command: {}", layout.command());
        let mut app = Self::with_layout(config, layout)?;

        if let Some(path) = initial_dot_file {
            app.open_path(path);
        }

        Ok(app)
    }
}

impl<L: LayoutService> GraphvizViewerApp<L> {
    /// Build the app around any layout service.
    pub fn with_layout(config: Config, layout: L) -> anyhow::Result<Self> {
        let output = RenderedOutput::create().context("creating the rendered SVG file")?;
        let watch = WatchLoop::new(layout, output, config.poll_interval())
            .with_source_encoding(&config.source_encoding);

        let mut view = RenderView::new(config.drawing_mode)
            .with_high_quality_antialiasing(config.high_quality_antialiasing);
        view.set_show_background(config.show_background);
        view.set_show_outline(config.show_outline);

        Ok(Self {
            config,
            watch,
            view,
            dialog: None,
            status: "Ready".to_string(),
            status_is_error: false,
            menu_bar_height: 0.0,
            pending_fit: false,
            pending_title: None,
        })
    }

    /// Start watching `path`, rendering it immediately.
    pub fn open_path(&mut self, path: PathBuf) {
        log::info!("Opening {}", path.display());
        let result = self.watch.enable(path);
        self.handle_render(result);
    }

    fn browse_file(&mut self) {
        if let Some(path) = FileDialog::new()
            .set_title("Open Graphviz File")
            .add_filter("Graphviz Files", &["dot"])
            .add_filter("All Files", &["*"])
            .pick_file()
        {
            self.open_path(path);
        }
    }

    fn reload(&mut self) {
        let result = self.watch.reload();
        self.handle_render(result);
    }

    /// Run the watch timer if a tick is due.
    fn poll_watch(&mut self, now: Instant) {
        if let Some(result) = self.watch.tick(now) {
            self.handle_render(result);
        }
    }

    fn handle_render(&mut self, result: Result<PathBuf, WatchError>) {
        match result {
            Ok(output) => self.show_output(&output),
            Err(e @ WatchError::NotFound(_)) => {
                self.set_error_status(e.to_string());
                self.dialog = Some(ErrorDialog::blocking("Open Dot File", e.to_string()));
            }
            Err(e) => {
                self.set_error_status(format!("Watch stopped: {}", e));
                self.dialog = Some(ErrorDialog::non_blocking("Render Failed", e.to_string()));
            }
        }
    }

    fn show_output(&mut self, output: &Path) {
        match self.view.load(output) {
            Ok(LoadOutcome::Loaded) => {
                self.pending_fit = true;
                let name = self
                    .watch
                    .watched_path()
                    .and_then(file_helper::get_file_name)
                    .unwrap_or_default();
                // Title follows the file on screen, however it got there
                self.pending_title = Some(format!("{} - {}", APP_TITLE, name));
                self.status = format!("Rendered {} at {}", name, chrono::Local::now().format("%H:%M:%S"));
                self.status_is_error = false;
            }
            Ok(LoadOutcome::Missing) => {}
            Err(e) => {
                log::warn!("{}", e);
                self.watch.disable();
                self.set_error_status(format!("Watch stopped: {}", e));
                self.dialog = Some(ErrorDialog::non_blocking("Render Failed", e.to_string()));
            }
        }
    }

    fn set_error_status(&mut self, message: String) {
        self.status = message;
        self.status_is_error = true;
    }

    fn is_blocked(&self) -> bool {
        self.dialog.as_ref().is_some_and(ErrorDialog::is_blocking)
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.is_blocked() {
            return;
        }
        if ctx.input_mut(|i| i.consume_shortcut(&OPEN_SHORTCUT)) {
            self.browse_file();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&RELOAD_SHORTCUT)) && self.watch.watched_path().is_some() {
            self.reload();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&ACTUAL_SIZE_SHORTCUT)) {
            self.view.reset_transform();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&EXIT_SHORTCUT)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn render_menu(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                let open = egui::Button::new("📁 Open...").shortcut_text(ctx.format_shortcut(&OPEN_SHORTCUT));
                if ui.add(open).on_hover_text("Open GraphViz dot file").clicked() {
                    ui.close_menu();
                    self.browse_file();
                }

                let reload = egui::Button::new("🔄 Reload").shortcut_text(ctx.format_shortcut(&RELOAD_SHORTCUT));
                if ui
                    .add_enabled(self.watch.watched_path().is_some(), reload)
                    .on_hover_text("Render the open file again and resume watching")
                    .clicked()
                {
                    ui.close_menu();
                    self.reload();
                }

                ui.separator();

                let exit = egui::Button::new("Exit").shortcut_text(ctx.format_shortcut(&EXIT_SHORTCUT));
                if ui.add(exit).on_hover_text("Exit Graphviz Viewer").clicked() {
                    ui.close_menu();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                ui.label(egui::RichText::new("Renderer").color(theme::dim_color()));
                let mut mode = self.view.drawing_mode();
                for candidate in DrawingMode::ALL {
                    ui.radio_value(&mut mode, candidate, candidate.label());
                }
                self.view.set_drawing_mode(mode);

                ui.separator();

                let mut background = self.view.show_background();
                if ui.checkbox(&mut background, "Background").changed() {
                    self.view.set_show_background(background);
                }
                let mut outline = self.view.show_outline();
                if ui.checkbox(&mut outline, "Outline").changed() {
                    self.view.set_show_outline(outline);
                }
                let mut antialiasing = self.view.high_quality_antialiasing();
                if ui.checkbox(&mut antialiasing, "High Quality Antialiasing").changed() {
                    if let Err(e) = self.view.set_high_quality_antialiasing(antialiasing) {
                        self.set_error_status(e.to_string());
                    }
                }

                ui.separator();

                if ui.button("Zoom In").clicked() {
                    self.view.zoom(WHEEL_UNITS_PER_NOTCH);
                }
                if ui.button("Zoom Out").clicked() {
                    self.view.zoom(-WHEEL_UNITS_PER_NOTCH);
                }

                let actual = egui::Button::new("Actual Size").shortcut_text(ctx.format_shortcut(&ACTUAL_SIZE_SHORTCUT));
                if ui.add(actual).clicked() {
                    ui.close_menu();
                    self.view.reset_transform();
                }
            });
        });
    }

    fn render_status_bar(&mut self, ui: &mut egui::Ui, accelerated_available: bool) {
        ui.horizontal(|ui| {
            if self.status_is_error {
                ui.colored_label(theme::error_color(), self.status.as_str());
            } else {
                ui.label(self.status.as_str());
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{:.0}%", self.view.transform().scale * 100.0));
                ui.separator();

                let effective = self.view.drawing_mode().effective(accelerated_available);
                ui.label(effective.label());
                ui.separator();

                let watch = self.watch.state();
                if watch.enabled {
                    ui.colored_label(
                        theme::success_color(),
                        format!("● Watching every {} ms", watch.interval.as_millis()),
                    );
                } else {
                    ui.colored_label(theme::dim_color(), "○ Idle");
                }
            });
        });
    }
}

impl<L: LayoutService> eframe::App for GraphvizViewerApp<L> {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let accelerated_available = frame.gl().is_some();
        let blocked = self.is_blocked();

        self.handle_shortcuts(ctx);
        self.poll_watch(Instant::now());

        // Menu bar
        let menu = egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            ui.add_enabled_ui(!blocked, |ui| self.render_menu(ui));
        });
        self.menu_bar_height = menu.response.rect.height();

        // Bottom status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.render_status_bar(ui, accelerated_available);
        });

        // Canvas
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(ctx.style().visuals.extreme_bg_color))
            .show(ctx, |ui| {
                ui.add_enabled_ui(!blocked, |ui| {
                    if self.view.state() == ViewState::Empty {
                        ui.centered_and_justified(|ui| {
                            ui.label(
                                egui::RichText::new("Open a Graphviz dot file (File > Open...)")
                                    .color(theme::dim_color()),
                            );
                        });
                    } else {
                        self.view.show(ui, accelerated_available);
                    }
                });
            });

        if let Some(dialog) = &self.dialog {
            if dialog.show(ctx) {
                self.dialog = None;
            }
        }

        if let Some(title) = self.pending_title.take() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
        }

        // Auto-fit the window to the graph after every reload
        if std::mem::take(&mut self.pending_fit) {
            let size = fit_window_size(self.view.size_hint(), self.config.fit_margin, self.menu_bar_height);
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
        }

        if let Some(delay) = self.watch.time_until_next_tick(Instant::now()) {
            ctx.request_repaint_after(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::LayoutError;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Layout double: `size W H` renders a WxH rectangle, anything else fails.
    #[derive(Clone, Default)]
    struct FakeLayout {
        calls: Rc<Cell<usize>>,
    }

    impl LayoutService for FakeLayout {
        fn render(&self, source: &str) -> Result<Vec<u8>, LayoutError> {
            self.calls.set(self.calls.get() + 1);
            let parts: Vec<&str> = source.split_whitespace().collect();
            match parts.as_slice() {
                ["size", w, h] => Ok(format!(
                    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><rect width="{w}" height="{h}"/></svg>"#
                )
                .into_bytes()),
                _ => Err(LayoutError::Failed {
                    code: Some(1),
                    stderr: "Error: syntax error in line 1".to_string(),
                }),
            }
        }
    }

    fn app(layout: FakeLayout) -> GraphvizViewerApp<FakeLayout> {
        GraphvizViewerApp::with_layout(Config::default(), layout).unwrap()
    }

    fn dot_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_fit_window_size() {
        assert_eq!(
            fit_window_size(egui::vec2(300.0, 200.0), 80.0, 24.0),
            egui::vec2(380.0, 304.0)
        );
        assert_eq!(
            fit_window_size(egui::vec2(54.5, 1000.0), 80.0, 20.0),
            egui::vec2(134.5, 1100.0)
        );
        // Degenerate empty graph
        assert_eq!(fit_window_size(egui::Vec2::ZERO, 80.0, 24.0), egui::vec2(80.0, 104.0));
    }

    #[test]
    fn test_open_renders_and_schedules_fit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dot_file(dir.path(), "a.dot", "size 300 200");

        let mut app = app(FakeLayout::default());
        app.open_path(path);

        assert_eq!(app.view.state(), ViewState::Loaded);
        assert_eq!(app.view.size_hint(), egui::vec2(300.0, 200.0));
        assert!(app.pending_fit);
        assert!(app.watch.is_enabled());
        assert!(app.dialog.is_none());
        assert_eq!(app.pending_title.as_deref(), Some("Graphviz Viewer - a.dot"));
    }

    #[test]
    fn test_open_missing_file_shows_blocking_dialog() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FakeLayout::default();
        let mut app = app(layout.clone());

        app.open_path(dir.path().join("missing.dot"));

        assert!(!app.watch.is_enabled());
        assert_eq!(layout.calls.get(), 0);
        assert!(app.is_blocked());
        let dialog = app.dialog.as_ref().unwrap();
        assert!(dialog.message.contains("missing.dot"));
        assert_eq!(app.view.state(), ViewState::Empty);
    }

    #[test]
    fn test_render_failure_keeps_last_good_frame() {
        let dir = tempfile::tempdir().unwrap();
        let good = dot_file(dir.path(), "a.dot", "size 40 30");
        let bad = dot_file(dir.path(), "b.dot", "digraph {");

        let layout = FakeLayout::default();
        let mut app = app(layout.clone());
        app.open_path(good);
        let shown = app.view.current_svg().unwrap().to_vec();

        app.open_path(bad);
        assert!(!app.watch.is_enabled());
        assert!(!app.is_blocked());
        assert_eq!(app.dialog.as_ref().unwrap().message, "Error: syntax error in line 1");
        assert_eq!(app.view.current_svg(), Some(shown.as_slice()));
        assert_eq!(app.view.item_count(), 1);

        let calls = layout.calls.get();
        app.poll_watch(Instant::now() + Duration::from_secs(5));
        app.poll_watch(Instant::now() + Duration::from_secs(10));
        assert_eq!(layout.calls.get(), calls);
    }

    #[test]
    fn test_tick_reloads_and_refits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dot_file(dir.path(), "a.dot", "size 10 10");

        let mut app = app(FakeLayout::default());
        app.open_path(path.clone());
        app.pending_fit = false;
        app.view.zoom(240.0);

        std::fs::write(&path, "size 64 48").unwrap();
        app.poll_watch(Instant::now() + Duration::from_secs(1));

        assert_eq!(app.view.size_hint(), egui::vec2(64.0, 48.0));
        assert_eq!(app.view.transform().scale, 1.0);
        assert!(app.pending_fit);
    }

    #[test]
    fn test_title_follows_reloaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dot_file(dir.path(), "a.dot", "size 10 10");
        let bad = dot_file(dir.path(), "b.dot", "digraph {");

        let mut app = app(FakeLayout::default());
        app.open_path(good);
        assert_eq!(app.pending_title.take().as_deref(), Some("Graphviz Viewer - a.dot"));

        app.open_path(bad.clone());
        assert!(app.pending_title.is_none());

        std::fs::write(&bad, "size 20 20").unwrap();
        app.reload();
        assert_eq!(app.watch.watched_path(), Some(bad.as_path()));
        assert_eq!(app.pending_title.as_deref(), Some("Graphviz Viewer - b.dot"));
    }

    #[test]
    fn test_antialiasing_from_config() {
        let config = Config {
            high_quality_antialiasing: false,
            ..Config::default()
        };
        let app = GraphvizViewerApp::with_layout(config, FakeLayout::default()).unwrap();
        assert!(!app.view.high_quality_antialiasing());
    }

    #[test]
    fn test_reload_after_fix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dot_file(dir.path(), "a.dot", "broken");

        let mut app = app(FakeLayout::default());
        app.open_path(path.clone());
        assert!(!app.watch.is_enabled());
        assert!(app.status_is_error);

        std::fs::write(&path, "size 5 5").unwrap();
        app.reload();
        assert!(app.watch.is_enabled());
        assert!(!app.status_is_error);
        assert_eq!(app.view.state(), ViewState::Loaded);
    }
}
