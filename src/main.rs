//! Graphviz Viewer - a desktop viewer for Graphviz dot files.
//!
//! Watches a dot file, re-runs Graphviz on it twice a second and shows the
//! resulting SVG in a pannable, zoomable canvas.

// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod config;
mod core;
mod ui;
mod utils;

use app::GraphvizViewerApp;
use clap::Parser;
use config::ConfigManager;
use eframe::egui;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "graphviz-viewer", version, about = "Live viewer for Graphviz dot files")]
struct Cli {
    /// Dot file to open, relative to the working directory
    dot_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let working_directory = std::env::current_dir()?;
    let initial_dot_file = cli
        .dot_file
        .map(|path| utils::file_helper::resolve_against(&working_directory, &path));

    let config_manager = ConfigManager::new();
    let config = config_manager.load();
    log::debug!("Config file: {}", config_manager.get_config_file_path().display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Graphviz Viewer")
            .with_inner_size([250.0, 150.0])
            .with_min_inner_size([200.0, 120.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Graphviz Viewer",
        options,
        Box::new(move |cc| Ok(Box::new(GraphvizViewerApp::new(cc, config, initial_dot_file)?))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}
