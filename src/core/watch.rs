//! Watch loop that re-renders the open dot file on a fixed interval.
//!
//! Every due tick reads the whole file, runs it through the layout service and
//! overwrites the rendered output. There is no change detection. The first
//! failure disables the loop; it stays off until the user opens or reloads a
//! file.

use super::layout::{LayoutError, LayoutService};
use super::output::RenderedOutput;
use crate::utils::encoding::SourceDecoder;
use crate::utils::file_helper;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors surfaced by the watch loop.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Could not open file '{}'.", .0.display())]
    NotFound(PathBuf),
    #[error("No dot file is open")]
    NoTarget,
    #[error("Could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Could not write rendered SVG: {0}")]
    Output(#[source] std::io::Error),
}

/// Enabled flag plus the fixed poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchState {
    pub enabled: bool,
    pub interval: Duration,
}

/// Periodically regenerates the rendered output from the watched path.
pub struct WatchLoop<L> {
    layout: L,
    output: RenderedOutput,
    state: WatchState,
    path: Option<PathBuf>,
    decoder: SourceDecoder,
    last_render: Option<Instant>,
}

impl<L: LayoutService> WatchLoop<L> {
    pub fn new(layout: L, output: RenderedOutput, interval: Duration) -> Self {
        Self {
            layout,
            output,
            state: WatchState {
                enabled: false,
                interval,
            },
            path: None,
            decoder: SourceDecoder::default(),
            last_render: None,
        }
    }

    /// Charset the dot source is stored in.
    pub fn with_source_encoding(mut self, label: &str) -> Self {
        self.decoder = SourceDecoder::for_label(label);
        self
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn watched_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start watching `path` and render it right away.
    ///
    /// A path that is not an existing file is rejected without rendering and
    /// leaves the loop disabled.
    pub fn enable(&mut self, path: impl Into<PathBuf>) -> Result<PathBuf, WatchError> {
        let path = path.into();
        if !file_helper::file_exists(&path) {
            self.state.enabled = false;
            return Err(WatchError::NotFound(path));
        }

        log::info!("Watching {}", path.display());
        self.path = Some(path);
        self.state.enabled = true;
        self.render_now()
    }

    /// Resume watching the current path.
    pub fn reload(&mut self) -> Result<PathBuf, WatchError> {
        match self.path.clone() {
            Some(path) => self.enable(path),
            None => Err(WatchError::NoTarget),
        }
    }

    pub fn disable(&mut self) {
        if self.state.enabled {
            log::debug!("Watch disabled");
        }
        self.state.enabled = false;
    }

    /// Run one timer tick.
    ///
    /// Returns `None` when the loop is disabled or the interval has not yet
    /// elapsed since the previous render finished.
    pub fn tick(&mut self, now: Instant) -> Option<Result<PathBuf, WatchError>> {
        if !self.state.enabled {
            return None;
        }
        if let Some(last) = self.last_render {
            if now.saturating_duration_since(last) < self.state.interval {
                return None;
            }
        }
        log::debug!("Watch tick");
        Some(self.render_now())
    }

    /// Delay until the next tick is due, or `None` when disabled.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        if !self.state.enabled {
            return None;
        }
        let due = match self.last_render {
            Some(last) => last + self.state.interval,
            None => return Some(Duration::ZERO),
        };
        Some(due.saturating_duration_since(now))
    }

    /// Render the watched file into the output, disabling the loop on failure.
    pub fn render_now(&mut self) -> Result<PathBuf, WatchError> {
        let result = self.render_once();
        // The interval is measured from the end of the render so ticks never overlap.
        self.last_render = Some(Instant::now());
        if let Err(e) = &result {
            log::warn!("Render failed, watch disabled: {}", e);
            self.state.enabled = false;
        }
        result
    }

    fn render_once(&self) -> Result<PathBuf, WatchError> {
        let path = self.path.as_deref().ok_or(WatchError::NoTarget)?;

        let source = self.decoder.read_file(path).map_err(|source| {
            WatchError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let svg = self.layout.render(&source)?;
        self.output.overwrite(&svg).map_err(WatchError::Output)?;

        Ok(self.output.path().to_path_buf())
    }
}
