//! The rendered SVG artifact.
//!
//! A single temporary `.svg` file is created when the viewer starts and is
//! overwritten in place on every successful render. Dropping the value
//! deletes the file.

use std::path::Path;
use tempfile::NamedTempFile;

/// Process-owned temporary file holding the latest SVG rendering.
pub struct RenderedOutput {
    file: NamedTempFile,
}

impl RenderedOutput {
    /// Create the empty backing file.
    pub fn create() -> std::io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("graphviz-viewer-")
            .suffix(".svg")
            .tempfile()?;
        log::debug!("Rendered output at {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Replace the file contents with a new rendering.
    pub fn overwrite(&self, svg: &[u8]) -> std::io::Result<()> {
        std::fs::write(self.file.path(), svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_empty_with_svg_suffix() {
        let output = RenderedOutput::create().unwrap();
        assert!(output.path().exists());
        assert_eq!(output.path().extension().and_then(|e| e.to_str()), Some("svg"));
        assert_eq!(std::fs::read(output.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_overwrite_keeps_path_and_replaces_content() {
        let output = RenderedOutput::create().unwrap();
        let path = output.path().to_path_buf();

        output.overwrite(b"<svg>first, longer content</svg>").unwrap();
        output.overwrite(b"<svg/>").unwrap();

        assert_eq!(output.path(), path);
        assert_eq!(std::fs::read(&path).unwrap(), b"<svg/>");
    }

    #[test]
    fn test_deleted_on_drop() {
        let output = RenderedOutput::create().unwrap();
        let path = output.path().to_path_buf();
        drop(output);
        assert!(!path.exists());
    }
}
