//! Charset handling for dot sources.
//!
//! Graphviz expects UTF-8 input, so a source saved in another charset is
//! decoded up front and the layout command always receives UTF-8 text.

use encoding_rs::Encoding;
use std::path::Path;

/// Decodes dot sources from a fixed charset into UTF-8.
///
/// A byte-order mark in the file overrides the configured charset.
#[derive(Debug, Clone, Copy)]
pub struct SourceDecoder {
    encoding: &'static Encoding,
}

impl SourceDecoder {
    /// Decoder for a WHATWG charset label. Unknown labels fall back to UTF-8.
    pub fn for_label(label: &str) -> Self {
        let encoding = Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
            log::warn!("Unknown source encoding '{}', using UTF-8", label);
            encoding_rs::UTF_8
        });
        Self { encoding }
    }

    /// Canonical name of the charset in use.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn decode(&self, data: &[u8]) -> String {
        let (text, used, had_errors) = self.encoding.decode(data);
        if had_errors {
            log::warn!("Dot source is not valid {}; bad bytes were replaced", used.name());
        }
        text.into_owned()
    }

    /// Read a whole dot file and decode it.
    pub fn read_file(&self, path: &Path) -> std::io::Result<String> {
        let data = std::fs::read(path)?;
        Ok(self.decode(&data))
    }
}

impl Default for SourceDecoder {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_passthrough() {
        let decoder = SourceDecoder::default();
        assert_eq!(decoder.decode("digraph { a -> b }".as_bytes()), "digraph { a -> b }");
    }

    #[test]
    fn test_latin1_label() {
        // "café" in ISO-8859-1
        let decoder = SourceDecoder::for_label("ISO-8859-1");
        assert_eq!(decoder.decode(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_unknown_label_falls_back_to_utf8() {
        let decoder = SourceDecoder::for_label("INVALID_ENCODING_LABEL");
        assert_eq!(decoder.name(), "UTF-8");
        assert_eq!(decoder.decode(b"graph {}"), "graph {}");
    }

    #[test]
    fn test_bom_overrides_label() {
        let decoder = SourceDecoder::for_label("ISO-8859-1");
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice("graph { \"é\" }".as_bytes());
        assert_eq!(decoder.decode(&data), "graph { \"é\" }");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let decoder = SourceDecoder::default();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.dot");
        std::fs::write(&path, "digraph { x }").unwrap();
        assert_eq!(SourceDecoder::default().read_file(&path).unwrap(), "digraph { x }");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SourceDecoder::default().read_file(&dir.path().join("nope.dot")).is_err());
    }
}
