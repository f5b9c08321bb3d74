//! Uploaded file → normalized text.

use crate::error::LoadError;
use crate::models::{Document, IndexingConfig};
use crate::utils::file::{
    calculate_checksum, extension_of, is_binary_extension, is_markup_extension, looks_binary,
};
use crate::utils::text::{normalize_text, strip_markup};

/// Reads uploaded bytes into a [`Document`] with normalized content.
#[derive(Debug, Clone)]
pub struct FileLoader {
    max_file_size: u64,
}

impl FileLoader {
    pub fn new(config: &IndexingConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&IndexingConfig::default())
    }

    /// Decode and normalize `bytes`. Empty input yields empty text.
    pub fn load_text(&self, name: &str, bytes: &[u8]) -> Result<String, LoadError> {
        let size = bytes.len() as u64;
        if size > self.max_file_size {
            return Err(LoadError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        let ext = extension_of(name);
        if let Some(ext) = ext.as_deref()
            && is_binary_extension(ext)
        {
            return Err(LoadError::UnsupportedFormat(format!(".{} files", ext)));
        }

        if looks_binary(bytes) {
            return Err(LoadError::UnsupportedFormat(format!(
                "{} contains binary data",
                display_name(name)
            )));
        }

        let raw = std::str::from_utf8(bytes).map_err(|e| {
            LoadError::InvalidEncoding(format!("{}: {}", display_name(name), e))
        })?;

        let text = match ext.as_deref() {
            Some(ext) if is_markup_extension(ext) => strip_markup(raw),
            _ => raw.to_string(),
        };

        Ok(normalize_text(&text))
    }

    /// Load an upload into a document identified by its name and content.
    pub fn load(&self, name: &str, bytes: &[u8]) -> Result<Document, LoadError> {
        let content = self.load_text(name, bytes)?;
        let checksum = calculate_checksum(content.as_bytes());
        Ok(Document::new(display_name(name), content, checksum))
    }

    /// Read a file from disk and load it.
    pub fn load_path(&self, path: &std::path::Path) -> Result<Document, LoadError> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > self.max_file_size {
            return Err(LoadError::TooLarge {
                size: metadata.len(),
                max: self.max_file_size,
            });
        }
        let bytes = std::fs::read(path)?;
        self.load(&path.to_string_lossy(), &bytes)
    }
}

fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "upload"
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let loader = FileLoader::with_defaults();
        let text = loader
            .load_text("sky.txt", b"The sky is blue.\r\n")
            .unwrap();
        assert_eq!(text, "The sky is blue.");
    }

    #[test]
    fn test_empty_file() {
        let loader = FileLoader::with_defaults();
        assert_eq!(loader.load_text("empty.txt", b"").unwrap(), "");
        assert_eq!(loader.load_text("blank.md", b"  \n\n ").unwrap(), "");
    }

    #[test]
    fn test_html_is_stripped() {
        let loader = FileLoader::with_defaults();
        let text = loader
            .load_text("page.html", b"<p>Hello</p><p>World &amp; all</p>")
            .unwrap();
        assert_eq!(text, "Hello\n\nWorld & all");
    }

    #[test]
    fn test_binary_extension_rejected() {
        let loader = FileLoader::with_defaults();
        let err = loader.load_text("scan.pdf", b"%PDF-1.7").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_binary_content_rejected() {
        let loader = FileLoader::with_defaults();
        let err = loader.load_text("data", b"abc\0def").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let loader = FileLoader::with_defaults();
        let err = loader.load_text("latin1.txt", &[0x63, 0x61, 0x66, 0xe9]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidEncoding(_)));
    }

    #[test]
    fn test_too_large() {
        let loader = FileLoader::new(&IndexingConfig {
            max_file_size: 4,
            ..Default::default()
        });
        let err = loader.load_text("big.txt", b"12345").unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { size: 5, max: 4 }));
    }

    #[test]
    fn test_load_document() {
        let loader = FileLoader::with_defaults();
        let doc = loader.load("sky.txt", b"The sky is blue.").unwrap();
        assert_eq!(doc.name, "sky.txt");
        assert_eq!(doc.content, "The sky is blue.");
        assert_eq!(doc.checksum.len(), 64);

        let unnamed = loader.load("", b"x").unwrap();
        assert_eq!(unnamed.name, "upload");
    }

    #[test]
    fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n\nRust is fast.").unwrap();

        let doc = FileLoader::with_defaults().load_path(&path).unwrap();
        assert_eq!(doc.content, "# Notes\n\nRust is fast.");
    }
}
