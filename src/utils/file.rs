//! File classification helpers shared by the loader and CLI ingestion.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Calculate SHA-256 checksum of content.
pub fn calculate_checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Lower-cased extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Check if a file on disk is likely a text file.
pub fn is_text_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if is_binary_extension(&ext) {
            return false;
        }
        if is_text_extension(&ext) {
            return true;
        }
    }

    if let Ok(file) = fs::File::open(path) {
        let mut buffer = [0u8; 512];
        let mut reader = std::io::BufReader::new(file);
        if let Ok(n) = reader.read(&mut buffer) {
            return !looks_binary(&buffer[..n]);
        }
    }

    false
}

/// NUL bytes in the leading block mark binary content.
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8192).any(|b| *b == 0)
}

/// Check if extension indicates a binary file.
pub fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "exe"
            | "dll"
            | "so"
            | "dylib"
            | "a"
            | "o"
            | "obj"
            | "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "bmp"
            | "ico"
            | "webp"
            | "mp3"
            | "mp4"
            | "avi"
            | "mkv"
            | "mov"
            | "wav"
            | "flac"
            | "zip"
            | "tar"
            | "gz"
            | "bz2"
            | "xz"
            | "7z"
            | "rar"
            | "pdf"
            | "doc"
            | "docx"
            | "xls"
            | "xlsx"
            | "ppt"
            | "pptx"
            | "odt"
            | "epub"
            | "woff"
            | "woff2"
            | "ttf"
            | "otf"
            | "class"
            | "jar"
            | "pyc"
            | "db"
            | "sqlite"
            | "bin"
    )
}

/// Check if extension indicates a text file.
pub fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        // Documents
        "txt" | "md" | "markdown" | "rst" | "adoc" | "org" | "tex"
            // Markup
            | "html" | "htm" | "xml" | "svg"
            // Data
            | "csv" | "tsv" | "json" | "jsonl" | "yaml" | "yml" | "toml" | "ini" | "log"
            // Source code
            | "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "h" | "cpp" | "rb" | "sh" | "sql"
    )
}

/// Markup formats whose tags are stripped before chunking.
pub fn is_markup_extension(ext: &str) -> bool {
    matches!(ext, "html" | "htm" | "xml")
}
