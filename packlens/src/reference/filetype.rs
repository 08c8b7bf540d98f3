//! File type detection from path extensions.
//!
//! Pure lookup, no I/O. Directories are detected by the trailing path
//! separator before the extension table is consulted.

use std::fmt;

/// Coarse asset type derived from a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Trailing path separator.
    Directory,
    /// Texture formats (blp, dds, tga, png, jpg).
    Image,
    /// Model/geometry formats (m2, mdx, wmo, skin, anim).
    Model,
    /// Audio formats (wav, mp3, ogg).
    Audio,
    /// Client database tables (dbc, db2, wdb).
    Database,
    /// Script and interface text (lua, toc, xml, html, txt, ini).
    Text,
    /// Anything else.
    Unknown,
}

impl FileKind {
    /// Classifies a backslash-normalized path.
    pub fn from_path(path: &str) -> Self {
        if path.ends_with('\\') {
            return FileKind::Directory;
        }
        let ext = match path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('\\') => ext.to_ascii_lowercase(),
            _ => return FileKind::Unknown,
        };
        match ext.as_str() {
            "blp" | "dds" | "tga" | "png" | "jpg" | "jpeg" | "bmp" => FileKind::Image,
            "m2" | "mdx" | "mdl" | "wmo" | "skin" | "anim" | "phys" | "bone" => FileKind::Model,
            "wav" | "mp3" | "ogg" => FileKind::Audio,
            "dbc" | "db2" | "wdb" | "adb" => FileKind::Database,
            "lua" | "toc" | "xml" | "html" | "htm" | "txt" | "ini" | "sbt" | "zmp" => {
                FileKind::Text
            }
            _ => FileKind::Unknown,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileKind::Directory => "directory",
            FileKind::Image => "image",
            FileKind::Model => "model",
            FileKind::Audio => "audio",
            FileKind::Database => "database",
            FileKind::Text => "text",
            FileKind::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}
