use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::client::AnalysisResponse;

/// Media types accepted for analysis. User agents declare JPEGs under either
/// string depending on platform, so both are recognized.
pub const ACCEPTED_MEDIA_TYPES: [&str; 2] = ["image/jpeg", "image/jpg"];

/// A user-selected file, before filtering.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub name: String,
    pub media_type: Option<&'static str>,
    pub size: u64,
}

impl CandidateFile {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = declared_media_type(&path);
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            name,
            media_type,
            size,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.media_type
            .map_or(false, |t| ACCEPTED_MEDIA_TYPES.contains(&t))
    }
}

/// Declared media type for a path, derived from its extension the same way a
/// user agent fills in `File.type`. Unknown extensions yield `None`.
pub fn declared_media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpeg" | "jpe" => Some("image/jpeg"),
        "jpg" => Some("image/jpg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// Whitelisted metadata extracted from one file. Every accepted file produces
/// exactly one record; extraction failures set `error` instead of aborting
/// the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExifRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExifRecord {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            filename: None,
            error: None,
        }
    }

    pub fn parse_error(message: String) -> Self {
        Self {
            fields: Map::new(),
            filename: None,
            error: Some(message),
        }
    }

    pub fn read_error(filename: String) -> Self {
        Self {
            fields: Map::new(),
            filename: Some(filename),
            error: Some("File read error".to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The aggregated per-file records for one submission, in read-completion
/// order.
pub type Batch = Vec<ExifRecord>;

#[derive(Debug, Clone)]
pub enum ExtractionStatus {
    Extracted { field_count: usize },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileStatus {
    pub name: String,
    pub size: u64,
    pub status: ExtractionStatus,
}

/// Events sent from the worker thread to the UI thread.
#[derive(Debug)]
pub enum ProgressEvent {
    FileDone(FileStatus),
    Submitting,
    Finished(Box<AnalysisResponse>),
    Recommendations(String),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_extensions_map_to_accepted_types() {
        assert_eq!(
            declared_media_type(Path::new("a/b/photo.JPG")),
            Some("image/jpg")
        );
        assert_eq!(
            declared_media_type(Path::new("photo.jpeg")),
            Some("image/jpeg")
        );
        assert_eq!(
            declared_media_type(Path::new("photo.png")),
            Some("image/png")
        );
        assert_eq!(declared_media_type(Path::new("notes.txt")), None);
        assert_eq!(declared_media_type(Path::new("no_extension")), None);

        assert!(CandidateFile::from_path(PathBuf::from("x.jpg")).is_accepted());
        assert!(CandidateFile::from_path(PathBuf::from("x.jpeg")).is_accepted());
        assert!(!CandidateFile::from_path(PathBuf::from("x.png")).is_accepted());
        assert!(!CandidateFile::from_path(PathBuf::from("x")).is_accepted());
    }

    #[test]
    fn record_serializes_fields_at_top_level() {
        let mut fields = Map::new();
        fields.insert("Make".to_string(), Value::String("NIKON".to_string()));
        fields.insert(
            "FNumber".to_string(),
            serde_json::json!([28, 10]),
        );
        let record = ExifRecord::from_fields(fields);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Make"], "NIKON");
        assert_eq!(json["FNumber"], serde_json::json!([28, 10]));
        // Absent error/filename must not appear in the payload.
        assert!(json.get("error").is_none());
        assert!(json.get("filename").is_none());
    }

    #[test]
    fn error_records_keep_their_diagnostics() {
        let parse = ExifRecord::parse_error("Could not read EXIF: broken".to_string());
        let json = serde_json::to_value(&parse).unwrap();
        assert_eq!(json["error"], "Could not read EXIF: broken");
        assert!(json.get("filename").is_none());

        let read = ExifRecord::read_error("a.jpg".to_string());
        let json = serde_json::to_value(&read).unwrap();
        assert_eq!(json["filename"], "a.jpg");
        assert_eq!(json["error"], "File read error");
        assert!(read.is_error());
    }
}
