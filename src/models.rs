use serde::{Deserialize, Serialize};

// One listed file. Rebuilt from the filesystem on every listing, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size: String,
    pub size_bytes: u64,
    pub modified: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub extension: String,
    pub is_image: bool,
    pub is_video: bool,
    pub is_audio: bool,
    pub is_document: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Image,
    Video,
    Audio,
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "Word Document")]
    WordDocument,
    #[serde(rename = "Excel Spreadsheet")]
    ExcelSpreadsheet,
    PowerPoint,
    #[serde(rename = "Text Document")]
    TextDocument,
    Archive,
    Executable,
    Unknown,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectedUpload {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    pub rejected: Vec<RejectedUpload>,
}
