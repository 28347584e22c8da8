use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tokio::fs;

use crate::config::Config;
use crate::models::{FileEntry, FileType};
use crate::storage::names::extension_of;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "wma"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf", "xls", "xlsx", "ppt", "pptx"];

/// Read-only view over the files directly inside the shared root.
///
/// Every call to [`DirectoryIndex::list`] rescans the directory; nothing is
/// cached, so a returned entry always existed at the time of the call.
pub struct DirectoryIndex {
    root: PathBuf,
}

impl DirectoryIndex {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.root.clone(),
        }
    }

    /// Lists regular files whose name contains `query` (case-insensitive),
    /// newest first. Scan failures are logged and yield an empty list.
    pub async fn list(&self, query: &str) -> Vec<FileEntry> {
        match self.scan(query).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("Error listing files in {}: {}", self.root.display(), err);
                Vec::new()
            }
        }
    }

    async fn scan(&self, query: &str) -> std::io::Result<Vec<FileEntry>> {
        let needle = query.to_lowercase();
        let mut files = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            // a lossy name would not resolve back to the file on disk
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::debug!("Skipping non UTF-8 name {:?}", raw);
                    continue;
                }
            };
            if !needle.is_empty() && !name.to_lowercase().contains(&needle) {
                continue;
            }

            // follows symlinks, like the download path does
            let metadata = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::debug!("Skipping {}: {}", name, err);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push(describe(name, metadata.len(), modified));
        }

        // stable sort: equal timestamps keep scan order
        files.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(files)
    }
}

fn describe(name: String, size_bytes: u64, modified: SystemTime) -> FileEntry {
    let extension = extension_of(&name);
    let ext = extension.as_str();

    FileEntry {
        size: format_size(size_bytes),
        size_bytes,
        modified: format_timestamp(modified),
        file_type: classify(ext),
        is_image: IMAGE_EXTENSIONS.contains(&ext),
        is_video: VIDEO_EXTENSIONS.contains(&ext),
        is_audio: AUDIO_EXTENSIONS.contains(&ext),
        is_document: DOCUMENT_EXTENSIONS.contains(&ext),
        extension,
        name,
    }
}

pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = size_bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, SIZE_UNITS[unit])
}

pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

/// Maps a lower-cased extension (no dot) to its display category.
pub fn classify(extension: &str) -> FileType {
    match extension {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" => FileType::Image,
        "mp4" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm" => FileType::Video,
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" => FileType::Audio,
        "pdf" => FileType::Pdf,
        "doc" | "docx" => FileType::WordDocument,
        "xls" | "xlsx" => FileType::ExcelSpreadsheet,
        "ppt" | "pptx" => FileType::PowerPoint,
        "txt" | "md" | "rtf" => FileType::TextDocument,
        "zip" | "rar" | "7z" | "tar" | "gz" => FileType::Archive,
        "exe" | "msi" | "dmg" | "pkg" => FileType::Executable,
        _ => FileType::Unknown,
    }
}
