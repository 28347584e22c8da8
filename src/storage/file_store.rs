use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::io::ReaderStream;

use crate::config::Config;
use crate::error::StorageError;
use crate::storage::names::{ensure_plain_name, extension_of, resolve_collision, sanitize};

/// Mutating side of the shared root: uploads, renames, deletes and opening
/// files for download.
///
/// Check-then-act sequences run under a single per-root lock. Uploads only
/// hold it while reserving their target name, never while streaming.
pub struct FileStore {
    root: PathBuf,
    allowed_extensions: HashSet<String>,
    max_upload_bytes: u64,
    mutations: Mutex<()>,
}

impl FileStore {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.root.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
            max_upload_bytes: config.max_upload_bytes,
            mutations: Mutex::new(()),
        }
    }

    /// Saves `reader` under a sanitized, collision-free version of
    /// `declared_name` and returns the name actually used.
    pub async fn upload<R>(&self, reader: R, declared_name: &str) -> Result<String, StorageError>
    where
        R: AsyncRead + Unpin,
    {
        let safe_name = sanitize(declared_name)?;
        let extension = extension_of(&safe_name);
        if extension.is_empty() || !self.allowed_extensions.contains(&extension) {
            return Err(StorageError::ExtensionNotAllowed(declared_name.to_string()));
        }

        let (final_name, file) = self.reserve(&safe_name).await?;
        let path = self.root.join(&final_name);

        if let Err(err) = self.write_stream(reader, file).await {
            if let Err(cleanup) = fs::remove_file(&path).await {
                tracing::warn!("Could not remove partial upload {}: {}", final_name, cleanup);
            }
            return Err(err);
        }

        tracing::info!("Saved upload {} as {}", declared_name, final_name);
        Ok(final_name)
    }

    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), StorageError> {
        ensure_plain_name(old_name)?;
        ensure_plain_name(new_name)?;

        let _guard = self.mutations.lock().await;
        let old_path = self.root.join(old_name);
        let new_path = self.root.join(new_name);

        if !is_regular_file(&old_path).await {
            return Err(StorageError::NotFound(old_name.to_string()));
        }
        if fs::symlink_metadata(&new_path).await.is_ok() {
            return Err(StorageError::AlreadyExists(new_name.to_string()));
        }

        fs::rename(&old_path, &new_path).await?;
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), StorageError> {
        ensure_plain_name(name)?;

        let _guard = self.mutations.lock().await;
        let path = self.root.join(name);
        if !is_regular_file(&path).await {
            return Err(StorageError::NotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        Ok(())
    }

    /// Opens a file in the root for reading and returns it with its length.
    pub async fn open(&self, name: &str) -> Result<(File, u64), StorageError> {
        ensure_plain_name(name)?;

        let path = self.root.join(name);
        if !is_regular_file(&path).await {
            return Err(StorageError::NotFound(name.to_string()));
        }

        let file = File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    async fn existing_names(&self) -> Result<HashSet<String>, StorageError> {
        let mut names = HashSet::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            // sanitized names are ASCII, so a non UTF-8 entry can never collide
            if let Ok(name) = entry.file_name().into_string() {
                names.insert(name);
            }
        }
        Ok(names)
    }

    // Picks a free name and creates it exclusively, so a concurrent upload of
    // the same name (or an outside writer) can never be overwritten.
    async fn reserve(&self, safe_name: &str) -> Result<(String, File), StorageError> {
        let _guard = self.mutations.lock().await;
        let mut existing = self.existing_names().await?;

        loop {
            let candidate = resolve_collision(safe_name, &existing);
            let created = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&candidate))
                .await;

            match created {
                Ok(file) => return Ok((candidate, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    existing.insert(candidate);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn write_stream<R>(&self, reader: R, mut file: File) -> Result<u64, StorageError>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunks = ReaderStream::new(reader);
        let mut written: u64 = 0;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > self.max_upload_bytes {
                return Err(StorageError::TooLarge {
                    limit: self.max_upload_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }
}

async fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    // Hands out one chunk, then fails like a dropped client connection.
    struct DroppedConnection {
        sent: bool,
    }

    impl AsyncRead for DroppedConnection {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(std::io::Error::new(
                    ErrorKind::ConnectionReset,
                    "client went away",
                )));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            Poll::Ready(Ok(()))
        }
    }

    fn store_for(root: &Path) -> FileStore {
        FileStore::new(&Config::new(root, "pw", "secret"))
    }

    #[tokio::test]
    async fn test_upload_twice_adds_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let first = store.upload(&b"first"[..], "report.pdf").await.unwrap();
        let second = store.upload(&b"second"[..], "report.pdf").await.unwrap();

        assert_eq!(first, "report.pdf");
        assert_eq!(second, "report_1.pdf");
        assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.path().join("report_1.pdf")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_upload_sanitizes_declared_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let saved = store.upload(&b"data"[..], "../../escape me.txt").await.unwrap();
        assert_eq!(saved, "escape_me.txt");
        assert!(dir.path().join("escape_me.txt").is_file());
        assert!(!dir.path().parent().unwrap().join("escape me.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let result = store.upload(&b"MZ"[..], "setup.exe").await;
        assert!(matches!(result, Err(StorageError::ExtensionNotAllowed(_))));
        let result = store.upload(&b"x"[..], "Makefile").await;
        assert!(matches!(result, Err(StorageError::ExtensionNotAllowed(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_extension_check_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let saved = store.upload(&b"img"[..], "Holiday Photo.JPG").await.unwrap();
        assert_eq!(saved, "Holiday_Photo.JPG");
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let result = store.upload(&b"x"[..], "../..").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_upload_too_large_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(dir.path(), "pw", "secret");
        config.max_upload_bytes = 8;
        let store = FileStore::new(&config);

        let result = store.upload(&b"more than eight bytes"[..], "big.txt").await;
        assert!(matches!(result, Err(StorageError::TooLarge { limit: 8 })));
        assert!(!dir.path().join("big.txt").exists());

        let saved = store.upload(&b"tiny"[..], "big.txt").await.unwrap();
        assert_eq!(saved, "big.txt");
    }

    #[tokio::test]
    async fn test_upload_interrupted_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let result = store.upload(DroppedConnection { sent: false }, "movie.mp4").await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let saved = store.upload(&b"whole"[..], "movie.mp4").await.unwrap();
        assert_eq!(saved, "movie.mp4");
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_for(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let body = format!("copy {i}");
                store.upload(body.as_bytes(), "photo.png").await.unwrap()
            }));
        }

        let mut saved = HashSet::new();
        for handle in handles {
            saved.insert(handle.await.unwrap());
        }
        assert_eq!(saved.len(), 8);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 8);
    }

    #[tokio::test]
    async fn test_rename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"content").unwrap();
        let store = store_for(dir.path());

        store.rename("a.txt", "b.txt").await.unwrap();

        assert!(!dir.path().join("a.txt").exists());
        assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "content");
    }

    #[tokio::test]
    async fn test_rename_onto_existing_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"keep me").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"other").unwrap();
        let store = store_for(dir.path());

        let result = store.rename("a.txt", "b.txt").await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "keep me");
        assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "other");
    }

    #[tokio::test]
    async fn test_rename_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(dir.path());

        let result = store.rename("missing.txt", "x.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(!dir.path().join("x.txt").exists());
    }

    #[tokio::test]
    async fn test_rename_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        let store = store_for(dir.path());

        let result = store.rename("a.txt", "../a.txt").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
        assert!(dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doomed.txt"), b"bye").unwrap();
        let store = store_for(dir.path());

        store.delete("doomed.txt").await.unwrap();
        assert!(!dir.path().join("doomed.txt").exists());

        let again = store.delete("doomed.txt").await;
        assert!(matches!(again, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        let store = store_for(dir.path());

        let result = store.delete("folder").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(dir.path().join("folder").is_dir());
    }

    #[tokio::test]
    async fn test_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("song.mp3"), b"12345").unwrap();
        let store = store_for(dir.path());

        let (_, len) = store.open("song.mp3").await.unwrap();
        assert_eq!(len, 5);
        assert!(matches!(store.open("nope.mp3").await, Err(StorageError::NotFound(_))));
        assert!(matches!(store.open("../song.mp3").await, Err(StorageError::InvalidName(_))));
    }
}
