use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::domain::{AppError, DownloadId};
use crate::utils::sanitize_filename;

/// Reference string for a registered payload, e.g. `blob:media-downloader/3`.
pub type HandleRef = String;

const HANDLE_SCHEME: &str = "blob:media-downloader/";

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    released: AtomicUsize,
    entries: Mutex<HashMap<u64, Bytes>>,
}

/// Process-wide table of in-memory payloads addressable by reference.
#[derive(Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<RegistryInner>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, payload: Bytes) -> TemporaryHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().insert(id, payload);
        debug!(handle = id, "temporary handle created");

        TemporaryHandle {
            id,
            registry: self.clone(),
            released: false,
        }
    }

    /// Look up the payload behind a reference, if still alive.
    pub fn resolve(&self, reference: &str) -> Option<Bytes> {
        let id = reference.strip_prefix(HANDLE_SCHEME)?.parse::<u64>().ok()?;
        self.lock().get(&id).cloned()
    }

    #[cfg(test)]
    pub fn live_handles(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn released_count(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    fn revoke(&self, id: u64) -> bool {
        let mut entries = self.lock();
        let removed = entries.remove(&id).is_some();
        if removed {
            self.inner.released.fetch_add(1, Ordering::SeqCst);
            debug!(handle = id, live = entries.len(), "temporary handle released");
        }
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Bytes>> {
        // A poisoned map is still structurally valid.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Single-owner reference to a registered payload.
///
/// Released by `release`, or on drop if that never happened.
pub struct TemporaryHandle {
    id: u64,
    registry: HandleRegistry,
    released: bool,
}

impl TemporaryHandle {
    pub fn reference(&self) -> HandleRef {
        format!("{}{}", HANDLE_SCHEME, self.id)
    }

    pub fn release(mut self) -> bool {
        self.released = true;
        self.registry.revoke(self.id)
    }
}

impl Drop for TemporaryHandle {
    fn drop(&mut self) {
        if !self.released {
            self.registry.revoke(self.id);
        }
    }
}

impl std::fmt::Debug for TemporaryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryHandle").field("id", &self.id).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub source: HandleRef,
    pub filename: String,
    pub prompt_for_location: bool,
}

/// Platform facility that persists a referenced payload.
///
/// Always resolves; `None` means the save was rejected.
#[async_trait]
pub trait DownloadFacility: Send + Sync {
    async fn download(&self, options: DownloadOptions) -> Option<DownloadId>;
}

/// Saves payloads into a directory, or wherever the user picks when prompted.
pub struct FileSystemFacility {
    registry: HandleRegistry,
    download_dir: PathBuf,
    next_id: AtomicU64,
}

impl FileSystemFacility {
    pub fn new(registry: HandleRegistry, download_dir: PathBuf) -> Self {
        Self {
            registry,
            download_dir,
            next_id: AtomicU64::new(0),
        }
    }

    async fn choose_save_path(&self, filename: &str) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_directory(&self.download_dir)
            .set_file_name(filename)
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    /// Write to a path the user picked; replacing it was their call.
    async fn overwrite(&self, path: &Path, payload: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(path).await?;
        write_all(file, payload).await
    }
}

#[async_trait]
impl DownloadFacility for FileSystemFacility {
    async fn download(&self, options: DownloadOptions) -> Option<DownloadId> {
        let Some(payload) = self.registry.resolve(&options.source) else {
            warn!(source = %options.source, "download source no longer resolves");
            return None;
        };

        let mut filename = sanitize_filename(&options.filename);
        if filename.is_empty() {
            filename = "download".to_string();
        }

        let written = if options.prompt_for_location {
            let path = self.choose_save_path(&filename).await?;
            self.overwrite(&path, &payload).await.map(|()| path)
        } else {
            write_unique(&self.download_dir, &filename, &payload).await
        };

        let path = match written {
            Ok(path) => path,
            Err(e) => {
                warn!(filename = %filename, "failed to write download: {}", e);
                return None;
            }
        };

        let id = DownloadId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        info!(%id, path = %path.display(), "download saved");
        Some(id)
    }
}

/// Create `dir/name`, or `dir/name (n).ext` for the first free `n`, and
/// write the payload. Existing files are never opened for writing.
async fn write_unique(dir: &Path, filename: &str, payload: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    for n in 0u32.. {
        let name = match (n, ext) {
            (0, _) => filename.to_string(),
            (n, Some(ext)) => format!("{} ({}).{}", stem, n, ext),
            (n, None) => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => {
                write_all(file, payload).await?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {}", filename),
    ))
}

async fn write_all(mut file: File, payload: &[u8]) -> std::io::Result<()> {
    file.write_all(payload).await?;
    file.sync_all().await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub download_dir: PathBuf,
    /// Grace period before the temporary handle is released. The facility
    /// is not asked whether it finished reading; a slow consumer can race it.
    pub release_delay: Duration,
    pub prompt_for_location: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            release_delay: Duration::from_millis(1000),
            prompt_for_location: false,
        }
    }
}

/// Hands payloads to a `DownloadFacility` through temporary handles.
#[derive(Clone)]
pub struct DownloadSink {
    registry: HandleRegistry,
    facility: Arc<dyn DownloadFacility>,
    release_delay: Duration,
    prompt_for_location: bool,
}

impl DownloadSink {
    pub fn new(
        registry: HandleRegistry,
        facility: Arc<dyn DownloadFacility>,
        config: &SinkConfig,
    ) -> Self {
        Self {
            registry,
            facility,
            release_delay: config.release_delay,
            prompt_for_location: config.prompt_for_location,
        }
    }

    /// Build a sink writing through a `FileSystemFacility`.
    pub fn to_filesystem(config: &SinkConfig) -> Self {
        let registry = HandleRegistry::new();
        let facility = FileSystemFacility::new(registry.clone(), config.download_dir.clone());
        Self::new(registry, Arc::new(facility), config)
    }

    #[cfg(test)]
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub async fn save(&self, payload: Bytes, filename: &str) -> Result<DownloadId, AppError> {
        let handle = self.registry.create(payload);
        let options = DownloadOptions {
            source: handle.reference(),
            filename: filename.to_string(),
            prompt_for_location: self.prompt_for_location,
        };

        let outcome = self.facility.download(options).await;
        self.schedule_release(handle);

        outcome.ok_or_else(|| AppError::Sink {
            detail: format!("facility returned no id for {}", filename),
        })
    }

    fn schedule_release(&self, handle: TemporaryHandle) {
        let delay = self.release_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.release();
        });
    }
}
