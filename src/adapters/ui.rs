use crate::core::naming::sanitize_file_stem;
use crate::core::template::IMAGE_DIR;
use crate::domain::messages::{CoreMessage, PackageZip};
use crate::domain::ports::{Storage, UiSink};
use crate::utils::error::{Result, SlicerError};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use zip::write::{FileOptions, SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Posts messages into an ordered in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelUi {
    tx: UnboundedSender<CoreMessage>,
}

impl ChannelUi {
    pub fn channel() -> (Self, UnboundedReceiver<CoreMessage>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UiSink for ChannelUi {
    async fn post(&self, message: CoreMessage) -> Result<()> {
        self.tx.send(message).map_err(|_| SlicerError::UiClosed)
    }
}

/// Keeps every posted message, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingUi {
    messages: Arc<Mutex<Vec<CoreMessage>>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<CoreMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn take(&self) -> Vec<CoreMessage> {
        std::mem::take(&mut *self.messages.lock().await)
    }

    pub async fn errors(&self) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .filter_map(|m| match m {
                CoreMessage::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn last_package(&self) -> Option<PackageZip> {
        self.messages
            .lock()
            .await
            .iter()
            .rev()
            .find_map(|m| match m {
                CoreMessage::PackageZip(package) => Some(package.clone()),
                _ => None,
            })
    }
}

impl UiSink for RecordingUi {
    async fn post(&self, message: CoreMessage) -> Result<()> {
        self.messages.lock().await.push(message);
        Ok(())
    }
}

/// Packaging side of the `package-zip` handoff.
pub struct ZipPackager<S: Storage> {
    storage: S,
}

impl<S: Storage> ZipPackager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn archive_name(package: &PackageZip) -> String {
        format!("{}.zip", sanitize_file_stem(&package.frame_name))
    }

    /// Builds `index.html` plus `images/<fileName>` in memory.
    pub fn build_archive(package: &PackageZip) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        if let Some(html) = &package.html {
            zip.start_file::<_, ()>("index.html", FileOptions::default())?;
            zip.write_all(html.as_bytes())?;
        }

        // Encoded images do not compress further.
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for image in &package.images {
            zip.start_file(format!("{}/{}", IMAGE_DIR, image.file_name), stored)?;
            zip.write_all(&image.image_bytes)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    /// Writes the archive through storage and returns its name.
    pub async fn package(&self, package: &PackageZip) -> Result<String> {
        let name = Self::archive_name(package);
        let data = Self::build_archive(package)?;
        tracing::debug!("Writing {} ({} bytes)", name, data.len());
        self.storage.write_file(&name, &data).await?;
        Ok(name)
    }
}
