// SPDX-License-Identifier: GPL-3.0-only

//! Shared media storage
//!
//! A [`MediaStore`] owns named collections of media. Inserting a
//! [`DestinationDescriptor`] reserves a new entry and returns where its bytes
//! go. [`FileMediaStore`] maps the image collection to a folder under the
//! user's Pictures directory.

use crate::errors::StorageError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Media collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCollection {
    /// Shared still images
    Images,
}

/// Record describing a new media entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDescriptor {
    pub display_name: String,
    pub mime_type: String,
}

impl DestinationDescriptor {
    pub fn new(display_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A reserved entry in a media collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDestination {
    pub collection: MediaCollection,
    /// Name actually used; differs from the descriptor on collisions
    pub display_name: String,
    pub path: PathBuf,
}

/// Shared media collection
pub trait MediaStore: Send + Sync {
    /// Reserve a new entry for `descriptor` in `collection`
    fn insert(
        &self,
        collection: MediaCollection,
        descriptor: &DestinationDescriptor,
    ) -> Result<MediaDestination, StorageError>;

    /// Write the complete contents of a reserved entry
    fn write(&self, destination: &MediaDestination, data: &[u8]) -> Result<(), StorageError>;

    /// Remove a reserved entry after a failed write
    fn discard(&self, destination: &MediaDestination);
}

/// Default photo directory: `$XDG_PICTURES_DIR/<folder>`
pub fn default_photo_dir(folder: &str) -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(folder)
}

/// Media store writing into a directory
#[derive(Debug, Clone)]
pub struct FileMediaStore {
    images_dir: PathBuf,
}

impl FileMediaStore {
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    fn collection_dir(&self, collection: MediaCollection) -> &Path {
        match collection {
            MediaCollection::Images => &self.images_dir,
        }
    }
}

impl MediaStore for FileMediaStore {
    fn insert(
        &self,
        collection: MediaCollection,
        descriptor: &DestinationDescriptor,
    ) -> Result<MediaDestination, StorageError> {
        let dir = self.collection_dir(collection);
        std::fs::create_dir_all(dir).map_err(|e| {
            StorageError::CollectionUnavailable(format!("{}: {}", dir.display(), e))
        })?;

        let (stem, extension) = split_name(&descriptor.display_name);
        for attempt in 0u32.. {
            let display_name = match attempt {
                0 => descriptor.display_name.clone(),
                n => match extension {
                    Some(ext) => format!("{}-{}.{}", stem, n, ext),
                    None => format!("{}-{}", stem, n),
                },
            };
            let path = dir.join(&display_name);

            // create_new reserves the name atomically
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    debug!(path = %path.display(), mime = %descriptor.mime_type, "Reserved media entry");
                    return Ok(MediaDestination {
                        collection,
                        display_name,
                        path,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::Io(format!(
            "No free name for {}",
            descriptor.display_name
        )))
    }

    fn write(&self, destination: &MediaDestination, data: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&destination.path)?;
        file.write_all(data)?;
        file.sync_all()?;
        info!(path = %destination.path.display(), bytes = data.len(), "Photo saved");
        Ok(())
    }

    fn discard(&self, destination: &MediaDestination) {
        if let Err(e) = std::fs::remove_file(&destination.path) {
            warn!(path = %destination.path.display(), error = %e, "Failed to discard media entry");
        }
    }
}

fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}
