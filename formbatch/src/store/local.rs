//! Document store backed by a local directory tree.
//!
//! Each immediate subdirectory of the root is a folder, named by its
//! directory name. A file is identified by its file name, so the same name in
//! two folders is the same file with two parents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{DocumentStore, FileHandle};
use crate::error::{FormBatchError, Result};

/// [`DocumentStore`] over a directory of folder subdirectories.
#[derive(Debug, Clone)]
pub struct LocalFolderStore {
    root: PathBuf,
}

impl LocalFolderStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_path(&self, folder_id: &str) -> Result<PathBuf> {
        check_component(folder_id)?;
        Ok(self.root.join(folder_id))
    }

    /// Names of every folder under the root, sorted.
    async fn folders(&self) -> Result<Vec<String>> {
        let mut folders = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                folders.push(name.to_string());
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Folders that contain a regular file named `id`.
    async fn parents_of(&self, id: &str) -> Result<Vec<String>> {
        let mut parents = Vec::new();
        for folder in self.folders().await? {
            if is_file(&self.root.join(&folder).join(id)).await {
                parents.push(folder);
            }
        }
        Ok(parents)
    }

    async fn handle_for(
        &self,
        id: &str,
        path: &Path,
        parent_ids: Vec<String>,
    ) -> Result<FileHandle> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|err| storage_error(id, err))?;
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Ok(FileHandle {
            id: id.to_string(),
            name: id.to_string(),
            mime_type: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            size: metadata.len(),
            created_at: created,
            parent_ids,
        })
    }
}

#[async_trait]
impl DocumentStore for LocalFolderStore {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<FileHandle>> {
        let folder = self.folder_path(folder_id)?;
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();

        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let parents = self.parents_of(&name).await?;
            files.push(self.handle_for(&name, &folder.join(&name), parents).await?);
        }
        Ok(files)
    }

    async fn get_file(&self, id: &str) -> Result<FileHandle> {
        check_component(id).map_err(|_| FormBatchError::FileNotFound { id: id.to_string() })?;
        let parents = self.parents_of(id).await?;
        let Some(first) = parents.first() else {
            return Err(FormBatchError::FileNotFound { id: id.to_string() });
        };
        let path = self.root.join(first).join(id);
        self.handle_for(id, &path, parents).await
    }

    async fn read_bytes(&self, file: &FileHandle) -> Result<Vec<u8>> {
        let Some(folder) = file.parent_ids.first() else {
            return Err(FormBatchError::FileNotFound {
                id: file.id.clone(),
            });
        };
        let path = self.folder_path(folder)?.join(&file.id);
        fs::read(&path)
            .await
            .map_err(|err| storage_error(&file.id, err))
    }

    async fn move_file(
        &self,
        file: &FileHandle,
        from_folder: &str,
        to_folder: &str,
    ) -> Result<()> {
        check_component(&file.id)?;
        let source = self.folder_path(from_folder)?.join(&file.id);
        let target_dir = self.folder_path(to_folder)?;
        let target = target_dir.join(&file.id);

        let in_source = is_file(&source).await;
        let in_target = is_file(&target).await;

        match (in_source, in_target) {
            (true, false) => {
                fs::create_dir_all(&target_dir)
                    .await
                    .map_err(|err| storage_error(&file.id, err))?;
                fs::rename(&source, &target)
                    .await
                    .map_err(|err| storage_error(&file.id, err))
            }
            (true, true) => fs::remove_file(&source)
                .await
                .map_err(|err| storage_error(&file.id, err)),
            (false, true) => Ok(()),
            (false, false) => Err(FormBatchError::FileNotFound {
                id: file.id.clone(),
            }),
        }
    }
}

/// Rejects identifiers that would escape the root.
fn check_component(value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\');
    if invalid {
        return Err(FormBatchError::invalid_config(format!(
            "not a valid folder or file name: {value:?}"
        )));
    }
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn storage_error(id: &str, err: io::Error) -> FormBatchError {
    if err.kind() == io::ErrorKind::NotFound {
        FormBatchError::FileNotFound { id: id.to_string() }
    } else {
        FormBatchError::storage(id, err.to_string())
    }
}
