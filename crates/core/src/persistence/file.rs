use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;

use crate::{error::PersistenceError, persistence::traits::StateStore};

/// Stores each key as a file named after it inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn save(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        let path = self.path_for(key);
        let staging = path.with_extension("tmp");
        fs::write(&staging, value).await.map_err(io_error(&staging))?;
        fs::rename(&staging, &path).await.map_err(io_error(&path))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        assert_eq!(store.load("orchestrator_state").await.expect("load"), None);
    }

    #[tokio::test]
    async fn save_overwrites_and_creates_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("nested"));

        store.save("orchestrator_state", "Idle".into()).await.expect("first save");
        store.save("orchestrator_state", "Done".into()).await.expect("second save");

        assert_eq!(
            store.load("orchestrator_state").await.expect("load").as_deref(),
            Some("Done")
        );
        assert!(!store.dir().join("orchestrator_state.tmp").exists());
    }
}
