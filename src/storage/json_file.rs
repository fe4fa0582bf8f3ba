use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{validate_key, SnapshotBackend};
use crate::error::{AppError, AppResult};

/// File-per-key JSON documents under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Open (and create if needed) the data directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| AppError::from_io("create data dir", &e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn doc_path(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.json")) }
}

impl SnapshotBackend for JsonFileBackend {
    fn load(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        validate_key(key)?;
        match fs::read(self.doc_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::from_io(&format!("read snapshot '{key}'"), &e)),
        }
    }

    fn store(&self, key: &str, bytes: &[u8]) -> AppResult<()> {
        validate_key(key)?;
        let path = self.doc_path(key);
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        let write_tmp = || -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            Ok(())
        };
        if let Err(e) = write_tmp().and_then(|_| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(AppError::from_io(&format!("write snapshot '{key}'"), &e));
        }
        debug!(target: "folio_admin::storage", "stored snapshot key='{}' bytes={} path='{}'", key, bytes.len(), path.display());
        Ok(())
    }

    fn describe(&self) -> String { format!("json-files:{}", self.dir.display()) }
}
