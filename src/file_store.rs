//! JSON 文件文档存储：每次查询重新读取，提交时整体原子替换。
//!
//! Writers of the store file, this process and the external owner of the
//! records alike, hold an exclusive `flock` on the sidecar `<file>.lock`
//! for their whole read-modify-write. Readers need no lock because the file
//! is only ever replaced by rename.

use fs4::fs_std::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::atomic::write_atomic;
use crate::document::{DocumentSnapshot, Filter, WriteBatch};
use crate::error::StoreError;
use crate::store::{Collections, DocumentStore};

/// Document store persisted as `{ "<collection>": { "<id>": { ... } } }`.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ensure_parent(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
            _ => Ok(()),
        }
    }

    /// Sidecar file guarding read-modify-write of the store file.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// 阻塞等待写锁；锁文件而非数据文件，因为数据文件会被 rename 替换。
    async fn lock_exclusive(&self) -> io::Result<WriteLock> {
        let path = self.lock_path();
        tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(WriteLock { file })
        })
        .await
        .map_err(|err| io::Error::other(err.to_string()))?
    }

    async fn load(&self) -> Result<Collections, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Collections::default()),
            Err(err) => return Err(StoreError::Io(err)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Collections::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl DocumentStore for FileStore {
    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        let collections = self.load().await?;
        Ok(collections.query(collection, filter))
    }

    async fn commit(&self, batch: &WriteBatch) -> Result<usize, StoreError> {
        let _lock = self.lock_exclusive().await?;
        let mut collections = self.load().await?;
        let written = collections.apply(batch)?;
        let contents = serde_json::to_vec_pretty(&collections)?;
        write_atomic(&self.path, &contents).await?;
        debug!(path = ?self.path, written, "store file replaced");
        Ok(written)
    }
}

struct WriteLock {
    file: File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
