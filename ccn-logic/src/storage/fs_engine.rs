use std::path::{Path, PathBuf};

use tokio::fs;

use super::StorageEngine;

/// Local content-addressed engine, files named by hash under `folder`,
/// sharded one level deep to avoid a flat directory with millions of entries.
/// Grounded on the teacher's `S3Storage`, adapted to a plain filesystem since
/// the core's own storage tier is local-first with IPFS as the fallback.
pub struct FilesystemEngine {
    folder: PathBuf,
}

impl FilesystemEngine {
    pub fn new(folder: PathBuf) -> Self {
        Self { folder }
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        let (shard, rest) = hash.split_at(hash.len().min(2));
        self.folder.join(shard).join(rest)
    }
}

#[async_trait::async_trait]
impl StorageEngine for FilesystemEngine {
    async fn read(&self, hash: &str) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(hash)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write(&self, hash: &str, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.path_for(hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, bytes).await
    }
}

/// Exposed for tests that want to assert on-disk layout without going through
/// the trait object.
pub fn shard_path(folder: &Path, hash: &str) -> PathBuf {
    let (shard, rest) = hash.split_at(hash.len().min(2));
    folder.join(shard).join(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_blob() {
        let dir = tempdir();
        let engine = FilesystemEngine::new(dir.clone());
        engine.write("abcdef", b"hello").await.unwrap();
        let read = engine.read("abcdef").await.unwrap();
        assert_eq!(read, Some(b"hello".to_vec()));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_hash_returns_none() {
        let dir = tempdir();
        let engine = FilesystemEngine::new(dir.clone());
        assert_eq!(engine.read("missing").await.unwrap(), None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("ccn-fs-engine-test-{:x}", rand_suffix()));
        dir
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64
    }
}
