use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> std::io::Result<()>;
}

/// Plain-directory backend. Writes go through a temp file and a rename so
/// a crash mid-write never leaves a half-written file under `ident`.
#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> std::io::Result<Self> {
        let path = PathBuf::from(storage_dir);
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }

    fn path_for(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.path_for(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path_for(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_name = format!(".{ident}.{}-{counter}.tmp", std::process::id());
        let temp_path = self.base_dir.join(temp_name);

        std::fs::write(&temp_path, data)?;

        std::fs::rename(&temp_path, self.path_for(ident))
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.path_for(ident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BackendLocal::new(dir.path().to_str().unwrap()).unwrap();

        assert!(!backend.exists("state.json"));
        backend.write("state.json", b"{}").unwrap();
        assert!(backend.exists("state.json"));
        assert_eq!(backend.read("state.json").unwrap(), b"{}");

        backend.delete("state.json").unwrap();
        assert!(!backend.exists("state.json"));
    }

    #[test]
    fn write_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BackendLocal::new(dir.path().to_str().unwrap()).unwrap();

        backend.write("f", b"one").unwrap();
        backend.write("f", b"two").unwrap();
        assert_eq!(backend.read("f").unwrap(), b"two");
    }
}
