//! Named persistence slots for the session (`user`, `token`).

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::debug;

/// Key/value slots that survive application restarts.
pub trait SlotStorage: Send + Sync {
    fn read(&self, slot: &str) -> io::Result<Option<String>>;
    fn write(&self, slot: &str, value: &str) -> io::Result<()>;
    /// Removing a slot that does not exist is not an error.
    fn remove(&self, slot: &str) -> io::Result<()>;
}

/// One file per slot inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a crash
/// mid-write leaves either the old value or the new one.
pub struct FileSlotStorage {
    dir: PathBuf,
}

impl FileSlotStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }
}

impl SlotStorage for FileSlotStorage {
    fn read(&self, slot: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, slot: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(slot);
        let tmp = self.dir.join(format!(".{slot}.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            restrict_permissions(&file)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!("Wrote session slot {}", path.display());
        Ok(())
    }

    fn remove(&self, slot: &str) -> io::Result<()> {
        match fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

/// In-process slots for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySlotStorage {
    slots: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemorySlotStorage {
    pub fn with_slots(slots: &[(&str, &str)]) -> Self {
        let storage = Self::default();
        for (slot, value) in slots {
            storage.write(slot, value).unwrap();
        }
        storage
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
impl SlotStorage for MemorySlotStorage {
    fn read(&self, slot: &str) -> io::Result<Option<String>> {
        Ok(self.slots.lock().unwrap().get(slot).cloned())
    }

    fn write(&self, slot: &str, value: &str) -> io::Result<()> {
        self.slots
            .lock()
            .unwrap()
            .insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> io::Result<()> {
        self.slots.lock().unwrap().remove(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_slots_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSlotStorage::new(dir.path().join("nested"));

        assert_eq!(storage.read("token").unwrap(), None);
        storage.write("token", "abc123").unwrap();
        assert_eq!(storage.read("token").unwrap().as_deref(), Some("abc123"));

        storage.write("token", "def456").unwrap();
        assert_eq!(storage.read("token").unwrap().as_deref(), Some("def456"));

        storage.remove("token").unwrap();
        assert_eq!(storage.read("token").unwrap(), None);
    }

    #[test]
    fn test_removing_missing_slot_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSlotStorage::new(dir.path());
        assert!(storage.remove("user").is_ok());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSlotStorage::new(dir.path());
        storage.write("user", "{}").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["user".to_string()]);
    }
}
