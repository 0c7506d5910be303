//! Where learned gauge parameters live between boots.
use std::path::{Path, PathBuf};

use crate::atomic::write_atomic;
use crate::error::MonitorError;
use crate::params::LearnedParams;

/// Keyed by battery-pack name; single writer.
pub trait ParamStore: Send {
    fn load(&self, pack: &str) -> Result<Option<LearnedParams>, MonitorError>;
    fn save(&self, pack: &str, params: &LearnedParams) -> Result<(), MonitorError>;
}

/// One JSON record per pack: `<dir>/<pack>_max17055_params.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, pack: &str) -> PathBuf {
        self.dir.join(format!("{pack}_max17055_params.json"))
    }
}

impl ParamStore for JsonFileStore {
    fn load(&self, pack: &str) -> Result<Option<LearnedParams>, MonitorError> {
        let path = self.path_for(pack);
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MonitorError::Store(format!("read {}: {e}", path.display())));
            }
        };
        let record = psu_config::load_params_json(&text)
            .map_err(|e| MonitorError::Store(format!("parse {}: {e}", path.display())))?;
        Ok(Some(LearnedParams::from(&record)))
    }

    fn save(&self, pack: &str, params: &LearnedParams) -> Result<(), MonitorError> {
        let path = self.path_for(pack);
        let record = psu_config::PersistedParams::from(&params.stamped_if_missing());
        let json = record
            .to_json()
            .map_err(|e| MonitorError::Store(e.to_string()))?;
        write_atomic(&path, json.as_bytes())
            .map_err(|e| MonitorError::Store(format!("write {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "learned params saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("batt_pack_v2").unwrap().is_none());
    }

    #[test]
    fn save_then_load_keeps_raw_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let p = LearnedParams::new(201, 9278, 1790, 4896, 210);
        store.save("batt_pack_v2", &p).unwrap();

        let back = store.load("batt_pack_v2").unwrap().unwrap();
        assert_eq!(back, p);
        assert_eq!(back.cycles, 210);
        assert!(back.calibrated_on.is_some());
        assert!(
            dir.path()
                .join("nested/batt_pack_v2_max17055_params.json")
                .exists()
        );
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(store.path_for("p"), "{not json").unwrap();
        let err = store.load("p").unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
