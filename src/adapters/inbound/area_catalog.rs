use crate::common::{DomainError, DomainResult};
use crate::domains::traversal::{AreaDefinition, AreaSource};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads area definitions from `<base>/<id>.toml`.
pub struct FilesystemAreaSource {
    base: PathBuf,
}

impl FilesystemAreaSource {
    /// Falls back to `TRAVERSAL_AREAS_DIR`, then `resources/areas`.
    pub fn new(base: Option<PathBuf>) -> Self {
        let base = base.unwrap_or_else(|| match env::var("TRAVERSAL_AREAS_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => PathBuf::from("resources/areas"),
        });
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.base.join(format!("{}.toml", id))
    }

    /// Load every area in `ids`, stopping at the first one that is missing or
    /// invalid.
    pub fn load_all(&self, ids: &[String]) -> DomainResult<Vec<AreaDefinition>> {
        ids.iter().map(|id| self.load_area(id)).collect()
    }
}

impl AreaSource for FilesystemAreaSource {
    fn list_areas(&self) -> DomainResult<Vec<String>> {
        let entries = fs::read_dir(&self.base).map_err(|e| {
            DomainError::InfrastructureError(format!("{}: {}", self.base.display(), e))
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DomainError::InfrastructureError(e.to_string()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load_area(&self, id: &str) -> DomainResult<AreaDefinition> {
        let path = self.path_for(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DomainError::AreaNotFound { id: id.to_string() });
            }
            Err(e) => {
                return Err(DomainError::InfrastructureError(format!("{}: {}", path.display(), e)));
            }
        };

        let area: AreaDefinition = toml::from_str(&content).map_err(|e| DomainError::InvalidArea {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        if area.id != id {
            return Err(DomainError::InvalidArea {
                id: id.to_string(),
                reason: format!("file declares id '{}'", area.id),
            });
        }
        area.validate()?;
        Ok(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const GATE: &str = r#"
id = "gate"
name = "Gate course"
obstacles = [1]

[bounds]
min_x = 0.0
max_x = 20.0
min_y = 0.0
max_y = 20.0

[start]
x = 1.0
y = 1.0

[stages]
enter = "open_gate"
act = "collect"
return_home = "teleport_home"

[[checkpoints]]
label = "first"
target = { x = 5.0, y = 1.0 }
settle_ms = 600

[[checkpoints.requirements]]
obstacle = 1
type = "min_distance"
reference = "agent"
min_distance = 5.0
"#;

    #[test]
    fn test_load_and_list() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("gate.toml"), GATE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = FilesystemAreaSource::new(Some(dir.path().to_path_buf()));
        assert_eq!(source.list_areas().unwrap(), vec!["gate".to_string()]);

        let area = source.load_area("gate").unwrap();
        assert_eq!(area.display_name(), "Gate course");
        assert_eq!(area.checkpoints.len(), 1);
        assert_eq!(area.checkpoints[0].requirements.len(), 1);
    }

    #[test]
    fn test_missing_area() {
        let dir = tempdir().unwrap();
        let source = FilesystemAreaSource::new(Some(dir.path().to_path_buf()));
        assert!(matches!(
            source.load_area("nowhere"),
            Err(DomainError::AreaNotFound { .. })
        ));
    }

    #[test]
    fn test_mismatched_id_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("other.toml"), GATE).unwrap();
        let source = FilesystemAreaSource::new(Some(dir.path().to_path_buf()));
        assert!(matches!(
            source.load_area("other"),
            Err(DomainError::InvalidArea { .. })
        ));
    }
}
