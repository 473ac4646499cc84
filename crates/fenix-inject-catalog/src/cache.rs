//! Decides whether a previously assembled manifest is still usable.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use fenix_inject_config::{Config, SourceDescriptor};

use crate::error::CatalogError;

/// Whether the manifest at `manifest_path` should be rebuilt.
///
/// A missing manifest is simply stale; every other filesystem failure
/// propagates.
pub fn is_expired(
    manifest_path: &Path,
    config: &Config,
    config_path: Option<&Path>,
) -> Result<bool, CatalogError> {
    if config.max_age <= 0 {
        return Ok(true);
    }

    let manifest_mtime = match fs::metadata(manifest_path) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = config_path {
        if mtime(path)? > manifest_mtime {
            return Ok(true);
        }
    }

    for name in &config.use_sources {
        // resolution failures surface during assembly, not here
        if let Ok(SourceDescriptor::LocalFiles { paths }) = config.resolve_source(name) {
            for path in &paths {
                if mtime(path)? > manifest_mtime {
                    return Ok(true);
                }
            }
        }
    }

    let age = SystemTime::now()
        .duration_since(manifest_mtime)
        .unwrap_or_default();
    Ok(age > Duration::from_secs(config.max_age as u64))
}

fn mtime(path: &Path) -> Result<SystemTime, CatalogError> {
    Ok(fs::metadata(path)?.modified()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use fenix_inject_config::SourceTable;

    fn backdate(path: &Path, seconds: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(seconds))
            .unwrap();
    }

    fn write_manifest(dir: &Path) -> PathBuf {
        let path = dir.join("collection.json");
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_non_positive_max_age_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path());

        let mut config = Config::default();
        config.max_age = 0;
        assert!(is_expired(&manifest, &config, None).unwrap());

        config.max_age = -5;
        assert!(is_expired(&manifest, &config, None).unwrap());
    }

    #[test]
    fn test_absent_manifest_is_expired_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let missing = dir.path().join("missing.json");
        assert!(is_expired(&missing, &config, None).unwrap());
    }

    #[test]
    fn test_fresh_manifest_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path());

        let mut config = Config::default();
        config.max_age = 3600;
        assert!(!is_expired(&manifest, &config, None).unwrap());
    }

    #[test]
    fn test_manifest_older_than_max_age_is_expired() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path());
        backdate(&manifest, 3601);

        let mut config = Config::default();
        config.max_age = 3600;
        assert!(is_expired(&manifest, &config, None).unwrap());
    }

    #[test]
    fn test_manifest_just_inside_max_age_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path());
        backdate(&manifest, 3599);

        let mut config = Config::default();
        config.max_age = 3600;
        assert!(!is_expired(&manifest, &config, None).unwrap());
    }

    #[test]
    fn test_newer_config_file_expires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path());
        backdate(&manifest, 100);

        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        let mut config = Config::default();
        config.max_age = 3600;
        assert!(is_expired(&manifest, &config, Some(&config_path)).unwrap());
    }

    #[test]
    fn test_newer_local_source_expires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path());
        backdate(&manifest, 100);

        let record_path = dir.path().join("record.json");
        fs::write(&record_path, "{\"guid\": \"a@x\"}").unwrap();

        let mut config = Config::default();
        config.max_age = 3600;
        config.sources.insert(
            "local".to_string(),
            SourceTable {
                kind: Some("file".to_string()),
                paths: Some(vec![record_path]),
                ..Default::default()
            },
        );
        config.use_sources.push("local".to_string());

        assert!(is_expired(&manifest, &config, None).unwrap());
    }

    #[test]
    fn test_missing_local_source_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path());

        let mut config = Config::default();
        config.max_age = 3600;
        config.sources.insert(
            "local".to_string(),
            SourceTable {
                kind: Some("file".to_string()),
                paths: Some(vec![dir.path().join("gone.json")]),
                ..Default::default()
            },
        );
        config.use_sources.push("local".to_string());

        assert!(matches!(
            is_expired(&manifest, &config, None),
            Err(CatalogError::Io(_))
        ));
    }
}
