//! Settings file materialization.

use std::path::{Path, PathBuf};

use agentrun_core::ConfigurationError;
use tracing::{debug, info};

/// Validate `raw` as JSON and write it verbatim to `path`.
///
/// Absent settings are a no-op. Validation happens before the filesystem is
/// touched, and the original text is written rather than a re-serialization
/// so key order and formatting survive. An existing file is overwritten.
pub async fn materialize(
    raw: Option<&str>,
    path: &Path,
) -> Result<Option<PathBuf>, ConfigurationError> {
    let Some(raw) = raw else {
        debug!("No settings supplied");
        return Ok(None);
    };

    serde_json::from_str::<serde_json::Value>(raw).map_err(ConfigurationError::InvalidConfig)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| persist_error(path, source))?;
    }
    tokio::fs::write(path, raw)
        .await
        .map_err(|source| persist_error(path, source))?;

    info!(path = %path.display(), bytes = raw.len(), "Wrote agent settings");
    Ok(Some(path.to_path_buf()))
}

fn persist_error(path: &Path, source: std::io::Error) -> ConfigurationError {
    ConfigurationError::Persist {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_settings_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".agentrun").join("settings.json");

        assert!(materialize(None, &path).await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_truncated_json_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".agentrun").join("settings.json");

        let err = materialize(Some("{\"a\":1"), &path).await.unwrap_err();

        assert!(matches!(err, ConfigurationError::InvalidConfig(_)));
        assert!(err.to_string().contains("EOF"));
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_writes_raw_text_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".agentrun").join("settings.json");
        let raw = "{\n  \"zeta\": 1,\n  \"alpha\": [true, false]\n}";

        let written = materialize(Some(raw), &path).await.unwrap();

        assert_eq!(written.as_deref(), Some(path.as_path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{\"old\": true, \"extra\": 1}").unwrap();

        materialize(Some("{\"new\":true}"), &path).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"new\":true}");
    }
}
