//! Reading and writing saved session configurations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parrot_types::PersistedConfiguration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration file {} is not valid: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode configuration: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write configuration file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads a configuration written by [`write_configuration`] or by older
/// releases using the single inlet/outlet layout.
pub fn read_configuration(path: &Path) -> Result<PersistedConfiguration, ConfigFileError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let configuration: PersistedConfiguration = serde_json::from_str(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        sources = configuration.sources.len(),
        drains = configuration.drains.len(),
        "read configuration"
    );
    Ok(configuration)
}

/// Writes `configuration` as pretty-printed JSON, replacing `path` as a whole.
pub fn write_configuration(path: &Path, configuration: &PersistedConfiguration) -> Result<(), ConfigFileError> {
    let content = serde_json::to_string_pretty(configuration).map_err(ConfigFileError::Encode)?;
    let write_error = |source: io::Error| ConfigFileError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    write_atomic(path, &content).map_err(write_error)?;
    debug!(path = %path.display(), "wrote configuration");
    Ok(())
}

fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let temporary_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|extension| extension.to_str()).unwrap_or("json")
    ));
    fs::write(&temporary_path, content)?;
    fs::rename(&temporary_path, path)
}

#[cfg(test)]
mod tests {
    use parrot_types::{NamedConfiguration, SerializedDrain};
    use serde_json::json;

    use super::*;

    fn configuration() -> PersistedConfiguration {
        PersistedConfiguration {
            sources: Vec::new(),
            drains: vec![SerializedDrain {
                name: "console".into(),
                selections: vec!["stdout".into()],
                configuration: json!({}),
                outlets: vec![NamedConfiguration::new("plain", json!({"useColor": false, "useUnicode": false}))],
            }],
        }
    }

    #[test]
    fn written_configurations_read_back_unchanged() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("nested").join("config.json");

        write_configuration(&path, &configuration()).unwrap();

        assert_eq!(read_configuration(&path).unwrap(), configuration());
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
        assert!(fs::read_to_string(&path).unwrap().contains("\n  \"sources\": []"));
    }

    #[test]
    fn rewrites_replace_the_previous_content() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("config.json");
        fs::write(&path, "{\"sources\": [], \"drains\": [], \"stale\": true}").unwrap();

        write_configuration(&path, &PersistedConfiguration::default()).unwrap();

        assert!(!fs::read_to_string(&path).unwrap().contains("stale"));
    }

    #[test]
    fn missing_and_malformed_files_name_the_path() {
        let directory = tempfile::tempdir().unwrap();
        let missing = directory.path().join("missing.json");
        let error = read_configuration(&missing).unwrap_err();
        assert!(matches!(error, ConfigFileError::Read { .. }));
        assert!(error.to_string().contains("missing.json"), "{error}");

        let malformed = directory.path().join("malformed.json");
        fs::write(&malformed, "{ not json").unwrap();
        assert!(matches!(read_configuration(&malformed), Err(ConfigFileError::Parse { .. })));
    }
}
