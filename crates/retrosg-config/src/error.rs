//! Errors raised while loading, saving or checking an analysis config.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read analysis config {path:?}: {source}")]
    ReadFile {
        /// Config file path.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be written.
    #[error("cannot write analysis config {path:?}: {source}")]
    WriteFile {
        /// Config file path.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// The directory for a new config could not be created.
    #[error("cannot create config directory {path:?}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML or has wrongly typed settings.
    #[error("malformed analysis config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("cannot render analysis config as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The settings are unusable for the session's sample rate.
    #[error("invalid analysis config: {0}")]
    Validation(#[from] crate::validation::ValidationError),
}

impl ConfigError {
    /// `ReadFile` for `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// `WriteFile` for `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// `CreateDir` for `path`.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use std::error::Error;
    use std::io::ErrorKind;

    fn denied() -> std::io::Error {
        std::io::Error::new(ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn io_variants_name_the_session_file() {
        let read = ConfigError::read_file("sessions/room_a.toml", denied());
        assert!(read.to_string().contains("room_a.toml"), "{read}");
        assert!(read.to_string().starts_with("cannot read analysis config"));

        let write = ConfigError::write_file("sessions/room_a.toml", denied());
        assert!(
            matches!(write, ConfigError::WriteFile { ref path, .. } if path.ends_with("room_a.toml"))
        );

        let dir = ConfigError::create_dir("sessions", denied());
        assert!(dir.to_string().starts_with("cannot create config directory"));
    }

    #[test]
    fn io_variants_keep_their_cause() {
        for err in [
            ConfigError::read_file("a.toml", denied()),
            ConfigError::write_file("a.toml", denied()),
            ConfigError::create_dir("a", denied()),
        ] {
            let cause = err.source().expect("I/O cause");
            assert_eq!(cause.to_string(), "denied");
            assert!(!matches!(err, ConfigError::Validation(_)));
        }
    }

    #[test]
    fn rejected_cutoff_reads_as_invalid_config() {
        let err = ConfigError::from(ValidationError::Invalid {
            field: "taper.high_cut_hz".to_string(),
            reason: "30000 Hz must be below Nyquist (24000 Hz)".to_string(),
        });
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "invalid analysis config: invalid value for 'taper.high_cut_hz': \
             30000 Hz must be below Nyquist (24000 Hz)"
        );
    }

    #[test]
    fn wrongly_typed_setting_is_malformed() {
        let toml_err =
            toml::from_str::<crate::AnalysisConfig>("[windows]\npre_delay_s = \"soon\"")
                .unwrap_err();
        let err = ConfigError::from(toml_err);
        assert!(err.to_string().starts_with("malformed analysis config"));
    }
}
