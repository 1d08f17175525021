use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading inputs. Layout itself never fails: degenerate inputs
/// produce an empty or partial layout instead.
#[derive(Debug, Error)]
pub enum DeclutterError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data file: {0}")]
    Data(#[from] serde_json::Error),

    #[error("invalid config file: {0}")]
    Config(#[from] json5::Error),

    #[error("unknown tolerance preset `{0}` (expected `standard` or `compact`)")]
    UnknownPreset(String),

    #[error("unknown theme `{0}` (expected `modern` or `classic`)")]
    UnknownTheme(String),
}

pub type Result<T> = std::result::Result<T, DeclutterError>;

pub(crate) fn read_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| DeclutterError::Io {
        path: path.to_path_buf(),
        source,
    })
}
