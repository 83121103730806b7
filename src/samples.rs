//! Example emails shipped with the binary, plus loading of user content files.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::content::EmailContent;

const BUILTIN: [(&str, &str); 6] = [
    ("welcome", include_str!("../samples/welcome.toml")),
    ("reset", include_str!("../samples/reset.toml")),
    ("receipt", include_str!("../samples/receipt.toml")),
    ("maintenance", include_str!("../samples/maintenance.toml")),
    ("invite_code", include_str!("../samples/invite_code.toml")),
    ("leave", include_str!("../samples/leave.toml")),
];

/// Named email content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: String,
    pub content: EmailContent,
}

impl Sample {
    pub fn new(name: impl Into<String>, content: EmailContent) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read content file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("content `{name}` is not valid TOML: {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot derive a content name from `{path}`")]
    Unnamed { path: PathBuf },
}

/// All built-in samples in a stable order.
pub fn builtin() -> Result<Vec<Sample>, SampleError> {
    BUILTIN
        .iter()
        .map(|(name, source)| parse(name, source))
        .collect()
}

/// Parse TOML email content.
pub fn parse(name: &str, source: &str) -> Result<Sample, SampleError> {
    let content = toml::from_str(source).map_err(|source| SampleError::Parse {
        name: name.to_string(),
        source,
    })?;
    Ok(Sample::new(name, content))
}

/// Load a content file, naming the sample after the file stem.
pub async fn load(path: &Path) -> Result<Sample, SampleError> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| SampleError::Unnamed {
            path: path.to_path_buf(),
        })?;

    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SampleError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    parse(name, &source)
}
