//! Filesystem storage for generated emails.
//!
//! Layout: `<root>/<theme>/<theme>.<content>.html` and `.txt`, with both
//! names slugified.

use std::path::{Path, PathBuf};

use slug::slugify;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::application::render::RenderedEmail;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("`{name}` cannot be used in an artifact path")]
    InvalidName { name: String },
    #[error("artifact io failed for `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Html,
    PlainText,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::PlainText => "txt",
        }
    }
}

/// Output directory holding one sub-directory per theme.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of one artifact; does not touch the filesystem.
    pub fn path_for(
        &self,
        theme: &str,
        content: &str,
        kind: ArtifactKind,
    ) -> Result<PathBuf, ArtifactError> {
        let theme = path_segment(theme)?;
        let content = path_segment(content)?;
        Ok(self
            .root
            .join(&theme)
            .join(format!("{theme}.{content}.{}", kind.extension())))
    }

    /// Write one artifact, creating the theme directory when needed.
    pub async fn write(
        &self,
        theme: &str,
        content: &str,
        kind: ArtifactKind,
        body: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(theme, content, kind)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| ArtifactError::io(parent, err))?;
        }
        fs::write(&path, body)
            .await
            .map_err(|err| ArtifactError::io(&path, err))?;

        debug!(
            target = "infra::artifacts",
            path = %path.display(),
            bytes = body.len(),
            "Artifact written"
        );
        Ok(path)
    }

    pub async fn read(
        &self,
        theme: &str,
        content: &str,
        kind: ArtifactKind,
    ) -> Result<String, ArtifactError> {
        let path = self.path_for(theme, content, kind)?;
        fs::read_to_string(&path)
            .await
            .map_err(|err| ArtifactError::io(&path, err))
    }

    /// Write both renderings of one email.
    pub async fn write_email(
        &self,
        theme: &str,
        content: &str,
        email: &RenderedEmail,
    ) -> Result<[PathBuf; 2], ArtifactError> {
        let html = self
            .write(theme, content, ArtifactKind::Html, &email.html)
            .await?;
        let text = self
            .write(theme, content, ArtifactKind::PlainText, &email.plain_text)
            .await?;
        Ok([html, text])
    }

    /// Read back both renderings written by [`ArtifactStore::write_email`].
    pub async fn read_email(&self, theme: &str, content: &str) -> Result<RenderedEmail, ArtifactError> {
        Ok(RenderedEmail {
            html: self.read(theme, content, ArtifactKind::Html).await?,
            plain_text: self.read(theme, content, ArtifactKind::PlainText).await?,
        })
    }
}

fn path_segment(name: &str) -> Result<String, ArtifactError> {
    let segment = slugify(name);
    if segment.is_empty() {
        return Err(ArtifactError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(segment)
}
