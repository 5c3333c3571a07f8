//! Attribute-source seam for the hosting world.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::AttributeError;

/// Read-side capability of the world entity carrying the desired-channel
/// attribute.
///
/// `Ok(None)` means the attribute is currently unset: the agent skips the
/// pass. `Err` means the host entity itself could not be read, which the
/// agent treats as the entity being gone.
#[async_trait]
pub trait AttributeSource: Send + Sync {
    async fn desired_channel(&self) -> Result<Option<String>, AttributeError>;
}

/// Attribute source backed by a file the world server writes.
///
/// An absent file is an unset attribute. Surrounding whitespace is trimmed
/// and an empty file counts as unset too.
pub struct FileAttributeSource {
    path: PathBuf,
}

impl FileAttributeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AttributeSource for FileAttributeSource {
    async fn desired_channel(&self) -> Result<Option<String>, AttributeError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let value = contents.trim();
                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(value.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AttributeError {
                reason: format!("{}: {}", self.path.display(), e),
            }),
        }
    }
}
