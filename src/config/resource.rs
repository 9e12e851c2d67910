//! Configuration resources and their resolution into module sources.

use std::path::{Path, PathBuf};

use url::Url;

use super::ConfigError;

/// `file:` URI of `path`, made absolute against the current directory.
pub(crate) fn file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Url::from_file_path(&absolute)
        .map_or_else(|()| format!("file://{}", absolute.display()), String::from)
}

/// A configuration resource: either a file on the local filesystem or
/// in-memory content identified by a logical URI.
#[derive(Debug, Clone)]
pub struct Resource {
    uri: String,
    file: Option<PathBuf>,
    content: Option<Vec<u8>>,
}

impl Resource {
    /// A file-backed resource.
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            uri: file_uri(&path),
            file: Some(path),
            content: None,
        }
    }

    /// A resource that is not backed by a file, such as bundled or fetched
    /// content. `content` must be UTF-8.
    pub fn in_memory(uri: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            uri: uri.into(),
            file: None,
            content: Some(content.into()),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Extension of the file name, or of the last URI segment.
    pub fn extension(&self) -> Option<&str> {
        match &self.file {
            Some(path) => path.extension().and_then(|ext| ext.to_str()),
            None => {
                let segment = self.uri.rsplit('/').next().unwrap_or(&self.uri);
                segment
                    .rsplit_once('.')
                    .map(|(_, ext)| ext)
                    .filter(|ext| !ext.is_empty())
            }
        }
    }

    /// File stem or last URI segment without extension.
    pub fn stem(&self) -> &str {
        let segment = match &self.file {
            Some(path) => path.file_name().and_then(|name| name.to_str()).unwrap_or(&self.uri),
            None => self.uri.rsplit('/').next().unwrap_or(&self.uri),
        };
        segment.split_once('.').map_or(segment, |(stem, _)| stem)
    }

    /// Reads the whole resource as UTF-8 text.
    pub fn read_to_string(&self) -> Result<String, ConfigError> {
        match (&self.file, &self.content) {
            (Some(path), _) => std::fs::read_to_string(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConfigError::FileNotFound(path.clone())
                } else {
                    ConfigError::ReadError {
                        location: path.display().to_string(),
                        source: e,
                    }
                }
            }),
            (None, Some(bytes)) => {
                String::from_utf8(bytes.clone()).map_err(|source| ConfigError::InvalidUtf8 {
                    uri: self.uri.clone(),
                    source,
                })
            }
            (None, None) => Ok(String::new()),
        }
    }
}

/// A unit of configuration text handed to an evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// Canonical absolute path, so relative imports resolve the same way as
    /// evaluating the file directly.
    File(PathBuf),
    Text { uri: String, text: String },
}

impl ModuleSource {
    /// Resolves a resource. File-backed resources are canonicalized and never
    /// read here; everything else is read in full.
    pub fn from_resource(resource: &Resource) -> Result<Self, ConfigError> {
        match resource.path() {
            Some(path) => {
                let canonical = path.canonicalize().map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        ConfigError::FileNotFound(path.to_path_buf())
                    } else {
                        ConfigError::ReadError {
                            location: path.display().to_string(),
                            source: e,
                        }
                    }
                })?;
                Ok(ModuleSource::File(canonical))
            }
            None => Ok(ModuleSource::Text {
                uri: resource.uri().to_string(),
                text: resource.read_to_string()?,
            }),
        }
    }

    pub fn uri(&self) -> String {
        match self {
            ModuleSource::File(path) => file_uri(path),
            ModuleSource::Text { uri, .. } => uri.clone(),
        }
    }
}
