//! Async file-based config source.
//!
//! [`FileSource`] picks its parser from the file extension when it is
//! opened, reads the file through Tokio on every [`load`](ConfigSource::load),
//! and validates the result before handing it out.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{format_for_extension, parse_config_str};
use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::ConfigSource;
use crate::error::HopperError;

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    format: &'static str,
}

impl FileSource {
    /// Fails with [`HopperError::UnsupportedFormat`] when the extension
    /// has no compiled-in parser.
    pub fn open(path: PathBuf) -> Result<Self, HopperError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let format = format_for_extension(ext)
            .ok_or_else(|| HopperError::UnsupportedFormat(ext.to_string()))?;
        Ok(Self { path, format })
    }

    async fn read_content(&self) -> Result<String, HopperError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HopperError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                HopperError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.format
    }

    async fn load(&self) -> Result<Config, HopperError> {
        let content = self.read_content().await?;
        let config = parse_config_str(self.format, &content, &self.path.display().to_string())?;
        validate(&config).map_err(|errors| HopperError::ConfigValidation { errors })?;
        Ok(config)
    }
}
