//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends and
//! [`resolve_source`], which picks a file source from an explicit path
//! or by auto-detecting `hopper.{yaml,yml,json,toml}` in the working
//! directory. Submodules provide the data model, validation logic, and
//! concrete source implementations.

pub mod model;
pub mod sources;
pub mod validation;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::HopperError;
use model::Config;

/// File names tried, in order, when no `--config` is given.
pub const AUTO_DETECT_CANDIDATES: [&str; 4] =
    ["hopper.yaml", "hopper.yml", "hopper.json", "hopper.toml"];

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<Config, HopperError>;
}

/// Build a source for `path`, choosing the parser from its extension.
pub fn create_file_source(path: &Path) -> Result<Box<dyn ConfigSource>, HopperError> {
    Ok(Box::new(sources::file_source::FileSource::open(path.to_path_buf())?))
}

/// Resolve the config source. Returns `Ok(None)` when no explicit path was
/// given and nothing was auto-detected; the caller then starts with an
/// empty directory.
pub async fn resolve_source(
    explicit: Option<&Path>,
) -> Result<Option<Box<dyn ConfigSource>>, HopperError> {
    if let Some(path) = explicit {
        return create_file_source(path).map(Some);
    }

    for name in &AUTO_DETECT_CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return create_file_source(&path).map(Some);
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_unsupported() {
        let result = create_file_source(Path::new("hopper.ini"));
        assert!(matches!(result, Err(HopperError::UnsupportedFormat(ext)) if ext == "ini"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_extension_selects_yaml_source() {
        let source = create_file_source(Path::new("conf/hopper.yml")).unwrap();
        assert_eq!(source.name(), "yaml");
    }
}
