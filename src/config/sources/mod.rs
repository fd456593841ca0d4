//! File-backed [`ConfigSource`](super::ConfigSource) and format parsing.
//!
//! Each format sits behind its feature flag. [`format_for_extension`]
//! reports which ones were compiled in; [`parse_config_str`] does the
//! actual deserialization for both the running server and `hopper validate`.

pub mod file_source;

use crate::config::model::Config;
use crate::error::HopperError;

/// Canonical format name for a file extension, `None` when the format
/// is unknown or its feature is disabled.
#[must_use]
pub fn format_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Some("yaml"),

        #[cfg(feature = "json")]
        "json" => Some("json"),

        #[cfg(feature = "toml")]
        "toml" => Some("toml"),

        _ => None,
    }
}

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, HopperError> {
    let parse_error = |source: Box<dyn std::error::Error + Send + Sync>| HopperError::ConfigParse {
        path: path_display.to_string(),
        source,
    };

    match format_for_extension(ext) {
        #[cfg(feature = "yaml")]
        Some("yaml") => serde_yml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        _ => Err(HopperError::UnsupportedFormat(ext.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_has_no_format() {
        assert_eq!(format_for_extension("ini"), None);
        assert!(matches!(
            parse_config_str("ini", "", "hopper.ini"),
            Err(HopperError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yml_is_yaml() {
        assert_eq!(format_for_extension("yml"), Some("yaml"));
        let config = parse_config_str("yml", "destinations: []\n", "hopper.yml").unwrap();
        assert!(config.destinations.is_empty());
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn parse_error_names_the_file() {
        let err = parse_config_str("yaml", "destinations: 7\n", "conf/hopper.yaml").unwrap_err();
        assert!(err.to_string().contains("conf/hopper.yaml"));
    }
}
