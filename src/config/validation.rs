//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as malformed destination URLs, bad HTTP methods, several
//! defaults, or an empty broadcast queue. Returns a list of
//! [`ValidationError`] values with per-field suggestions. The same
//! per-field checks back the destination REST API.

use url::Url;

use super::model::Config;
use crate::error::ValidationError;

/// Validate a single destination URL. Returns `Ok(())` or a human-readable error.
pub fn validate_destination_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("url cannot be empty".into());
    }
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

/// Validate a method filter. Empty means "any method".
///
/// Matching at dispatch time is case-sensitive, so a lowercase standard
/// method is almost always a mistake and is rejected with a suggestion.
pub fn validate_method(method: &str) -> Result<(), (String, Option<String>)> {
    if method.is_empty() {
        return Ok(());
    }
    if http::Method::from_bytes(method.as_bytes()).is_err() {
        return Err((format!("'{method}' is not a valid HTTP method"), None));
    }
    let upper = method.to_ascii_uppercase();
    if upper != method && is_standard_method(&upper) {
        return Err((
            format!("'{method}' never matches, methods are compared case-sensitively"),
            Some(format!("did you mean '{upper}'?")),
        ));
    }
    Ok(())
}

fn is_standard_method(method: &str) -> bool {
    matches!(
        method,
        "GET" | "POST" | "PUT" | "DELETE" | "PATCH" | "HEAD" | "OPTIONS" | "CONNECT" | "TRACE"
    )
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.broadcast.queue == 0 {
        errors.push(ValidationError {
            destination: "(root)".into(),
            field: "broadcast.queue".into(),
            message: "queue must hold at least one line".into(),
            suggestion: Some("the default is 64".into()),
        });
    }

    let default_count = config.destinations.iter().filter(|d| d.default).count();
    if default_count > 1 {
        errors.push(ValidationError {
            destination: "(root)".into(),
            field: "destinations".into(),
            message: format!("{default_count} destinations marked as default, at most 1 allowed"),
            suggestion: None,
        });
    }

    let mut seen = std::collections::HashSet::new();

    for (i, dest) in config.destinations.iter().enumerate() {
        let id = format!("destinations[{i}]");

        // An inactive destination may be parked without a URL.
        if dest.active || !dest.url.is_empty() {
            if let Err(msg) = validate_destination_url(&dest.url) {
                errors.push(ValidationError {
                    destination: id.clone(),
                    field: "url".into(),
                    message: msg,
                    suggestion: None,
                });
            }
        }

        if let Err((msg, suggestion)) = validate_method(&dest.method) {
            errors.push(ValidationError {
                destination: id.clone(),
                field: "method".into(),
                message: msg,
                suggestion,
            });
        }

        if !dest.url.is_empty() && !seen.insert((&dest.url, &dest.method)) {
            errors.push(ValidationError {
                destination: id,
                field: "url".into(),
                message: "duplicate destination (same url and method)".into(),
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} destinations, {} active\n",
        config.destinations.len(),
        config.active_destinations()
    )];

    for dest in &config.destinations {
        let method = if dest.method.is_empty() {
            "*"
        } else {
            dest.method.as_str()
        };
        let mut flags = Vec::new();
        if dest.default {
            flags.push("default");
        }
        if !dest.active {
            flags.push("inactive");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        lines.push(format!("  {method:<7} -> {}{flags}", dest.url));
    }

    lines.push(format!(
        "\n  replay timeout: {}",
        config
            .defaults
            .replay_timeout()
            .map_or_else(|| "none".to_string(), |t| format!("{}ms", t.as_millis()))
    ));

    format!("{} is valid\n{}", path, lines.join("\n"))
}
