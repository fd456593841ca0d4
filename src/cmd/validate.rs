//! `hopper validate`: check a configuration file offline.
//!
//! Hard errors (bad URL, bad method, two defaults, duplicates) fail the
//! command. A config that parses but would answer callers with errors at
//! runtime, such as one with no usable default, passes with advisories.

use serde::Serialize;

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::{Config, DestinationConfig};
use crate::config::sources::parse_config_str;
use crate::config::validation;
use crate::error::{HopperError, ValidationError};

/// One destination as it appears in the JSON report.
#[derive(Serialize)]
struct DestinationSummary<'a> {
    url: &'a str,
    method: &'a str,
    active: bool,
    default: bool,
}

impl<'a> From<&'a DestinationConfig> for DestinationSummary<'a> {
    fn from(dest: &'a DestinationConfig) -> Self {
        Self {
            url: &dest.url,
            method: if dest.method.is_empty() { "*" } else { dest.method.as_str() },
            active: dest.active,
            default: dest.default,
        }
    }
}

pub fn execute(args: &ValidateArgs) -> Result<(), HopperError> {
    let path = &args.config;
    if !path.exists() {
        return Err(HopperError::ConfigFileNotFound { path: path.clone() });
    }

    let display = path.display().to_string();
    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &display)?;

    if let Err(errors) = validation::validate(&config) {
        match args.format {
            ValidateFormat::Text => print_errors_text(&display, &errors),
            ValidateFormat::Json => println!("{}", errors_json(&errors)),
        }
        return Err(HopperError::ConfigValidation { errors });
    }

    let notes = advisories(&config);
    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&display, &config)
            );
            for note in &notes {
                println!("  ! {note}");
            }
        }
        ValidateFormat::Json => println!("{}", valid_json(&config, &notes)),
    }
    Ok(())
}

/// Runtime problems a structurally valid config would still produce.
fn advisories(config: &Config) -> Vec<String> {
    let mut notes = Vec::new();

    if config.active_destinations() == 0 {
        notes.push("no active destinations: every request will be answered 502".to_string());
        return notes;
    }

    match config.destinations.iter().find(|d| d.default) {
        None => notes.push(
            "no default destination: every request will be answered 500 \
             until one is marked default"
                .to_string(),
        ),
        Some(d) if !d.active => notes.push(format!(
            "default destination {} is inactive: requests will be answered 500",
            d.url
        )),
        Some(d) if !d.method.is_empty() => notes.push(format!(
            "default destination {} only accepts {}: other methods will be answered 500",
            d.url, d.method
        )),
        Some(_) => {}
    }

    if config.defaults.timeout == 0 {
        notes.push("replay timeout disabled: a hung destination holds its request open".into());
    }

    notes
}

fn print_errors_text(display: &str, errors: &[ValidationError]) {
    eprintln!("\u{2717} {display} has {} errors\n", errors.len());
    for error in errors {
        eprintln!("{error}");
    }
}

fn errors_json(errors: &[ValidationError]) -> serde_json::Value {
    let errors: Vec<serde_json::Value> = errors
        .iter()
        .map(|e| {
            serde_json::json!({
                "destination": e.destination,
                "field": e.field,
                "message": e.message,
                "suggestion": e.suggestion,
            })
        })
        .collect();
    serde_json::json!({ "valid": false, "errors": errors })
}

fn valid_json(config: &Config, notes: &[String]) -> serde_json::Value {
    let destinations: Vec<DestinationSummary<'_>> =
        config.destinations.iter().map(DestinationSummary::from).collect();
    serde_json::json!({
        "valid": true,
        "timeout_ms": config.defaults.timeout,
        "broadcast_queue": config.broadcast.queue,
        "destinations": destinations,
        "advisories": notes,
    })
}
