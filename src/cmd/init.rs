//! `hopper init`: generate a starter configuration file.
//!
//! Creates a YAML, JSON, or TOML config file with either minimal
//! or fully documented templates.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::HopperError;

pub fn execute(args: &InitArgs) -> Result<(), HopperError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("hopper.{}", args.format.extension())));

    if output.exists() {
        return Err(HopperError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# Hopper config

destinations:
  - url: "http://localhost:8081"
    default: true
  - url: "http://localhost:8082"
"#;

const YAML_FULL: &str = r#"# Hopper config
#
# Every inbound request is replayed to each active destination whose
# method matches. The caller receives the default destination's response.

defaults:
  timeout: 30000            # Per-destination replay timeout in ms (0 = none)
  strip_hop_by_hop: true    # Drop Connection, TE, Upgrade, etc. before replaying

broadcast:
  queue: 64                 # Lines buffered per /traffic observer

destinations:
  # The default destination's response is relayed to the caller.
  # At most one destination may be the default.
  - url: "http://localhost:8081"
    default: true

  # method restricts a destination to one HTTP method; omit to accept all.
  - url: "http://localhost:8082/audit"
    method: "POST"

  # Inactive destinations stay in the directory but receive nothing.
  - url: "http://localhost:8083"
    active: false
"#;

const JSON_MINIMAL: &str = r#"{
  "destinations": [
    {
      "url": "http://localhost:8081",
      "default": true
    },
    {
      "url": "http://localhost:8082"
    }
  ]
}
"#;

const JSON_FULL: &str = r#"{
  "defaults": {
    "timeout": 30000,
    "strip_hop_by_hop": true
  },
  "broadcast": {
    "queue": 64
  },
  "destinations": [
    {
      "url": "http://localhost:8081",
      "default": true
    },
    {
      "url": "http://localhost:8082/audit",
      "method": "POST"
    },
    {
      "url": "http://localhost:8083",
      "active": false
    }
  ]
}
"#;

const TOML_MINIMAL: &str = r#"# Hopper config

[[destinations]]
url = "http://localhost:8081"
default = true

[[destinations]]
url = "http://localhost:8082"
"#;

const TOML_FULL: &str = r#"# Hopper config
#
# Every inbound request is replayed to each active destination whose
# method matches. The caller receives the default destination's response.

[defaults]
timeout = 30000             # Per-destination replay timeout in ms (0 = none)
strip_hop_by_hop = true     # Drop Connection, TE, Upgrade, etc. before replaying

[broadcast]
queue = 64                  # Lines buffered per /traffic observer

# The default destination's response is relayed to the caller.
[[destinations]]
url = "http://localhost:8081"
default = true

# method restricts a destination to one HTTP method; omit to accept all.
[[destinations]]
url = "http://localhost:8082/audit"
method = "POST"

# Inactive destinations stay in the directory but receive nothing.
[[destinations]]
url = "http://localhost:8083"
active = false
"#;
