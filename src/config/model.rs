//! Serde data structures for the Hopper configuration file.
//!
//! Contains [`Config`] (the root), [`Defaults`], [`BroadcastConfig`]
//! and [`DestinationConfig`]. All types derive `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_timeout() -> u64 {
    30_000
}

const fn default_queue() -> usize {
    64
}

const fn default_true() -> bool {
    true
}

fn is_default_timeout(v: &u64) -> bool {
    *v == default_timeout()
}

fn is_default_queue(v: &usize) -> bool {
    *v == default_queue()
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_defaults(v: &Defaults) -> bool {
    v.timeout == default_timeout() && v.strip_hop_by_hop
}

fn is_default_broadcast(v: &BroadcastConfig) -> bool {
    v.queue == default_queue()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "is_default_defaults")]
    pub defaults: Defaults,

    #[serde(default, skip_serializing_if = "is_default_broadcast")]
    pub broadcast: BroadcastConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<DestinationConfig>,
}

impl Config {
    #[must_use]
    pub fn active_destinations(&self) -> usize {
        self.destinations.iter().filter(|d| d.active).count()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Per-replay timeout in milliseconds; `0` disables the deadline.
    #[serde(
        default = "default_timeout",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: u64,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub strip_hop_by_hop: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            strip_hop_by_hop: default_true(),
        }
    }
}

impl Defaults {
    #[must_use]
    pub const fn replay_timeout(&self) -> Option<Duration> {
        if self.timeout == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout))
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Lines buffered per observer before new lines are dropped for it.
    #[serde(default = "default_queue", skip_serializing_if = "is_default_queue")]
    pub queue: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue: default_queue(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,
}
