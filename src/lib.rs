//! Hopper is an HTTP fan-out gateway.
//!
//! Every inbound request is replayed concurrently to each active
//! destination in a runtime-editable directory. The caller receives the
//! response of the single default destination, and a one-line summary of
//! each replay is pushed to every live `/traffic` observer.
//!
//! # Architecture
//!
//! - [`broadcast`] -- The [`Hub`](broadcast::Hub) of observer queues and the
//!   `/traffic` WebSocket handler.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Configuration loading and validation via the
//!   [`ConfigSource`](config::ConfigSource) trait.
//! - [`destinations`] -- `/destinations` REST handlers.
//! - [`directory`] -- The [`Directory`](directory::Directory) trait with
//!   in-memory and `MongoDB` implementations.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- Destination selection, URL composition, concurrent replay,
//!   and relay of the default response.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `mongodb` | `MongoDB` destination directory |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod broadcast;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod destinations;
pub mod directory;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod server;
