//! Domain types shared by the SongBridge server, provider client and CLI.
//!
//! - [`types`] - task ids and completion records.
//! - [`registry`] - the task-id → completion store written by the webhook
//!   receiver and read by the status endpoint.
//! - [`callback`] - classification of inbound provider callbacks.
//! - [`envelope`] - tolerant field lookup over provider JSON envelopes.
//! - [`config`] - environment-variable parsing helpers.

pub mod callback;
pub mod config;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod types;
