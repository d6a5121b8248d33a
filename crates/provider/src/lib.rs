//! HTTP client library for the asynchronous music-generation provider.
//!
//! Provides generation submission, status lookups (against the provider or
//! against this system's own status endpoint), the bounded polling loop that
//! turns either into a single awaitable result, and the lyric-writing call.

pub mod api;
pub mod config;
pub mod lyrics;
pub mod poller;
pub mod status;

pub use api::{GenerationRequest, MusicProviderApi, SubmissionError};
pub use config::ProviderConfig;
pub use lyrics::{Lyrics, LyricsApi, LyricsConfig, LyricsError};
pub use poller::{wait_for_completion, CompletionWaiter, PollConfig, PollError, PollPhase};
pub use status::{BridgeStatusSource, ProviderStatusSource, StatusError, StatusReport, StatusSource};
