//! Checks whether internet radio streams are alive.
//!
//! Station URLs are probed over raw ICY, plain HTTP or HTTPS (with a ladder
//! of TLS configurations for old servers), and playlist URLs are expanded
//! into the streams they list. Results are streamed to a [`report::Reporter`]
//! together with a run-wide [`summary::RunSummary`].

pub mod config;
pub mod context;
pub mod error;
pub mod http_probe;
pub mod icy_probe;
pub mod playlist;
pub mod probe;
pub mod report;
pub mod station;
pub mod summary;
pub mod target;

pub use context::ProbeContext;
pub use error::ProbeError;
pub use http_probe::result::ProbeResult;
pub use probe::run;
