//! Frame production and ordered delivery to a sink.

/// Streaming encode loop (render workers + ordered sink writer).
pub mod encoder;
/// Progress callback contract.
pub mod progress;
