//! Source audio decoding and lead-in composition.

/// Lead-in silence + source overlay into one buffer of exact duration.
pub mod compose;
/// Decoded PCM and the decoders that produce it.
pub mod media;
