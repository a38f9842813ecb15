//! Cue timeline construction and time-indexed lookup.

/// Cues, the validated timeline and lookup queries.
pub mod cue;
/// Raw tabular rows and the JSON / TSV readers that produce them.
pub mod rows;
