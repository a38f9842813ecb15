/// Frame, rate and canvas primitives.
pub mod core;
/// Error taxonomy shared by every pipeline stage.
pub mod error;
