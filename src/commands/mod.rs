// Scaling operations
pub mod scale;

// Checkpoint inspection
pub mod reset;
pub mod status;
