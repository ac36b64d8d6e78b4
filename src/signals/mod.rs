// =============================================================================
// Signals Module
// =============================================================================
//
// Turns the latest indicator readings into a discrete buy/sell/hold call:
// - Input extraction from an IndicatorSnapshot (latest + previous values)
// - Per-indicator votes and score banding

pub mod inputs;
pub mod vote_score;

pub use inputs::SignalInputs;
pub use vote_score::{evaluate, Classification, Signal};
