//! Signal detection and evaluation
//!
//! Detectors scan the full event group sequence and emit detected signals;
//! evaluators decide which of those signals are confirmed.

pub mod detector;
pub mod evaluator;

// Re-export key types for convenience
pub use detector::{DetectorKind, SignalDetector};
pub use evaluator::Evaluator;
