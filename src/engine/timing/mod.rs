//! Zero-cost timing instrumentation for the batch engine.
//!
//! When the `timing` feature is enabled, this module collects coarse phase
//! timings per batch and reports them through `tracing` at debug level.
//!
//! When disabled, all types become zero-sized and all methods compile away.

#[cfg(feature = "timing")]
mod real;
#[cfg(not(feature = "timing"))]
mod stub;

#[cfg(feature = "timing")]
pub use real::*;
#[cfg(not(feature = "timing"))]
pub use stub::*;
