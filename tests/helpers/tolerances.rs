//! Tolerance constants for host tests.

/// Exact operations (unity gain, parameter values that went through an
/// f32 state blob).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Values below this are considered silent (~-80dB).
pub const SILENCE_THRESHOLD: f32 = 0.0001;
