//! Tolerance constants for stretch tests.

/// Floating point rounding errors (for pure copies and layout changes).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Relative error allowed between retrieved and expected output length.
pub const OUTPUT_LENGTH_TOLERANCE: f64 = 0.05;

/// Relative level difference allowed through the vocoder at unity ratio.
pub const LEVEL_TOLERANCE: f32 = 0.1;
