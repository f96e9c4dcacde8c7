//! Internal modules ported from external libraries.
//!
//! These modules contain code adapted from:
//! - numpy: piecewise-linear interpolation

pub mod numpy;
