//! Photovoltaic array model for driving trackers off the bench.
//!
//! Cells follow the single-diode equation. Cells are grouped into substrings
//! that share a bypass diode and an irradiance, and the substrings are wired
//! in series, which is enough to reproduce the multi-peak P-V curves of a
//! partially shaded array.

mod array;
mod cell;

pub use array::{Array, Substring};
pub use cell::{Cell, Conditions, G_REF, T_REF};
