//! LFOs and the modulation matrix
//!
//! Both update once per block from the parameter snapshot.

mod lfo;
mod matrix;

pub use lfo::{Lfo, LfoBank, LfoShape};
pub use matrix::{ModMatrix, ModSlot, ModTarget};
