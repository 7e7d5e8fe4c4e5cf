//! Public facade crate for `factlens`.
//!
//! This crate intentionally contains no IO or heuristics.
//! It re-exports the report, message and store types/traits from `factlens-core`.

pub use factlens_core::*;
