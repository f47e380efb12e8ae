//! Short code generators for linkforge.
//!
//! The [`Generator`] trait lives in `linkforge_core`; this crate provides the
//! implementations.

pub mod seq;

pub use linkforge_core::Generator;
pub use seq::SeqGenerator;
