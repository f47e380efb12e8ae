//! Core types and traits for the linkforge URL shortener.
//!
//! This crate holds everything that is independent of a storage engine:
//! alias validation, base62 encoding, the query engine, the mapping creator,
//! and the [`MappingStore`] contract implemented by `linkforge-storage`.

pub mod alias;
pub mod base62;
pub mod clock;
pub mod creator;
pub mod error;
pub mod generator;
pub mod query;
pub mod record;
pub mod shortcode;
pub mod store;

pub use alias::{AliasPolicy, AliasViolation};
pub use clock::{Clock, ManualClock, SystemClock};
pub use creator::{MappingCreator, MappingSink, PersistError};
pub use error::{ErrorMapper, GeneratorError, MappingError, PlainErrorMapper, Result};
pub use generator::Generator;
pub use query::{Direction, QueryEngine, QueryFilter, SortKey, StatusFilter};
pub use record::{ExpiryPatch, MappingPatch, MappingRecord};
pub use shortcode::ShortCode;
pub use store::MappingStore;
