//! Type integration with external types
//!
//! Implementation [`Decode`][d] and [`Encode`][e] for external types.
//!
//! Available for:
//!
//! - [`serde`]'s [`Deserialize`][sd] and [`Serialize`][ss] via [`Json`]
//! - [`time`][::time]'s [`UtcDateTime`][tu] as `timestamptz`
//!
//! [d]: crate::Decode
//! [e]: crate::Encode
//! [sd]: serde::Deserialize
//! [ss]: serde::Serialize
//! [tu]: ::time::UtcDateTime

mod json;
pub(crate) mod time;

pub use json::Json;
