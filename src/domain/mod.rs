//! Domain types and DTOs
//!
//! These types define the canonical project schema and the generated
//! LoE document exchanged over the HTTP surface.

pub mod document;
pub mod schema;

pub use document::*;
pub use schema::*;
