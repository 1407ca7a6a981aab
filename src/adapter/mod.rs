//! Relational adapter
//!
//! Turns one place aggregate into relational rows plus the pending links
//! that cannot be resolved inline.

mod flags;
mod place_adapter;

pub use flags::ChildFlags;
pub use place_adapter::{author_key, PlaceAdapter, AUTHOR_KEY_SENTINEL};
