//! Keyroster DB - remembers what happened and when
//!
//! A single JSON file in the data directory records:
//! - when a verb was last applied to an item (`verified` a team, `fetched` a key)
//! - which keys were imported into GnuPG
//! - requests we've sent to join teams

pub mod database;
pub mod error;
pub mod item;

pub use database::Database;
pub use error::{DatabaseError, Result};
pub use item::Item;
