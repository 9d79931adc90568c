//! Domain models for the shelf.
//!
//! - [`Entity`]: a catalog title record, stored verbatim when favorited.
//! - [`Identity`]: the one local account, also used as the acting user.
//! - [`Comment`]: an entry in an entity's feedback thread.

mod comment;
mod entity;
mod identity;

pub use comment::*;
pub use entity::*;
pub use identity::*;
