//! Local persistence for a catalog browser.
//!
//! A single local account, favorites, star ratings and per-title comment
//! threads, all stored as JSON documents in a flat key/value store, plus a
//! cache of the remote catalog.

pub mod catalog;
pub mod config;
pub mod favorites;
pub mod feedback;
pub mod models;
pub mod ratings;
pub mod session;
pub mod shelf;
pub mod store;

pub use shelf::Shelf;
