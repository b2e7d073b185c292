//! Navidrome/Subsonic REST client.

pub mod api;
pub mod auth;
pub mod error;
pub mod models;

pub use api::SubsonicClient;
pub use error::SubsonicError;
