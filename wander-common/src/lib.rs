//! # Wander Common Library
//!
//! Shared code for the Wander recommendation client:
//! - Data model exchanged with the recommendation service
//! - Lifecycle events and the EventBus
//! - Configuration loading and data folder resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use models::{Destination, DestinationKey, EncoderOptions, FavoriteRecord, Location};
