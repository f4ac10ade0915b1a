//! wander-client library interface
//!
//! Exposes the search orchestration layer to the `wander` binary and to
//! integration tests.

pub mod criteria;
pub mod error;
pub mod favorites;
pub mod gateway;
pub mod orchestrator;
pub mod presenter;
pub mod render;

pub use crate::error::{ClientError, ClientResult};
pub use crate::favorites::{FavoritesStore, FileSlot, MemorySlot};
pub use crate::gateway::{GatewayError, HttpGateway, RecommendationGateway};
pub use crate::orchestrator::{SearchOrchestrator, SearchState, SubmitOutcome};
pub use crate::presenter::{ResultsView, SortKey};
