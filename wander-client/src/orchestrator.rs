//! Search lifecycle state machine
//!
//! Idle → Loading → Success | Error → (new submission) → Loading
//!
//! Overlapping submissions resolve latest-wins. Each submission takes the next
//! request id and cancels the one in flight; a completion is applied only while
//! its id is still the latest.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wander_common::events::{EventBus, LifecyclePhase, OptionsSource, SearchEvent};
use wander_common::models::{EncoderOptions, Location, SearchCriteria, FALLBACK_REGIONS};

use crate::criteria::normalize;
use crate::error::ClientResult;
use crate::gateway::RecommendationGateway;
use crate::presenter::ResultsView;

/// Search lifecycle state
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Loading { request_id: u64 },
    Success { request_id: u64, view: ResultsView },
    Error { request_id: u64, message: String },
}

impl SearchState {
    pub fn phase(&self) -> LifecyclePhase {
        match self {
            SearchState::Idle => LifecyclePhase::Idle,
            SearchState::Loading { .. } => LifecyclePhase::Loading,
            SearchState::Success { .. } => LifecyclePhase::Success,
            SearchState::Error { .. } => LifecyclePhase::Error,
        }
    }

    /// Result view of a successful search
    pub fn results(&self) -> Option<&ResultsView> {
        match self {
            SearchState::Success { view, .. } => Some(view),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SearchState::Error { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// What happened to one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Results applied; the state is now `Success`
    Completed { request_id: u64, result_count: usize },
    /// Failure applied; the state is now `Error`
    Failed { request_id: u64, message: String },
    /// A newer submission took over; the state was left to it
    Superseded { request_id: u64 },
}

struct Shared {
    state: SearchState,
    latest_request_id: u64,
    in_flight: Option<CancellationToken>,
}

impl Shared {
    fn transition_to(&mut self, request_id: u64, new_state: SearchState) -> SearchEvent {
        let event = SearchEvent::StateChanged {
            request_id,
            old_state: self.state.phase(),
            new_state: new_state.phase(),
            timestamp: Utc::now(),
        };
        self.state = new_state;
        event
    }
}

/// Coordinates validation, submission and result presentation
pub struct SearchOrchestrator {
    gateway: Arc<dyn RecommendationGateway>,
    shared: RwLock<Shared>,
    encoder_options: RwLock<Option<EncoderOptions>>,
    event_bus: EventBus,
}

impl SearchOrchestrator {
    pub fn new(gateway: Arc<dyn RecommendationGateway>) -> Self {
        Self::with_event_bus(gateway, EventBus::default())
    }

    pub fn with_event_bus(gateway: Arc<dyn RecommendationGateway>, event_bus: EventBus) -> Self {
        Self {
            gateway,
            shared: RwLock::new(Shared {
                state: SearchState::Idle,
                latest_request_id: 0,
                in_flight: None,
            }),
            encoder_options: RwLock::new(None),
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Fetch encoder options, falling back to the static set on any failure
    ///
    /// The fallback is silent degraded mode: logged, never returned as an error.
    pub async fn load_encoder_options(&self) -> OptionsSource {
        let (options, source) = match self.gateway.fetch_encoders().await {
            Ok(options) => {
                debug!(
                    climates = options.climate.len(),
                    budgets = options.budget_level.len(),
                    accessibility = options.accessibility.len(),
                    "Loaded encoder options"
                );
                (options, OptionsSource::Remote)
            }
            Err(e) => {
                warn!("Encoder options unavailable, using fallback: {}", e);
                (EncoderOptions::fallback(), OptionsSource::Fallback)
            }
        };

        *self.encoder_options.write().await = Some(options);
        self.event_bus.emit_lossy(SearchEvent::EncoderOptionsLoaded {
            source,
            timestamp: Utc::now(),
        });
        source
    }

    /// Encoder options in use, `None` before [`Self::load_encoder_options`]
    pub async fn encoder_options(&self) -> Option<EncoderOptions> {
        self.encoder_options.read().await.clone()
    }

    /// Region names for the conditional State field
    ///
    /// Only India has regions. A failed lookup yields the static list.
    pub async fn load_regions(&self, location: Location) -> Vec<String> {
        match location {
            Location::OutsideIndia => Vec::new(),
            Location::India => match self.gateway.fetch_states(location.as_str()).await {
                Ok(regions) => regions,
                Err(e) => {
                    warn!("Region list unavailable, using fallback: {}", e);
                    FALLBACK_REGIONS.iter().map(|s| s.to_string()).collect()
                }
            },
        }
    }

    /// Snapshot of the lifecycle state
    pub async fn state(&self) -> SearchState {
        self.shared.read().await.state.clone()
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.shared.read().await.state.phase()
    }

    /// Run `f` against the current result view, if the last search succeeded
    pub async fn with_results<R>(&self, f: impl FnOnce(&mut ResultsView) -> R) -> Option<R> {
        let mut shared = self.shared.write().await;
        match &mut shared.state {
            SearchState::Success { view, .. } => Some(f(view)),
            _ => None,
        }
    }

    /// Validate `criteria` and run a search
    ///
    /// Validation failure returns [`crate::ClientError::Validation`] and leaves
    /// the state untouched. Gateway failures are not errors here: they move
    /// the lifecycle to `Error` and come back as [`SubmitOutcome::Failed`].
    pub async fn submit(&self, criteria: &SearchCriteria) -> ClientResult<SubmitOutcome> {
        let options = self.encoder_options.read().await.clone();
        let request = normalize(criteria, options.as_ref())?;

        let (request_id, token) = {
            let mut shared = self.shared.write().await;
            shared.latest_request_id += 1;
            let request_id = shared.latest_request_id;

            if let Some(previous) = shared.in_flight.take() {
                debug!(request_id, "Cancelling in-flight search");
                previous.cancel();
            }
            let token = CancellationToken::new();
            shared.in_flight = Some(token.clone());

            let event = shared.transition_to(request_id, SearchState::Loading { request_id });
            self.event_bus.emit_lossy(event);
            (request_id, token)
        };

        info!(request_id, top_k = request.top_k, "Submitting search");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(request_id, "Search superseded before completion");
                return Ok(SubmitOutcome::Superseded { request_id });
            }
            result = self.gateway.recommend(&request.query, request.top_k) => result,
        };

        let mut shared = self.shared.write().await;
        if shared.latest_request_id != request_id {
            let latest_request_id = shared.latest_request_id;
            debug!(request_id, latest_request_id, "Discarding stale response");
            self.event_bus.emit_lossy(SearchEvent::StaleResponseDiscarded {
                request_id,
                latest_request_id,
                timestamp: Utc::now(),
            });
            return Ok(SubmitOutcome::Superseded { request_id });
        }
        shared.in_flight = None;

        let (event, outcome) = match result {
            Ok(results) => {
                let result_count = results.len();
                info!(request_id, result_count, "Search completed");
                let view = ResultsView::new(results);
                (
                    shared.transition_to(request_id, SearchState::Success { request_id, view }),
                    SubmitOutcome::Completed {
                        request_id,
                        result_count,
                    },
                )
            }
            Err(e) => {
                error!(request_id, "Search failed: {}", e);
                let message = e.user_message();
                (
                    shared.transition_to(
                        request_id,
                        SearchState::Error {
                            request_id,
                            message: message.clone(),
                        },
                    ),
                    SubmitOutcome::Failed {
                        request_id,
                        message,
                    },
                )
            }
        };
        drop(shared);

        self.event_bus.emit_lossy(event);
        Ok(outcome)
    }
}
