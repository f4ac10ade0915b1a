//! Event types for the Wander event system
//!
//! Provides shared event definitions and the EventBus used by the search
//! orchestrator to announce lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of the search lifecycle, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Idle,
    Loading,
    Success,
    Error,
}

/// Where the encoder options in use came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionsSource {
    /// Fetched from `/encoders`
    Remote,
    /// Static fallback after a failed fetch
    Fallback,
}

/// Wander event types
///
/// Events are broadcast via EventBus and can be serialized for logging or
/// forwarding to another front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchEvent {
    /// Lifecycle moved between phases
    StateChanged {
        /// Submission that caused the change (0 before any submission)
        request_id: u64,
        old_state: LifecyclePhase,
        new_state: LifecyclePhase,
        timestamp: DateTime<Utc>,
    },

    /// Encoder options became available
    EncoderOptionsLoaded {
        source: OptionsSource,
        timestamp: DateTime<Utc>,
    },

    /// A completion arrived for a submission that is no longer the latest
    StaleResponseDiscarded {
        request_id: u64,
        latest_request_id: u64,
        timestamp: DateTime<Utc>,
    },

    /// A destination was bookmarked
    FavoriteSaved {
        destination: String,
        country: String,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally: publishing never blocks, slow subscribers
/// see `Lagged` instead of stalling the producer.
///
/// # Examples
///
/// ```
/// use wander_common::events::{EventBus, LifecyclePhase, SearchEvent};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SearchEvent::StateChanged {
///     request_id: 1,
///     old_state: LifecyclePhase::Idle,
///     new_state: LifecyclePhase::Loading,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SearchEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SearchEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(SearchEvent::EncoderOptionsLoaded {
            source: OptionsSource::Fallback,
            timestamp: Utc::now(),
        });

        // Late subscribers only see events sent after they joined
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(SearchEvent::StaleResponseDiscarded {
            request_id: 1,
            latest_request_id: 2,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            SearchEvent::StaleResponseDiscarded {
                request_id,
                latest_request_id,
                ..
            } => {
                assert_eq!(request_id, 1);
                assert_eq!(latest_request_id, 2);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SearchEvent::StateChanged {
            request_id: 3,
            old_state: LifecyclePhase::Loading,
            new_state: LifecyclePhase::Success,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "StateChanged");
        assert_eq!(value["new_state"], "success");
    }
}
