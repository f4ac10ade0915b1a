//! Test helper modules for wander-client integration tests
//!
//! - MockService: in-process recommendation service on an ephemeral port
//! - Fixtures for destination records and complete search criteria

#![allow(dead_code)]

pub mod mock_service;

pub use mock_service::{MockResponse, MockService};

use serde_json::{json, Value};
use wander_common::models::SearchCriteria;

/// A destination record as the service returns it
pub fn destination_json(name: &str, rating: f64, avg_cost: f64) -> Value {
    json!({
        "Destination": name,
        "Country": "India",
        "State": "Kerala",
        "SourceCity": "Kochi",
        "Rating": rating,
        "AvgCostINR": avg_cost,
        "Climate": "Tropical",
        "BudgetLevel": "Low",
        "Activities": "Beaches, backwaters",
        "SafetyIndex": 7.5,
        "TransportCostINR": 1800,
        "PopularityScore": 72
    })
}

/// Complete criteria that pass validation against the fallback options
pub fn tropical_criteria() -> SearchCriteria {
    SearchCriteria {
        climate: "Tropical".to_string(),
        budget_level: "Low".to_string(),
        avg_cost_inr: "20000".to_string(),
        avg_temp_c: "30".to_string(),
        safety_index: "7".to_string(),
        accessibility: "Easy".to_string(),
        transport_cost_inr: "2000".to_string(),
        top_k: Some(5),
        ..Default::default()
    }
}
