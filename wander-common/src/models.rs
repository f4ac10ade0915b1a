//! Data model shared between the client and the recommendation service
//!
//! Wire field names follow the service schema (`AvgCostINR`, `SafetyIndex`, ...),
//! so every field is renamed explicitly rather than through `rename_all`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Regions offered for `Location = India` when `/states` is unavailable
pub const FALLBACK_REGIONS: &[&str] = &[
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

/// Legal values for the categorical criteria fields
///
/// Replaced wholesale on reload, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderOptions {
    #[serde(rename = "Climate", default)]
    pub climate: Vec<String>,
    #[serde(rename = "BudgetLevel", default)]
    pub budget_level: Vec<String>,
    #[serde(rename = "Accessibility", default)]
    pub accessibility: Vec<String>,
}

impl EncoderOptions {
    /// Static option set used when the encoder lookup fails
    pub fn fallback() -> Self {
        fn owned(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }

        Self {
            climate: owned(&["Tropical", "Temperate", "Arid", "Continental", "Mediterranean"]),
            budget_level: owned(&["Low", "Medium", "High"]),
            accessibility: owned(&["Easy", "Moderate", "Difficult"]),
        }
    }
}

/// Where the traveller wants to go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[default]
    India,
    #[serde(rename = "Outside India")]
    OutsideIndia,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::India => "India",
            Location::OutsideIndia => "Outside India",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "india" => Ok(Location::India),
            "outside india" | "outside-india" | "outside" => Ok(Location::OutsideIndia),
            other => Err(Error::InvalidInput(format!(
                "unknown location '{}' (expected 'India' or 'Outside India')",
                other
            ))),
        }
    }
}

/// Raw questionnaire state, possibly incomplete
///
/// Numeric fields hold the text the user typed. An empty string means "not
/// entered" and is distinct from `"0"`; coercion happens at normalization time.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub location: Location,
    /// Only meaningful when `location` is India
    pub state: String,
    pub climate: String,
    pub budget_level: String,
    pub avg_cost_inr: String,
    pub popularity_score: String,
    pub avg_temp_c: String,
    pub rating: String,
    pub safety_index: String,
    pub accessibility: String,
    pub transport_cost_inr: String,
    pub top_k: Option<u32>,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            location: Location::India,
            state: String::new(),
            climate: String::new(),
            budget_level: String::new(),
            avg_cost_inr: String::new(),
            popularity_score: "50".to_string(),
            avg_temp_c: String::new(),
            rating: "3".to_string(),
            safety_index: String::new(),
            accessibility: String::new(),
            transport_cost_inr: String::new(),
            top_k: Some(10),
        }
    }
}

impl SearchCriteria {
    /// Change the location, clearing `state` when leaving India
    pub fn set_location(&mut self, location: Location) {
        self.location = location;
        if location != Location::India {
            self.state.clear();
        }
    }
}

/// Criteria ready for transmission: validated, numeric fields coerced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuery {
    #[serde(rename = "Location")]
    pub location: Location,
    #[serde(rename = "State", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "Climate")]
    pub climate: String,
    #[serde(rename = "BudgetLevel")]
    pub budget_level: String,
    #[serde(rename = "AvgCostINR")]
    pub avg_cost_inr: f64,
    #[serde(rename = "PopularityScore")]
    pub popularity_score: f64,
    #[serde(rename = "AvgTempC")]
    pub avg_temp_c: f64,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "SafetyIndex")]
    pub safety_index: f64,
    #[serde(rename = "Accessibility")]
    pub accessibility: String,
    #[serde(rename = "TransportCostINR")]
    pub transport_cost_inr: f64,
}

/// `POST /predict` body: the query fields plus `top_k`
#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    #[serde(flatten)]
    pub query: &'a NormalizedQuery,
    pub top_k: u32,
}

/// A recommended destination as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(rename = "Destination")]
    pub name: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "State", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "SourceCity", default, skip_serializing_if = "Option::is_none")]
    pub source_city: Option<String>,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "AvgCostINR")]
    pub avg_cost_inr: f64,
    #[serde(rename = "Climate")]
    pub climate: String,
    #[serde(rename = "BudgetLevel")]
    pub budget_level: String,
    #[serde(rename = "Activities", default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<String>,
    #[serde(rename = "SafetyIndex")]
    pub safety_index: f64,
    #[serde(rename = "TransportCostINR")]
    pub transport_cost_inr: f64,
    #[serde(rename = "PopularityScore", default, skip_serializing_if = "Option::is_none")]
    pub popularity_score: Option<f64>,
}

impl Destination {
    /// Identity key used to deduplicate favorites and track expansion
    pub fn key(&self) -> DestinationKey {
        DestinationKey {
            destination: self.name.clone(),
            country: self.country.clone(),
        }
    }

    /// Whether `other` shares this destination's identity key
    pub fn same_place(&self, other: &Destination) -> bool {
        self.name == other.name && self.country == other.country
    }
}

/// (Destination, Country) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationKey {
    pub destination: String,
    pub country: String,
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.destination, self.country)
    }
}

/// A bookmarked destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    #[serde(flatten)]
    pub destination: Destination,
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
}

impl FavoriteRecord {
    pub fn new(destination: Destination, saved_at: DateTime<Utc>) -> Self {
        Self {
            destination,
            saved_at,
        }
    }
}

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn goa() -> Destination {
        Destination {
            name: "Goa Beaches".to_string(),
            country: "India".to_string(),
            state: Some("Goa".to_string()),
            source_city: None,
            rating: 4.5,
            avg_cost_inr: 18000.0,
            climate: "Tropical".to_string(),
            budget_level: "Low".to_string(),
            activities: Some("Beach, Nightlife".to_string()),
            safety_index: 7.5,
            transport_cost_inr: 2500.0,
            popularity_score: None,
        }
    }

    #[test]
    fn test_fallback_encoder_options() {
        let options = EncoderOptions::fallback();
        assert_eq!(
            options.climate,
            vec!["Tropical", "Temperate", "Arid", "Continental", "Mediterranean"]
        );
        assert_eq!(options.budget_level, vec!["Low", "Medium", "High"]);
        assert_eq!(options.accessibility, vec!["Easy", "Moderate", "Difficult"]);
    }

    #[test]
    fn test_encoder_options_wire_names() {
        let options: EncoderOptions = serde_json::from_value(json!({
            "Climate": ["Arid"],
            "BudgetLevel": ["High"],
            "Accessibility": ["Easy"]
        }))
        .unwrap();
        assert_eq!(options.climate, vec!["Arid"]);
        assert_eq!(options.budget_level, vec!["High"]);
    }

    #[test]
    fn test_fallback_regions_cover_indian_states() {
        assert_eq!(FALLBACK_REGIONS.len(), 28);
        assert!(FALLBACK_REGIONS.contains(&"Kerala"));
    }

    #[test]
    fn test_location_parse_and_wire_format() {
        assert_eq!("India".parse::<Location>().unwrap(), Location::India);
        assert_eq!(
            "outside-india".parse::<Location>().unwrap(),
            Location::OutsideIndia
        );
        assert!("Mars".parse::<Location>().is_err());
        assert_eq!(
            serde_json::to_value(Location::OutsideIndia).unwrap(),
            json!("Outside India")
        );
    }

    #[test]
    fn test_set_location_clears_state_outside_india() {
        let mut criteria = SearchCriteria {
            state: "Kerala".to_string(),
            ..Default::default()
        };
        criteria.set_location(Location::India);
        assert_eq!(criteria.state, "Kerala");

        criteria.set_location(Location::OutsideIndia);
        assert!(criteria.state.is_empty());
    }

    #[test]
    fn test_destination_tolerates_missing_optionals() {
        let destination: Destination = serde_json::from_value(json!({
            "Destination": "Petra",
            "Country": "Jordan",
            "State": null,
            "Rating": 4.8,
            "AvgCostINR": 90000,
            "Climate": "Arid",
            "BudgetLevel": "High",
            "SafetyIndex": 6.5,
            "TransportCostINR": 40000
        }))
        .unwrap();
        assert_eq!(destination.state, None);
        assert_eq!(destination.popularity_score, None);
        assert_eq!(destination.avg_cost_inr, 90000.0);
    }

    #[test]
    fn test_predict_request_flattens_query() {
        let query = NormalizedQuery {
            location: Location::India,
            state: None,
            climate: "Tropical".to_string(),
            budget_level: "Low".to_string(),
            avg_cost_inr: 20000.0,
            popularity_score: 50.0,
            avg_temp_c: 30.0,
            rating: 3.0,
            safety_index: 7.0,
            accessibility: "Easy".to_string(),
            transport_cost_inr: 2000.0,
        };
        let body = serde_json::to_value(PredictRequest {
            query: &query,
            top_k: 5,
        })
        .unwrap();

        assert_eq!(body["top_k"], 5);
        assert_eq!(body["Location"], "India");
        assert_eq!(body["AvgCostINR"], 20000.0);
        assert!(body.get("State").is_none());
    }

    #[test]
    fn test_favorite_record_carries_saved_at() {
        let record = FavoriteRecord::new(goa(), Utc::now());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["Destination"], "Goa Beaches");
        assert!(value["savedAt"].is_string());

        let back: FavoriteRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.destination.key(), goa().key());
    }
}
