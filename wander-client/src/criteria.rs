//! Criteria validation and normalization
//!
//! Pure functions from raw [`SearchCriteria`] to either a complete set of
//! field errors or a [`NormalizedRequest`]. Every check runs on every call, so
//! the caller gets all field errors in one pass.

use std::collections::BTreeMap;
use std::fmt;
use wander_common::models::{EncoderOptions, Location, NormalizedQuery, SearchCriteria};

/// Result count used when `top_k` is absent or zero
pub const DEFAULT_TOP_K: u32 = 10;
/// Largest result count the form accepts
pub const MAX_TOP_K: u32 = 50;

const DEFAULT_POPULARITY_SCORE: f64 = 50.0;
const DEFAULT_RATING: f64 = 3.0;

/// Form fields that can carry a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CriteriaField {
    Climate,
    BudgetLevel,
    AvgCostINR,
    PopularityScore,
    AvgTempC,
    Rating,
    SafetyIndex,
    Accessibility,
    TransportCostINR,
}

/// Fields that must be filled in before submission
pub const REQUIRED_FIELDS: [CriteriaField; 7] = [
    CriteriaField::Climate,
    CriteriaField::BudgetLevel,
    CriteriaField::AvgCostINR,
    CriteriaField::AvgTempC,
    CriteriaField::SafetyIndex,
    CriteriaField::Accessibility,
    CriteriaField::TransportCostINR,
];

impl CriteriaField {
    /// Field name as the service spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            CriteriaField::Climate => "Climate",
            CriteriaField::BudgetLevel => "BudgetLevel",
            CriteriaField::AvgCostINR => "AvgCostINR",
            CriteriaField::PopularityScore => "PopularityScore",
            CriteriaField::AvgTempC => "AvgTempC",
            CriteriaField::Rating => "Rating",
            CriteriaField::SafetyIndex => "SafetyIndex",
            CriteriaField::Accessibility => "Accessibility",
            CriteriaField::TransportCostINR => "TransportCostINR",
        }
    }

    /// Human-readable label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            CriteriaField::Climate => "Climate",
            CriteriaField::BudgetLevel => "Budget level",
            CriteriaField::AvgCostINR => "Average cost",
            CriteriaField::PopularityScore => "Popularity score",
            CriteriaField::AvgTempC => "Average temperature",
            CriteriaField::Rating => "Rating",
            CriteriaField::SafetyIndex => "Safety index",
            CriteriaField::Accessibility => "Accessibility",
            CriteriaField::TransportCostINR => "Transport cost",
        }
    }

    fn required_message(&self) -> String {
        format!("{} is required", self.label())
    }

    fn raw<'a>(&self, criteria: &'a SearchCriteria) -> &'a str {
        match self {
            CriteriaField::Climate => &criteria.climate,
            CriteriaField::BudgetLevel => &criteria.budget_level,
            CriteriaField::AvgCostINR => &criteria.avg_cost_inr,
            CriteriaField::PopularityScore => &criteria.popularity_score,
            CriteriaField::AvgTempC => &criteria.avg_temp_c,
            CriteriaField::Rating => &criteria.rating,
            CriteriaField::SafetyIndex => &criteria.safety_index,
            CriteriaField::Accessibility => &criteria.accessibility,
            CriteriaField::TransportCostINR => &criteria.transport_cost_inr,
        }
    }
}

impl fmt::Display for CriteriaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation errors, at most one per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<CriteriaField, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: CriteriaField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: CriteriaField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CriteriaField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Record an error unless the field already has one
    fn add(&mut self, field: CriteriaField, message: String) {
        self.0.entry(field).or_insert(message);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// A query ready for `POST /predict`
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub query: NormalizedQuery,
    /// Sent alongside the query fields, never inside them
    pub top_k: u32,
}

/// Collect every field error in `criteria`
///
/// Categorical values are checked against `options` when provided; an empty
/// option list for a field disables the membership check for that field.
pub fn validate(criteria: &SearchCriteria, options: Option<&EncoderOptions>) -> FieldErrors {
    match check(criteria, options) {
        Ok(_) => FieldErrors::default(),
        Err(errors) => errors,
    }
}

/// Validate and coerce `criteria` into a request
///
/// Never mutates its input.
pub fn normalize(
    criteria: &SearchCriteria,
    options: Option<&EncoderOptions>,
) -> Result<NormalizedRequest, FieldErrors> {
    let checked = check(criteria, options)?;

    let state = match criteria.location {
        Location::India => Some(criteria.state.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Location::OutsideIndia => None,
    };

    Ok(NormalizedRequest {
        query: NormalizedQuery {
            location: criteria.location,
            state,
            climate: criteria.climate.trim().to_string(),
            budget_level: criteria.budget_level.trim().to_string(),
            avg_cost_inr: checked.avg_cost_inr,
            popularity_score: checked.popularity_score,
            avg_temp_c: checked.avg_temp_c,
            rating: checked.rating,
            safety_index: checked.safety_index,
            accessibility: criteria.accessibility.trim().to_string(),
            transport_cost_inr: checked.transport_cost_inr,
        },
        top_k: effective_top_k(criteria.top_k),
    })
}

/// `top_k` as sent: zero or absent means the default, capped at the maximum
pub fn effective_top_k(top_k: Option<u32>) -> u32 {
    match top_k {
        None | Some(0) => DEFAULT_TOP_K,
        Some(k) => k.min(MAX_TOP_K),
    }
}

struct CheckedNumbers {
    avg_cost_inr: f64,
    popularity_score: f64,
    avg_temp_c: f64,
    rating: f64,
    safety_index: f64,
    transport_cost_inr: f64,
}

fn check(
    criteria: &SearchCriteria,
    options: Option<&EncoderOptions>,
) -> Result<CheckedNumbers, FieldErrors> {
    let mut errors = FieldErrors::default();

    for field in REQUIRED_FIELDS {
        if field.raw(criteria).trim().is_empty() {
            errors.add(field, field.required_message());
        }
    }

    if let Some(options) = options {
        check_option(&mut errors, CriteriaField::Climate, &criteria.climate, &options.climate);
        check_option(
            &mut errors,
            CriteriaField::BudgetLevel,
            &criteria.budget_level,
            &options.budget_level,
        );
        check_option(
            &mut errors,
            CriteriaField::Accessibility,
            &criteria.accessibility,
            &options.accessibility,
        );
    }

    let avg_cost_inr = number(&mut errors, criteria, CriteriaField::AvgCostINR, None, Some(0.0), None);
    let avg_temp_c = number(&mut errors, criteria, CriteriaField::AvgTempC, None, None, None);
    let safety_index = number(&mut errors, criteria, CriteriaField::SafetyIndex, None, Some(0.0), Some(10.0));
    let transport_cost_inr = number(
        &mut errors,
        criteria,
        CriteriaField::TransportCostINR,
        None,
        Some(0.0),
        None,
    );
    let popularity_score = number(
        &mut errors,
        criteria,
        CriteriaField::PopularityScore,
        Some(DEFAULT_POPULARITY_SCORE),
        Some(0.0),
        Some(100.0),
    );
    let rating = number(
        &mut errors,
        criteria,
        CriteriaField::Rating,
        Some(DEFAULT_RATING),
        Some(0.0),
        Some(5.0),
    );

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CheckedNumbers {
        avg_cost_inr,
        popularity_score,
        avg_temp_c,
        rating,
        safety_index,
        transport_cost_inr,
    })
}

fn check_option(errors: &mut FieldErrors, field: CriteriaField, value: &str, allowed: &[String]) {
    let value = value.trim();
    if value.is_empty() || allowed.is_empty() {
        return;
    }
    if !allowed.iter().any(|a| a == value) {
        errors.add(
            field,
            format!("{} must be one of: {}", field.label(), allowed.join(", ")),
        );
    }
}

/// Coerce one numeric field, recording any error
///
/// Empty text takes `default` when one exists; required fields have already
/// been flagged. The returned value is meaningless once an error is recorded.
fn number(
    errors: &mut FieldErrors,
    criteria: &SearchCriteria,
    field: CriteriaField,
    default: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
) -> f64 {
    let raw = field.raw(criteria).trim();
    if raw.is_empty() {
        return default.unwrap_or(0.0);
    }

    let value = match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            errors.add(field, format!("{} must be a number", field.label()));
            return 0.0;
        }
    };

    match (min, max) {
        (Some(lo), Some(hi)) if value < lo || value > hi => {
            errors.add(field, format!("{} must be between {} and {}", field.label(), lo, hi));
        }
        (Some(lo), None) if value < lo => {
            errors.add(field, format!("{} cannot be negative", field.label()));
        }
        _ => {}
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> SearchCriteria {
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

    #[test]
    fn test_complete_criteria_has_no_errors() {
        assert!(validate(&complete(), Some(&EncoderOptions::fallback())).is_empty());
    }

    #[test]
    fn test_empty_form_reports_every_required_field() {
        let errors = validate(&SearchCriteria::default(), None);

        assert_eq!(errors.len(), REQUIRED_FIELDS.len());
        assert_eq!(errors.get(CriteriaField::Climate), Some("Climate is required"));
        assert_eq!(errors.get(CriteriaField::BudgetLevel), Some("Budget level is required"));
        assert_eq!(errors.get(CriteriaField::AvgCostINR), Some("Average cost is required"));
        assert_eq!(
            errors.get(CriteriaField::AvgTempC),
            Some("Average temperature is required")
        );
        assert_eq!(errors.get(CriteriaField::SafetyIndex), Some("Safety index is required"));
        assert_eq!(errors.get(CriteriaField::Accessibility), Some("Accessibility is required"));
        assert_eq!(
            errors.get(CriteriaField::TransportCostINR),
            Some("Transport cost is required")
        );
    }

    #[test]
    fn test_each_missing_field_yields_exactly_one_error() {
        for field in REQUIRED_FIELDS {
            let mut criteria = complete();
            match field {
                CriteriaField::Climate => criteria.climate.clear(),
                CriteriaField::BudgetLevel => criteria.budget_level.clear(),
                CriteriaField::AvgCostINR => criteria.avg_cost_inr.clear(),
                CriteriaField::AvgTempC => criteria.avg_temp_c.clear(),
                CriteriaField::SafetyIndex => criteria.safety_index.clear(),
                CriteriaField::Accessibility => criteria.accessibility.clear(),
                CriteriaField::TransportCostINR => criteria.transport_cost_inr.clear(),
                _ => unreachable!(),
            }

            let errors = validate(&criteria, Some(&EncoderOptions::fallback()));
            assert_eq!(errors.len(), 1, "field {}", field);
            assert!(errors.contains(field));
        }
    }

    #[test]
    fn test_whitespace_counts_as_missing() {
        let criteria = SearchCriteria {
            climate: "   ".to_string(),
            ..complete()
        };
        assert_eq!(
            validate(&criteria, None).get(CriteriaField::Climate),
            Some("Climate is required")
        );
    }

    #[test]
    fn test_zero_is_present_not_missing() {
        let criteria = SearchCriteria {
            avg_temp_c: "0".to_string(),
            ..complete()
        };
        let request = normalize(&criteria, None).unwrap();
        assert_eq!(request.query.avg_temp_c, 0.0);
    }

    #[test]
    fn test_non_numeric_text_is_rejected() {
        let criteria = SearchCriteria {
            avg_cost_inr: "cheap".to_string(),
            safety_index: "NaN".to_string(),
            ..complete()
        };
        let errors = validate(&criteria, None);
        assert_eq!(errors.get(CriteriaField::AvgCostINR), Some("Average cost must be a number"));
        assert_eq!(errors.get(CriteriaField::SafetyIndex), Some("Safety index must be a number"));
    }

    #[test]
    fn test_range_checks() {
        let criteria = SearchCriteria {
            transport_cost_inr: "-1".to_string(),
            rating: "5.5".to_string(),
            popularity_score: "101".to_string(),
            ..complete()
        };
        let errors = validate(&criteria, None);
        assert_eq!(
            errors.get(CriteriaField::TransportCostINR),
            Some("Transport cost cannot be negative")
        );
        assert_eq!(errors.get(CriteriaField::Rating), Some("Rating must be between 0 and 5"));
        assert_eq!(
            errors.get(CriteriaField::PopularityScore),
            Some("Popularity score must be between 0 and 100")
        );
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let criteria = SearchCriteria {
            climate: "Polar".to_string(),
            ..complete()
        };
        let errors = validate(&criteria, Some(&EncoderOptions::fallback()));
        assert_eq!(
            errors.get(CriteriaField::Climate),
            Some("Climate must be one of: Tropical, Temperate, Arid, Continental, Mediterranean")
        );

        // Without loaded options any value passes
        assert!(validate(&criteria, None).is_empty());
    }

    #[test]
    fn test_missing_field_reports_required_not_option_error() {
        let criteria = SearchCriteria {
            budget_level: String::new(),
            ..complete()
        };
        let errors = validate(&criteria, Some(&EncoderOptions::fallback()));
        assert_eq!(errors.get(CriteriaField::BudgetLevel), Some("Budget level is required"));
    }

    #[test]
    fn test_normalize_coerces_numbers_and_separates_top_k() {
        let criteria = complete();
        let before = criteria.clone();

        let request = normalize(&criteria, Some(&EncoderOptions::fallback())).unwrap();

        assert_eq!(criteria, before);
        assert_eq!(request.top_k, 5);
        assert_eq!(request.query.avg_cost_inr, 20000.0);
        assert_eq!(request.query.avg_temp_c, 30.0);
        assert_eq!(request.query.safety_index, 7.0);
        assert_eq!(request.query.transport_cost_inr, 2000.0);
        assert_eq!(request.query.popularity_score, 50.0);
        assert_eq!(request.query.rating, 3.0);

        let body = serde_json::to_value(&request.query).unwrap();
        assert!(body.get("top_k").is_none());
        assert!(body["AvgCostINR"].is_number());
        assert!(body["Rating"].is_number());
    }

    #[test]
    fn test_empty_sliders_take_defaults() {
        let criteria = SearchCriteria {
            popularity_score: String::new(),
            rating: String::new(),
            ..complete()
        };
        let request = normalize(&criteria, None).unwrap();
        assert_eq!(request.query.popularity_score, 50.0);
        assert_eq!(request.query.rating, 3.0);
    }

    #[test]
    fn test_state_only_sent_for_india() {
        let mut criteria = SearchCriteria {
            state: "Kerala".to_string(),
            ..complete()
        };
        let request = normalize(&criteria, None).unwrap();
        assert_eq!(request.query.state.as_deref(), Some("Kerala"));

        criteria.state = String::new();
        assert_eq!(normalize(&criteria, None).unwrap().query.state, None);

        // Bypassing set_location still never leaks a state abroad
        criteria.state = "Kerala".to_string();
        criteria.location = Location::OutsideIndia;
        assert_eq!(normalize(&criteria, None).unwrap().query.state, None);
    }

    #[test]
    fn test_effective_top_k() {
        assert_eq!(effective_top_k(None), 10);
        assert_eq!(effective_top_k(Some(0)), 10);
        assert_eq!(effective_top_k(Some(1)), 1);
        assert_eq!(effective_top_k(Some(50)), 50);
        assert_eq!(effective_top_k(Some(500)), 50);
    }

    #[test]
    fn test_field_errors_display() {
        let errors = validate(
            &SearchCriteria {
                climate: String::new(),
                ..complete()
            },
            None,
        );
        assert_eq!(errors.to_string(), "Climate: Climate is required");
    }
}
