//! Plain-text rendering for the `wander` command line

use wander_common::events::OptionsSource;
use wander_common::models::{EncoderOptions, FavoriteRecord, ServiceHealth};

use crate::criteria::FieldErrors;
use crate::favorites::{FavoritesSlot, FavoritesStore};
use crate::presenter::{Presentation, ResultCard, ResultsView};

pub const EMPTY_RESULTS_TITLE: &str = "No destinations found";
pub const EMPTY_RESULTS_HINT: &str = "Try adjusting your search criteria to find more options.";

/// INR amount with thousands separators, e.g. `₹125,000`
pub fn format_inr(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    if cents == "00" {
        format!("{}₹{}", sign, grouped)
    } else {
        format!("{}₹{}.{}", sign, grouped, cents)
    }
}

/// One result card
pub fn render_card(card: &ResultCard<'_>) -> String {
    let d = card.destination;
    let mut out = String::new();

    let marker = if card.saved { "  [saved]" } else { "" };
    out.push_str(&format!(
        "{:>2}. {}  ★ {:.1}{}\n",
        card.position, d.name, d.rating, marker
    ));

    let location = match d.state.as_deref().filter(|s| !s.is_empty()) {
        Some(state) => format!("{}, {}", d.country, state),
        None => d.country.clone(),
    };
    out.push_str(&format!("    Location:    {}\n", location));
    if let Some(city) = d.source_city.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("    From:        {}\n", city));
    }
    out.push_str(&format!("    Avg cost:    {}\n", format_inr(d.avg_cost_inr)));
    out.push_str(&format!("    Climate:     {}\n", d.climate));
    out.push_str(&format!("    Budget:      {}\n", d.budget_level));

    if card.expanded {
        if let Some(activities) = d.activities.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("    Activities:  {}\n", activities));
        }
        out.push_str(&format!("    Safety:      {}/10\n", d.safety_index));
        out.push_str(&format!(
            "    Transport:   {}\n",
            format_inr(d.transport_cost_inr)
        ));
        if let Some(popularity) = d.popularity_score {
            out.push_str(&format!("    Popularity:  {}\n", popularity));
        }
    }

    out
}

/// The whole result list in display order, or the empty-results notice
pub fn render_results<S: FavoritesSlot>(view: &ResultsView, store: &FavoritesStore<S>) -> String {
    match view.presentation() {
        Presentation::Empty => format!("{}\n{}\n", EMPTY_RESULTS_TITLE, EMPTY_RESULTS_HINT),
        Presentation::Results(count) => {
            let mut out = format!(
                "Found {} destination{} (sorted by {})\n\n",
                count,
                if count == 1 { "" } else { "s" },
                view.sort_key()
            );
            let cards: Vec<String> = view.cards(store).iter().map(render_card).collect();
            out.push_str(&cards.join("\n"));
            out
        }
    }
}

/// One line per field error
pub fn render_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("  {}: {}\n", field, message))
        .collect()
}

pub fn render_favorites(records: &[FavoriteRecord]) -> String {
    if records.is_empty() {
        return "No saved destinations\n".to_string();
    }

    records
        .iter()
        .map(|record| {
            format!(
                "{} ({})  saved {}\n",
                record.destination.name,
                record.destination.country,
                record.saved_at.format("%Y-%m-%d %H:%M UTC")
            )
        })
        .collect()
}

pub fn render_options(options: &EncoderOptions, source: OptionsSource) -> String {
    let origin = match source {
        OptionsSource::Remote => "service",
        OptionsSource::Fallback => "built-in fallback",
    };
    format!(
        "Encoder options ({})\n  Climate:       {}\n  Budget level:  {}\n  Accessibility: {}\n",
        origin,
        options.climate.join(", "),
        options.budget_level.join(", "),
        options.accessibility.join(", ")
    )
}

pub fn render_health(health: &ServiceHealth) -> String {
    let mut out = format!(
        "status: {}\nmodel loaded: {}\n",
        health.status,
        if health.model_loaded { "yes" } else { "no" }
    );
    if let Some(features) = &health.features {
        out.push_str(&format!("features: {}\n", features.join(", ")));
    }
    out
}
