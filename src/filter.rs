use tracing::info;

use crate::crawler::models::{FuelCategory, Listing};

/// Source-language spellings and common abbreviations for each fuel class.
const PETROL_KEYWORDS: &[&str] = &["benz", "benzin", "benzīn", "benzīns", "petrol", "gas"];
const DIESEL_KEYWORDS: &[&str] = &["diesel", "dīze", "dize", "dīzel", "d-4d", "d4d", "tdi", "dci"];
const HYBRID_KEYWORDS: &[&str] = &["hybrid", "hibr", "phev", "plug-in"];

/// Keyword matches for one record, derived from the structured fuel hint
/// when it yields anything, otherwise from the free text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuelSignals {
    pub petrol: bool,
    pub diesel: bool,
    pub hybrid: bool,
}

impl FuelSignals {
    fn from_text(text: &str) -> Self {
        Self {
            petrol: matches_any(text, PETROL_KEYWORDS),
            diesel: matches_any(text, DIESEL_KEYWORDS),
            hybrid: matches_any(text, HYBRID_KEYWORDS),
        }
    }

    fn any(self) -> bool {
        self.petrol || self.diesel || self.hybrid
    }
}

fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

pub fn fuel_signals(listing: &Listing) -> FuelSignals {
    let hint = listing.fuel_hint.trim().to_lowercase();
    if !hint.is_empty() {
        let signals = FuelSignals::from_text(&hint);
        if signals.any() {
            return signals;
        }
    }
    FuelSignals::from_text(&listing.combined_text())
}

/// Derives the fuel category, petrol-before-diesel-before-hybrid on first
/// match. Pure function of record content.
pub fn classify(listing: &Listing) -> FuelCategory {
    let signals = fuel_signals(listing);
    if signals.petrol {
        FuelCategory::Petrol
    } else if signals.diesel {
        FuelCategory::Diesel
    } else if signals.hybrid {
        FuelCategory::Hybrid
    } else {
        FuelCategory::Unknown
    }
}

/// Inclusion policy, first matching rule decides:
/// 1. Hilux / Land Cruiser link segment: include, any fuel.
/// 2. Hybrid: exclude.
/// 3. Defect category: include iff the text mentions toyota and the
///    signals are petrol and not diesel.
/// 4. Otherwise: include iff petrol and not diesel.
///
/// A record matching both petrol and diesel keywords is diesel-dominant
/// for rules 3-4 and excluded.
pub fn include(listing: &Listing) -> bool {
    let link = listing.link.to_lowercase();
    if link.contains("/hilux/") || link.contains("/land-cruiser/") {
        return true;
    }

    let signals = fuel_signals(listing);
    if signals.hybrid {
        return false;
    }

    if listing.is_defect {
        return listing.combined_text().contains("toyota") && signals.petrol && !signals.diesel;
    }

    signals.petrol && !signals.diesel
}

pub fn filter_listings(listings: &[Listing]) -> Vec<Listing> {
    let filtered: Vec<Listing> = listings.iter().filter(|l| include(l)).cloned().collect();
    info!(total = listings.len(), matched = filtered.len(), "Applied inclusion policy");
    filtered
}
