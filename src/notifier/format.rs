use once_cell::sync::Lazy;
use regex::Regex;

use crate::crawler::models::{FuelCategory, Listing};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Renders one listing as a human-readable notification.
pub fn format_listing(listing: &Listing, fuel: FuelCategory, phone: Option<&str>) -> String {
    let year = YEAR_RE
        .find(&listing.title)
        .map(|m| m.as_str())
        .unwrap_or("N/A");

    let mut msg = if listing.is_defect {
        String::from("⚠️ Defekts / Crash Toyota\n")
    } else {
        String::from("🚗 Toyota\n")
    };
    msg.push_str(&listing.title);
    msg.push('\n');
    msg.push_str(&format!("📅 Gads: {year}\n"));
    msg.push_str(&format!("⛽ Dzinējs: {}\n", fuel.label()));
    msg.push_str(&format!("💰 Cena: {}\n", listing.price));
    if let Some(phone) = phone {
        msg.push_str(&format!("📞 {phone}\n"));
    }
    if listing.is_defect {
        let labels = crash_labels(listing);
        if !labels.is_empty() {
            msg.push_str(&format!("🏷 {}\n", labels.join(" ")));
        }
    }
    msg.push_str(&format!("🔗 {}", listing.link));
    msg
}

/// Derives tag labels for crash/defect listings from keyword matches and
/// the condition-percentage column.
pub fn crash_labels(listing: &Listing) -> Vec<String> {
    let text = listing.combined_text();
    let mut labels = Vec::new();

    if text.contains("defekt") {
        labels.push("DEFEKTS".to_string());
    }
    if text.contains("avārij") || text.contains("crash") {
        labels.push("AVĀRIJA".to_string());
    }
    if text.contains("bojāt") {
        labels.push("BOJĀTS".to_string());
    }
    if text.contains("rezerves daļas") || text.contains("detaļas") {
        labels.push("DAĻAS".to_string());
    }
    if text.contains("remont") {
        labels.push("REMONTAM".to_string());
    }
    if text.contains("motors") && text.contains("defekt") {
        labels.push("MOTORA DEFEKTS".to_string());
    }

    if let Some(fields) = &listing.category_fields {
        let digits = fields.condition_pct.trim_end_matches('%');
        if let Ok(pct) = digits.parse::<u32>() {
            if pct < 30 {
                labels.push("SMAGI BOJĀTS".to_string());
            } else if pct < 60 {
                labels.push("VIDĒJI BOJĀTS".to_string());
            } else if pct < 80 {
                labels.push("VIEGLI BOJĀTS".to_string());
            }
            labels.push(format!("📊 {pct}%"));
        }
    }

    labels
}
