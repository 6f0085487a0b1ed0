/// Extra columns exposed by the crash/defect category table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFields {
    pub make: String,
    pub model: String,
    pub year: String,
    pub condition_pct: String,
}

/// One scraped advertisement, normalized from the listing row markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Stable identifier from the row container; falls back to the link.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Display string; default currency appended when purely numeric.
    pub price: String,
    /// Absolute URL of the detail page.
    pub link: String,
    /// Structured engine/fuel text from the detail page, may be empty.
    pub fuel_hint: String,
    /// True iff discovered via the crash/defect category.
    pub is_defect: bool,
    pub category_fields: Option<CategoryFields>,
}

impl Listing {
    /// Lowercased title + description, the fallback classification signal.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelCategory {
    Petrol,
    Diesel,
    Hybrid,
    Unknown,
}

impl FuelCategory {
    pub fn label(self) -> &'static str {
        match self {
            FuelCategory::Petrol => "Petrol",
            FuelCategory::Diesel => "Diesel",
            FuelCategory::Hybrid => "Hybrid",
            FuelCategory::Unknown => "N/A",
        }
    }
}
