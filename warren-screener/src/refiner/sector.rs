//! Sector growth caps.

/// Sector whose companies are not valued by DCF.
pub const FINANCIAL_SERVICES: &str = "Financial Services";

/// Cap applied to sectors without an explicit entry (including "N/A").
pub const DEFAULT_GROWTH_CAP: f64 = 0.10;

/// Sectors where a very deep discount is not treated as distress.
const GROWTH_SECTORS: &[&str] = &["Technology", "Healthcare"];

/// Highest long-run growth rate considered realistic for `sector`.
///
/// Total over all inputs: unknown labels get [`DEFAULT_GROWTH_CAP`].
/// Financial Services reports 0; its records never reach the cap step.
pub fn growth_cap(sector: &str) -> f64 {
    match sector {
        "Consumer Defensive" => 0.06,
        "Utilities" => 0.05,
        "Energy" => 0.05,
        "Industrials" => 0.08,
        FINANCIAL_SERVICES => 0.0,
        "Real Estate" => 0.06,
        "Technology" => 0.15,
        "Healthcare" => 0.12,
        "Communication Services" => 0.12,
        "Consumer Cyclical" => 0.10,
        "Basic Materials" => 0.07,
        _ => DEFAULT_GROWTH_CAP,
    }
}

pub fn is_financial(sector: &str) -> bool {
    sector == FINANCIAL_SERVICES
}

/// Exempt from the distress override.
pub fn is_growth_sector(sector: &str) -> bool {
    GROWTH_SECTORS.contains(&sector)
}
