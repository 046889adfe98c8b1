use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seller attached to a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dealer {
    pub seller: String,
    pub region: String,
    pub city: String,
    pub contact: String,
}

/// One normalized catalog row. Built once at load, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub manufacturer: String,
    pub model: String,
    pub year: String,
    pub price: Option<f64>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub mileage: String,
    pub fuel: String,
    pub gearbox: String,
    pub origin: String,
    pub dealer: Dealer,
}

impl CatalogRecord {
    /// Midpoint of the listed price bounds, if both are known.
    pub fn average_price(&self) -> Option<f64> {
        match (self.lower_bound, self.upper_bound) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
            _ => None,
        }
    }

    /// Price used when two vehicles are compared head to head.
    pub fn reference_price(&self) -> Option<f64> {
        self.price.or_else(|| self.average_price())
    }

    /// e.g. "80,000 - 90,000 GHS"
    pub fn price_range_label(&self) -> String {
        match (self.lower_bound, self.upper_bound) {
            (Some(lo), Some(hi)) => format!("{} - {} GHS", format_amount(lo), format_amount(hi)),
            (Some(lo), None) => format!("from {} GHS", format_amount(lo)),
            (None, Some(hi)) => format!("up to {} GHS", format_amount(hi)),
            (None, None) => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    PriceInquiry,
    DealerSearch,
    Comparison,
    #[default]
    GeneralInfo,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::PriceInquiry => "price_inquiry",
            IntentKind::DealerSearch => "dealer_search",
            IntentKind::Comparison => "comparison",
            IntentKind::GeneralInfo => "general_info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "price_inquiry" => Some(IntentKind::PriceInquiry),
            "dealer_search" => Some(IntentKind::DealerSearch),
            "comparison" => Some(IntentKind::Comparison),
            "general_info" => Some(IntentKind::GeneralInfo),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured interpretation of one user turn. `None` means "no constraint".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentRecord {
    pub intent: IntentKind,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub price_range: Option<String>,
    pub year: Option<String>,
    pub comparison_items: Option<Vec<String>>,
}

impl IntentRecord {
    pub fn new(intent: IntentKind) -> Self {
        Self {
            intent,
            ..Default::default()
        }
    }

    /// Location the user cares about: city when given, else region.
    pub fn location(&self) -> Option<&str> {
        self.city.as_deref().or(self.region.as_deref())
    }
}

/// A ranked candidate, discarded once the reply is rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredVehicle {
    pub vehicle: CatalogRecord,
    pub score: f64,
}

/// Format a currency amount with thousands separators, no decimals.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// A recorded turn as exposed by the conversation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub query: String,
    pub response: String,
    pub intent: IntentRecord,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}
