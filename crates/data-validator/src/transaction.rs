//! Transaction Records

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Merchant categories present in the historical transaction data
pub const KNOWN_CATEGORIES: [&str; 14] = [
    "grocery_pos",
    "entertainment",
    "shopping_pos",
    "misc_pos",
    "shopping_net",
    "gas_transport",
    "misc_net",
    "grocery_net",
    "food_dining",
    "health_fitness",
    "kids_pets",
    "home",
    "personal_care",
    "travel",
];

/// Merchant used when a request does not name one
pub const DEFAULT_MERCHANT: &str = "dummy_merchant";

/// Untyped transaction as it arrives from a caller.
///
/// Every field is optional at this stage; [`crate::Validator`] decides what is
/// required. Numbers are accepted as floats so that `34` and `34.0` both parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Transaction amount
    pub amt: Option<f64>,
    /// Merchant category
    pub category: Option<String>,
    /// Card holder gender (`M` or `F`)
    pub gender: Option<String>,
    /// Card holder region code
    pub state: Option<String>,
    /// Card holder job title
    pub job: Option<String>,
    /// Card holder age in years
    pub age: Option<f64>,
    /// Hour of day the transaction happened
    pub hour: Option<f64>,
    /// Merchant name
    #[serde(default)]
    pub merchant: Option<String>,
    /// Time-of-day bucket, derived from `hour` when absent
    #[serde(default, rename = "Hour_Category")]
    pub hour_category: Option<String>,
}

/// Card holder gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// Code used in the training data
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            other => Err(ValidationError::InvalidValue {
                field: "gender",
                reason: format!("expected \"M\" or \"F\", got {:?}", other),
            }),
        }
    }
}

/// Time-of-day bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HourCategory {
    #[serde(rename = "Early Morning")]
    EarlyMorning,
    #[serde(rename = "Morning")]
    Morning,
    #[serde(rename = "Afternoon")]
    Afternoon,
    #[serde(rename = "Evening")]
    Evening,
}

impl HourCategory {
    /// All buckets in hour order
    pub const ALL: [HourCategory; 4] = [
        HourCategory::EarlyMorning,
        HourCategory::Morning,
        HourCategory::Afternoon,
        HourCategory::Evening,
    ];

    /// Bucket for an hour of day over [0,6), [6,12), [12,18), [18,24)
    pub fn for_hour(hour: u8) -> Option<Self> {
        match hour {
            0..=5 => Some(HourCategory::EarlyMorning),
            6..=11 => Some(HourCategory::Morning),
            12..=17 => Some(HourCategory::Afternoon),
            18..=23 => Some(HourCategory::Evening),
            _ => None,
        }
    }

    /// Label used in the training data
    pub fn as_str(&self) -> &'static str {
        match self {
            HourCategory::EarlyMorning => "Early Morning",
            HourCategory::Morning => "Morning",
            HourCategory::Afternoon => "Afternoon",
            HourCategory::Evening => "Evening",
        }
    }
}

impl fmt::Display for HourCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HourCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HourCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "Hour_Category",
                reason: format!("unknown hour category {:?}", s),
            })
    }
}

/// Transaction that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amt: f64,
    pub category: String,
    pub gender: Gender,
    pub state: String,
    pub job: String,
    pub age: u32,
    pub hour: u8,
    pub merchant: Option<String>,
    pub hour_category: Option<HourCategory>,
}

impl Transaction {
    /// Whether the category is one seen in the historical data
    pub fn has_known_category(&self) -> bool {
        KNOWN_CATEGORIES.contains(&self.category.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_transaction_from_json() {
        let raw: RawTransaction = serde_json::from_str(
            r#"{"amt": 500.0, "category": "travel", "gender": "F", "state": "CA",
                "job": "Engineer", "age": 34, "hour": 2, "extra": "ignored"}"#,
        )
        .unwrap();

        assert_eq!(raw.amt, Some(500.0));
        assert_eq!(raw.age, Some(34.0));
        assert_eq!(raw.merchant, None);
        assert_eq!(raw.hour_category, None);
    }

    #[test]
    fn test_hour_category_label_in_json() {
        let raw: RawTransaction =
            serde_json::from_str(r#"{"Hour_Category": "Early Morning"}"#).unwrap();
        assert_eq!(raw.hour_category.as_deref(), Some("Early Morning"));
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("M".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(" F ".parse::<Gender>().unwrap(), Gender::Female);
        let err = "X".parse::<Gender>().unwrap_err();
        assert_eq!(err.field(), "gender");
    }

    #[test]
    fn test_hour_category_labels_round_trip() {
        for category in HourCategory::ALL {
            assert_eq!(category.as_str().parse::<HourCategory>().unwrap(), category);
        }
        assert!("Night".parse::<HourCategory>().is_err());
    }
}
