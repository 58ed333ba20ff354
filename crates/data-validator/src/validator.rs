//! Transaction Validator

use crate::error::ValidationError;
use crate::transaction::{Gender, HourCategory, RawTransaction, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Amount valid range
    pub amt_range: (f64, f64),
    /// Card holder age valid range (years)
    pub age_range: (f64, f64),
    /// Hour of day valid range
    pub hour_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            amt_range: (0.0, f64::MAX),
            age_range: (18.0, 120.0),
            hour_range: (0.0, 23.0),
        }
    }
}

/// Validator for raw transaction records
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validation configuration in use
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a raw record, reporting the first offending field.
    pub fn validate(&self, raw: &RawTransaction) -> Result<Transaction, ValidationError> {
        let amt = self.validate_amt(raw.amt)?;
        let category = required_text("category", raw.category.as_deref())?;
        let gender: Gender = required_text("gender", raw.gender.as_deref())?.parse()?;
        let state = required_text("state", raw.state.as_deref())?;
        let job = required_text("job", raw.job.as_deref())?;
        let age = self.validate_age(raw.age)?;
        let hour = self.validate_hour(raw.hour)?;

        let merchant = raw
            .merchant
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let hour_category = match raw.hour_category.as_deref() {
            Some(label) => Some(consistent_hour_category(label, hour)?),
            None => None,
        };

        let transaction = Transaction {
            amt,
            category,
            gender,
            state,
            job,
            age,
            hour,
            merchant,
            hour_category,
        };

        if !transaction.has_known_category() {
            debug!(category = %transaction.category, "Category not seen in historical data");
        }

        Ok(transaction)
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidValue {
                field,
                reason: format!("{} is not a finite number", value),
            });
        }
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate amount
    pub fn validate_amt(&self, amt: Option<f64>) -> Result<f64, ValidationError> {
        let amt = amt.ok_or(ValidationError::MissingField("amt"))?;
        self.validate_range("amt", amt, self.config.amt_range)?;
        Ok(amt)
    }

    /// Validate card holder age
    pub fn validate_age(&self, age: Option<f64>) -> Result<u32, ValidationError> {
        let age = age.ok_or(ValidationError::MissingField("age"))?;
        self.validate_range("age", age, self.config.age_range)?;
        whole_number("age", age)
    }

    /// Validate hour of day
    pub fn validate_hour(&self, hour: Option<f64>) -> Result<u8, ValidationError> {
        let hour = hour.ok_or(ValidationError::MissingField("hour"))?;
        self.validate_range("hour", hour, self.config.hour_range)?;
        whole_number("hour", hour)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

fn required_text(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Convert a finite, range-checked value to an integer without saturating
fn whole_number<T: TryFrom<i64>>(field: &'static str, value: f64) -> Result<T, ValidationError> {
    if value.fract() != 0.0 {
        return Err(ValidationError::InvalidValue {
            field,
            reason: format!("{} is not a whole number", value),
        });
    }
    let whole = value as i64;
    if whole as f64 != value {
        return Err(ValidationError::InvalidValue {
            field,
            reason: format!("{} does not fit in an integer", value),
        });
    }
    T::try_from(whole).map_err(|_| ValidationError::InvalidValue {
        field,
        reason: format!("{} does not fit in {}", value, std::any::type_name::<T>()),
    })
}

/// A supplied time-of-day label must agree with the bucket of `hour`
fn consistent_hour_category(label: &str, hour: u8) -> Result<HourCategory, ValidationError> {
    let supplied: HourCategory = label.parse()?;
    match HourCategory::for_hour(hour) {
        Some(expected) if expected == supplied => Ok(supplied),
        Some(expected) => Err(ValidationError::InvalidValue {
            field: "Hour_Category",
            reason: format!("{} contradicts hour {} ({})", supplied, hour, expected),
        }),
        None => Err(ValidationError::InvalidValue {
            field: "Hour_Category",
            reason: format!("hour {} has no time-of-day bucket", hour),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> RawTransaction {
        RawTransaction {
            amt: Some(500.0),
            category: Some("travel".to_string()),
            gender: Some("F".to_string()),
            state: Some("CA".to_string()),
            job: Some("Engineer".to_string()),
            age: Some(34.0),
            hour: Some(2.0),
            merchant: None,
            hour_category: None,
        }
    }

    #[test]
    fn test_valid_transaction() {
        let validator = Validator::default();
        let tx = validator.validate(&sample()).unwrap();
        assert_eq!(tx.amt, 500.0);
        assert_eq!(tx.gender, Gender::Female);
        assert_eq!(tx.age, 34);
        assert_eq!(tx.hour, 2);
        assert_eq!(tx.merchant, None);
        assert!(tx.has_known_category());
    }

    #[test]
    fn test_hour_out_of_range() {
        let validator = Validator::default();
        let raw = RawTransaction {
            hour: Some(24.0),
            ..sample()
        };
        let err = validator.validate(&raw).unwrap_err();
        assert_eq!(err.field(), "hour");
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_negative_amount() {
        let validator = Validator::default();
        let raw = RawTransaction {
            amt: Some(-1.0),
            ..sample()
        };
        assert_eq!(validator.validate(&raw).unwrap_err().field(), "amt");
    }

    #[test]
    fn test_nan_amount_rejected() {
        let validator = Validator::default();
        let raw = RawTransaction {
            amt: Some(f64::NAN),
            ..sample()
        };
        assert!(matches!(
            validator.validate(&raw).unwrap_err(),
            ValidationError::InvalidValue { field: "amt", .. }
        ));
    }

    #[test]
    fn test_missing_fields() {
        let validator = Validator::default();
        let raw = RawTransaction {
            job: None,
            ..sample()
        };
        assert_eq!(
            validator.validate(&raw).unwrap_err(),
            ValidationError::MissingField("job")
        );

        let raw = RawTransaction {
            state: Some("   ".to_string()),
            ..sample()
        };
        assert_eq!(
            validator.validate(&raw).unwrap_err(),
            ValidationError::MissingField("state")
        );
    }

    #[test]
    fn test_fractional_hour_rejected() {
        let validator = Validator::default();
        let raw = RawTransaction {
            hour: Some(2.5),
            ..sample()
        };
        assert_eq!(validator.validate(&raw).unwrap_err().field(), "hour");
    }

    #[test]
    fn test_unknown_category_is_accepted() {
        let validator = Validator::default();
        let raw = RawTransaction {
            category: Some("unknown_category_xyz".to_string()),
            ..sample()
        };
        let tx = validator.validate(&raw).unwrap();
        assert!(!tx.has_known_category());
    }

    #[test]
    fn test_supplied_hour_category() {
        let validator = Validator::default();
        let raw = RawTransaction {
            hour_category: Some("Early Morning".to_string()),
            ..sample()
        };
        let tx = validator.validate(&raw).unwrap();
        assert_eq!(tx.hour_category, Some(HourCategory::EarlyMorning));

        let raw = RawTransaction {
            hour_category: Some("Midnight".to_string()),
            ..sample()
        };
        assert_eq!(validator.validate(&raw).unwrap_err().field(), "Hour_Category");
    }

    #[test]
    fn test_hour_category_contradicting_hour_rejected() {
        let validator = Validator::default();
        let raw = RawTransaction {
            hour: Some(2.0),
            hour_category: Some("Evening".to_string()),
            ..sample()
        };
        let err = validator.validate(&raw).unwrap_err();
        assert_eq!(err.field(), "Hour_Category");
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn test_wide_ranges_do_not_saturate() {
        let validator = Validator::new(ValidationConfig {
            age_range: (-10.0, 1e12),
            hour_range: (-5.0, 1000.0),
            ..ValidationConfig::default()
        });

        let raw = RawTransaction {
            age: Some(-3.0),
            ..sample()
        };
        assert!(matches!(
            validator.validate(&raw).unwrap_err(),
            ValidationError::InvalidValue { field: "age", .. }
        ));

        let raw = RawTransaction {
            age: Some(5e9),
            ..sample()
        };
        assert_eq!(validator.validate(&raw).unwrap_err().field(), "age");

        let raw = RawTransaction {
            hour: Some(300.0),
            ..sample()
        };
        assert!(matches!(
            validator.validate(&raw).unwrap_err(),
            ValidationError::InvalidValue { field: "hour", .. }
        ));

        let raw = RawTransaction {
            age: Some(4_000_000_000.0),
            ..sample()
        };
        assert_eq!(validator.validate(&raw).unwrap().age, 4_000_000_000);
    }

    #[test]
    fn test_blank_merchant_treated_as_absent() {
        let validator = Validator::default();
        let raw = RawTransaction {
            merchant: Some("  ".to_string()),
            ..sample()
        };
        assert_eq!(validator.validate(&raw).unwrap().merchant, None);
    }

    proptest! {
        #[test]
        fn prop_every_valid_hour_accepted(hour in 0u8..24) {
            let validator = Validator::default();
            let raw = RawTransaction { hour: Some(hour as f64), ..sample() };
            prop_assert_eq!(validator.validate(&raw).unwrap().hour, hour);
        }

        #[test]
        fn prop_supplied_hour_category_must_match_hour(hour in 0u8..24, index in 0usize..4) {
            let validator = Validator::default();
            let label = HourCategory::ALL[index];
            let raw = RawTransaction {
                hour: Some(hour as f64),
                hour_category: Some(label.as_str().to_string()),
                ..sample()
            };
            let accepted = validator.validate(&raw).is_ok();
            prop_assert_eq!(accepted, HourCategory::for_hour(hour) == Some(label));
        }

        #[test]
        fn prop_hours_past_range_rejected(hour in 24u32..10_000) {
            let validator = Validator::default();
            let raw = RawTransaction { hour: Some(hour as f64), ..sample() };
            prop_assert!(validator.validate(&raw).is_err());
        }
    }
}
