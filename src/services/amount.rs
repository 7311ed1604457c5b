//! Net billable amount of a weighed transaction.
//!
//! `amount = weight * rate - (moisture + rejection + duplex + first + second + third)`,
//! rounded half away from zero to two places. Deductions larger than the base
//! produce a negative amount, which is kept.
//!
//! Inputs are brought to their column scale first (weight 3 places, money 2)
//! and bounded to what `DECIMAL(14, x)` holds, so the stored row always
//! satisfies the formula and arithmetic cannot overflow.

use crate::errors::ServiceError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Itemized quality deductions; absent fields are zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deductions {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub moisture: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub rejection: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub duplex: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub first: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub second: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub third: Decimal,
}

impl Deductions {
    /// Sum of every deduction; `None` on overflow
    pub fn total(&self) -> Option<Decimal> {
        [
            self.rejection,
            self.duplex,
            self.first,
            self.second,
            self.third,
        ]
        .into_iter()
        .try_fold(self.moisture, Decimal::checked_add)
    }

    /// Each deduction at money scale and within the column range
    pub fn normalized(&self) -> Result<Self, ServiceError> {
        Ok(Self {
            moisture: money(self.moisture, "moisture")?,
            rejection: money(self.rejection, "rejection")?,
            duplex: money(self.duplex, "duplex")?,
            first: money(self.first, "first")?,
            second: money(self.second, "second")?,
            third: money(self.third, "third")?,
        })
    }
}

/// Integer digits left in a `DECIMAL(14, 2)` money column
const MONEY_INTEGER_DIGITS: u32 = 12;
/// Weight is stored as `DECIMAL(14, 3)`
const WEIGHT_SCALE: u32 = 3;
const WEIGHT_INTEGER_DIGITS: u32 = 11;

fn bounded(
    value: Decimal,
    scale: u32,
    integer_digits: u32,
    field: &str,
) -> Result<Decimal, ServiceError> {
    let rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    let limit = Decimal::from(10_i64.pow(integer_digits));
    if rounded.abs() >= limit {
        return Err(ServiceError::ValidationError(format!(
            "{} must be smaller than {} in magnitude",
            field, limit
        )));
    }
    Ok(rounded)
}

/// Rounds to 2 places and rejects values a money column cannot hold
pub fn money(value: Decimal, field: &str) -> Result<Decimal, ServiceError> {
    bounded(value, 2, MONEY_INTEGER_DIGITS, field)
}

/// Rounds to 3 places and rejects values the weight column cannot hold
pub fn weight(value: Decimal) -> Result<Decimal, ServiceError> {
    bounded(value, WEIGHT_SCALE, WEIGHT_INTEGER_DIGITS, "weight")
}

/// Amount from already-normalized inputs; the result must fit a money column.
pub fn compute_amount(
    weight: Decimal,
    rate: Decimal,
    deductions: &Deductions,
) -> Result<Decimal, ServiceError> {
    let net = weight
        .checked_mul(rate)
        .zip(deductions.total())
        .and_then(|(gross, deducted)| gross.checked_sub(deducted))
        .ok_or_else(|| {
            ServiceError::ValidationError("weight × rate is out of range".to_string())
        })?;
    money(net, "total_amount")
}

/// Overflow-checked sum of ledger amounts
pub fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    field: &str,
) -> Result<Decimal, ServiceError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .map(round_money)
        .ok_or_else(|| ServiceError::ValidationError(format!("{} is out of range", field)))
}

/// Sum of amounts already stored in the ledger. Overflow here means the
/// stored data is inconsistent, not that the caller sent bad input.
pub fn ledger_total(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, ServiceError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .map(round_money)
        .ok_or_else(|| ServiceError::InternalError("ledger total overflowed".to_string()))
}

/// Two-place rounding used for every money figure leaving the ledger
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Reads a JSON number or numeric string; anything else is `None`.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        // Go through the textual form so 0.1 stays 0.1 instead of its binary neighbour
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => {
            let trimmed = s.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .ok()
        }
        _ => None,
    }
}

/// Missing, null or non-numeric input becomes zero.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_decimal(&value).unwrap_or_default())
}

/// Like [`lenient_decimal`] but keeps "not supplied" distinguishable.
pub fn lenient_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(ref s) if s.trim().is_empty() => Ok(None),
        other => Ok(parse_decimal(&other)),
    }
}

/// Rejects unparseable input instead of zeroing it; used for payment amounts.
pub fn strict_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(ref s) if s.trim().is_empty() => Ok(None),
        other => parse_decimal(&other)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a number, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn subtracts_deductions_from_base() {
        let deductions = Deductions {
            moisture: dec!(2),
            rejection: dec!(1),
            ..Default::default()
        };
        assert_eq!(compute_amount(dec!(100), dec!(10), &deductions).unwrap(), dec!(997.00));
    }

    #[test]
    fn negative_amount_is_not_clamped() {
        let deductions = Deductions {
            moisture: dec!(5),
            ..Default::default()
        };
        assert_eq!(compute_amount(dec!(1), dec!(1), &deductions).unwrap(), dec!(-4.00));
    }

    #[test]
    fn missing_deduction_fields_default_to_zero() {
        let deductions: Deductions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(deductions, Deductions::default());
        assert_eq!(compute_amount(dec!(50), dec!(20), &deductions).unwrap(), dec!(1000.00));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let none = Deductions::default();
        assert_eq!(compute_amount(dec!(1.005), dec!(1), &none).unwrap(), dec!(1.01));
        assert_eq!(compute_amount(dec!(0.333), dec!(3), &none).unwrap(), dec!(1.00));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn decimal_arithmetic_has_no_float_drift() {
        let none = Deductions::default();
        assert_eq!(compute_amount(dec!(0.1), dec!(3), &none).unwrap(), dec!(0.30));
    }

    #[test]
    fn non_numeric_inputs_become_zero() {
        let deductions: Deductions = serde_json::from_value(json!({
            "moisture": "abc",
            "rejection": null,
            "duplex": "1.5",
            "first": 2,
            "second": true,
            "third": ""
        }))
        .unwrap();
        assert_eq!(deductions.moisture, Decimal::ZERO);
        assert_eq!(deductions.rejection, Decimal::ZERO);
        assert_eq!(deductions.duplex, dec!(1.5));
        assert_eq!(deductions.first, dec!(2));
        assert_eq!(deductions.total(), Some(dec!(3.5)));
    }

    #[test]
    fn huge_inputs_are_rejected_instead_of_overflowing() {
        let none = Deductions::default();
        assert!(matches!(
            compute_amount(Decimal::MAX, dec!(2), &none),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            compute_amount(dec!(99999999999), dec!(999999999999), &none),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(weight(dec!(79228162514264337593543950335)).is_err());
        assert!(money(dec!(-1000000000000), "rate").is_err());

        let huge = Deductions {
            moisture: Decimal::MAX,
            rejection: Decimal::MAX,
            ..Default::default()
        };
        assert_eq!(huge.total(), None);
        assert!(huge.normalized().is_err());
        assert!(checked_sum([Decimal::MAX, Decimal::MAX], "total").is_err());
    }

    #[test]
    fn inputs_take_their_column_scale() {
        assert_eq!(weight(dec!(12.3456)).unwrap(), dec!(12.346));
        assert_eq!(money(dec!(10.255), "rate").unwrap(), dec!(10.26));
        assert_eq!(money(dec!(999999999999.99), "rate").unwrap(), dec!(999999999999.99));
        assert_eq!(checked_sum([dec!(0.1), dec!(0.2)], "total").unwrap(), dec!(0.30));
    }

    #[test]
    fn parse_decimal_accepts_numbers_and_strings() {
        assert_eq!(parse_decimal(&json!(12.5)), Some(dec!(12.5)));
        assert_eq!(parse_decimal(&json!(" 7 ")), Some(dec!(7)));
        assert_eq!(parse_decimal(&json!("1e2")), Some(dec!(100)));
        assert_eq!(parse_decimal(&json!([1])), None);
    }
}
