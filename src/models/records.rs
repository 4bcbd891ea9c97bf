//! Concrete device record types.

use super::datum::{Base, Datum, IdentityFieldsVersion, format_float, required};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Record type of a continuous glucose reading.
pub const CBG_TYPE: &str = "cbg";
/// Record type of a fingerstick glucose reading.
pub const SMBG_TYPE: &str = "smbg";
/// Record type of a bolus.
pub const BOLUS_TYPE: &str = "bolus";
/// Record type of a basal rate segment.
pub const BASAL_TYPE: &str = "basal";
/// Record type of a food entry.
pub const FOOD_TYPE: &str = "food";

/// A glucose reading (`cbg` or `smbg`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glucose {
    /// Shared fields.
    #[serde(flatten)]
    pub base: Base,
    /// Units, e.g. `mg/dL` or `mmol/L`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Reading value in `units`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Glucose {
    /// Creates a continuous glucose reading.
    #[must_use]
    pub fn cbg(units: impl Into<String>, value: f64) -> Self {
        Self::with_type(CBG_TYPE, units, value)
    }

    /// Creates a fingerstick glucose reading.
    #[must_use]
    pub fn smbg(units: impl Into<String>, value: f64) -> Self {
        Self::with_type(SMBG_TYPE, units, value)
    }

    fn with_type(datum_type: &str, units: impl Into<String>, value: f64) -> Self {
        Self {
            base: Base::new(datum_type),
            units: Some(units.into()),
            value: Some(value),
        }
    }
}

impl Datum for Glucose {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn type_identity_fields(&self, _version: IdentityFieldsVersion) -> Result<Vec<String>> {
        let value = self
            .value
            .ok_or_else(|| Error::InvalidDatum("value is missing".to_string()))?;
        Ok(vec![
            required(self.units.as_deref(), "units")?,
            format_float(value),
        ])
    }
}

/// An insulin bolus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bolus {
    /// Shared fields.
    #[serde(flatten)]
    pub base: Base,
    /// Delivery shape, e.g. `normal`, `square`, `dual/square`.
    pub sub_type: String,
    /// Immediate units delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<f64>,
    /// Extended units delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<f64>,
}

impl Bolus {
    /// Creates a normal bolus.
    #[must_use]
    pub fn normal(units: f64) -> Self {
        Self {
            base: Base::new(BOLUS_TYPE),
            sub_type: "normal".to_string(),
            normal: Some(units),
            extended: None,
        }
    }
}

impl Datum for Bolus {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn type_identity_fields(&self, version: IdentityFieldsVersion) -> Result<Vec<String>> {
        let sub_type = required(Some(self.sub_type.as_str()), "sub type")?;
        // Legacy hashes only distinguished boluses by shape.
        if version == IdentityFieldsVersion::Legacy {
            return Ok(vec![sub_type]);
        }
        Ok(vec![
            sub_type,
            amount_or_absent(self.normal),
            amount_or_absent(self.extended),
        ])
    }
}

/// Marks an absent bolus amount so each amount keeps its own field slot.
const ABSENT_AMOUNT: &str = "-";

fn amount_or_absent(amount: Option<f64>) -> String {
    amount.map_or_else(|| ABSENT_AMOUNT.to_string(), format_float)
}

/// A basal rate segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basal {
    /// Shared fields.
    #[serde(flatten)]
    pub base: Base,
    /// Delivery type, e.g. `scheduled`, `temp`, `suspend`.
    pub delivery_type: String,
    /// Rate in units per hour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Segment duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl Basal {
    /// Creates a scheduled basal segment.
    #[must_use]
    pub fn scheduled(rate: f64, duration_ms: i64) -> Self {
        Self {
            base: Base::new(BASAL_TYPE),
            delivery_type: "scheduled".to_string(),
            rate: Some(rate),
            duration: Some(duration_ms),
        }
    }
}

impl Datum for Basal {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn type_identity_fields(&self, _version: IdentityFieldsVersion) -> Result<Vec<String>> {
        let rate = self
            .rate
            .ok_or_else(|| Error::InvalidDatum("rate is missing".to_string()))?;
        let duration = self
            .duration
            .ok_or_else(|| Error::InvalidDatum("duration is missing".to_string()))?;
        Ok(vec![
            required(Some(self.delivery_type.as_str()), "delivery type")?,
            format_float(rate),
            duration.to_string(),
        ])
    }
}

/// A food entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    /// Shared fields.
    #[serde(flatten)]
    pub base: Base,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Net carbohydrate in grams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbohydrate: Option<f64>,
}

impl Food {
    /// Creates a food entry.
    #[must_use]
    pub fn new(name: impl Into<String>, carbohydrate: f64) -> Self {
        Self {
            base: Base::new(FOOD_TYPE),
            name: Some(name.into()),
            carbohydrate: Some(carbohydrate),
        }
    }
}

impl Datum for Food {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn type_identity_fields(&self, _version: IdentityFieldsVersion) -> Result<Vec<String>> {
        let carbohydrate = self
            .carbohydrate
            .ok_or_else(|| Error::InvalidDatum("carbohydrate is missing".to_string()))?;
        Ok(vec![
            required(self.name.as_deref(), "name")?,
            format_float(carbohydrate),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    fn stamp<D: Datum>(mut datum: D) -> D {
        datum.set_user_id(Some("user".to_string()));
        datum.set_device_id(Some("dev".to_string()));
        datum.base_mut().time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single();
        datum
    }

    #[test]
    fn test_glucose_identity_includes_units_and_value() {
        let fields = stamp(Glucose::cbg("mg/dL", 120.0))
            .identity_fields(IdentityFieldsVersion::Platform)
            .unwrap_or_default();
        assert_eq!(
            fields,
            vec!["user", "dev", "2024-01-02T03:04:05.000Z", "cbg", "mg/dL", "120"]
        );
    }

    #[test]
    fn test_glucose_without_value_fails() {
        let mut glucose = stamp(Glucose::smbg("mmol/L", 5.5));
        glucose.value = None;
        assert!(matches!(
            glucose.identity_fields(IdentityFieldsVersion::Platform),
            Err(Error::InvalidDatum(_))
        ));
    }

    #[test]
    fn test_bolus_legacy_fields_drop_amounts() {
        let bolus = stamp(Bolus::normal(2.5));
        let legacy = bolus
            .identity_fields(IdentityFieldsVersion::Legacy)
            .unwrap_or_default();
        assert_eq!(legacy, vec!["bolus", "dev", "2024-01-02T03:04:05", "normal"]);

        let platform = bolus
            .identity_fields(IdentityFieldsVersion::Platform)
            .unwrap_or_default();
        assert_eq!(&platform[4..], ["normal", "2.5", "-"]);
    }

    fn dual(normal: Option<f64>, extended: Option<f64>) -> Bolus {
        stamp(Bolus {
            base: Base::new(BOLUS_TYPE),
            sub_type: "dual/square".to_string(),
            normal,
            extended,
        })
    }

    #[test]
    fn test_bolus_amounts_keep_their_slots() {
        let immediate = dual(Some(1.0), None)
            .identity_fields(IdentityFieldsVersion::Platform)
            .unwrap();
        let extended = dual(None, Some(1.0))
            .identity_fields(IdentityFieldsVersion::Platform)
            .unwrap();

        assert_eq!(&immediate[4..], ["dual/square", "1", "-"]);
        assert_eq!(&extended[4..], ["dual/square", "-", "1"]);
        assert_ne!(immediate, extended);
    }

    #[test]
    fn test_basal_and_food_types() {
        let basal = stamp(Basal::scheduled(0.8, 3_600_000));
        assert_eq!(basal.datum_type(), BASAL_TYPE);
        assert_eq!(
            basal
                .identity_fields(IdentityFieldsVersion::Platform)
                .map(|f| f.len())
                .unwrap_or_default(),
            7
        );

        let food = stamp(Food::new("apple", 14.0));
        assert_eq!(food.datum_type(), FOOD_TYPE);
        assert_eq!(
            food.identity_fields(IdentityFieldsVersion::Platform)
                .map(|f| f.len())
                .unwrap_or_default(),
            6
        );
    }

    #[test_case(Basal::scheduled(1.5, 3_600_000) ; "rate")]
    #[test_case(Basal::scheduled(0.5, 1_800_000) ; "duration")]
    #[test_case(Basal { delivery_type: "temp".to_string(), ..Basal::scheduled(0.5, 3_600_000) } ; "delivery type")]
    fn test_basal_identity_distinguishes(other: Basal) {
        let reference = stamp(Basal::scheduled(0.5, 3_600_000))
            .identity_fields(IdentityFieldsVersion::Platform)
            .unwrap();
        assert_eq!(&reference[4..], ["scheduled", "0.5", "3600000"]);
        assert_ne!(
            stamp(other).identity_fields(IdentityFieldsVersion::Platform).unwrap(),
            reference
        );
    }

    #[test_case(Food::new("steak", 10.0) ; "name")]
    #[test_case(Food::new("apple", 0.0) ; "carbohydrate")]
    fn test_food_identity_distinguishes(other: Food) {
        let reference = stamp(Food::new("apple", 10.0))
            .identity_fields(IdentityFieldsVersion::Platform)
            .unwrap();
        assert_eq!(&reference[4..], ["apple", "10"]);
        assert_ne!(
            stamp(other).identity_fields(IdentityFieldsVersion::Platform).unwrap(),
            reference
        );
    }

    #[test]
    fn test_basal_and_food_missing_values_fail() {
        let mut basal = stamp(Basal::scheduled(0.5, 3_600_000));
        basal.rate = None;
        assert!(matches!(
            basal.identity_fields(IdentityFieldsVersion::Platform),
            Err(Error::InvalidDatum(ref message)) if message == "rate is missing"
        ));
        basal.rate = Some(0.5);
        basal.duration = None;
        assert!(matches!(
            basal.identity_fields(IdentityFieldsVersion::Platform),
            Err(Error::InvalidDatum(ref message)) if message == "duration is missing"
        ));

        let mut food = stamp(Food::new("apple", 10.0));
        food.name = None;
        assert!(matches!(
            food.identity_fields(IdentityFieldsVersion::Platform),
            Err(Error::InvalidDatum(_))
        ));
        food.name = Some("apple".to_string());
        food.carbohydrate = None;
        assert!(matches!(
            food.identity_fields(IdentityFieldsVersion::Platform),
            Err(Error::InvalidDatum(ref message)) if message == "carbohydrate is missing"
        ));
    }

    #[test]
    fn test_glucose_serializes_flat() {
        let glucose = stamp(Glucose::cbg("mg/dL", 100.0));
        let json = serde_json::to_value(&glucose).unwrap_or_default();
        assert_eq!(json["type"], "cbg");
        assert_eq!(json["userId"], "user");
        assert_eq!(json["units"], "mg/dL");
    }
}
