//! Census tract identity, features, and property decoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::geo::TractGeometry;

/// Stable census tract identifier (GEOID).
///
/// ## Invariants
/// - non-empty once trimmed of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TractId(String);

/// Validation errors returned when constructing [`TractId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TractIdValidationError {
    /// Identifier is empty after trimming whitespace.
    #[error("tract id must not be empty")]
    Empty,
}

impl TractId {
    /// Validate and wrap a tract identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TractIdValidationError::Empty`] for blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, TractIdValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TractIdValidationError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for TractId {
    type Error = TractIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TractId> for String {
    fn from(value: TractId) -> Self {
        value.0
    }
}

impl std::fmt::Display for TractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for TractId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Tile property a tract id was read from, with the value as stored.
///
/// Engine filters compare types strictly, so a tileset storing numeric ids
/// must be filtered with the number, not its string rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TractKey {
    /// Property name, such as `GEOID`.
    pub property: String,
    /// Stored value: a string or a number.
    pub value: Value,
}

impl TractKey {
    /// Wrap a property name and its stored value.
    pub fn new(property: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            value,
        }
    }

    /// String-valued `GEOID` key for `id`.
    pub fn geoid(id: &TractId) -> Self {
        Self::new(DEFAULT_ID_KEYS[0], Value::from(id.as_str()))
    }
}

/// One census tract polygon as returned by a tile query.
#[derive(Debug, Clone, PartialEq)]
pub struct TractFeature {
    /// Stable tract identifier.
    pub id: TractId,
    /// Where the id came from in the tile, used for layer filters.
    pub key: TractKey,
    /// Opportunity-relevant attribute (household income at age 35).
    pub raw_attribute: f64,
    /// Tract outline, used only to re-render the highlight source.
    pub geometry: TractGeometry,
}

impl TractFeature {
    /// Build a feature keyed by a string `GEOID`.
    pub fn new(id: TractId, raw_attribute: f64, geometry: TractGeometry) -> Self {
        Self {
            key: TractKey::geoid(&id),
            id,
            raw_attribute,
            geometry,
        }
    }

    /// Replace the tile key the id was read from.
    #[must_use]
    pub fn with_key(mut self, key: TractKey) -> Self {
        self.key = key;
        self
    }
}

const DEFAULT_ID_KEYS: [&str; 2] = ["GEOID", "GEO_ID"];
const DEFAULT_ATTRIBUTE_KEYS: [&str; 3] = [
    "Household_Income_at_Age_35_rP_gP_p25",
    "household_income_at_age_35_rp_gp_p25",
    "Household_Income_at_Age_35-rP_gP_p25",
];

/// Property names used to read the id and raw attribute off a tile feature.
///
/// Tilesets in the wild spell the income column several ways; keys are tried
/// in order and the first match wins. The same order feeds the `coalesce`
/// in the fill-colour expression so the map and the readout agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeKeys {
    /// Candidate identifier properties, in priority order.
    pub id_keys: Vec<String>,
    /// Candidate raw attribute properties, in priority order.
    pub attribute_keys: Vec<String>,
}

impl Default for AttributeKeys {
    fn default() -> Self {
        Self {
            id_keys: DEFAULT_ID_KEYS.iter().map(|key| (*key).to_owned()).collect(),
            attribute_keys: DEFAULT_ATTRIBUTE_KEYS
                .iter()
                .map(|key| (*key).to_owned())
                .collect(),
        }
    }
}

impl AttributeKeys {
    /// Read the tract id from feature properties.
    ///
    /// Numeric ids are accepted and rendered without a fractional part.
    pub fn tract_id(&self, properties: &Map<String, Value>) -> Option<TractId> {
        self.tract_key(properties).map(|(id, _)| id)
    }

    /// Read the tract id along with the property it matched and the value
    /// exactly as stored.
    pub fn tract_key(&self, properties: &Map<String, Value>) -> Option<(TractId, TractKey)> {
        self.id_keys.iter().find_map(|key| {
            let value = properties.get(key)?;
            let id = match value {
                Value::String(text) => TractId::new(text.as_str()).ok()?,
                Value::Number(number) => TractId::new(number.to_string()).ok()?,
                _ => return None,
            };
            Some((id, TractKey::new(key.as_str(), value.clone())))
        })
    }

    /// Read the raw attribute from the first non-null attribute property.
    ///
    /// Numeric strings are accepted because some tile pipelines stringify
    /// numeric columns. A value that does not parse yields `None` rather than
    /// falling through to later keys, mirroring `coalesce` then `to-number`
    /// in the paint expression.
    pub fn raw_attribute(&self, properties: &Map<String, Value>) -> Option<f64> {
        let value = self
            .attribute_keys
            .iter()
            .find_map(|key| properties.get(key).filter(|value| !value.is_null()))?;
        let parsed = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|parsed| parsed.is_finite())
    }

    /// Primary id key, used for layer filters.
    pub fn primary_id_key(&self) -> &str {
        self.id_keys.first().map_or(DEFAULT_ID_KEYS[0], String::as_str)
    }
}

#[cfg(test)]
mod tests {
    //! Tract id validation and property decoding coverage.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn tract_id_rejects_blank(#[case] value: &str) {
        assert_eq!(TractId::new(value), Err(TractIdValidationError::Empty));
    }

    #[test]
    fn tract_id_trims_input() {
        let id = TractId::new(" 36061000100 ").expect("valid id");
        assert_eq!(id.as_str(), "36061000100");
    }

    #[rstest]
    #[case(json!({ "GEOID": "36061000100" }), Some("36061000100"))]
    #[case(json!({ "GEO_ID": "36061000200" }), Some("36061000200"))]
    #[case(json!({ "GEOID": "", "GEO_ID": "36061000300" }), Some("36061000300"))]
    #[case(json!({ "GEOID": 36061000400_u64 }), Some("36061000400"))]
    #[case(json!({ "NAME": "Tract 1" }), None)]
    fn reads_tract_id_from_first_present_key(#[case] properties: Value, #[case] expected: Option<&str>) {
        let keys = AttributeKeys::default();
        let id = keys.tract_id(&props(properties));
        assert_eq!(id.as_ref().map(TractId::as_str), expected);
    }

    #[rstest]
    #[case(json!({ "GEOID": "36061000100" }), "GEOID", json!("36061000100"))]
    #[case(json!({ "GEOID": "", "GEO_ID": "1400000US36061000300" }), "GEO_ID", json!("1400000US36061000300"))]
    #[case(json!({ "GEOID": 36061000400_u64 }), "GEOID", json!(36061000400_u64))]
    fn tract_key_keeps_matched_property_and_stored_value(
        #[case] properties: Value,
        #[case] property: &str,
        #[case] value: Value,
    ) {
        let keys = AttributeKeys::default();
        let (_, key) = keys.tract_key(&props(properties)).expect("id present");
        assert_eq!(key, TractKey::new(property, value));
    }

    #[test]
    fn plain_features_are_keyed_by_string_geoid() {
        let id = TractId::new("36061000100").expect("valid id");
        let feature = TractFeature::new(id, 0.0, TractGeometry::empty());
        assert_eq!(feature.key, TractKey::new("GEOID", json!("36061000100")));
    }

    #[rstest]
    #[case(json!({ "Household_Income_at_Age_35_rP_gP_p25": 35000.0 }), Some(35000.0))]
    #[case(json!({ "household_income_at_age_35_rp_gp_p25": 28000 }), Some(28000.0))]
    #[case(json!({ "Household_Income_at_Age_35-rP_gP_p25": "41000" }), Some(41000.0))]
    #[case(json!({ "Household_Income_at_Age_35_rP_gP_p25": null }), None)]
    #[case(
        json!({
            "Household_Income_at_Age_35_rP_gP_p25": null,
            "household_income_at_age_35_rp_gp_p25": " 30000 "
        }),
        Some(30000.0)
    )]
    #[case(
        json!({
            "Household_Income_at_Age_35_rP_gP_p25": "n/a",
            "household_income_at_age_35_rp_gp_p25": 30000
        }),
        None
    )]
    #[case(json!({}), None)]
    fn reads_raw_attribute_from_known_spellings(
        #[case] properties: Value,
        #[case] expected: Option<f64>,
    ) {
        let keys = AttributeKeys::default();
        assert_eq!(keys.raw_attribute(&props(properties)), expected);
    }
}
