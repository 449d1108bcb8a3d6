//! DTOs for decoding tilequery responses.
//!
//! Only feature properties are read; geometry and tilequery metadata are
//! ignored.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub(super) struct FeatureCollectionDto {
    #[serde(default)]
    pub(super) features: Vec<FeatureDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeatureDto {
    #[serde(default)]
    pub(super) properties: Map<String, Value>,
}

impl FeatureCollectionDto {
    pub(super) fn into_properties(self) -> Vec<Map<String, Value>> {
        self.features
            .into_iter()
            .map(|feature| feature.properties)
            .collect()
    }
}
