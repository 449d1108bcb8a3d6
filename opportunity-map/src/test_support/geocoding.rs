//! Scripted geocoding source and recording score listener.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::GeoPoint;
use crate::domain::ports::{
    GeocodeError, GeocodedAddress, GeocodingSource, ReverseGeocoded, ScoreListener, ScoreUpdate,
};

/// Build a US geocoding hit.
///
/// # Panics
///
/// Panics when the coordinate is out of range.
pub fn geocoded(display_name: &str, lat: f64, lon: f64) -> GeocodedAddress {
    let point = match GeoPoint::new(lat, lon) {
        Ok(point) => point,
        Err(error) => panic!("invalid coordinate: {error}"),
    };
    GeocodedAddress {
        point,
        display_name: display_name.to_owned(),
        country_code: Some("us".to_owned()),
    }
}

#[derive(Debug, Default)]
struct Script {
    forward: HashMap<String, Result<Option<GeocodedAddress>, GeocodeError>>,
    reverse: Option<Result<Option<ReverseGeocoded>, GeocodeError>>,
    searched: Vec<String>,
    reversed: Vec<GeoPoint>,
}

/// Geocoding source answering from a script and recording every request.
///
/// Unscripted addresses resolve to no result.
#[derive(Debug, Default)]
pub struct ScriptedGeocodingSource {
    script: Mutex<Script>,
}

impl ScriptedGeocodingSource {
    /// Source with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `address` (matched exactly as sent) with `result`.
    #[must_use]
    pub fn with_result(
        self,
        address: &str,
        result: Result<Option<GeocodedAddress>, GeocodeError>,
    ) -> Self {
        self.lock().forward.insert(address.to_owned(), result);
        self
    }

    /// Answer `address` with `hit`.
    #[must_use]
    pub fn with_hit(self, address: &str, hit: GeocodedAddress) -> Self {
        self.with_result(address, Ok(Some(hit)))
    }

    /// Answer every reverse lookup with `result`.
    #[must_use]
    pub fn with_reverse(self, result: Result<Option<ReverseGeocoded>, GeocodeError>) -> Self {
        self.lock().reverse = Some(result);
        self
    }

    /// Addresses searched so far, in order.
    pub fn searched(&self) -> Vec<String> {
        self.lock().searched.clone()
    }

    /// Points reverse geocoded so far, in order.
    pub fn reversed(&self) -> Vec<GeoPoint> {
        self.lock().reversed.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("script mutex"),
        }
    }
}

#[async_trait]
impl GeocodingSource for ScriptedGeocodingSource {
    async fn search(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let mut script = self.lock();
        script.searched.push(address.to_owned());
        script.forward.get(address).cloned().unwrap_or(Ok(None))
    }

    async fn reverse(&self, point: GeoPoint) -> Result<Option<ReverseGeocoded>, GeocodeError> {
        let mut script = self.lock();
        script.reversed.push(point);
        script.reverse.clone().unwrap_or(Ok(None))
    }
}

/// Score listener keeping every update.
#[derive(Debug, Default)]
pub struct RecordingScoreListener(Mutex<Vec<ScoreUpdate>>);

impl RecordingScoreListener {
    /// Updates received so far, in order.
    pub fn updates(&self) -> Vec<ScoreUpdate> {
        self.lock().clone()
    }

    /// Most recent update.
    pub fn last(&self) -> Option<ScoreUpdate> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScoreUpdate>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("listener mutex"),
        }
    }
}

impl ScoreListener for RecordingScoreListener {
    fn score_changed(&self, update: &ScoreUpdate) {
        self.lock().push(update.clone());
    }
}
