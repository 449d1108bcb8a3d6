//! Cached, throttled geocoding over the [`GeocodingSource`] port.
//!
//! Lookups are memoised for the lifetime of the service under a normalised
//! address key. Cache misses funnel through one global throttle so outbound
//! requests are spaced by at least the configured interval no matter which
//! address they are for.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, warn};

use super::geo::GeoPoint;
use super::ports::{GeocodeError, GeocodedAddress, GeocodingSource, ReverseGeocoded};

/// Minimum spacing between outbound requests (one request per second).
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Country code accepted by default.
pub const DEFAULT_SUPPORTED_COUNTRY: &str = "us";

/// Throttle and region settings for [`GeocodingService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodingConfig {
    /// Minimum spacing between outbound requests.
    pub min_request_interval: Duration,
    /// Only results in this country are accepted; `None` accepts all.
    pub supported_country: Option<String>,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            supported_country: Some(DEFAULT_SUPPORTED_COUNTRY.to_owned()),
        }
    }
}

/// Normalised cache key for an address: trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressKey(String);

impl AddressKey {
    /// Normalise `address` into a key.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::InvalidAddress`] for blank input.
    pub fn new(address: &str) -> Result<Self, GeocodeError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(GeocodeError::invalid_address());
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Borrow the normalised key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Async sleeping abstraction used by the throttle.
#[async_trait]
pub trait ThrottleSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl ThrottleSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Domain-owned geocoding service.
pub struct GeocodingService {
    source: Arc<dyn GeocodingSource>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn ThrottleSleeper>,
    config: GeocodingConfig,
    forward: Mutex<HashMap<AddressKey, GeocodedAddress>>,
    reverse: Mutex<HashMap<String, ReverseGeocoded>>,
    last_request: tokio::sync::Mutex<Option<DateTime<Utc>>>,
}

impl GeocodingService {
    /// Build a service sleeping on the Tokio timer.
    pub fn new(
        source: Arc<dyn GeocodingSource>,
        clock: Arc<dyn Clock>,
        config: GeocodingConfig,
    ) -> Self {
        Self::with_sleeper(source, clock, Arc::new(TokioSleeper), config)
    }

    /// Build a service with an injected sleeper.
    pub fn with_sleeper(
        source: Arc<dyn GeocodingSource>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn ThrottleSleeper>,
        config: GeocodingConfig,
    ) -> Self {
        Self {
            source,
            clock,
            sleeper,
            config,
            forward: Mutex::new(HashMap::new()),
            reverse: Mutex::new(HashMap::new()),
            last_request: tokio::sync::Mutex::new(None),
        }
    }

    /// Resolve `address` to a coordinate.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::InvalidAddress`] for blank input, before any I/O;
    /// - [`GeocodeError::NotFound`] when the service has no result;
    /// - [`GeocodeError::NonUsAddress`] when the result lies outside the
    ///   supported country (not cached);
    /// - transport, status, and decode errors from the source unchanged.
    pub async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        let key = AddressKey::new(address)?;
        if let Some(hit) = lookup(&self.forward, &key) {
            debug!(address = key.as_str(), "geocode cache hit");
            return Ok(hit);
        }

        let mut last_request = self.last_request.lock().await;
        if let Some(hit) = lookup(&self.forward, &key) {
            debug!(address = key.as_str(), "geocode cache filled while throttled");
            return Ok(hit);
        }
        self.wait_for_slot(&mut last_request).await;
        debug!(address = key.as_str(), "geocode cache miss, querying source");
        let result = self.source.search(address.trim()).await;
        drop(last_request);

        let hit = match result {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                warn!(address = key.as_str(), "address not found");
                return Err(GeocodeError::not_found(address.trim()));
            }
            Err(err) => {
                warn!(address = key.as_str(), error = %err, "geocoding failed");
                return Err(err);
            }
        };
        self.ensure_supported(hit.country_code.as_deref())?;
        store(&self.forward, key, hit.clone());
        Ok(hit)
    }

    /// Describe `point`, sharing the cache discipline and throttle of
    /// [`Self::geocode`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::NotFound`] when the service knows nothing at
    /// `point`, or the source's error unchanged.
    pub async fn reverse_geocode(&self, point: GeoPoint) -> Result<ReverseGeocoded, GeocodeError> {
        let key = format!("{:.6},{:.6}", point.lat(), point.lon());
        if let Some(hit) = lookup(&self.reverse, &key) {
            debug!(point = %key, "reverse geocode cache hit");
            return Ok(hit);
        }

        let mut last_request = self.last_request.lock().await;
        if let Some(hit) = lookup(&self.reverse, &key) {
            return Ok(hit);
        }
        self.wait_for_slot(&mut last_request).await;
        debug!(point = %key, "reverse geocode cache miss, querying source");
        let result = self.source.reverse(point).await;
        drop(last_request);

        match result {
            Ok(Some(hit)) => {
                store(&self.reverse, key, hit.clone());
                Ok(hit)
            }
            Ok(None) => {
                warn!(point = %key, "nothing known at point");
                Err(GeocodeError::not_found(key))
            }
            Err(err) => {
                warn!(point = %key, error = %err, "reverse geocoding failed");
                Err(err)
            }
        }
    }

    /// Number of memoised forward lookups.
    pub fn cached_addresses(&self) -> usize {
        lock(&self.forward).len()
    }

    /// Sleep until the interval since the previous request has elapsed, then
    /// claim the slot for the request about to be issued.
    async fn wait_for_slot(&self, last_request: &mut Option<DateTime<Utc>>) {
        if let Some(previous) = *last_request {
            let elapsed = (self.clock.utc() - previous)
                .to_std()
                .unwrap_or(Duration::ZERO);
            let wait = self.config.min_request_interval.saturating_sub(elapsed);
            if !wait.is_zero() {
                debug!(wait_ms = wait.as_millis(), "throttling geocoding request");
                self.sleeper.sleep(wait).await;
            }
        }
        *last_request = Some(self.clock.utc());
    }

    fn ensure_supported(&self, country_code: Option<&str>) -> Result<(), GeocodeError> {
        let (Some(supported), Some(country)) = (self.config.supported_country.as_deref(), country_code)
        else {
            return Ok(());
        };
        if country.eq_ignore_ascii_case(supported) {
            Ok(())
        } else {
            warn!(country, supported, "geocoded address outside supported region");
            Err(GeocodeError::non_us_address(country))
        }
    }
}

fn lock<K, V>(cache: &Mutex<HashMap<K, V>>) -> MutexGuard<'_, HashMap<K, V>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lookup<K: Eq + Hash, V: Clone>(cache: &Mutex<HashMap<K, V>>, key: &K) -> Option<V> {
    lock(cache).get(key).cloned()
}

fn store<K: Eq + Hash, V>(cache: &Mutex<HashMap<K, V>>, key: K, value: V) {
    lock(cache).insert(key, value);
}
