//! Behaviour-driven tests for the cached, throttled geocoding service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use opportunity_map::domain::ports::{GeocodeError, GeocodedAddress};
use opportunity_map::domain::{GeocodingConfig, GeocodingService};
use opportunity_map::test_support::{
    MutableClock, RecordingSleeper, ScriptedGeocodingSource, geocoded,
};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};

const HOME_ADDRESS: &str = "123 Main St";

#[derive(Clone)]
struct RuntimeHandle(Arc<tokio::runtime::Runtime>);

#[derive(Default, ScenarioState)]
struct GeocodingWorld {
    runtime: Slot<RuntimeHandle>,
    source: Slot<Arc<ScriptedGeocodingSource>>,
    sleeper: Slot<Arc<RecordingSleeper>>,
    service: Slot<Arc<GeocodingService>>,
    last_result: Slot<Result<GeocodedAddress, GeocodeError>>,
}

impl GeocodingWorld {
    fn setup(&self, country_code: Option<&str>) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime builds");
        let mut hit = geocoded("123 Main St, Springfield, IL", 39.7817, -89.6501);
        hit.country_code = country_code.map(str::to_owned);
        let source = Arc::new(ScriptedGeocodingSource::new().with_hit(HOME_ADDRESS, hit));
        let sleeper = Arc::new(RecordingSleeper::default());
        let clock = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let service = GeocodingService::with_sleeper(
            source.clone(),
            Arc::new(MutableClock::new(clock)),
            sleeper.clone(),
            GeocodingConfig::default(),
        );

        self.runtime.set(RuntimeHandle(Arc::new(runtime)));
        self.source.set(source);
        self.sleeper.set(sleeper);
        self.service.set(Arc::new(service));
    }

    fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        let runtime = self.runtime.get().expect("runtime should be set");
        let service = self.service.get().expect("service should be set");
        runtime.0.block_on(service.geocode(address))
    }

    fn last_error(&self) -> GeocodeError {
        match self.last_result.get().expect("a lookup should have run") {
            Ok(hit) => panic!("expected a failed lookup, got {hit:?}"),
            Err(error) => error,
        }
    }
}

#[fixture]
fn world() -> GeocodingWorld {
    GeocodingWorld::default()
}

#[given("a geocoder that knows the home address")]
fn a_geocoder_that_knows_the_home_address(world: &GeocodingWorld) {
    world.setup(Some("us"));
}

#[given("a geocoder that places the home address in {country}")]
fn a_geocoder_that_places_the_home_address_in(world: &GeocodingWorld, country: String) {
    world.setup(Some(country.to_ascii_lowercase().as_str()));
}

#[when("the home address is geocoded twice with different spacing and case")]
fn the_home_address_is_geocoded_twice(world: &GeocodingWorld) {
    world.geocode(HOME_ADDRESS).expect("first lookup succeeds");
    world.last_result.set(world.geocode("  123 MAIN st "));
}

#[when("the home address is geocoded")]
fn the_home_address_is_geocoded(world: &GeocodingWorld) {
    world.last_result.set(world.geocode(HOME_ADDRESS));
}

#[when("the address {address} is geocoded")]
fn the_address_is_geocoded(world: &GeocodingWorld, address: String) {
    world.last_result.set(world.geocode(&address));
}

#[when("{count} different addresses are geocoded back to back")]
fn different_addresses_are_geocoded(world: &GeocodingWorld, count: usize) {
    for index in 0..count {
        world.last_result.set(world.geocode(&format!("{index} Elm St")));
    }
}

#[then("the geocoding source was queried {count} times")]
fn the_geocoding_source_was_queried(world: &GeocodingWorld, count: usize) {
    let source = world.source.get().expect("source should be set");
    assert_eq!(source.searched().len(), count);
    let result = world.last_result.get().expect("a lookup should have run");
    assert!(result.is_ok(), "cached lookup should succeed: {result:?}");
}

#[then("the lookup fails with a message mentioning {address}")]
fn the_lookup_fails_with_a_message_mentioning(world: &GeocodingWorld, address: String) {
    let error = world.last_error();
    assert_eq!(error, GeocodeError::not_found(address.clone()));
    assert!(error.user_message().contains(&address));
}

#[then("the lookup fails because the address is outside the supported region")]
fn the_lookup_fails_outside_the_supported_region(world: &GeocodingWorld) {
    let error = world.last_error();
    assert!(
        matches!(error, GeocodeError::NonUsAddress { .. }),
        "expected a non-US rejection, got {error:?}"
    );
}

#[then("the geocoder waited {count} times for {millis} milliseconds each")]
fn the_geocoder_waited(world: &GeocodingWorld, count: usize, millis: u64) {
    let sleeper = world.sleeper.get().expect("sleeper should be set");
    assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(millis); count]);
}

#[scenario(
    path = "tests/features/geocoding.feature",
    name = "Repeated lookups are served from the cache"
)]
fn repeated_lookups_are_served_from_the_cache(world: GeocodingWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/geocoding.feature",
    name = "Unknown addresses are reported to the user"
)]
fn unknown_addresses_are_reported_to_the_user(world: GeocodingWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/geocoding.feature",
    name = "Addresses outside the supported country are rejected"
)]
fn addresses_outside_the_supported_country_are_rejected(world: GeocodingWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/geocoding.feature",
    name = "Lookups are spaced by the minimum request interval"
)]
fn lookups_are_spaced_by_the_minimum_request_interval(world: GeocodingWorld) {
    drop(world);
}
