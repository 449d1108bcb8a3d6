//! Async address searches against a mounted map view.
//!
//! The view itself is synchronous. A search locks it only to start (minting
//! a token) and again to continue with the geocoding result; the lock is
//! never held across the network call, so clicks keep flowing while a lookup
//! is in flight and a superseded result is dropped on arrival.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use super::geocoding::GeocodingService;
use super::map_view::{EventOutcome, MapViewController, MapViewError, SearchProgress};
use super::ports::{GeocodeError, GeocodedAddress, MapEngine, MapEvent};

/// Result of an address search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The camera is flying to the address; the home tract resolves on the
    /// next move end.
    Located(GeocodedAddress),
    /// The address was found but the style is still loading; the flight
    /// starts once it has.
    Deferred(GeocodedAddress),
    /// A newer search started while this one was in flight.
    Superseded,
}

/// Errors raised by an address search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The address could not be geocoded.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    /// The map engine rejected a call.
    #[error(transparent)]
    View(#[from] MapViewError),
}

impl SessionError {
    /// Message suitable for the person using the map.
    pub fn user_message(&self) -> String {
        match self {
            Self::Geocode(err) => err.user_message(),
            Self::View(_) => "The map could not be updated. Please reload the page.".to_owned(),
        }
    }
}

/// A mounted map view paired with the geocoder feeding its searches.
pub struct MapSession<E: MapEngine> {
    view: Mutex<MapViewController<E>>,
    geocoder: Arc<GeocodingService>,
    address: Mutex<Option<String>>,
}

impl<E: MapEngine> MapSession<E> {
    /// Pair `view` with `geocoder`.
    pub fn new(view: MapViewController<E>, geocoder: Arc<GeocodingService>) -> Self {
        Self {
            view: Mutex::new(view),
            geocoder,
            address: Mutex::new(None),
        }
    }

    /// Search for `address` and fly the camera there.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Geocode`] when the current search cannot be
    /// geocoded, or [`SessionError::View`] when the engine rejects a call. A
    /// failure for a superseded search is reported as
    /// [`SearchOutcome::Superseded`] instead.
    pub async fn search_address(&self, address: &str) -> Result<SearchOutcome, SessionError> {
        let token = self.lock_view().begin_address_search()?;

        let hit = match self.geocoder.geocode(address).await {
            Ok(hit) => hit,
            Err(err) => {
                if self.lock_view().selection().ensure_current(token).is_err() {
                    debug!(%token, error = %err, "ignoring failure of superseded search");
                    return Ok(SearchOutcome::Superseded);
                }
                warn!(%token, error = %err, "address search failed");
                return Err(err.into());
            }
        };

        let progress = self.lock_view().address_geocoded(token, hit.point)?;
        Ok(match progress {
            SearchProgress::Flying => SearchOutcome::Located(hit),
            SearchProgress::AwaitingStyle => SearchOutcome::Deferred(hit),
            SearchProgress::Superseded => SearchOutcome::Superseded,
        })
    }

    /// React to the host's address parameter.
    ///
    /// A search runs only when the trimmed address differs from the last one
    /// seen; clearing the parameter forgets it without searching.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::search_address`] errors.
    pub async fn update_address(
        &self,
        address: Option<&str>,
    ) -> Result<Option<SearchOutcome>, SessionError> {
        let next = address
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_owned);
        {
            let mut current = self.lock_address();
            if *current == next {
                return Ok(None);
            }
            current.clone_from(&next);
        }
        match next {
            Some(address) => self.search_address(&address).await.map(Some),
            None => Ok(None),
        }
    }

    /// Forward an engine event to the view.
    ///
    /// # Errors
    ///
    /// Propagates [`MapViewController::handle_event`] errors.
    pub fn dispatch(&self, event: MapEvent) -> Result<EventOutcome, MapViewError> {
        self.lock_view().handle_event(event)
    }

    /// Run `inspect` against the view.
    pub fn with_view<R>(&self, inspect: impl FnOnce(&MapViewController<E>) -> R) -> R {
        inspect(&self.lock_view())
    }

    /// Unmount the view, resetting the selection and removing the engine.
    pub fn unmount(self) {
        self.view
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .unmount();
    }

    fn lock_view(&self) -> MutexGuard<'_, MapViewController<E>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_address(&self) -> MutexGuard<'_, Option<String>> {
        self.address.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
