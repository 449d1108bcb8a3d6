//! Home/focus tract selection state machine.
//!
//! Two independently writable slots hold the tract resolved from the latest
//! address search (home) and the tract most recently clicked (focus). The
//! highlight always follows the slot that was written last; every transition
//! returns the highlight update the view must apply so callers never repaint
//! from a cached value or from the other slot.

use serde::Serialize;
use thiserror::Error;

use super::score::{OpportunityScore, ScoreProjector};
use super::tract::{TractFeature, TractId};

/// Which of the two slots a transition wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSlot {
    /// Tract derived from the most recent address search.
    Home,
    /// Tract derived from the most recent click.
    Focus,
}

/// Descriptive summary of which slots are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    /// Neither slot is set.
    Empty,
    /// Only the home slot is set.
    HomeOnly,
    /// Only the focus slot is set.
    FocusOnly,
    /// Both slots are set.
    HomeAndFocus,
}

/// Monotonically increasing address-search sequence number.
///
/// Tokens are only minted by [`SelectionState::begin_address_search`], so a
/// caller cannot forge a current token for a search it did not start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SearchToken(u64);

impl SearchToken {
    /// Raw sequence number.
    pub const fn value(self) -> u64 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for SearchToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the highlight render source must show after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightUpdate {
    /// Paint this feature; it is always the feature just written.
    Show(TractFeature),
    /// Blank the highlight source.
    Clear,
    /// Leave the highlight untouched.
    Keep,
}

/// Result of a slot write.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChange {
    /// Slot that was written.
    pub slot: SelectionSlot,
    /// Highlight instruction for the view.
    pub highlight: HighlightUpdate,
    /// `true` when the slot already held a tract with the same id.
    ///
    /// The repaint is still required; state is unchanged.
    pub reselected: bool,
}

/// Outcome of starting an address search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStarted {
    /// Token the eventual resolution must present.
    pub token: SearchToken,
    /// Highlight instruction; `Clear` only when home was showing.
    pub highlight: HighlightUpdate,
}

/// A resolution arrived for a search that is no longer current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("address search {token} was superseded by {current}")]
pub struct StaleSearch {
    /// Token presented by the late resolution.
    pub token: SearchToken,
    /// Token of the search currently in flight.
    pub current: SearchToken,
}

/// Authoritative home/focus selection for one mounted map view.
///
/// # Examples
/// ```
/// use opportunity_map::domain::{
///     HighlightUpdate, SelectionPhase, SelectionState, TractFeature, TractGeometry, TractId,
/// };
///
/// let tract = |id: &str, raw: f64| {
///     TractFeature::new(TractId::new(id).expect("id"), raw, TractGeometry::empty())
/// };
/// let mut state = SelectionState::new();
/// let search = state.begin_address_search();
/// state.resolve_address(search.token, tract("home", 30_000.0)).expect("current search");
/// let change = state.click_tract(tract("clicked", 42_000.0));
///
/// assert_eq!(state.phase(), SelectionPhase::HomeAndFocus);
/// assert!(matches!(change.highlight, HighlightUpdate::Show(ref f) if f.id.as_str() == "clicked"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    home: Option<TractFeature>,
    focus: Option<TractFeature>,
    last_written: Option<SelectionSlot>,
    token: SearchToken,
}

impl SelectionState {
    /// Empty selection, as created when the map view mounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new address search, invalidating any search in flight.
    ///
    /// Clears the home slot. When the highlight was showing home it is
    /// cleared as well; a focus highlight is left in place.
    pub fn begin_address_search(&mut self) -> SearchStarted {
        self.token = self.token.next();
        self.home = None;
        let highlight = if self.last_written == Some(SelectionSlot::Home) {
            self.last_written = None;
            HighlightUpdate::Clear
        } else {
            HighlightUpdate::Keep
        };
        SearchStarted {
            token: self.token,
            highlight,
        }
    }

    /// Write the home slot for the search identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`StaleSearch`] without touching state when a newer search
    /// has started since `token` was issued.
    pub fn resolve_address(
        &mut self,
        token: SearchToken,
        feature: TractFeature,
    ) -> Result<SelectionChange, StaleSearch> {
        self.ensure_current(token)?;
        Ok(Self::write(
            &mut self.home,
            &mut self.last_written,
            SelectionSlot::Home,
            feature,
        ))
    }

    /// Write the focus slot from a click. Never touches home.
    pub fn click_tract(&mut self, feature: TractFeature) -> SelectionChange {
        Self::write(
            &mut self.focus,
            &mut self.last_written,
            SelectionSlot::Focus,
            feature,
        )
    }

    /// Check that `token` still identifies the search in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StaleSearch`] when a newer search has started.
    pub fn ensure_current(&self, token: SearchToken) -> Result<(), StaleSearch> {
        if token == self.token {
            Ok(())
        } else {
            Err(StaleSearch {
                token,
                current: self.token,
            })
        }
    }

    /// Empty both slots and invalidate any search in flight.
    pub fn reset(&mut self) {
        self.home = None;
        self.focus = None;
        self.last_written = None;
        self.token = self.token.next();
    }

    /// Tract from the latest address search, if resolved.
    pub const fn home_tract(&self) -> Option<&TractFeature> {
        self.home.as_ref()
    }

    /// Tract from the latest click, if any.
    pub const fn focus_tract(&self) -> Option<&TractFeature> {
        self.focus.as_ref()
    }

    /// Slot whose geometry the highlight currently shows.
    pub const fn last_written(&self) -> Option<SelectionSlot> {
        self.last_written
    }

    /// Token of the search currently in flight (or last started).
    pub const fn current_token(&self) -> SearchToken {
        self.token
    }

    /// Feature of the most recently written slot.
    pub fn highlighted(&self) -> Option<&TractFeature> {
        match self.last_written? {
            SelectionSlot::Home => self.home.as_ref(),
            SelectionSlot::Focus => self.focus.as_ref(),
        }
    }

    /// Tract driving the displayed score: focus, else home.
    pub fn active_tract(&self) -> Option<&TractFeature> {
        self.focus.as_ref().or(self.home.as_ref())
    }

    /// Slot of the tract driving the displayed score.
    pub const fn active_slot(&self) -> Option<SelectionSlot> {
        if self.focus.is_some() {
            Some(SelectionSlot::Focus)
        } else if self.home.is_some() {
            Some(SelectionSlot::Home)
        } else {
            None
        }
    }

    /// Displayed score; `None` when no tract is selected (read as `0`).
    pub fn active_score(&self, projector: &ScoreProjector) -> Option<OpportunityScore> {
        self.active_tract()
            .map(|tract| projector.score(tract.raw_attribute))
    }

    /// Id of the tract driving the displayed score.
    pub fn active_tract_id(&self) -> Option<&TractId> {
        self.active_tract().map(|tract| &tract.id)
    }

    /// Which slots are populated.
    pub const fn phase(&self) -> SelectionPhase {
        match (self.home.is_some(), self.focus.is_some()) {
            (false, false) => SelectionPhase::Empty,
            (true, false) => SelectionPhase::HomeOnly,
            (false, true) => SelectionPhase::FocusOnly,
            (true, true) => SelectionPhase::HomeAndFocus,
        }
    }

    fn write(
        slot_value: &mut Option<TractFeature>,
        last_written: &mut Option<SelectionSlot>,
        slot: SelectionSlot,
        feature: TractFeature,
    ) -> SelectionChange {
        let reselected = slot_value
            .as_ref()
            .is_some_and(|current| current.id == feature.id);
        *last_written = Some(slot);
        *slot_value = Some(feature.clone());
        SelectionChange {
            slot,
            highlight: HighlightUpdate::Show(feature),
            reselected,
        }
    }
}
