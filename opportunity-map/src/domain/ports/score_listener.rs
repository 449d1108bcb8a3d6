//! Outbound notification of the displayed opportunity score.

use serde::Serialize;

use crate::domain::selection::SelectionSlot;
use crate::domain::tract::TractId;

/// Reading shown next to the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreUpdate {
    /// Score in `0..=10`; `0` when nothing is selected.
    pub score: u8,
    /// Colour the map paints this score with.
    pub color: &'static str,
    /// Raw attribute of the driving tract.
    pub raw_attribute: Option<f64>,
    /// Id of the driving tract.
    pub tract_id: Option<TractId>,
    /// Slot the driving tract lives in.
    pub source: Option<SelectionSlot>,
}

/// Port notified whenever the active reading changes.
#[cfg_attr(test, mockall::automock)]
pub trait ScoreListener: Send + Sync {
    /// Receive the new reading.
    fn score_changed(&self, update: &ScoreUpdate);
}

/// Listener that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpScoreListener;

impl ScoreListener for NoOpScoreListener {
    fn score_changed(&self, _update: &ScoreUpdate) {}
}
