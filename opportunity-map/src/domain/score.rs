//! Opportunity score projection.
//!
//! A single threshold table maps the raw tract attribute (household income at
//! age 35) to a 0–10 score and its display colour. The same table renders the
//! map's `fill-color` paint expression and the legend, so the colour a tract
//! is painted with always matches the score shown next to the map.

use serde::Serialize;
use serde_json::{Value, json};

use super::tract::AttributeKeys;

/// Highest score on the scale.
pub const MAX_SCORE: u8 = 10;

/// One band of the projection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScoreBand {
    /// Inclusive upper bound of the raw attribute for this band.
    upper_bound: u32,
    color: &'static str,
}

const BANDS: [ScoreBand; 10] = [
    ScoreBand { upper_bound: 10_000, color: "#9b252f" },
    ScoreBand { upper_bound: 25_000, color: "#b65441" },
    ScoreBand { upper_bound: 28_000, color: "#d07e59" },
    ScoreBand { upper_bound: 30_000, color: "#e5a979" },
    ScoreBand { upper_bound: 32_000, color: "#f4d79e" },
    ScoreBand { upper_bound: 35_000, color: "#fcfdc1" },
    ScoreBand { upper_bound: 37_000, color: "#cdddb5" },
    ScoreBand { upper_bound: 39_000, color: "#9dbda9" },
    ScoreBand { upper_bound: 41_000, color: "#729d9d" },
    ScoreBand { upper_bound: 45_000, color: "#4f7f8b" },
];

const TOP_BAND_COLOR: &str = "#34687e";

const ATTRIBUTE_VAR: &str = "attribute";

/// Projected score with its display colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpportunityScore {
    /// Score in `0..=10`.
    pub value: u8,
    /// Hex colour (`#rrggbb`) used for this score on the map and legend.
    pub color: &'static str,
}

/// One legend swatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// Score the swatch represents.
    pub score: u8,
    /// Inclusive upper bound of the band; `None` for the open top band.
    pub upper_bound: Option<u32>,
    /// Swatch colour.
    pub color: &'static str,
}

/// Pure, table-driven projection from raw attribute to score.
///
/// # Examples
/// ```
/// use opportunity_map::domain::ScoreProjector;
///
/// let projector = ScoreProjector;
/// assert_eq!(projector.score(10_000.0).value, 0);
/// assert_eq!(projector.score(35_000.0).value, 5);
/// assert_eq!(projector.score(45_001.0).value, 10);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreProjector;

impl ScoreProjector {
    /// Project a raw attribute onto the 0–10 scale.
    ///
    /// Non-finite input lands in the lowest band.
    pub fn score(&self, raw_attribute: f64) -> OpportunityScore {
        if !raw_attribute.is_finite() {
            return Self::band(0);
        }
        let value = BANDS
            .iter()
            .position(|band| raw_attribute <= f64::from(band.upper_bound))
            .unwrap_or(BANDS.len());
        Self::band(value)
    }

    /// Colour for an already-computed score, clamped to the scale.
    pub fn color_for(&self, score: u8) -> &'static str {
        Self::band(usize::from(score.min(MAX_SCORE))).color
    }

    /// Legend swatches from the lowest to the highest score.
    pub fn legend(&self) -> Vec<LegendEntry> {
        BANDS
            .iter()
            .zip(0_u8..)
            .map(|(band, score)| LegendEntry {
                score,
                upper_bound: Some(band.upper_bound),
                color: band.color,
            })
            .chain(std::iter::once(LegendEntry {
                score: MAX_SCORE,
                upper_bound: None,
                color: TOP_BAND_COLOR,
            }))
            .collect()
    }

    /// Map engine `fill-color` expression painting tracts by score band.
    ///
    /// The attribute is coalesced over the configured keys (defaulting to
    /// `0`), converted with `to-number` so stringified columns paint like
    /// numbers, and bound once with `let`. A `case` then compares it against
    /// the same inclusive upper bounds [`Self::score`] uses.
    pub fn fill_color_expression(&self, keys: &AttributeKeys) -> Value {
        let mut coalesce = vec![json!("coalesce")];
        coalesce.extend(keys.attribute_keys.iter().map(|key| json!(["get", key])));
        coalesce.push(json!(0));

        let mut case = vec![json!("case")];
        for band in &BANDS {
            case.push(json!(["<=", ["var", ATTRIBUTE_VAR], band.upper_bound]));
            case.push(json!(band.color));
        }
        case.push(json!(TOP_BAND_COLOR));

        let attribute = json!(["to-number", Value::Array(coalesce), 0]);
        json!(["let", ATTRIBUTE_VAR, attribute, Value::Array(case)])
    }

    fn band(index: usize) -> OpportunityScore {
        let color = BANDS.get(index).map_or(TOP_BAND_COLOR, |band| band.color);
        let value = u8::try_from(index).map_or(MAX_SCORE, |value| value.min(MAX_SCORE));
        OpportunityScore { value, color }
    }
}

#[cfg(test)]
mod tests {
    //! Projection table coverage.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(10_000.0, 0)]
    #[case(10_000.5, 1)]
    #[case(25_000.0, 1)]
    #[case(28_000.0, 2)]
    #[case(30_000.0, 3)]
    #[case(32_000.0, 4)]
    #[case(35_000.0, 5)]
    #[case(37_000.0, 6)]
    #[case(39_000.0, 7)]
    #[case(41_000.0, 8)]
    #[case(42_000.0, 9)]
    #[case(45_000.0, 9)]
    #[case(45_001.0, 10)]
    #[case(120_000.0, 10)]
    #[case(-5.0, 0)]
    fn projects_attribute_onto_bands(#[case] raw: f64, #[case] expected: u8) {
        assert_eq!(ScoreProjector.score(raw).value, expected);
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    fn non_finite_input_is_lowest_band(#[case] raw: f64) {
        assert_eq!(ScoreProjector.score(raw), ScoreProjector.score(0.0));
    }

    #[test]
    fn projection_is_monotonic_and_deterministic() {
        let projector = ScoreProjector;
        let mut previous = 0_u8;
        for step in 0..=600_u32 {
            let raw = f64::from(step) * 100.0;
            let score = projector.score(raw);
            assert_eq!(score, projector.score(raw), "same input, same output");
            assert!(score.value >= previous, "score dropped at {raw}");
            assert!(score.value <= MAX_SCORE);
            previous = score.value;
        }
        assert_eq!(previous, MAX_SCORE);
    }

    #[test]
    fn score_colour_matches_colour_lookup() {
        let projector = ScoreProjector;
        for raw in [5_000.0, 26_000.0, 33_000.0, 40_000.0, 60_000.0] {
            let score = projector.score(raw);
            assert_eq!(projector.color_for(score.value), score.color);
        }
        assert_eq!(projector.color_for(200), TOP_BAND_COLOR);
    }

    #[test]
    fn legend_covers_every_score_once() {
        let legend = ScoreProjector.legend();
        assert_eq!(legend.len(), usize::from(MAX_SCORE) + 1);
        for (entry, expected) in legend.iter().zip(0_u8..) {
            assert_eq!(entry.score, expected);
            assert_eq!(entry.color, ScoreProjector.color_for(expected));
        }
        assert_eq!(legend.last().and_then(|entry| entry.upper_bound), None);
    }

    /// Evaluate the `let`/`case` expression for one attribute value.
    fn paint_for(expression: &Value, raw: f64) -> String {
        let case = expression[3].as_array().expect("case array");
        for pair in case[1..case.len() - 1].chunks(2) {
            let bound = pair[0][2].as_f64().expect("numeric bound");
            if raw <= bound {
                return pair[1].as_str().expect("colour").to_owned();
            }
        }
        case[case.len() - 1].as_str().expect("fallback colour").to_owned()
    }

    #[test]
    fn fill_expression_agrees_with_scores() {
        let expression = ScoreProjector.fill_color_expression(&AttributeKeys::default());
        assert_eq!(expression[0], "let");
        assert_eq!(expression[1], ATTRIBUTE_VAR);
        assert_eq!(expression[2][0], "to-number");
        assert_eq!(expression[2][2], 0, "unparseable values paint as zero");
        assert_eq!(expression[2][1][0], "coalesce");
        assert_eq!(expression[2][1].as_array().map(Vec::len), Some(5), "op, three keys, default");
        assert_eq!(expression[3][0], "case");

        for raw in [
            0.0, 9_999.0, 10_000.0, 10_000.5, 25_000.0, 33_000.0, 35_000.0, 35_000.25, 42_000.0,
            45_000.0, 45_000.01, 90_000.0,
        ] {
            assert_eq!(
                paint_for(&expression, raw),
                ScoreProjector.score(raw).color,
                "paint and readout disagree at {raw}"
            );
        }
    }

    #[test]
    fn fill_expression_converts_stringified_attributes() {
        let keys = AttributeKeys {
            id_keys: vec!["GEOID".to_owned()],
            attribute_keys: vec!["income".to_owned()],
        };
        let expression = ScoreProjector.fill_color_expression(&keys);
        assert_eq!(
            expression[2],
            json!(["to-number", ["coalesce", ["get", "income"], 0], 0])
        );
    }
}
