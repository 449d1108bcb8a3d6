//! `opportunity-lookup` command parsing, execution, and rendering.
//!
//! The binary wires HTTP adapters into a [`CommandContext`]; everything here
//! works against the domain services so it can run over test doubles.

use std::fmt::Write as _;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;

use crate::domain::ports::{GeocodeError, GeocodedAddress, ReverseGeocoded};
use crate::domain::{
    GeoPoint, GeoPointValidationError, GeocodingService, LegendEntry, ScoreLookup,
    ScoreLookupError, ScoreLookupService, ScoreProjector, ScoreSource,
};

/// `opportunity-lookup` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "opportunity-lookup",
    about = "Geocode addresses and look up census-tract opportunity scores",
    version
)]
pub struct CliArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Operations offered by the CLI.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Resolve an address to a coordinate.
    Geocode {
        /// Free-text address.
        address: String,
    },
    /// Describe a coordinate.
    Reverse {
        /// Latitude in degrees.
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees.
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },
    /// Score the census tract containing an address.
    Score {
        /// Free-text address.
        address: String,
    },
    /// Print the score legend.
    Legend,
}

/// Rendering of command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `key=value` lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Errors raised while executing a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    /// Geocoding failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    /// The score lookup failed.
    #[error(transparent)]
    Lookup(#[from] ScoreLookupError),
    /// The coordinate was out of range.
    #[error(transparent)]
    Coordinate(#[from] GeoPointValidationError),
    /// Output could not be serialised.
    #[error("failed to render output: {0}")]
    Render(String),
}

/// Services a command runs against.
pub struct CommandContext {
    /// Shared geocoder.
    pub geocoder: Arc<GeocodingService>,
    /// Address to score pipeline over the same geocoder.
    pub scores: ScoreLookupService,
}

/// Result of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    /// Forward geocoding hit.
    Geocoded(GeocodedAddress),
    /// Reverse geocoding hit.
    Reversed(ReverseGeocoded),
    /// Score lookup.
    Score(ScoreLookup),
    /// Legend swatches.
    Legend {
        /// Swatches from lowest to highest score.
        entries: Vec<LegendEntry>,
    },
}

/// Run `command` against `context`.
///
/// # Errors
///
/// Returns [`CliError`] when the underlying service fails or the coordinate
/// is invalid.
pub async fn execute(
    command: &Command,
    context: &CommandContext,
) -> Result<CommandOutput, CliError> {
    match command {
        Command::Geocode { address } => {
            Ok(CommandOutput::Geocoded(context.geocoder.geocode(address).await?))
        }
        Command::Reverse { lat, lon } => {
            let point = GeoPoint::new(*lat, *lon)?;
            Ok(CommandOutput::Reversed(
                context.geocoder.reverse_geocode(point).await?,
            ))
        }
        Command::Score { address } => {
            Ok(CommandOutput::Score(context.scores.lookup(address).await?))
        }
        Command::Legend => Ok(CommandOutput::Legend {
            entries: ScoreProjector.legend(),
        }),
    }
}

/// Render `output` in `format`.
///
/// # Errors
///
/// Returns [`CliError::Render`] when JSON serialisation fails.
pub fn render(output: &CommandOutput, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(output).map_err(|error| CliError::Render(error.to_string()))
        }
        OutputFormat::Text => {
            render_text(output).map_err(|error| CliError::Render(error.to_string()))
        }
    }
}

/// Message for a failed command, preferring the user-facing geocoding text.
pub fn describe_error(error: &CliError) -> String {
    match error {
        CliError::Geocode(geocode) | CliError::Lookup(ScoreLookupError::Geocode(geocode)) => {
            geocode.user_message()
        }
        other => other.to_string(),
    }
}

fn render_text(output: &CommandOutput) -> Result<String, std::fmt::Error> {
    let mut text = String::new();
    match output {
        CommandOutput::Geocoded(hit) => write_geocoded(&mut text, hit)?,
        CommandOutput::Reversed(hit) => {
            writeln!(text, "display_name={}", hit.display_name)?;
            writeln!(text, "country_code={}", hit.country_code.as_deref().unwrap_or("-"))?;
        }
        CommandOutput::Score(lookup) => write_score(&mut text, lookup)?,
        CommandOutput::Legend { entries } => {
            for entry in entries {
                let bound = entry
                    .upper_bound
                    .map_or_else(|| "open".to_owned(), |bound| bound.to_string());
                writeln!(
                    text,
                    "score={} upper_bound={bound} color={}",
                    entry.score, entry.color
                )?;
            }
        }
    }
    Ok(text)
}

fn write_geocoded(text: &mut String, hit: &GeocodedAddress) -> std::fmt::Result {
    writeln!(text, "display_name={}", hit.display_name)?;
    writeln!(text, "lat={}", hit.point.lat())?;
    writeln!(text, "lon={}", hit.point.lon())?;
    writeln!(text, "country_code={}", hit.country_code.as_deref().unwrap_or("-"))
}

fn write_score(text: &mut String, lookup: &ScoreLookup) -> std::fmt::Result {
    write_geocoded(text, &lookup.address)?;
    writeln!(
        text,
        "tract_id={}",
        lookup.tract_id.as_ref().map_or("-", |id| id.as_str())
    )?;
    writeln!(text, "raw_attribute={}", lookup.raw_attribute)?;
    writeln!(text, "score={}", lookup.score.value)?;
    writeln!(text, "color={}", lookup.score.color)?;
    let source = match lookup.source {
        ScoreSource::TileQuery => "tile_query",
        ScoreSource::Estimate => "estimate",
    };
    writeln!(text, "source={source}")
}

#[cfg(test)]
mod tests {
    //! Command parsing, execution, and rendering coverage.

    use super::*;
    use crate::domain::GeocodingConfig;
    use crate::domain::ports::FixtureTileQuerySource;
    use crate::domain::tract::AttributeKeys;
    use crate::test_support::{ImmediateSleeper, ScriptedGeocodingSource, geocoded};
    use mockable::DefaultClock;
    use rstest::rstest;

    fn context(source: ScriptedGeocodingSource) -> CommandContext {
        let geocoder = Arc::new(GeocodingService::with_sleeper(
            Arc::new(source),
            Arc::new(DefaultClock),
            Arc::new(ImmediateSleeper),
            GeocodingConfig::default(),
        ));
        let scores = ScoreLookupService::new(
            geocoder.clone(),
            Arc::new(FixtureTileQuerySource),
            AttributeKeys::default(),
        );
        CommandContext { geocoder, scores }
    }

    #[rstest]
    #[case(&["opportunity-lookup", "legend"], Command::Legend)]
    #[case(
        &["opportunity-lookup", "score", "123 Main St"],
        Command::Score { address: "123 Main St".to_owned() }
    )]
    #[case(
        &["opportunity-lookup", "reverse", "40.7", "-74.0"],
        Command::Reverse { lat: 40.7, lon: -74.0 }
    )]
    fn parses_subcommands(#[case] argv: &[&str], #[case] expected: Command) {
        let args = CliArgs::try_parse_from(argv.iter().copied()).expect("arguments parse");

        assert_eq!(args.command, expected);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn json_format_is_selectable() {
        let args = CliArgs::try_parse_from(["opportunity-lookup", "--format", "json", "legend"])
            .expect("arguments parse");

        assert_eq!(args.format, OutputFormat::Json);
    }

    #[tokio::test]
    async fn score_without_tile_data_reports_estimate() {
        let context = context(ScriptedGeocodingSource::new().with_hit(
            "123 Main St",
            geocoded("123 Main St, Springfield, IL", 39.7817, -89.6501),
        ));

        let output = execute(
            &Command::Score {
                address: "123 Main St".to_owned(),
            },
            &context,
        )
        .await
        .expect("lookup succeeds");
        let text = render(&output, OutputFormat::Text).expect("renders");

        assert!(text.contains("score=5\n"), "{text}");
        assert!(text.contains("source=estimate\n"), "{text}");
        assert!(text.contains("tract_id=-\n"), "{text}");
    }

    #[tokio::test]
    async fn out_of_range_reverse_coordinates_fail_before_io() {
        let source = ScriptedGeocodingSource::new();
        let context = context(source);

        let error = execute(&Command::Reverse { lat: 95.0, lon: 0.0 }, &context)
            .await
            .expect_err("latitude out of range");

        assert!(matches!(error, CliError::Coordinate(_)));
    }

    #[tokio::test]
    async fn geocode_failures_use_the_friendly_message() {
        let context = context(ScriptedGeocodingSource::new());

        let error = execute(
            &Command::Geocode {
                address: "1 Nowhere Rd".to_owned(),
            },
            &context,
        )
        .await
        .expect_err("not found");

        assert!(describe_error(&error).contains("1 Nowhere Rd"));
    }

    #[test]
    fn legend_renders_every_band_as_json() {
        let output = CommandOutput::Legend {
            entries: ScoreProjector.legend(),
        };

        let json = render(&output, OutputFormat::Json).expect("renders");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

        assert_eq!(value["kind"], "legend");
        assert_eq!(value["entries"].as_array().map(Vec::len), Some(11));
        assert_eq!(value["entries"][10]["upper_bound"], serde_json::Value::Null);
    }
}
