//! Look up census-tract opportunity scores from the command line.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use mockable::DefaultClock;
use opportunity_map::MapSettings;
use opportunity_map::domain::{GeocodingService, ScoreLookupService};
use opportunity_map::inbound::cli::{CliArgs, CommandContext, describe_error, execute, render};
use opportunity_map::outbound::nominatim::{NominatimHttpIdentity, NominatimHttpSource};
use opportunity_map::outbound::tilequery::{TilequeryHttpSource, TilequeryTarget};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = MapSettings::load_from_iter([OsString::from("opportunity-lookup")])
        .wrap_err("failed to load settings")?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    runtime.block_on(async_main(args, settings))
}

async fn async_main(args: CliArgs, settings: MapSettings) -> Result<ExitCode> {
    let context = build_context(&settings)?;
    match execute(&args.command, &context).await {
        Ok(output) => {
            print!("{}", render(&output, args.format)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("{}", describe_error(&err));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_context(settings: &MapSettings) -> Result<CommandContext> {
    let geocoder_source = NominatimHttpSource::with_identity(
        settings.geocoder_base_url()?,
        settings.http_timeout(),
        NominatimHttpIdentity {
            user_agent: settings.user_agent().to_owned(),
        },
    )
    .wrap_err("failed to build geocoding client")?;
    let geocoder = Arc::new(GeocodingService::new(
        Arc::new(geocoder_source),
        Arc::new(DefaultClock),
        settings.geocoding_config(),
    ));

    let tiles = TilequeryHttpSource::new(
        TilequeryTarget {
            base_url: settings.tilequery_base_url()?,
            tileset_id: settings.tileset_id().to_owned(),
            access_token: settings.mapbox_access_token().map(str::to_owned),
        },
        settings.http_timeout(),
    )
    .wrap_err("failed to build tile query client")?;
    let scores = ScoreLookupService::new(
        geocoder.clone(),
        Arc::new(tiles),
        settings.map_view_config().attribute_keys,
    );
    Ok(CommandContext { geocoder, scores })
}
