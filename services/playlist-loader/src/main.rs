//!
//! src/main.rs
//!
//! Entry point of the playlist loader. Creates the playlists table,
//! imports the input csv (enriching each new song through musicbrainz)
//! then exports the whole table back to csv.
//!
//!

mod config;
mod errors;
mod logging;

mod types;
mod fetch;
mod reader;
mod persistent;
mod sink;
mod pipeline;

use tracing::{error, info};

use crate::errors::LoaderError;

#[tokio::main]
async fn main() -> Result<(), LoaderError> {
    let cfgs    = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    info!(
        service="playlist-loader",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let db = persistent::Persistent::connect(&cfgs.persistence)?;
    let musicbrainz = fetch::MusicBrainzClient::new(
        &cfgs.http,
        &cfgs.identity,
        &cfgs.musicbrainz
    )?;

    // each stage logs its own failure and the next one still runs
    match db.ensure_schema().await {
        Ok(()) => info!(table = "playlists", "schema.ready"),
        Err(e) => error!(error = %e, "schema.failed"),
    }

    match pipeline::import_csv(&db, &musicbrainz, &cfgs.paths.input_csv).await {
        Ok(summary) => info!(
            read = summary.read,
            inserted = summary.inserted,
            skipped = summary.skipped,
            unmatched = summary.unmatched,
            "import.done"
        ),
        Err(e) => error!(error = %e, path = %cfgs.paths.input_csv.display(), "import.failed"),
    }

    pipeline::report_store_rows(&db).await;

    match pipeline::export_csv(&db, &cfgs.paths.output_csv).await {
        Ok(Some(count)) => info!(count, "export.done"),
        Ok(None) => info!("export.skipped"),
        Err(e) => error!(error = %e, path = %cfgs.paths.output_csv.display(), "export.failed"),
    }

    db.close().await;
    info!("exit");
    Ok(())
}
