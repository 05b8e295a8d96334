//! Kvlog CLI
//!
//! Appends newline-delimited JSON events from stdin to a DynamoDB table.
//!
//! # Usage
//!
//! ```bash
//! # Append to a real table
//! KVLOG_TABLE=events AWS_ACCESS_KEY_ID=... AWS_SECRET_ACCESS_KEY=... kvlog < events.ndjson
//!
//! # Dry run against the in-memory store
//! KVLOG_ENV=test KVLOG_TABLE=events kvlog < events.ndjson
//! ```
//!
//! # Environment Variables
//!
//! - `KVLOG_ENV`: Environment (test, development, production)
//! - `KVLOG_TABLE`: Target table (required)
//! - `KVLOG_REGION` / `AWS_REGION`: Region (default: us-east-1)
//! - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`: Credentials
//! - `KVLOG_SSL_ENABLED`: Use HTTPS (default: true)
//! - `KVLOG_ENDPOINT`: Endpoint override, e.g. localhost:8000
//! - `KVLOG_KEY_FORMAT`: monotonic (default) or legacy. Monotonic keys pad
//!   the nanosecond digits to a fixed width, legacy keys do not, so the two
//!   only sort correctly against each other across different milliseconds.
//!   Use legacy when appending to a table that already holds legacy keys and
//!   ordering inside a millisecond matters.
//! - `KVLOG_MAX_IN_FLIGHT`: Maximum concurrent writes (default: 25)

use kvlog_cli::{build_appender, ingest, log_traces, Config};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr, stdout carries the summary)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("kvlog=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        table = %config.table_name,
        region = %config.connection.region,
        ssl_enabled = config.connection.ssl_enabled,
        key_format = %config.key_format,
        max_in_flight = config.max_in_flight,
        "kvlog"
    );

    let appender = build_appender(&config)?;
    let _traces = log_traces(&appender);

    let summary = ingest(
        &appender,
        BufReader::new(tokio::io::stdin()),
        config.max_in_flight,
    )
    .await?;

    info!(
        submitted = summary.submitted,
        stored = summary.stored,
        failed = summary.failed,
        rejected = summary.rejected,
        "Ingest finished"
    );
    println!("{}", summary);

    if summary.failed > 0 {
        anyhow::bail!("{} event(s) failed to store", summary.failed);
    }

    Ok(())
}
