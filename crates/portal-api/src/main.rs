//! Stdio JSON service for the grievance portal.
//!
//! Reads one JSON request object per line from stdin, dispatches it to the
//! lifecycle engine through the abstract API surface, and writes one JSON
//! response per line to stdout. Logs go to stderr so they never interleave
//! with the protocol stream.
//!
//! # Usage
//!
//! ```bash
//! # Offline, keyword heuristic scorer
//! portal-api
//!
//! # With an OpenAI-compatible scorer and a 5-minute SLA sweep
//! PORTAL_SCORER_URL=http://localhost:8080/v1/chat/completions \
//!     portal-api --sweep-secs 300
//!
//! # From a config file
//! portal-api --config portal.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use grievance::{
    EventBus, GrievanceStore, LifecycleEngine, SharedEventBus, SystemClock, UrgencyScorer,
};
use portal_api::{ApiResponse, HeuristicScorer, OpenAiScorer, PortalApi, PortalConfig, Request};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file (overrides environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the periodic SLA sweep at this interval in seconds
    /// (overrides config)
    #[arg(long)]
    sweep_secs: Option<u64>,

    /// Use the keyword heuristic scorer even if an endpoint is configured
    #[arg(long, default_value_t = false)]
    heuristic_scorer: bool,
}

/// Drain the event bus and log deliveries. The real delivery fan-out
/// (websockets, email, push) attaches here, outside the engine core.
async fn deliver_notifications(bus: SharedEventBus) {
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => info!(
                kind = event.kind(),
                grievance_id = event.grievance_id(),
                "Notification dispatched"
            ),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification subscriber lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = PortalConfig::load(args.config.as_deref())?;

    let scorer: Arc<dyn UrgencyScorer> = match (&config.scorer, args.heuristic_scorer) {
        (Some(scorer_config), false) => {
            info!(url = %scorer_config.url, model = %scorer_config.model, "Using remote urgency scorer");
            Arc::new(OpenAiScorer::new(scorer_config))
        }
        _ => {
            info!("Using keyword heuristic urgency scorer");
            Arc::new(HeuristicScorer)
        }
    };

    let bus = EventBus::new().shared();
    tokio::spawn(deliver_notifications(bus.clone()));

    let engine = Arc::new(LifecycleEngine::new(
        GrievanceStore::new().shared(),
        bus,
        scorer,
        Arc::new(SystemClock),
    ));

    if let Some(secs) = args.sweep_secs.or(config.sweep_interval_secs) {
        info!(interval_secs = secs, "Starting periodic SLA sweep");
        tokio::spawn(portal_api::sweep::run(
            engine.clone(),
            Duration::from_secs(secs),
        ));
    }

    let api = PortalApi::new(engine);

    let mut lines = BufReader::new(stdin()).lines();
    let mut out = stdout();

    info!("Grievance portal ready; reading requests from stdin");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => api.dispatch(request).await,
            Err(err) => ApiResponse::bad_request(format!("malformed request: {err}")),
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        out.write_all(&payload).await?;
        out.flush().await?;
    }

    Ok(())
}
