use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulso_etl::{HttpClient, Pipeline, Settings, SourceEndpoint, Store, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new()?;
    let store = Store::connect(Path::new(&settings.database.path)).await?;

    // Run the cycles, then release the store on every exit path.
    let outcome = run(&settings, &store).await;
    store.close().await;
    outcome
}

async fn run(settings: &Settings, store: &Store) -> Result<()> {
    let client = HttpClient::new(&settings.http)?;
    let clock = Arc::new(SystemClock);

    let which = std::env::args().nth(1).unwrap_or_else(|| "all".to_string());

    let mut endpoints = Vec::new();
    if which == "all" || which == "deals" {
        if let Some(deals) = &settings.deals {
            endpoints.push(SourceEndpoint::deals(deals));
        }
    }
    if which == "all" || which == "weather" {
        if let Some(weather) = &settings.weather {
            endpoints.push(SourceEndpoint::weather(weather));
        }
    }

    anyhow::ensure!(
        !endpoints.is_empty(),
        "no source configured for `{which}` (check config/default.yaml)"
    );

    for endpoint in endpoints {
        let domain = endpoint.domain();
        let pipeline = Pipeline::new(client.clone(), store.clone(), clock.clone(), endpoint);
        let metrics = pipeline.run_cycle().await?;

        info!(
            domain = domain.as_str(),
            status = metrics.status.as_str(),
            extracted = metrics.extracted,
            saved = metrics.saved,
            failed = metrics.failed,
            "Extraction summary"
        );
    }

    Ok(())
}
