use anyhow::Result;
use autolab_api::client::Client;
use autolab_api::preferences::Preferences;
use dotenvy::dotenv;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

/// Builds the engine client and resolves preferences from the environment,
/// loading a `.env` file when one is present.
pub fn init_from_env() -> Result<InitFromEnv> {
    dotenv().ok();

    let prefs = Preferences::from_env()?;
    let client = Client::new()?;
    debug!(?prefs, "resolved preferences");

    Ok(InitFromEnv { client, prefs })
}

pub struct InitFromEnv {
    pub client: Client,
    pub prefs: Preferences,
}

pub fn init_tracing() {
    registry()
        .with(fmt::layer().event_format(format().pretty()))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()
                .unwrap(),
        )
        .init();
}
