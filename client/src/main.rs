//! Narrative demo: post a value, then display two channel values from two
//! lightweight threads. The `values` line prints before the
//! `delayedvalues` line whenever the server takes longer on the latter.
//!
//! Usage: `narrative [BASE_URL]`. Without an argument the base URL comes
//! from the config file, or defaults to `http://localhost:8000/`.

use std::{env, io};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use retro::{EventLoop, Future, ResolvedConfig, Retro, RetroConfig, display_value};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn resolve_config() -> Result<ResolvedConfig> {
    let mut config = RetroConfig::load()
        .context("loading config file")?
        .unwrap_or_default();
    if let Some(base_url) = env::args().nth(1) {
        config.http.get_or_insert_with(Default::default).base_url = Some(base_url);
    }
    config.resolve().context("resolving config")
}

/// Show `future`'s value once it arrives, without holding up anyone else.
fn display(event_loop: &EventLoop, text: &'static str, future: Future<Value>) {
    event_loop.spawn(async move {
        match future.read().await {
            Ok(value) => println!("{text}{}", display_value(&value)),
            Err(err) => println!("{text}<{err}>"),
        }
    });
}

fn main() -> Result<()> {
    init_tracing();

    let config = resolve_config()?;
    tracing::info!(base_url = %config.http.base_url(), "Narrative test");

    let retro = Retro::from_config(&config)?;
    let channel = retro.channel();
    let event_loop = EventLoop::new().context("starting event loop")?;

    event_loop.block_on(async {
        let posted = retro.post_str("values", "name=pouet&value=pouetvalue");
        event_loop.spawn(async move {
            if let Err(err) = posted.read().await {
                tracing::warn!(error = %err, "posting the initial value failed");
            }
        });
        display(&event_loop, "Delayed values: ", channel.get_str("delayedvalues"));
        display(&event_loop, "values:         ", channel.get_str("values"));
    });
    event_loop.run();

    Ok(())
}
