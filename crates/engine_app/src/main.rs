//! # engine_app — index demo driver
//!
//! Builds an [`Index`] from the environment, runs a short scenario against
//! it (shared components, an intersection query, entity teardown), and
//! prints a JSON report of what the index answered at each step.
//!
//! ## Environment
//!
//! - `RUST_LOG` — tracing filter (default directive `engine_app=info`).
//! - `ENGINE_INDEX_REPLACE_POLICY` — `detach` or `reject`.
//! - `ENGINE_INDEX_CAPACITY` — initial entity capacity.

mod components;
mod scenario;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_component::{Index, IndexConfig};

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let config = IndexConfig::from_env();
    info!(policy = ?config.replace_policy, capacity = config.entity_capacity, "starting index demo");

    let index = Index::with_config(config);
    let report = scenario::run(&index)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!("index demo finished");
    Ok(())
}
