//! Plugins Demo
//!
//! Three plugins declared in TOML files resolve services across each other:
//!
//! - `common` exports `timeout`, built from the `clock` library
//! - `pluginA` exports `A.b` (async) and keeps `A.a` private
//! - `pluginB` exports `B.a`, which needs `timeout` and `A.b`
//!
//! `A.a` depends on `B.a` even though `pluginB` is declared after `pluginA`;
//! exported names are registered before anything resolves, so declaration
//! order does not matter.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package plugins-demo
//! cargo run --package plugins-demo -- --json
//! WEAVE_LOGGING__LEVEL=debug cargo run --package plugins-demo -- --wait
//! ```

mod modules;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use weave::prelude::*;
use weave::runtime::WeaveConfig;

#[derive(Debug, Parser)]
#[command(about = "Resolve the demo plugins and print the container report")]
struct Args {
    /// Directory holding weave.toml and the plugin descriptors.
    #[arg(long, default_value = env!("CARGO_MANIFEST_DIR"))]
    root: PathBuf,

    /// Configuration profile (development, production, ...).
    #[arg(long)]
    profile: Option<String>,

    /// Print the report as JSON instead of tables.
    #[arg(long)]
    json: bool,

    /// Keep running after the report until Ctrl+C.
    #[arg(long)]
    wait: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut base = WeaveConfig::default();
    base.container.root.clone_from(&args.root);

    let mut builder = WeaveRuntime::builder().search_path(&args.root).merge(base);
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile.as_str());
    }
    let runtime = builder.build()?;

    runtime
        .run_until(async {
            let Some(container) = runtime.container() else {
                return;
            };

            match container.get("B.a").await {
                Ok(Some(value)) => {
                    let text = value.downcast_ref::<String>().map_or("<not a string>", String::as_str);
                    info!("===========================================");
                    info!("Lookup from outside plugins");
                    info!("{text}");
                    info!("===========================================");
                }
                Ok(None) => error!("B.a is not exported"),
                Err(e) => error!(error = %e, "B.a failed to resolve"),
            }

            container.settled().await;
            let report = container.info();
            if args.json {
                match report.to_json() {
                    Ok(json) => println!("{json}"),
                    Err(e) => error!(error = %e, "Failed to serialize the report"),
                }
            } else {
                println!("{report}");
            }

            if args.wait {
                info!("Press Ctrl+C to stop.");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        })
        .await?;

    Ok(())
}
