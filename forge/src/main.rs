// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `khora-forge`: watches a project tree and keeps its compiled asset stores
//! up to date.

use anyhow::{Context, Result};
use clap::Parser;
use khora_forge_core::asset::AssetKind;
use khora_forge_io::{ForgeConfig, Orchestrator};
use std::path::PathBuf;

/// Incremental asset compiler for Khora projects.
#[derive(Parser, Debug)]
#[command(name = "khora-forge", version, about)]
struct Cli {
    /// Root of the project whose source assets are compiled.
    project_root: PathBuf,

    /// Configuration file to use instead of `<PROJECT_ROOT>/Assets.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the minimum time between two scans, in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,

    /// Runs a single scan and exits.
    #[arg(long)]
    once: bool,

    /// Prints the compiled assets of one kind (texture, mesh, shader, wave) and exits.
    #[arg(long, value_parser = parse_kind)]
    list: Option<AssetKind>,
}

fn parse_kind(name: &str) -> Result<AssetKind, String> {
    AssetKind::from_name(&name.to_ascii_lowercase()).ok_or_else(|| {
        let names: Vec<_> = AssetKind::ALL.iter().map(|k| k.name()).collect();
        format!("expected one of {}", names.join(", "))
    })
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("naga", log::LevelFilter::Warn)
        .filter_module("symphonia", log::LevelFilter::Warn)
        .init();

    let cli = Cli::parse();
    let root = cli.project_root;

    let mut config = match &cli.config {
        Some(path) => ForgeConfig::load_file(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display()))?,
        None => ForgeConfig::load(&root)
            .with_context(|| format!("Failed to load configuration of '{}'", root.display()))?,
    };
    if let Some(interval) = cli.interval_ms {
        config.pipeline.scan_interval_ms = interval;
    }

    let mut forge = Orchestrator::with_config(&root, config)
        .with_context(|| format!("Failed to open project '{}'", root.display()))?;

    if let Some(kind) = cli.list {
        for (hash, name, size) in forge.context().listing(kind) {
            println!("{hash}  {size:>10}  {name}");
        }
        return Ok(());
    }

    if cli.once {
        forge.scan_once().context("Scan failed")?;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("Failed to install the Ctrl-C handler")?;

    forge.run(&shutdown_rx).context("Build loop failed")?;
    Ok(())
}
