// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::{Context, Result};
use charta::{
    diagnose_raw_config, ChartMapper, InMemoryDatasetRegistry, InMemoryFormDataCache,
    MapperConfig, PreviewFormat, QueryResult, TaskManager,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Format {
    Ascii,
    VegaLite,
    Table,
}

impl From<Format> for PreviewFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Ascii => PreviewFormat::Ascii,
            Format::VegaLite => PreviewFormat::VegaLite,
            Format::Table => PreviewFormat::Table,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Map a chart config to form data and print the result.
    Generate {
        #[arg(long)]
        chart: PathBuf,
        #[arg(long)]
        dataset_id: Option<String>,
        /// Query result to render a preview from.
        #[arg(long)]
        rows: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Ascii)]
        format: Format,
    },
    /// Explain what is wrong with a chart config.
    Diagnose {
        #[arg(long)]
        chart: PathBuf,
    },
    /// Run a periodic refresh job for a few ticks.
    Refresh {
        #[arg(long, default_value_t = 250)]
        interval_ms: u64,
        #[arg(long, default_value_t = 4)]
        runs: usize,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "charta-demo")]
#[command(about = "Turns chart configs into explore form data, with advice, links and previews.")]
struct Cli {
    #[arg(long, default_value_t = false)]
    debug: bool,
    #[arg(long, default_value = "bin/demos/charta-demo/data/datasets.yaml")]
    datasets: PathBuf,
    #[arg(long, default_value = "bin/demos/charta-demo/data/charta.yaml")]
    settings: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn load_config(path: &Path) -> Result<MapperConfig> {
    let config = if path.exists() {
        MapperConfig::from_yaml_file(path)?
    } else {
        warn!(path = %path.display(), "Settings file not found, using defaults");
        MapperConfig::default()
    };
    Ok(config.with_env_overrides()?)
}

fn generate(
    mapper: &ChartMapper<InMemoryDatasetRegistry, InMemoryFormDataCache>,
    chart: &Path,
    dataset_id: Option<&str>,
    rows: Option<&Path>,
    format: Format,
) -> Result<()> {
    let raw = read_json(chart)?;
    let generated = match mapper.generate_from_value(&raw, dataset_id) {
        Ok(generated) => generated,
        Err(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }
    };
    println!("{}", generated.name);
    println!("{}", serde_json::to_string_pretty(&generated.form_data)?);
    for warning in &generated.warnings {
        println!("[{}] {}: {}", warning.severity.as_str(), warning.advisor, warning.message);
        for suggestion in &warning.suggestions {
            println!("    - {suggestion}");
        }
    }
    println!("Insight: {}", generated.semantics.primary_insight);
    if let Some(id) = dataset_id {
        println!("Explore: {}", mapper.explore_link(id, &generated.form_data));
    }
    if let Some(rows) = rows {
        let result: QueryResult = serde_json::from_value(read_json(rows)?)?;
        let preview = mapper.preview(format.into(), &generated, &result);
        println!("{}", serde_json::to_string_pretty(&preview)?);
    }
    Ok(())
}

fn refresh(interval_ms: u64, runs: usize) {
    let manager = TaskManager::new(Duration::from_millis(20));
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    manager.add_task(
        "datasource-refresh",
        Duration::ZERO,
        Some(Duration::from_millis(interval_ms)),
        move || {
            let run = counter.fetch_add(1, Ordering::SeqCst) + 1;
            info!(run, "Refreshing datasource metadata");
        },
    );
    while fired.load(Ordering::SeqCst) < runs {
        std::thread::sleep(Duration::from_millis(interval_ms / 2 + 1));
    }
    manager.stop();
    info!(runs = fired.load(Ordering::SeqCst), "Refresh demo finished");
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Generate {
            chart,
            dataset_id,
            rows,
            format,
        } => {
            let registry = InMemoryDatasetRegistry::from_yaml_file(&cli.datasets)?;
            info!(datasets = registry.len(), "Loaded dataset registry");
            let config = load_config(&cli.settings)?;
            let mapper = ChartMapper::new(registry, InMemoryFormDataCache::new(), config);
            generate(&mapper, &chart, dataset_id.as_deref(), rows.as_deref(), format)?;
        }
        Commands::Diagnose { chart } => {
            let diagnosis = diagnose_raw_config(&read_json(&chart)?);
            println!("{}", serde_json::to_string_pretty(&diagnosis)?);
        }
        Commands::Refresh { interval_ms, runs } => refresh(interval_ms, runs),
    }
    Ok(())
}
