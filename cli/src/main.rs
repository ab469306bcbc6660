mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regionsim_core::{Simulation, SimulationBuilder};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "regionsim_core=info,regionsim_cli=info";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut simulation = build_simulation()?;
    cli::run(&mut simulation)
}

fn build_simulation() -> Result<Simulation> {
    let mut builder = match resolve_config_dir()? {
        Some(dir) => {
            tracing::info!(config = %dir.display(), "設定ディレクトリを読み込みます");
            SimulationBuilder::from_dir(&dir)
                .with_context(|| format!("設定の読み込みに失敗しました: {}", dir.display()))?
        }
        None => {
            tracing::info!("設定ディレクトリが見つからないため組み込みシナリオを使用します");
            SimulationBuilder::from_embedded()?
        }
    };

    if let Ok(seed) = std::env::var("REGIONSIM_SEED") {
        let seed: u64 = seed
            .parse()
            .with_context(|| format!("REGIONSIM_SEED は整数で指定してください: {}", seed))?;
        builder = builder.with_seed(seed);
    }
    if let Ok(player) = std::env::var("REGIONSIM_PLAYER") {
        builder = builder.with_player(player);
    }
    builder.build()
}

fn resolve_config_dir() -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().context("カレントディレクトリの取得に失敗しました")?;
    let candidates = [
        cwd.join("config"),
        Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("config"),
    ];
    Ok(candidates
        .into_iter()
        .find(|dir| dir.join("countries.json").exists()))
}
