// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.                                                                          

use cyberfield::metrics::analyzer::{self, AnalysisReport};
use cyberfield::network::generators::Topology;
use cyberfield::rewards::RewardRegistry;
use cyberfield::simulation::{GameMode, RunConfig, Simulation};
use cyberfield::strategies::PolicyRegistry;

use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[arg(short, long, default_value = "scan-and-fix")]
        policy: String,
        #[arg(short, long, default_value_t = 100)]
        episodes: usize,
        #[arg(short, long, default_value_t = 4)]
        workers: usize,
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, default_value = "mesh")]
        network: Topology,
        #[arg(long, default_value_t = 10)]
        nodes: usize,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    Compare {
        /// Comma separated, defaults to every registered policy.
        #[arg(short, long)]
        policies: Option<String>,
        #[arg(short, long, default_value_t = 100)]
        episodes: usize,
        #[arg(short, long, default_value_t = 4)]
        workers: usize,
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, default_value = "mesh")]
        network: Topology,
        #[arg(long, default_value_t = 10)]
        nodes: usize,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    Analyze {
        #[arg(default_value = "results")]
        path: PathBuf,
    },

    Validate {
        config: PathBuf,
    },

    List,
}

fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { policy, episodes, workers, seed, config, network, nodes, output } => {
            let game_mode = load_game_mode(config.as_ref())?;
            let config = RunConfig::new(&policy)
                .with_episodes(episodes)
                .with_workers(workers)
                .with_seed(seed)
                .with_network(network, nodes)
                .with_game_mode(game_mode)
                .with_output_dir(output);

            info!("Cyberfield: Single Run");
            let mut sim = Simulation::new(config);
            sim.run()?;
            sim.save_results()?;
        }

        Commands::Compare { policies, episodes, workers, seed, config, network, nodes, output } => {
            let game_mode = load_game_mode(config.as_ref())?;
            let names = match policies {
                Some(list) => list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
                None => PolicyRegistry::global().list(),
            };
            if names.is_empty() {
                anyhow::bail!("No policies to compare");
            }

            info!("Cyberfield: Comparison");
            info!("Policies: {}", names.join(", "));

            let mut reports = Vec::new();
            for name in &names {
                info!("Testing: {}", name);
                // same seed for every policy so they face the same networks
                let config = RunConfig::new(name)
                    .with_episodes(episodes)
                    .with_workers(workers)
                    .with_seed(seed)
                    .with_network(network, nodes)
                    .with_game_mode(game_mode.clone())
                    .with_output_dir(&output);
                let mut sim = Simulation::new(config);
                sim.run()?;
                reports.push(sim.save_results()?);
            }

            comparison_table(&reports);

            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let comparison_path = output.join(format!("comparison_{}.json", timestamp));
            std::fs::write(&comparison_path, serde_json::to_string_pretty(&reports)?)?;
            info!("Comparison saved to: {}", comparison_path.display());
        }

        Commands::Analyze { path } => {
            analyze_results(&path)?;
        }

        Commands::Validate { config } => {
            let mode = GameMode::load(&config)?;
            println!("{} is valid", config.display());
            println!("  reward function: {}", mode.rewards.reward_function);
            println!("  max steps:       {}", mode.game_rules.max_steps);
            println!("  red skill:       {:.2}", mode.red.skill);
        }

        Commands::List => {
            println!("\nAvailable Blue Policies");
            for policy in PolicyRegistry::global().list() {
                println!("  - {}", policy);
            }

            println!("\nAvailable Reward Functions");
            for function in RewardRegistry::global().list() {
                println!("  - {}", function);
            }

            println!("\nUsage: cargo run -- run --policy <name>");
            println!("Example: cargo run -- run --policy scan-and-fix --network eighteen\n");
        }
    }

    let total_time = program_start.elapsed();
    info!("Total runtime: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

fn load_game_mode(path: Option<&PathBuf>) -> Result<GameMode> {
    match path {
        Some(path) => {
            info!("Loading game mode from {}", path.display());
            GameMode::load(path)
        }
        None => Ok(GameMode::default()),
    }
}

fn analyze_results(path: &PathBuf) -> Result<()> {
    use std::fs;

    info!("Analyzing results in: {}", path.display());

    let mut reports = Vec::new();
    for entry in fs::read_dir(path)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json")
            && path.to_string_lossy().contains("analysis") {
            let content = fs::read_to_string(&path)?;
            let report: AnalysisReport = serde_json::from_str(&content)?;
            reports.push(report);
        }
    }

    if reports.is_empty() {
        info!("No analysis files found.");
        return Ok(());
    }

    comparison_table(&reports);

    Ok(())
}

fn comparison_table(reports: &[AnalysisReport]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════╗");
    println!("║                           POLICY COMPARISON                           ║");
    println!("╠═══════════════╦══════════╦═══════════╦════════════╦═══════════════════╣");
    println!("║ Policy        ║ Episodes ║ Blue wins ║ Avg reward ║ Avg length        ║");
    println!("║               ║          ║ (%)       ║            ║ (steps)           ║");
    println!("╠═══════════════╬══════════╬═══════════╬════════════╬═══════════════════╣");

    for report in reports {
        println!(
            "║ {:<13} ║ {:>8} ║ {:>8.2}% ║ {:>10.2} ║ {:>17.1} ║",
            report.policy_name,
            report.episodes,
            report.blue_win_rate * 100.0,
            report.avg_reward,
            report.avg_length,
        );
    }

    println!("╚═══════════════╩══════════╩═══════════╩════════════╩═══════════════════╝\n");

    if let Some(best) = reports.iter().max_by(|a, b| a.blue_win_rate.total_cmp(&b.blue_win_rate)) {
        println!("Top win rate: {} ({:.2}%)", best.policy_name, best.blue_win_rate * 100.0);
    }

    if let Some(best) = reports.iter().max_by(|a, b| a.avg_reward.total_cmp(&b.avg_reward)) {
        println!("Top reward: {} ({:.2})", best.policy_name, best.avg_reward);
    }

    let merged = analyzer::merge(reports);
    println!("Overall blue win rate: {:.2}% over {} episodes", merged.blue_win_rate * 100.0, merged.episodes);
    println!();
}
