// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use zonalsim::bridge::FirewallFilter;
use zonalsim::metrics::{AnalysisReport, ReportLogger};
use zonalsim::prelude::*;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

/// Options shared by `run` and `sweep`.
#[derive(clap::Args, Clone)]
struct StreamArgs {
    #[arg(short, long, default_value = "intra-zone")]
    preset: String,
    #[arg(short = 's', long, default_value_t = 512)]
    packet_size: u32,
    /// constant, poisson, interval or burst
    #[arg(short, long, default_value = "constant")]
    traffic: String,
    #[arg(short, long, default_value = "500Kbps")]
    rate: String,
    /// Gap for the interval pattern, seconds.
    #[arg(long, default_value_t = 0.1)]
    interval: f64,
    #[arg(long, default_value_t = 150)]
    burst: u32,
    #[arg(long, default_value_t = 1.1)]
    start: f64,
    #[arg(long, default_value_t = 10.0)]
    stop: f64,
    #[arg(long, default_value_t = 1.5)]
    trace_start: f64,
    #[arg(short, long, default_value_t = 11.0)]
    duration: f64,
    #[arg(long, default_value_t = 1)]
    seed: u64,
    #[arg(short, long, default_value = "results")]
    output: PathBuf,
    /// Third CSV column holds the one-way delay instead of the packet size.
    #[arg(long)]
    delay_column: bool,
    /// Message type stamped on every packet of the stream.
    #[arg(short = 'm', long)]
    message_type: Option<String>,
    /// JSON firewall rules installed on every zonal switch.
    #[arg(long)]
    firewall: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[command(flatten)]
        stream: StreamArgs,
        /// Load the whole configuration from JSON instead.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    Sweep {
        #[command(flatten)]
        stream: StreamArgs,
        /// Comma separated packet sizes, e.g. 64,512,1500
        #[arg(long, conflicts_with = "rates")]
        sizes: Option<String>,
        /// Comma separated sending rates, e.g. 1Mbps,10Mbps,100Mbps
        #[arg(long)]
        rates: Option<String>,
    },

    List,
}

fn main() -> Result<()> {
    let program_start = Instant::now(); // Global timer for end time.

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { stream, config } => {
            let (config, output) = match config {
                Some(path) => {
                    let config = SimConfig::from_json_file(&path)
                        .with_context(|| format!("loading config {}", path.display()))?;
                    (config, stream.output)
                }
                None => (build_config(&stream)?, stream.output.clone()),
            };
            run_single_simulation(config, &output)?;
        }

        Commands::Sweep { stream, sizes, rates } => {
            sweep(&stream, sizes.as_deref(), rates.as_deref(), program_start)?;
        }

        Commands::List => {
            println!("\nAvailable Latency Models");
            for model in LatencyRegistry::global().list() {
                println!("  - {}", model);
            }

            println!("\nAvailable Presets");
            for preset in ZonalPreset::ALL {
                println!("  - {} ({} hops)", preset, preset.hops().len());
            }

            println!("\nUsage: cargo run -- run --preset <name>");
            println!("Example: cargo run -- run --preset inter-zone --packet-size 1500\n");
        }
    }

    let total_time = program_start.elapsed();
    info!("Total runtime: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

fn build_config(args: &StreamArgs) -> Result<SimConfig> {
    let preset: ZonalPreset = args.preset.parse()?;
    let traffic = parse_traffic_pattern(args)?;
    let layout = if args.delay_column {
        CsvLayout::Delay
    } else {
        CsvLayout::PacketSize
    };

    let mut config = SimConfig::default()
        .with_name(format!("{}_{}B", preset, args.packet_size))
        .with_preset(preset)
        .with_packet_size(args.packet_size)
        .with_traffic(traffic)
        .with_window(
            SimTime::from_secs_f64(args.start),
            SimTime::from_secs_f64(args.stop),
            SimTime::from_secs_f64(args.trace_start),
        )
        .with_duration(SimTime::from_secs_f64(args.duration));
    config.seed = args.seed;
    config.csv_layout = layout;
    config.message_type = args.message_type.clone();
    if let Some(path) = &args.firewall {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading firewall rules {}", path.display()))?;
        let rules: FirewallFilter = serde_json::from_str(&text)
            .with_context(|| format!("parsing firewall rules {}", path.display()))?;
        config = config.with_switch_firewall(rules);
    }
    config.validate()?;
    Ok(config)
}

fn parse_traffic_pattern(args: &StreamArgs) -> Result<TrafficPattern> {
    match args.traffic.to_lowercase().as_str() {
        "constant" | "cbr" => Ok(TrafficPattern::ConstantRate {
            rate: args.rate.parse()?,
        }),
        "poisson" => Ok(TrafficPattern::Poisson {
            rate: args.rate.parse()?,
        }),
        "interval" => Ok(TrafficPattern::Interval {
            every: SimTime::from_secs_f64(args.interval),
        }),
        "burst" => Ok(TrafficPattern::Burst { count: args.burst }),
        _ => anyhow::bail!("Unknown traffic pattern: {}", args.traffic),
    }
}

fn run_single_simulation(config: SimConfig, output: &Path) -> Result<RunReport> {
    info!("ZonalSim: Single Run");

    let mut sim = Simulation::with_output(config, output)?;
    let report = sim.run()?;

    println!();
    println!("{}", sim.describe());
    comparison_table(std::slice::from_ref(&report.analysis));
    Ok(report)
}

fn sweep(
    args: &StreamArgs,
    sizes: Option<&str>,
    rates: Option<&str>,
    global_start: Instant,
) -> Result<()> {
    let base = build_config(args)?;

    let configs: Vec<SimConfig> = match (sizes, rates) {
        (Some(list), _) => split_list(list)
            .map(|s| -> Result<SimConfig> {
                let size: u32 = s.parse().with_context(|| format!("bad packet size: {}", s))?;
                Ok(base
                    .clone()
                    .with_name(format!("{}_{}B", args.preset, size))
                    .with_packet_size(size))
            })
            .collect::<Result<_>>()?,
        (None, Some(list)) => split_list(list)
            .map(|s| -> Result<SimConfig> {
                let rate: DataRate = s.parse()?;
                let traffic = match &base.traffic {
                    TrafficPattern::Poisson { .. } => TrafficPattern::Poisson { rate },
                    _ => TrafficPattern::ConstantRate { rate },
                };
                Ok(base
                    .clone()
                    .with_name(format!("{}_{}", args.preset, rate))
                    .with_traffic(traffic))
            })
            .collect::<Result<_>>()?,
        (None, None) => anyhow::bail!("sweep needs --sizes or --rates"),
    };

    info!("ZonalSim: Sweep");
    info!("Preset: {}", args.preset);
    info!("Runs: {}", configs.len());

    let bar = ProgressBar::new(configs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?,
    );

    let output = args.output.clone();
    let results: Vec<Result<RunReport>> = configs
        .into_par_iter()
        .map(|config| {
            let name = config.name.clone();
            let mut sim = Simulation::with_output(config, &output)?;
            let report = sim.run().with_context(|| format!("run {}", name))?;
            bar.inc(1);
            bar.set_message(name);
            Ok(report)
        })
        .collect();
    bar.finish_and_clear();

    let runs: Vec<RunReport> = results.into_iter().collect::<Result<_>>()?;
    let reports: Vec<AnalysisReport> = runs.iter().map(|r| r.analysis.clone()).collect();

    info!("Sweep done in {}", format_time(global_start.elapsed()));
    comparison_table(&reports);

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let comparison_path = output.join(format!("comparison_{}.json", timestamp));
    std::fs::write(&comparison_path, serde_json::to_string_pretty(&runs)?)?;
    info!("Comparison saved to: {}", comparison_path.display());

    let mut logger = ReportLogger::create(&output, &format!("comparison_{}", timestamp))?;
    for run in &runs {
        logger.write_run(&run.summary, &run.analysis)?;
    }
    let csv_path = logger.finish()?;
    info!("Comparison table saved to: {}", csv_path.display());

    Ok(())
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn format_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    let minutes = secs / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}.{:03}", minutes, seconds, duration.subsec_millis())
}

fn comparison_table(reports: &[AnalysisReport]) {
    println!("\n╔═══════════════════════╦═════════╦════════════╦════════════╦════════════╦════════════╦════════════╗");
    println!("║ Run                   ║ Samples ║ Mean (us)  ║ Min (us)   ║ Max (us)   ║ Jitter(us) ║ Drop (%)   ║");
    println!("╠═══════════════════════╬═════════╬════════════╬════════════╬════════════╬════════════╬════════════╣");

    for report in reports {
        println!(
            "║ {:<21} ║ {:>7} ║ {:>10.3} ║ {:>10.3} ║ {:>10.3} ║ {:>10.3} ║ {:>9.2}% ║",
            report.name,
            report.samples,
            report.mean_latency_s * 1e6,
            report.min_latency_s * 1e6,
            report.max_latency_s * 1e6,
            report.mean_jitter_s * 1e6,
            report.drop_rate * 100.0,
        );
    }

    println!("╚═══════════════════════╩═════════╩════════════╩════════════╩════════════╩════════════╩════════════╝\n");

    if reports.len() > 1 {
        if let Some(best) = reports
            .iter()
            .min_by(|a, b| a.mean_latency_s.total_cmp(&b.mean_latency_s))
        {
            println!("Lowest Latency: {} ({:.3} us)", best.name, best.mean_latency_s * 1e6);
        }
        if let Some(worst) = reports
            .iter()
            .max_by(|a, b| a.drop_rate.total_cmp(&b.drop_rate))
        {
            println!("Highest Loss: {} ({:.2}%)", worst.name, worst.drop_rate * 100.0);
        }
        println!();
    }
}
