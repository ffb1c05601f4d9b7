use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use plantpop::{
    calculate,
    config::ProfileLoader,
    logging::init_logging,
    report::{group_thousands, OutputFormat, Report},
    web::{self, WebServerConfig},
    CalculationRequest, Profile, RoundingPolicy, SpacingUnit,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Plant population & seed requirement calculator")]
struct Cli {
    /// Path to a profile YAML file (uses the built-in western India profile when omitted)
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Log level filter, e.g. "debug" (overrides the profile; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate seeds and packets for a field
    Calculate(CalculateArgs),
    /// List configured regions and seed packet sizes
    Regions,
    /// Print the effective profile as YAML
    Profile,
    /// Serve the JSON calculation API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Debug, Args)]
struct CalculateArgs {
    #[arg(long)]
    region: String,

    /// Unit of the spacing values: cm or m
    #[arg(long, default_value = "cm")]
    unit: SpacingUnit,

    /// Distance between rows
    #[arg(long)]
    row_spacing: f64,

    /// Distance between plants within a row
    #[arg(long)]
    plant_spacing: f64,

    /// Farm area in acres
    #[arg(long)]
    area: f64,

    #[arg(long, default_value = "hybrid")]
    seed_type: String,

    /// Expected germination rate in (0, 1] (defaults to the profile's rate)
    #[arg(long)]
    germination_rate: Option<f64>,

    /// Plants expected to fail after emergence
    #[arg(long, default_value_t = 0)]
    mortality: u64,

    /// Packet rounding: up (packets needed) or down (full packets only)
    #[arg(long)]
    rounding: Option<RoundingPolicy>,

    /// Output format: text, json or yaml
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let profile = match &cli.profile {
        Some(path) => ProfileLoader::new(".").load(path)?,
        None => Profile::builtin(),
    };
    init_logging(&profile.logging, cli.log_level.as_deref())?;

    match cli.command {
        Command::Calculate(args) => run_calculate(&profile, args),
        Command::Regions => {
            print_regions(&profile);
            Ok(())
        }
        Command::Profile => {
            print!("{}", profile.to_yaml_string()?);
            Ok(())
        }
        Command::Serve { host, port } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run(WebServerConfig {
                profile,
                host,
                port,
            }))
        }
    }
}

fn run_calculate(profile: &Profile, args: CalculateArgs) -> Result<()> {
    let germination_rate = match args.germination_rate {
        Some(rate) => rate,
        None => {
            info!(
                rate = profile.germination_rate,
                profile = %profile.name,
                "using profile germination rate"
            );
            profile.germination_rate
        }
    };

    let request = CalculationRequest {
        region: args.region,
        spacing_unit: args.unit,
        row_spacing: args.row_spacing,
        plant_spacing: args.plant_spacing,
        land_area_acres: args.area,
        seed_type: args.seed_type,
        germination_rate,
        mortality_count: args.mortality,
        packet_rounding: args.rounding,
    };

    let result = calculate(profile, &request)?;
    if let Some(shortfall) = result.capacity_shortfall() {
        warn!(
            shortfall = shortfall.ceil() as u64,
            "spacing cannot hold the regional target population"
        );
    }
    print!("{}", Report::new(profile, &request, &result)?.render(args.format)?);
    Ok(())
}

fn print_regions(profile: &Profile) {
    println!("Profile '{}'", profile.name);
    println!("Regions (target plants/acre):");
    for (name, density) in profile.regions.iter() {
        println!("  {name:<20} {}", group_thousands(density.round() as u64));
    }
    println!("Seed types (seeds/packet):");
    for (name, seeds) in profile.seed_types.iter() {
        println!("  {name:<20} {}", group_thousands(seeds));
    }
    println!(
        "Default germination rate: {}  Packet rounding: {}",
        profile.germination_rate, profile.packet_rounding
    );
}
