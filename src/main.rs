//! Gridiron CLI
//!
//! Builds leak-free drive and game features from an NFL play-by-play export.

use clap::{Parser, Subcommand};
use gridiron::{Config, Result};

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(
    about = "Sequential drive and game features from NFL play-by-play data",
    long_about = None
)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature table for one team-season
    Build {
        /// Play-by-play CSV (overrides config)
        #[arg(long)]
        input: Option<String>,
        /// Feature CSV to write (overrides config)
        #[arg(long)]
        output: Option<String>,
        /// Offensive team abbreviation, e.g. SF
        #[arg(long)]
        team: Option<String>,
        /// Season year; January and February games count toward the previous year
        #[arg(long)]
        season: Option<i32>,
        /// Also write the table into this SQLite file
        #[arg(long)]
        database: Option<String>,
    },
    /// List the aggregations the configured metric plan produces
    Metrics {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Build {
            input,
            output,
            team,
            season,
            database,
        } => commands::build(config, input, output, team, season, database),
        Commands::Metrics { format } => commands::metrics(&config, format),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridiron::data::{FeatureStore, PlayFilter};
    use gridiron::pipeline::FeaturePipeline;
    use gridiron::GridironError;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");

        println!("\nNext steps:");
        println!("  1. Put a play-by-play export at {}", config.data.input_path);
        println!("  2. Edit {} to pick the team, season and metrics", config_path);
        println!("  3. Run 'gridiron build' to write {}", config.data.output_path);

        Ok(())
    }

    pub fn build(
        mut config: Config,
        input: Option<String>,
        output: Option<String>,
        team: Option<String>,
        season: Option<i32>,
        database: Option<String>,
    ) -> Result<()> {
        if let Some(input) = input {
            config.data.input_path = input;
        }
        if let Some(output) = output {
            config.data.output_path = output;
        }
        if let Some(team) = team {
            config.filter.team = team;
        }
        if season.is_some() {
            config.filter.season = season;
        }
        if database.is_some() {
            config.data.database_path = database;
        }

        // Validate everything before touching the input
        let filter = PlayFilter::from_config(&config.filter)?;
        let pipeline = FeaturePipeline::from_config(&config)?;

        let (features, stats) = pipeline.run_path(filter.clone(), &config.data.input_path)?;
        features.save_csv(&config.data.output_path)?;

        println!("Feature Table");
        println!("───────────────────────────────");
        println!("  Team:     {}", filter.team);
        if let Some(season) = filter.season {
            println!("  Season:   {}", season);
        }
        println!("  Read:     {}", stats.read);
        println!("  Loaded:   {}", stats.kept);
        println!("  Plays:    {}", features.len());
        println!("  Columns:  {}", features.header().len());
        println!("  Output:   {}", config.data.output_path);

        if let Some(path) = &config.data.database_path {
            let mut store = FeatureStore::open(path)?;
            store.write_dataset(&config.data.table, &features)?;
            let summary = store.get_stats(&config.data.table)?;
            println!(
                "  Database: {} ({} plays, {} games, {} drives)",
                path, summary.play_count, summary.game_count, summary.drive_count
            );
        }

        Ok(())
    }

    pub fn metrics(config: &Config, format: OutputFormat) -> Result<()> {
        let pipeline = FeaturePipeline::from_config(config)?;
        let plan = pipeline.plan();

        match format {
            OutputFormat::Table => {
                println!("{:<36} {:<12} {:<6} Source", "Output", "Kind", "Scope");
                println!("{}", "─".repeat(72));
                for spec in plan.iter() {
                    println!(
                        "{:<36} {:<12} {:<6} {}",
                        spec.output(),
                        spec.kind(),
                        spec.scope(),
                        spec.source()
                    );
                }
                println!(
                    "\n{} aggregations over {} source metrics",
                    plan.len(),
                    plan.source_metrics().len()
                );
                println!("Loader reads: {}", pipeline.required_metrics().join(", "));
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(plan)
                    .map_err(|e| GridironError::Parse(e.to_string()))?;
                println!("{}", json);
            }
        }

        Ok(())
    }
}
