use clap::Parser;
use poly_lag::cli::{describe_config, Cli, Commands};
use poly_lag::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using bundled configuration");
            Config::bundled()?
        }
    };

    // Only the long-running command exports metrics
    match cli.command {
        Commands::Run(_) => poly_lag::telemetry::init_telemetry(&config.telemetry)?,
        _ => poly_lag::telemetry::init_logging(
            &config.telemetry.log_level,
            config.telemetry.log_format,
        )?,
    }

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(config = %cli.config, "Starting run");
            args.execute(config).await?;
        }
        Commands::Report(args) => args.execute(&config)?,
        Commands::Status(args) => args.execute(&config)?,
        Commands::Config => println!("{}", describe_config(&config)),
    }

    Ok(())
}
