use clap::Parser;
use log::{error, info};
use std::process;

mod config;
mod ec2;
mod launch;
mod retry;

use config::{Cli, Config};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(err) if err.is_usage() => {
            eprintln!("{}\n\n{}", err, Cli::usage());
            process::exit(1);
        }
        Err(err) => {
            error!("Failed to load config: {}", err);
            process::exit(1);
        }
    };

    let launcher = match ec2::Ec2Launcher::connect(&config).await {
        Ok(launcher) => launcher,
        Err(err) => {
            error!("Failed to load config: {:#}", err);
            process::exit(1);
        }
    };

    info!(
        "Launching up to {} instance(s) from template {} in {} every {}",
        config.count,
        config.launch_template,
        config.region.name(),
        humantime::format_duration(config.interval)
    );

    launch::run(&config, &launcher, &launch::LogReporter).await;
}
