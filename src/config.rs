use clap::{CommandFactory, Parser};
use rusoto_signature::Region;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

/// Keep launching EC2 instances from a launch template until capacity shows up.
#[derive(Parser, Debug)]
#[command(name = "ec2-launch-loop")]
#[command(version)]
pub struct Cli {
    /// Number of instances to launch simultaneously
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
    pub count: i64,

    /// Interval between instance launch attempts
    #[arg(long, default_value = "500ms", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    /// EC2 launch template name
    #[arg(long)]
    pub launch_template: Option<String>,

    /// AWS region (defaults to $AWS_REGION)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

impl Cli {
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub count: i64,
    pub interval: Duration,
    pub launch_template: String,
    pub region: Region,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    MissingRegion,
    MissingLaunchTemplate,
    InvalidRegion(String),
}

impl ConfigError {
    /// Missing flags are operator mistakes answered with the usage text.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ConfigError::MissingRegion | ConfigError::MissingLaunchTemplate
        )
    }
}

impl Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingRegion => write!(f, "--region (or $AWS_REGION) is required"),
            ConfigError::MissingLaunchTemplate => write!(f, "--launch-template is required"),
            ConfigError::InvalidRegion(name) => write!(f, "Unknown AWS region: {}", name),
        }
    }
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let region = non_empty(&cli.region).ok_or(ConfigError::MissingRegion)?;
        let launch_template =
            non_empty(&cli.launch_template).ok_or(ConfigError::MissingLaunchTemplate)?;

        let region =
            Region::from_str(region).map_err(|_| ConfigError::InvalidRegion(region.to_string()))?;

        Ok(Config {
            count: cli.count,
            interval: cli.interval,
            launch_template: launch_template.to_string(),
            region,
        })
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
