use crate::config::Config;
use async_trait::async_trait;
use log::{info, warn};
use std::error::Error;
use std::fmt;
use tokio::time::sleep;

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

/// One RunInstances call. Rebuilt for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub template_name: String,
    pub min_count: i64,
    pub max_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchedInstance {
    pub instance_type: String,
    pub availability_zone: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchError(pub String);

impl Error for LaunchError {}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[async_trait]
pub trait InstanceLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<Vec<LaunchedInstance>, LaunchError>;
}

pub trait LaunchReporter {
    fn launched(&self, instance: &LaunchedInstance);
    fn failed(&self, error: &LaunchError);
}

/// Reports attempts through the `log` facade.
pub struct LogReporter;

impl LaunchReporter for LogReporter {
    fn launched(&self, instance: &LaunchedInstance) {
        info!("{}", describe_launch(instance));
    }

    fn failed(&self, error: &LaunchError) {
        warn!("{}", describe_failure(error));
    }
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl LaunchRequest {
    pub fn new(template_name: &str, count: i64) -> Self {
        LaunchRequest {
            template_name: template_name.to_string(),
            min_count: 1,
            max_count: count,
        }
    }
}

pub fn describe_launch(instance: &LaunchedInstance) -> String {
    format!(
        "Launched {} instance in {}: {}",
        instance.instance_type, instance.availability_zone, instance.instance_id
    )
}

pub fn describe_failure(error: &LaunchError) -> String {
    format!("Launch failed: {}", error)
}

/// Issues one launch request and reports the outcome. Returns the number of
/// instances the provider handed back.
pub async fn attempt<L, R>(config: &Config, launcher: &L, reporter: &R) -> usize
where
    L: InstanceLauncher + ?Sized,
    R: LaunchReporter + ?Sized,
{
    let request = LaunchRequest::new(&config.launch_template, config.count);

    match launcher.launch(request).await {
        Ok(instances) => {
            for instance in &instances {
                reporter.launched(instance);
            }
            instances.len()
        }
        Err(err) => {
            reporter.failed(&err);
            0
        }
    }
}

/// Launches forever at a fixed cadence. Only process termination stops it.
pub async fn run<L, R>(config: &Config, launcher: &L, reporter: &R)
where
    L: InstanceLauncher + ?Sized,
    R: LaunchReporter + ?Sized,
{
    loop {
        attempt(config, launcher, reporter).await;
        sleep(config.interval).await;
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
