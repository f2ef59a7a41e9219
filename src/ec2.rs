use crate::{
    config::Config,
    launch::{InstanceLauncher, LaunchError, LaunchRequest, LaunchedInstance},
    retry::RetryPolicy,
};
use anyhow::anyhow;
use async_trait::async_trait;
use rusoto_core::proto::xml::error::{XmlError, XmlErrorDeserializer};
use rusoto_core::proto::xml::util::{find_start_element, start_element, XmlResponse};
use rusoto_core::{DispatchSignedRequest, HttpClient, RusotoError};
use rusoto_credential::{DefaultCredentialsProvider, ProvideAwsCredentials};
use rusoto_ec2::{
    Ec2, Ec2Client, Instance, LaunchTemplateSpecification, Reservation, RunInstancesError,
    RunInstancesRequest,
};
use xml::reader::EventReader;

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

/// Error codes the SDK's standard retryer treats as retryable: its default
/// retryable codes plus its throttle codes.
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "RequestTimeout",
    "RequestTimeoutException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "SlowDown",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottled",
    "RequestThrottledException",
    "TooManyRequestsException",
    "EC2ThrottledException",
    "PriorRequestNotComplete",
    "InternalError",
    "ServiceUnavailable",
    "Unavailable",
];

const TRANSIENT_STATUS_CODES: &[u16] = &[500, 502, 503, 504];

pub struct Ec2Launcher {
    client: Ec2Client,
    retry: RetryPolicy,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl Ec2Launcher {
    /// Resolves credentials up front so a broken setup fails before the loop.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let provider = DefaultCredentialsProvider::new()
            .map_err(|err| anyhow!("Failed to create credentials provider: {}", err))?;
        provider
            .credentials()
            .await
            .map_err(|err| anyhow!("Failed to get credentials: {}", err))?;

        let http_client =
            HttpClient::new().map_err(|err| anyhow!("Failed to create HTTP client: {:?}", err))?;

        Ok(Ec2Launcher::new_with(http_client, provider, config))
    }

    pub fn new_with<D, P>(dispatcher: D, credentials: P, config: &Config) -> Self
    where
        D: DispatchSignedRequest + Send + Sync + 'static,
        P: ProvideAwsCredentials + Send + Sync + 'static,
    {
        Ec2Launcher {
            client: Ec2Client::new_with(dispatcher, credentials, config.region.clone()),
            retry: RetryPolicy::constant(config.interval),
        }
    }
}

#[async_trait]
impl InstanceLauncher for Ec2Launcher {
    async fn launch(&self, request: LaunchRequest) -> Result<Vec<LaunchedInstance>, LaunchError> {
        let input = create_run_instances_request(&request);

        let reservation = self
            .retry
            .run(|| self.client.run_instances(input.clone()), is_transient)
            .await
            .map_err(|err| LaunchError(describe_error(&err)))?;

        Ok(launched_instances(reservation))
    }
}

fn create_run_instances_request(request: &LaunchRequest) -> RunInstancesRequest {
    RunInstancesRequest {
        launch_template: Some(LaunchTemplateSpecification {
            launch_template_name: Some(request.template_name.clone()),
            ..Default::default()
        }),
        min_count: request.min_count,
        max_count: request.max_count,
        ..Default::default()
    }
}

fn launched_instances(reservation: Reservation) -> Vec<LaunchedInstance> {
    reservation
        .instances
        .unwrap_or_default()
        .into_iter()
        .map(launched_instance)
        .collect()
}

fn launched_instance(instance: Instance) -> LaunchedInstance {
    let unknown = || "unknown".to_string();

    LaunchedInstance {
        instance_type: instance.instance_type.unwrap_or_else(unknown),
        availability_zone: instance
            .placement
            .and_then(|placement| placement.availability_zone)
            .unwrap_or_else(unknown),
        instance_id: instance.instance_id.unwrap_or_else(unknown),
    }
}

fn is_transient(err: &RusotoError<RunInstancesError>) -> bool {
    match err {
        RusotoError::HttpDispatch(_) => true,
        RusotoError::Unknown(response) => {
            is_transient_response(response.status.as_u16(), response.body_as_str())
        }
        _ => false,
    }
}

fn is_transient_response(status: u16, body: &str) -> bool {
    if TRANSIENT_STATUS_CODES.contains(&status) {
        return true;
    }

    parse_error_body(body)
        .map_or(false, |error| TRANSIENT_ERROR_CODES.contains(&error.code.as_str()))
}

/// EC2 error bodies come back unparsed inside `RusotoError::Unknown`.
fn describe_error(err: &RusotoError<RunInstancesError>) -> String {
    if let RusotoError::Unknown(response) = err {
        if let Some(description) = describe_error_body(response.body_as_str()) {
            return description;
        }
    }

    err.to_string()
}

fn describe_error_body(body: &str) -> Option<String> {
    let error = parse_error_body(body)?;
    if error.message.is_empty() {
        Some(error.code)
    } else {
        Some(format!("{}: {}", error.code, error.message))
    }
}

/// Parses `<Response><Errors><Error>...` the way the EC2 query protocol shapes it.
fn parse_error_body(body: &str) -> Option<XmlError> {
    let reader = EventReader::new(body.as_bytes());
    let mut stack = XmlResponse::new(reader.into_iter().peekable());
    find_start_element(&mut stack);

    start_element("Response", &mut stack).ok()?;
    start_element("Errors", &mut stack).ok()?;
    let error = XmlErrorDeserializer::deserialize("Error", &mut stack).ok()?;

    Some(error).filter(|error| !error.code.is_empty())
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
