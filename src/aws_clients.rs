use crate::config::Config;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use tracing;

/// Shared SDK config for the DynamoDB backend.
///
/// Credentials come from the default provider chain. `AWS_ENDPOINT_URL` points the
/// client at a local DynamoDB or localstack instead of AWS.
pub async fn create_sdk_config(config: &Config) -> SdkConfig {
    tracing::info!(sdk_region = %config.aws_region, "Setting SDK region");
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    match &config.localstack_endpoint {
        Some(endpoint_url) => {
            tracing::info!(%endpoint_url, "Using DynamoDB endpoint override");
            loader = loader.endpoint_url(endpoint_url);
        }
        None => tracing::info!("Using default AWS endpoints"),
    }

    loader.load().await
}

pub fn create_dynamodb_client(sdk_config: &SdkConfig) -> DynamoDbClient {
    DynamoDbClient::new(sdk_config)
}
