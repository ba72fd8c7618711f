use crate::archive::error::ArchiveError;
use crate::archive::storage::Archive;
use crate::config::S3Config;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{config::Region, Client};
use bytes::Bytes;
use tracing::{debug, info};

/// Real S3 implementation of the Archive trait
#[derive(Clone)]
pub struct S3Archive {
    client: Client,
    bucket: String,
}

impl S3Archive {
    /// Create a new S3Archive instance from configuration
    pub async fn new(config: &S3Config) -> Result<Self, ArchiveError> {
        // Set up AWS SDK config
        let config_loader = aws_config::from_env().region(Region::new(config.region.clone()));

        // If access key and secret are provided, use them for credentials
        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "StaticCredentialsProvider",
            );

            config_loader.credentials_provider(credentials).load().await
        } else {
            config_loader.load().await
        };

        // Create S3 client with endpoint override if provided
        let mut client_builder = aws_sdk_s3::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.endpoint {
            client_builder = client_builder.endpoint_url(endpoint);
        }

        let s3_config = client_builder.build();
        let client = Client::from_conf(s3_config);

        info!("Connected to S3 in region {}", config.region);

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl Archive for S3Archive {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), ArchiveError> {
        debug!("Writing object to S3: {}", key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(data.into())
            .send()
            .await
            .map_err(|e| match e {
                _ if e.to_string().contains("AccessDenied") => {
                    ArchiveError::AccessDenied(key.to_string(), e.to_string())
                }
                _ => ArchiveError::WriteError(key.to_string(), e.to_string()),
            })?;

        debug!("Successfully wrote object to S3: {}", key);
        Ok(())
    }

    #[cfg(test)]
    async fn get_object(&self, key: &str) -> Result<Bytes, ArchiveError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                _ if e.to_string().contains("NoSuchKey") => {
                    ArchiveError::ObjectNotFound(key.to_string())
                }
                _ => ArchiveError::Other(anyhow::anyhow!("Failed to get object: {}", e)),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| ArchiveError::Other(anyhow::anyhow!("Failed to read body: {}", e)))?
            .into_bytes();

        Ok(data)
    }

    #[cfg(test)]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ArchiveError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| ArchiveError::Other(anyhow::anyhow!("Failed to list objects: {}", e)))?;

        Ok(response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect())
    }
}
