use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::ObjectCannedAcl,
};
use tracing::{debug, error};

use crate::storage::{
    ObjectStore, S3StorageConfig, StorageError, Visibility, join_url, validate_path,
};

pub struct S3Store {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3Store {
    pub async fn new(config: &S3StorageConfig) -> Result<Self, StorageError> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "S3 bucket name is empty".to_string(),
            ));
        }

        let mut aws_config_builder = aws_config::defaults(BehaviorVersion::latest());

        // Set region if provided, otherwise use default from environment
        if let Some(region) = &config.region {
            aws_config_builder = aws_config_builder.region(Region::new(region.clone()));
        }

        // Explicit credentials win over the default provider chain
        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials =
                Credentials::new(access_key, secret_key, None, None, "photoshare-s3-store");
            aws_config_builder = aws_config_builder.credentials_provider(credentials);
        }

        let aws_config = aws_config_builder.load().await;
        let client = Client::new(&aws_config);

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            base_url: config.public_base_url(),
        })
    }
}

fn canned_acl(visibility: Visibility) -> ObjectCannedAcl {
    match visibility {
        Visibility::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), StorageError> {
        validate_path(path)?;
        debug!(
            "Uploading {} to s3://{} ({} bytes)",
            path,
            self.bucket,
            bytes.len()
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .acl(canned_acl(visibility))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                error!("S3 PutObject failed for {}: {}", path, DisplayErrorContext(&e));
                StorageError::S3Error(DisplayErrorContext(&e).to_string())
            })?;

        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        validate_path(path)?;

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(path.to_string())
                } else {
                    StorageError::S3Error(DisplayErrorContext(&e).to_string())
                }
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        validate_path(path)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::S3Error(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn name(&self) -> &str {
        "Amazon S3"
    }
}
