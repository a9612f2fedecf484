use std::io::Read;

use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use tracing::debug;

use super::{BlobStore, validate_key};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::runtime::BlockingRuntime;

/// Connection settings of an S3 compatible object store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct S3Options {
    /// Empty for AWS itself.
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Address the bucket as a path segment instead of a host prefix.
    pub force_path_style: bool,
}

impl Default for S3Options {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: "us-east-1".to_string(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: String::new(),
            force_path_style: true,
        }
    }
}

/// Blob store on S3 compatible object storage.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    runtime: BlockingRuntime,
}

impl S3BlobStore {
    /// Builds the client. Without an access key pair the ambient AWS
    /// credential chain is used.
    pub fn new(options: &S3Options, runtime: BlockingRuntime) -> Result<Self> {
        if options.bucket.is_empty() {
            return Err(Error::Config("s3 bucket is required".to_string()));
        }
        if options.access_key_id.is_empty() != options.secret_access_key.is_empty() {
            return Err(Error::Config(
                "s3 access_key_id and secret_access_key must be set together".to_string(),
            ));
        }

        let mut builder = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(options.region.clone()))
            .force_path_style(options.force_path_style);

        if options.access_key_id.is_empty() {
            let region = Region::new(options.region.clone());
            let chain = runtime.setup(async move {
                Ok(DefaultCredentialsChain::builder()
                    .region(region)
                    .build()
                    .await)
            })?;
            builder = builder.credentials_provider(chain);
        } else {
            let session_token =
                (!options.session_token.is_empty()).then(|| options.session_token.clone());
            builder = builder.credentials_provider(Credentials::new(
                options.access_key_id.clone(),
                options.secret_access_key.clone(),
                session_token,
                None,
                "chartshift-config",
            ));
        }

        if let Some(endpoint) = normalize_endpoint(&options.endpoint) {
            builder = builder.endpoint_url(endpoint);
        }

        let config = builder.build();
        let client = runtime.setup(async move { Ok(Client::from_conf(config)) })?;

        Ok(Self {
            client,
            bucket: options.bucket.clone(),
            runtime,
        })
    }
}

/// Bare `host:port` endpoints (e.g. `minio:9000`) are taken as plain HTTP.
fn normalize_endpoint(endpoint: &str) -> Option<String> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return None;
    }
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(endpoint.to_string())
    } else {
        Some(format!("http://{endpoint}"))
    }
}

fn sdk_error<E>(err: SdkError<E>, key: &str) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    if let SdkError::ServiceError(service_err) = &err {
        if service_err.raw().status().as_u16() == 404 {
            return Error::NotFound(format!("object {key}"));
        }
    }
    Error::S3(Box::new(err))
}

impl BlobStore for S3BlobStore {
    fn upload(
        &self,
        ctx: &CallContext,
        key: &str,
        object_id: &str,
        content: &mut dyn Read,
    ) -> Result<()> {
        ctx.check()?;
        validate_key(key)?;

        let mut body = Vec::new();
        content.read_to_end(&mut body)?;
        debug!("put object {key} ({} bytes) to {}", body.len(), self.bucket);

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_disposition(format!("attachment; filename=\"{object_id}\""))
            .body(ByteStream::from(body));
        self.runtime.run(ctx, async move {
            request.send().await.map_err(|e| sdk_error(e, key))?;
            Ok::<_, Error>(())
        })
    }

    fn get(&self, ctx: &CallContext, key: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        validate_key(key)?;

        let request = self.client.get_object().bucket(&self.bucket).key(key);
        self.runtime.run(ctx, async move {
            let output = request.send().await.map_err(|e| sdk_error(e, key))?;
            let data = output
                .body
                .collect()
                .await
                .map_err(|e| Error::S3(Box::new(e)))?;
            Ok::<_, Error>(data.into_bytes().to_vec())
        })
    }
}
