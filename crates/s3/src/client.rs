//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from minx-core for
//! the one bucket a session is bound to.

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_smithy_types::byte_stream::Length;
use tracing::debug;

use minx_core::{CompletedPart, Error, ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore, Result, Session, UploadBody};

const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NotFound", "NoSuchBucket", "NoSuchUpload"];

/// S3 client bound to one bucket
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Client {
    /// Create a client from a session's endpoint and credentials
    pub async fn new(session: &Session) -> Result<Self> {
        let credentials = aws_credential_types::Credentials::new(
            session.access_key.clone(),
            session.secret_key.clone(),
            None,
            None,
            "minx-session",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(session.region.clone()))
            .endpoint_url(&session.endpoint)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(session.path_style)
            .build();

        debug!(endpoint = %session.endpoint, bucket = %session.bucket, "created S3 client");
        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: session.bucket.clone(),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    async fn byte_stream(body: UploadBody) -> Result<ByteStream> {
        match body {
            UploadBody::Empty => Ok(ByteStream::from(Vec::new())),
            UploadBody::Bytes(bytes) => Ok(ByteStream::from(bytes)),
            UploadBody::File {
                path,
                offset,
                length,
            } => ByteStream::read_from()
                .path(&path)
                .offset(offset)
                .length(Length::Exact(length))
                .build()
                .await
                .map_err(|e| Error::TransferFailed(format!("{}: {e}", path.display()))),
        }
    }
}

/// Map an SDK failure on `subject` to a core error
fn map_sdk_error<E, R>(err: SdkError<E, R>, subject: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if err.code().is_some_and(|code| NOT_FOUND_CODES.contains(&code)) {
        return Error::ObjectNotFound(subject.to_string());
    }
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            Error::Network(format!("{subject}: {}", DisplayErrorContext(&err)))
        }
        _ => Error::General(format!("{subject}: {}", DisplayErrorContext(&err))),
    }
}

fn to_timestamp(dt: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok()
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// `Range` header for an inclusive byte range, `None` for a full read
fn range_header(start: u64, end: Option<u64>) -> Option<String> {
    match (start, end) {
        (0, None) => None,
        (start, None) => Some(format!("bytes={start}-")),
        (start, Some(end)) => Some(format!("bytes={start}-{end}")),
    }
}

/// `x-amz-copy-source` value with each key segment percent-encoded
fn copy_source(bucket: &str, key: &str) -> Result<String> {
    let mut url = url::Url::parse("s3://copy/")
        .map_err(|e| Error::General(format!("building copy source: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| Error::General("building copy source".into()))?
        .clear()
        .push(bucket)
        .extend(key.split('/'));
    Ok(url.path().trim_start_matches('/').to_string())
}

#[async_trait]
impl ObjectStore for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_sdk_error(e, &self.bucket) {
                Error::ObjectNotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn list_objects(&self, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(&self.bucket);

        if let Some(prefix) = options.prefix.as_deref().filter(|p| !p.is_empty()) {
            request = request.prefix(prefix);
        }
        if !options.recursive {
            request = request.delimiter("/");
        }
        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }
        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let subject = options.prefix.clone().unwrap_or_else(|| "/".to_string());
        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &subject))?;

        let mut items = Vec::new();

        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                items.push(ObjectInfo::dir(p));
            }
        }

        for object in response.contents() {
            let key = object.key().unwrap_or_default();
            let mut info = if key.ends_with('/') {
                ObjectInfo::dir(key)
            } else {
                ObjectInfo::file(key, object.size().unwrap_or(0).max(0) as u64)
            };
            info.last_modified = object.last_modified().and_then(to_timestamp);
            info.etag = object.e_tag().map(trim_etag);
            items.push(info);
        }

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn head_object(&self, key: &str) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        let size = response.content_length().unwrap_or(0).max(0) as u64;
        let mut info = ObjectInfo::file(key, size);
        info.last_modified = response.last_modified().and_then(to_timestamp);
        info.etag = response.e_tag().map(trim_etag);
        info.content_type = response.content_type().map(str::to_string);
        Ok(info)
    }

    async fn get_object_range(
        &self,
        key: &str,
        start: u64,
        end: Option<u64>,
    ) -> Result<ObjectReader> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range_header(start, end))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        Ok(Box::pin(response.body.into_async_read()))
    }

    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        let size = body.len();
        let stream = Self::byte_stream(body).await?;

        let response = self
            .inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(size as i64)
            .set_content_type(content_type.clone())
            .body(stream)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        let mut info = if key.ends_with('/') {
            ObjectInfo::dir(key)
        } else {
            ObjectInfo::file(key, size)
        };
        info.etag = response.e_tag().map(trim_etag);
        info.content_type = content_type;
        info.last_modified = Some(jiff::Timestamp::now());
        Ok(info)
    }

    async fn copy_object(&self, src_key: &str, dst_key: &str) -> Result<ObjectInfo> {
        let source = copy_source(&self.bucket, src_key)?;

        self.inner
            .copy_object()
            .copy_source(source)
            .bucket(&self.bucket)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, src_key))?;

        // copy responses carry no size
        self.head_object(dst_key).await
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: Option<String>,
    ) -> Result<String> {
        let response = self
            .inner
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::TransferFailed(format!("{key}: no upload id returned")))
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: UploadBody,
    ) -> Result<String> {
        let size = body.len();
        let stream = Self::byte_stream(body).await?;

        let response = self
            .inner
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(size as i64)
            .body(stream)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        response
            .e_tag()
            .map(trim_etag)
            .ok_or_else(|| Error::TransferFailed(format!("{key}: part {part_number} has no etag")))
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<ObjectInfo> {
        let parts = parts
            .into_iter()
            .map(|part| {
                S3CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.etag)
                    .build()
            })
            .collect();
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.inner
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        self.head_object(key).await
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        self.inner
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;
        Ok(())
    }
}
