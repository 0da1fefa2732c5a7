//! Cloud Storage collaborator: probe, list, download, upload.
//!
//! [`ObjectStore`] is the exact surface the pipeline consumes — an
//! existence probe that reports "not yet visible" as `Ok(false)` rather
//! than an error (the trigger handler owns the retry policy), prefix
//! listing for OCR output shards, and whole-object download/upload. The
//! Google implementation speaks the JSON API; object names are passed
//! through `Url` path segments so `/` and unicode names encode correctly.

use crate::error::Pdf2AudioError;
use crate::gcp::auth::TokenProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Default base for metadata/list/download calls.
const STORAGE_ENDPOINT: &str = "https://storage.googleapis.com/storage/v1";
/// Default base for media uploads.
const UPLOAD_ENDPOINT: &str = "https://storage.googleapis.com/upload/storage/v1";

/// The storage operations the pipeline consumes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether `object` is visible in `bucket`.
    ///
    /// `Ok(false)` covers both a missing object and a missing bucket —
    /// from the trigger handler's point of view they are the same "not
    /// resolvable yet" state. Transport and auth failures are errors.
    async fn object_exists(&self, bucket: &str, object: &str) -> Result<bool, Pdf2AudioError>;

    /// Names of all objects in `bucket` whose names start with `prefix`,
    /// in the service's listing order (lexicographic for GCS).
    async fn list_objects(&self, bucket: &str, prefix: &str)
        -> Result<Vec<String>, Pdf2AudioError>;

    /// Full contents of one object.
    async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, Pdf2AudioError>;

    /// Write `bytes` to `object`, overwriting any existing object.
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), Pdf2AudioError>;
}

/// Cloud Storage JSON-API client.
pub struct GcsClient {
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    endpoint: String,
    upload_endpoint: String,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListedObject>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
}

impl GcsClient {
    pub fn new(client: reqwest::Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_endpoints(client, tokens, STORAGE_ENDPOINT, UPLOAD_ENDPOINT)
    }

    /// Test hook: point at non-default API bases.
    pub fn with_endpoints(
        client: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        endpoint: impl Into<String>,
        upload_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            endpoint: endpoint.into(),
            upload_endpoint: upload_endpoint.into(),
        }
    }

    /// `{endpoint}/b/{bucket}/o/{object}` with the object name encoded as
    /// a single path segment (the JSON API requires `/` escaped).
    fn object_url(&self, bucket: &str, object: &str) -> Result<reqwest::Url, Pdf2AudioError> {
        let mut url = reqwest::Url::parse(&self.endpoint).map_err(|e| Pdf2AudioError::Storage {
            op: "url",
            bucket: bucket.to_string(),
            object: object.to_string(),
            detail: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| Pdf2AudioError::Storage {
                op: "url",
                bucket: bucket.to_string(),
                object: object.to_string(),
                detail: "endpoint cannot be a base".to_string(),
            })?
            .extend(["b", bucket, "o", object]);
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, Pdf2AudioError> {
        self.tokens.access_token().await
    }
}

fn storage_err(
    op: &'static str,
    bucket: &str,
    object: &str,
    detail: impl std::fmt::Display,
) -> Pdf2AudioError {
    Pdf2AudioError::Storage {
        op,
        bucket: bucket.to_string(),
        object: object.to_string(),
        detail: detail.to_string(),
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn object_exists(&self, bucket: &str, object: &str) -> Result<bool, Pdf2AudioError> {
        let url = self.object_url(bucket, object)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| storage_err("probe", bucket, object, e))?;

        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => Err(storage_err(
                "probe",
                bucket,
                object,
                format!("HTTP {s}"),
            )),
        }
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, Pdf2AudioError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = reqwest::Url::parse(&format!("{}/b/{}/o", self.endpoint, bucket))
                .map_err(|e| storage_err("list", bucket, prefix, e))?;
            url.query_pairs_mut().append_pair("prefix", prefix);
            if let Some(ref token) = page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let response = self
                .client
                .get(url)
                .bearer_auth(self.bearer().await?)
                .send()
                .await
                .map_err(|e| storage_err("list", bucket, prefix, e))?;

            if !response.status().is_success() {
                return Err(storage_err(
                    "list",
                    bucket,
                    prefix,
                    format!("HTTP {}", response.status()),
                ));
            }

            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| storage_err("list", bucket, prefix, e))?;

            names.extend(page.items.into_iter().map(|o| o.name));
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Listed {} objects under gs://{}/{}", names.len(), bucket, prefix);
        Ok(names)
    }

    async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, Pdf2AudioError> {
        let mut url = self.object_url(bucket, object)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| storage_err("download", bucket, object, e))?;

        if !response.status().is_success() {
            return Err(storage_err(
                "download",
                bucket,
                object,
                format!("HTTP {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| storage_err("download", bucket, object, e))?;
        debug!("Downloaded gs://{}/{} ({} bytes)", bucket, object, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), Pdf2AudioError> {
        let mut url = reqwest::Url::parse(&format!("{}/b/{}/o", self.upload_endpoint, bucket))
            .map_err(|e| storage_err("upload", bucket, object, e))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);

        let size = bytes.len();
        let response = self
            .client
            .post(url)
            .bearer_auth(self.bearer().await?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| storage_err("upload", bucket, object, e))?;

        if !response.status().is_success() {
            return Err(storage_err(
                "upload",
                bucket,
                object,
                format!("HTTP {}", response.status()),
            ));
        }

        debug!("Uploaded gs://{}/{} ({} bytes)", bucket, object, size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::auth::StaticToken;

    fn client() -> GcsClient {
        GcsClient::new(reqwest::Client::new(), Arc::new(StaticToken::new("t")))
    }

    #[test]
    fn object_url_encodes_slashes_in_name() {
        let url = client().object_url("b1", "a/b/doc 1.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/b1/o/a%2Fb%2Fdoc%201.pdf"
        );
    }

    #[test]
    fn list_response_tolerates_empty_page() {
        // A bucket with no matches returns `{}` — no `items` key at all.
        let page: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
