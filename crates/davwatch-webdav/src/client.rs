//! WebDAV client
//!
//! Typed HTTP client for the three remote operations the pipeline needs,
//! with the protocol's status codes mapped to explicit outcomes:
//!
//! | Operation       | Method   | Success            | Missing parent      |
//! |-----------------|----------|--------------------|---------------------|
//! | Upload file     | PUT      | 201/204 uploaded   | 404                 |
//! | Check directory | PROPFIND | 207 exists         | 404 does not exist  |
//! | Create directory| MKCOL    | 201 created, 405 already exists | 409 hard fail |
//!
//! Every other status raises [`WebDavError::Protocol`]. Authentication and
//! transport-level concerns (auth headers, HTTP/2 upgrade) belong to the
//! `reqwest::Client` handed in at construction; this module never retries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::{Body, Method, StatusCode};
use tracing::debug;

use crate::cache::DirectoryCache;
use crate::WebDavError;

/// Which endpoint this client instance is bound to
///
/// The orchestrator picks the variant per cycle based on the LAN probe;
/// large files are only uploaded through [`Variant::Lan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Internet-facing endpoint, always reachable, slower
    Wan,
    /// Local-network endpoint, preferred for large files when reachable
    Lan,
}

/// Result of a file upload request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server stored the file (201 or 204)
    Uploaded,
    /// The parent collection does not exist remotely (404)
    ParentMissing,
}

/// Result of a directory existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    /// The collection exists (207, or served from the cache)
    Exists,
    /// The collection does not exist (404)
    Absent,
}

/// Result of a single MKCOL request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// WebDAV client bound to one endpoint and timeout budget
///
/// WAN and LAN instances share the same [`DirectoryCache`]; directory
/// existence learned through either endpoint is valid for both since they
/// front the same store.
pub struct WebDavClient {
    http: reqwest::Client,
    base_url: String,
    remote_root: String,
    variant: Variant,
    dir_cache: Arc<DirectoryCache>,
}

impl WebDavClient {
    /// Creates a client for the given endpoint.
    ///
    /// # Arguments
    /// * `http` - Pre-configured HTTP client (timeout and auth header set by the caller)
    /// * `base_url` - Endpoint base URL, e.g. `https://cloud.example.com`
    /// * `remote_root` - Root folder under `remote.php/dav/files/`
    /// * `variant` - WAN or LAN identity of this instance
    /// * `dir_cache` - Shared directory existence cache
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        remote_root: impl Into<String>,
        variant: Variant,
        dir_cache: Arc<DirectoryCache>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            remote_root: remote_root.into(),
            variant,
            dir_cache,
        }
    }

    /// Returns true for the LAN instance
    pub fn is_lan(&self) -> bool {
        self.variant == Variant::Lan
    }

    /// Returns the shared directory cache
    pub fn dir_cache(&self) -> &Arc<DirectoryCache> {
        &self.dir_cache
    }

    /// Builds the full resource URL for a relative remote path
    fn resource_url(&self, remote_path: &str) -> String {
        format!(
            "{}/remote.php/dav/files/{}/{}",
            self.base_url, self.remote_root, remote_path
        )
    }

    /// Uploads a request body as a file at `remote_path`.
    ///
    /// Maps 201/204 to [`UploadOutcome::Uploaded`] and 404 (the parent
    /// collection does not exist) to [`UploadOutcome::ParentMissing`].
    ///
    /// # Errors
    /// [`WebDavError::Protocol`] for any other status.
    pub async fn upload_file(
        &self,
        body: impl Into<Body>,
        remote_path: &str,
    ) -> Result<UploadOutcome, WebDavError> {
        let url = self.resource_url(remote_path);
        debug!(url = %url, "PUT upload");

        let response = self.http.put(&url).body(body).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(UploadOutcome::ParentMissing),
            StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(UploadOutcome::Uploaded),
            status => Err(WebDavError::Protocol {
                operation: "upload",
                path: remote_path.to_string(),
                status,
            }),
        }
    }

    /// Checks whether the remote collection at `remote_dir` exists.
    ///
    /// The shared cache is consulted first, except for the root (empty)
    /// path which is never cached on lookup. A 207 answer populates the
    /// cache; 404 maps to [`DirectoryStatus::Absent`].
    ///
    /// # Errors
    /// [`WebDavError::Protocol`] for any other status.
    pub async fn check_directory_exists(
        &self,
        remote_dir: &str,
    ) -> Result<DirectoryStatus, WebDavError> {
        if !remote_dir.is_empty() && self.dir_cache.contains(remote_dir) {
            return Ok(DirectoryStatus::Exists);
        }

        let url = self.resource_url(remote_dir);
        debug!(url = %url, cache_size = self.dir_cache.len(), "PROPFIND directory");

        let method = Method::from_bytes(b"PROPFIND").expect("valid method name");
        let response = self.http.request(method, &url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DirectoryStatus::Absent),
            StatusCode::MULTI_STATUS => {
                self.dir_cache.add(remote_dir);
                Ok(DirectoryStatus::Exists)
            }
            status => Err(WebDavError::Protocol {
                operation: "propfind",
                path: remote_dir.to_string(),
                status,
            }),
        }
    }

    /// Issues a single MKCOL for `remote_dir`.
    ///
    /// 201 and 405 both mean the collection exists afterwards and populate
    /// the cache. 409 means the parent collection is missing, which is a
    /// hard failure for this call.
    async fn create_directory(&self, remote_dir: &str) -> Result<CreateOutcome, WebDavError> {
        let url = self.resource_url(remote_dir);
        debug!(url = %url, "MKCOL directory");

        let method = Method::from_bytes(b"MKCOL").expect("valid method name");
        let response = self.http.request(method, &url).send().await?;

        match response.status() {
            StatusCode::METHOD_NOT_ALLOWED => {
                self.dir_cache.add(remote_dir);
                Ok(CreateOutcome::AlreadyExists)
            }
            StatusCode::CONFLICT => Err(WebDavError::ParentMissing(remote_dir.to_string())),
            StatusCode::CREATED => {
                self.dir_cache.add(remote_dir);
                Ok(CreateOutcome::Created)
            }
            status => Err(WebDavError::Protocol {
                operation: "mkcol",
                path: remote_dir.to_string(),
                status,
            }),
        }
    }

    /// Ensures every ancestor of `remote_path` exists, then the path itself.
    ///
    /// Recurses on the parent first, re-checks existence (another worker may
    /// have created the collection since), then issues the MKCOL. Both
    /// "created" and "already exists" count as success. Recursion depth is
    /// bounded by the number of path segments.
    pub fn create_recursive_remote_path<'a>(
        &'a self,
        remote_path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), WebDavError>> + Send + 'a>> {
        Box::pin(async move {
            if remote_path.is_empty() {
                return Ok(());
            }

            let parent = parent_path(remote_path);
            self.create_recursive_remote_path(parent).await?;

            if self.check_directory_exists(remote_path).await? == DirectoryStatus::Exists {
                return Ok(());
            }

            self.create_directory(remote_path).await?;
            Ok(())
        })
    }
}

/// Returns the parent of a relative remote path, or `""` for a top-level
/// segment.
fn parent_path(remote_path: &str) -> &str {
    match remote_path.trim_end_matches('/').rfind('/') {
        Some(idx) => &remote_path[..idx],
        None => "",
    }
}
