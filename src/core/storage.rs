//! Client for the Yandex.Disk resources API.
//!
//! Every transfer is two-phase: an authenticated metadata request returns a
//! single-use signed link, then the bytes move directly against that link.

use chrono::{DateTime, FixedOffset};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::logging::LogThrottle;

/// Page size for directory listings.
pub const LISTING_LIMIT: u32 = 100;

const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open {path}: {source}")]
    OpenLocal {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("connection failed while requesting {operation} link for {path}: {source}")]
    LinkRequest {
        operation: &'static str,
        path: String,
        source: reqwest::Error,
    },

    #[error("{operation} link request for {path} returned status {status}")]
    LinkStatus {
        operation: &'static str,
        path: String,
        status: StatusCode,
    },

    #[error("upload destination {path} was rejected with 409, the remote folder may not exist")]
    Conflict { path: String },

    #[error("malformed response for {what}: {source}")]
    Decode {
        what: &'static str,
        source: reqwest::Error,
    },

    #[error("transfer of {file} failed: {source}")]
    Transfer { file: String, source: reqwest::Error },

    #[error("file {file} was not accepted, status {status}")]
    Rejected { file: String, status: StatusCode },

    #[error("listing {path} failed: {source}")]
    Listing { path: String, source: reqwest::Error },

    #[error("listing {path} returned status {status}")]
    ListingStatus { path: String, status: StatusCode },

    #[error("no file starting with '{prefix}' found in {path}")]
    NotFound { prefix: String, path: String },

    #[error("download of {file} returned status {status}")]
    DownloadStatus { file: String, status: StatusCode },

    #[error("failed to write {path}: {source}")]
    WriteLocal {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Signed single-use URL returned by the link endpoints.
#[derive(Debug, Deserialize)]
pub struct TransferLink {
    pub href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceItem {
    pub name: String,
    pub path: String,
    pub created: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceList {
    #[serde(rename = "_embedded", default)]
    pub embedded: Embedded,
}

#[derive(Debug, Default, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub items: Vec<ResourceItem>,
}

/// Result of a finished upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub remote_path: String,
    pub bytes: u64,
}

/// Result of a finished download.
#[derive(Debug, Clone)]
pub struct DownloadReceipt {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub bytes: u64,
}

/// Join a remote directory and a file name, keeping a single separator.
pub fn remote_join(dir: &str, name: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() && !dir.starts_with('/') {
        name.to_string()
    } else {
        format!("{}/{}", trimmed, name)
    }
}

/// Last path segment of a remote path such as `disk:/backup/a.7z`.
pub fn remote_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// First file entry whose name starts with `prefix`. The listing is already
/// sorted newest first by the server, so the first hit is the newest.
pub fn select_newest<'a>(items: &'a [ResourceItem], prefix: &str) -> Option<&'a ResourceItem> {
    items
        .iter()
        .find(|item| item.kind == ResourceKind::File && item.name.starts_with(prefix))
}

pub struct DiskClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DiskClient {
    /// `client` carries the request timeout; see [`crate::context::http_client`].
    pub fn new(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn auth_value(&self) -> String {
        format!("OAuth {}", self.token)
    }

    /// Upload `local_path` into `remote_dir`, overwriting any remote file of
    /// the same name.
    pub async fn upload(&self, local_path: &Path, remote_dir: &str) -> Result<UploadReceipt> {
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|source| StorageError::OpenLocal {
                path: local_path.to_path_buf(),
                source,
            })?;
        let size = file
            .metadata()
            .await
            .map_err(|source| StorageError::OpenLocal {
                path: local_path.to_path_buf(),
                source,
            })?
            .len();

        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = remote_join(remote_dir, &file_name);

        let link = self.upload_link(&destination).await?;

        info!(file = %file_name, bytes = size, "Uploading");

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .client
            .put(&link.href)
            .header(header::CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .map_err(|source| StorageError::Transfer {
                file: file_name.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(StorageError::Rejected {
                file: file_name,
                status,
            });
        }

        info!(file = %file_name, remote = %destination, "Upload complete");

        Ok(UploadReceipt {
            remote_path: destination,
            bytes: size,
        })
    }

    async fn upload_link(&self, destination: &str) -> Result<TransferLink> {
        let url = format!("{}/upload", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("path", destination), ("overwrite", "true")])
            .header(header::AUTHORIZATION, self.auth_value())
            .send()
            .await
            .map_err(|source| StorageError::LinkRequest {
                operation: "upload",
                path: destination.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::CONFLICT => {
                warn!(path = %destination, "Upload link refused with 409, destination folder may not exist");
                return Err(StorageError::Conflict {
                    path: destination.to_string(),
                });
            }
            status => {
                return Err(StorageError::LinkStatus {
                    operation: "upload",
                    path: destination.to_string(),
                    status,
                });
            }
        }

        response
            .json::<TransferLink>()
            .await
            .map_err(|source| StorageError::Decode {
                what: "upload link",
                source,
            })
    }

    /// Newest-first listing of `remote_dir`, capped at [`LISTING_LIMIT`].
    pub async fn list(&self, remote_dir: &str) -> Result<Vec<ResourceItem>> {
        let limit = LISTING_LIMIT.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("path", remote_dir),
                ("sort", "-created"),
                ("limit", limit.as_str()),
            ])
            .header(header::AUTHORIZATION, self.auth_value())
            .send()
            .await
            .map_err(|source| StorageError::Listing {
                path: remote_dir.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StorageError::ListingStatus {
                path: remote_dir.to_string(),
                status,
            });
        }

        let list = response
            .json::<ResourceList>()
            .await
            .map_err(|source| StorageError::Decode {
                what: "resource listing",
                source,
            })?;

        debug!(path = %remote_dir, items = list.embedded.items.len(), "Listed remote folder");
        Ok(list.embedded.items)
    }

    /// Download the newest file in `remote_dir` whose name starts with
    /// `prefix` into `output_dir`. An existing local file with the same name
    /// is overwritten.
    pub async fn download_newest(
        &self,
        prefix: &str,
        remote_dir: &str,
        output_dir: &Path,
    ) -> Result<DownloadReceipt> {
        let items = self.list(remote_dir).await?;

        let target = select_newest(&items, prefix).ok_or_else(|| StorageError::NotFound {
            prefix: prefix.to_string(),
            path: remote_dir.to_string(),
        })?;

        info!(
            file = %target.name,
            created = %target.created.format("%Y-%m-%d %H:%M"),
            "Found file"
        );

        let link = self.download_link(&target.path).await?;

        let file_name = remote_basename(&target.path).to_string();
        let local_path = output_dir.join(&file_name);

        // Signed link; the storage token must not be sent along.
        let mut response = self
            .client
            .get(&link.href)
            .send()
            .await
            .map_err(|source| StorageError::Transfer {
                file: file_name.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::DownloadStatus {
                file: file_name,
                status,
            });
        }

        let write_err = |source| StorageError::WriteLocal {
            path: local_path.clone(),
            source,
        };

        let mut out = tokio::fs::File::create(&local_path)
            .await
            .map_err(write_err)?;

        let mut throttle = LogThrottle::new(PROGRESS_LOG_INTERVAL);
        let mut bytes: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| StorageError::Transfer {
                file: file_name.clone(),
                source,
            })?
        {
            out.write_all(&chunk).await.map_err(write_err)?;
            bytes += chunk.len() as u64;
            throttle.progress(&file_name, bytes);
        }
        out.flush().await.map_err(write_err)?;

        info!(file = %target.name, bytes, "Download complete");

        Ok(DownloadReceipt {
            remote_path: target.path.clone(),
            local_path,
            bytes,
        })
    }

    async fn download_link(&self, remote_path: &str) -> Result<TransferLink> {
        let url = format!("{}/download", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("path", remote_path)])
            .header(header::AUTHORIZATION, self.auth_value())
            .send()
            .await
            .map_err(|source| StorageError::LinkRequest {
                operation: "download",
                path: remote_path.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StorageError::LinkStatus {
                operation: "download",
                path: remote_path.to_string(),
                status,
            });
        }

        response
            .json::<TransferLink>()
            .await
            .map_err(|source| StorageError::Decode {
                what: "download link",
                source,
            })
    }
}
