//! Fulfillment service: download registration, upload, links, delivery.

use crate::download::{DigitalDownload, DownloadLink};
use crate::object_store::{ObjectStore, StoredObject};
use serde::Deserialize;
use std::sync::Arc;
use vendo_commerce::ids::{DownloadId, OrderItemId, ProductId};
use vendo_commerce::CommerceError;
use vendo_db::Table;

/// Input for registering a deliverable file.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDigitalDownload {
    pub product_id: ProductId,
    pub file_name: String,
    pub content_type: String,
    pub download_limit: Option<i64>,
    pub expiration_days: Option<i64>,
}

/// A delivered file: bytes plus the metadata the transport needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDelivery {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

/// Issues and serves secure, rate-limited, time-bounded download links
/// for digital order items.
pub struct FulfillmentService {
    object_store: Arc<dyn ObjectStore>,
    downloads: Table<DigitalDownload>,
    links: Table<DownloadLink>,
}

impl FulfillmentService {
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            object_store,
            downloads: Table::new(),
            links: Table::new(),
        }
    }

    /// Register a deliverable file. One record per file; the storage key
    /// is assigned here and never changes.
    pub fn create_digital_download(
        &self,
        input: NewDigitalDownload,
    ) -> Result<DigitalDownload, CommerceError> {
        if input.file_name.trim().is_empty() {
            return Err(CommerceError::Validation(
                "file name must not be empty".into(),
            ));
        }
        let id = DownloadId::generate();
        let download = DigitalDownload {
            storage_key: format!("digital/{}/{}", id, input.file_name),
            id,
            product_id: input.product_id,
            file_name: input.file_name,
            content_type: input.content_type,
            download_limit: input.download_limit,
            expiration_days: input.expiration_days,
            created_at: current_timestamp(),
        };
        self.downloads.insert(download.clone())?;
        Ok(download)
    }

    /// Look up a download record.
    pub fn get_digital_download(
        &self,
        id: &DownloadId,
    ) -> Result<DigitalDownload, CommerceError> {
        self.downloads
            .get(id.as_str())
            .ok_or_else(|| CommerceError::DownloadNotFound(id.to_string()))
    }

    /// Write file bytes to the object store under the download's storage
    /// key, tagged with its MIME type and delivery filename.
    pub async fn upload_file(
        &self,
        download_id: &DownloadId,
        bytes: Vec<u8>,
    ) -> Result<(), CommerceError> {
        let download = self.get_digital_download(download_id)?;
        self.object_store
            .put(
                &download.storage_key,
                StoredObject {
                    bytes,
                    content_type: download.content_type.clone(),
                    content_disposition: download.content_disposition(),
                },
            )
            .await?;
        tracing::debug!(download = %download.id, key = %download.storage_key, "file uploaded");
        Ok(())
    }

    /// Mint a download link for a fulfilled digital order item.
    ///
    /// Limits and expiry default to the download's configuration when not
    /// supplied per link.
    pub fn create_download_link(
        &self,
        order_item_id: &OrderItemId,
        download_id: &DownloadId,
        max_downloads: Option<i64>,
        expiration_days: Option<i64>,
    ) -> Result<DownloadLink, CommerceError> {
        let download = self.get_digital_download(download_id)?;
        let link = DownloadLink::mint(
            order_item_id.clone(),
            download_id.clone(),
            max_downloads.or(download.download_limit),
            expiration_days.or(download.expiration_days),
        );
        self.links.insert(link.clone())?;
        tracing::info!(link = %link.id, order_item = %order_item_id, "download link minted");
        Ok(link)
    }

    /// Resolve a link by token, refusing expired or exhausted links.
    pub fn get_download_link_by_token(
        &self,
        token: &str,
    ) -> Result<DownloadLink, CommerceError> {
        let link = self.links.get(token).ok_or(CommerceError::LinkNotFound)?;
        link.validate()?;
        Ok(link)
    }

    /// Consume one download from a link.
    ///
    /// The expiry/limit check and the counter increment are a single
    /// conditional update, so two concurrent claims against a link with
    /// one remaining download cannot both pass: exactly one wins and the
    /// loser sees the usual expired/limit error.
    pub fn record_download(&self, token: &str) -> Result<DownloadLink, CommerceError> {
        let claimed = self
            .links
            .update_if(
                token,
                |link| link.claimable(),
                |link| {
                    link.download_count += 1;
                    link.last_downloaded_at = Some(current_timestamp());
                },
            )
            .map_err(|_| CommerceError::LinkNotFound)?;
        match claimed {
            Some(link) => Ok(link),
            None => {
                // Zero rows affected: report which gate refused the claim.
                let link = self.links.get(token).ok_or(CommerceError::LinkNotFound)?;
                link.validate()?;
                // Validate passing here means another claim won in
                // between; surface it as the limit gate.
                Err(CommerceError::DownloadLimitReached)
            }
        }
    }

    /// Serve the file behind a token: claim a download, then fetch the
    /// bytes.
    ///
    /// A missing object for an existing record means storage and records
    /// have drifted; that is a hard failure.
    pub async fn get_download_file(&self, token: &str) -> Result<FileDelivery, CommerceError> {
        let link = self.record_download(token)?;
        let download = self.get_digital_download(&link.download_id)?;

        let object = self
            .object_store
            .get(&download.storage_key)
            .await?
            .ok_or_else(|| CommerceError::ObjectMissing(download.storage_key.clone()))?;

        Ok(FileDelivery {
            bytes: object.bytes,
            file_name: download.file_name,
            content_type: download.content_type,
        })
    }

    /// Purge links past their expiry.
    pub fn cleanup_expired_links(&self) -> usize {
        let removed = self.links.delete_where(|link| link.is_expired());
        if removed > 0 {
            tracing::info!(removed, "expired download links purged");
        }
        removed
    }

    /// All links minted for an order item.
    pub fn links_for_order_item(&self, order_item_id: &OrderItemId) -> Vec<DownloadLink> {
        self.links.find(|l| &l.order_item_id == order_item_id)
    }

    #[cfg(test)]
    pub(crate) fn force_expire(&self, token: &str) {
        let _ = self.links.update(token, |link| {
            link.expires_at = Some(0);
        });
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
