//! Digital download and download link types.

use crate::token::generate_download_token;
use serde::{Deserialize, Serialize};
use vendo_commerce::ids::{DownloadId, DownloadLinkId, OrderItemId, ProductId};
use vendo_commerce::CommerceError;
use vendo_db::Record;

/// A deliverable file tied to a product.
///
/// The storage key is assigned at creation and never changes; the bytes
/// themselves live in the object store under that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalDownload {
    /// Unique download identifier.
    pub id: DownloadId,
    /// Product this file belongs to.
    pub product_id: ProductId,
    /// Filename presented to the customer.
    pub file_name: String,
    /// MIME type served with the file.
    pub content_type: String,
    /// Write-once object store key.
    pub storage_key: String,
    /// Default per-link download limit.
    pub download_limit: Option<i64>,
    /// Default link expiration window, in days.
    pub expiration_days: Option<i64>,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl Record for DigitalDownload {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

impl DigitalDownload {
    /// Content-Disposition header value for delivery.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

/// A single customer's access grant to a digital download.
///
/// The token is the bearer credential; the record is fulfillment
/// evidence and is never re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadLink {
    /// Unique link identifier.
    pub id: DownloadLinkId,
    /// Order item this link fulfills.
    pub order_item_id: OrderItemId,
    /// Download being granted.
    pub download_id: DownloadId,
    /// Unguessable bearer token.
    pub token: String,
    /// Downloads consumed so far.
    pub download_count: i64,
    /// Maximum downloads allowed (None = unlimited).
    pub max_downloads: Option<i64>,
    /// Unix timestamp after which access is refused (None = no expiry).
    pub expires_at: Option<i64>,
    /// Unix timestamp of the most recent download.
    pub last_downloaded_at: Option<i64>,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl Record for DownloadLink {
    // Links are looked up and claimed by token, so the token is the key.
    fn key(&self) -> String {
        self.token.clone()
    }
}

impl DownloadLink {
    /// Mint a new link for an order item.
    pub fn mint(
        order_item_id: OrderItemId,
        download_id: DownloadId,
        max_downloads: Option<i64>,
        expiration_days: Option<i64>,
    ) -> Self {
        let now = current_timestamp();
        Self {
            id: DownloadLinkId::generate(),
            order_item_id,
            download_id,
            token: generate_download_token(),
            download_count: 0,
            max_downloads,
            expires_at: expiration_days.map(|days| now + days * 86_400),
            last_downloaded_at: None,
            created_at: now,
        }
    }

    /// Check if the link is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires| current_timestamp() > expires)
            .unwrap_or(false)
    }

    /// Check if the download count is exhausted.
    pub fn limit_reached(&self) -> bool {
        self.max_downloads
            .map(|max| self.download_count >= max)
            .unwrap_or(false)
    }

    /// Check both gates, expiry first so the caller gets the more
    /// specific reason.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.is_expired() {
            return Err(CommerceError::LinkExpired);
        }
        if self.limit_reached() {
            return Err(CommerceError::DownloadLimitReached);
        }
        Ok(())
    }

    /// Check whether one more download may be consumed right now.
    pub fn claimable(&self) -> bool {
        !self.is_expired() && !self.limit_reached()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> DownloadLink {
        DownloadLink::mint(
            OrderItemId::new("oi-1"),
            DownloadId::new("dl-1"),
            Some(3),
            Some(7),
        )
    }

    #[test]
    fn test_mint_sets_expiry_from_days() {
        let link = link();
        let expires = link.expires_at.unwrap();
        assert_eq!(expires - link.created_at, 7 * 86_400);
        assert!(!link.is_expired());
    }

    #[test]
    fn test_no_expiry_when_unconfigured() {
        let link = DownloadLink::mint(
            OrderItemId::new("oi-1"),
            DownloadId::new("dl-1"),
            None,
            None,
        );
        assert!(link.expires_at.is_none());
        assert!(!link.is_expired());
        assert!(!link.limit_reached());
    }

    #[test]
    fn test_expired_link_rejected() {
        let mut link = link();
        link.expires_at = Some(0);
        assert!(matches!(link.validate(), Err(CommerceError::LinkExpired)));
    }

    #[test]
    fn test_limit_reached_rejected() {
        let mut link = link();
        link.download_count = 3;
        assert!(matches!(
            link.validate(),
            Err(CommerceError::DownloadLimitReached)
        ));
    }

    #[test]
    fn test_expiry_reported_before_limit() {
        let mut link = link();
        link.expires_at = Some(0);
        link.download_count = 3;
        // Both gates fail; expiry is the reported reason.
        assert!(matches!(link.validate(), Err(CommerceError::LinkExpired)));
    }
}
