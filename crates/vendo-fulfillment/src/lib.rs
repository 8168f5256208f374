//! Digital fulfillment for Vendo.
//!
//! Issues secure, rate-limited, time-bounded download links for digital
//! order items after payment completion. Tokens are fixed-length
//! lowercase hex bearer credentials; knowing one grants access bounded
//! only by the link's expiry and count limit.
//!
//! The check-and-increment on the download counter is a single
//! conditional update, so concurrent requests for the same token can
//! never push `download_count` past `max_downloads`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vendo_fulfillment::prelude::*;
//!
//! let service = FulfillmentService::new(Arc::new(MemoryObjectStore::new()));
//! let download = service.create_digital_download(NewDigitalDownload {
//!     product_id,
//!     file_name: "guide.pdf".into(),
//!     content_type: "application/pdf".into(),
//!     download_limit: Some(3),
//!     expiration_days: Some(7),
//! })?;
//! service.upload_file(&download.id, bytes).await?;
//!
//! let link = service.create_download_link(&order_item_id, &download.id, None, None)?;
//! let file = service.get_download_file(&link.token).await?;
//! ```

pub mod download;
pub mod object_store;
pub mod service;
pub mod token;

pub use download::{DigitalDownload, DownloadLink};
pub use object_store::{MemoryObjectStore, ObjectStore, StoredObject};
pub use service::{FileDelivery, FulfillmentService, NewDigitalDownload};
pub use token::{generate_download_token, TOKEN_LEN};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::download::{DigitalDownload, DownloadLink};
    pub use crate::object_store::{MemoryObjectStore, ObjectStore, StoredObject};
    pub use crate::service::{FileDelivery, FulfillmentService, NewDigitalDownload};
    pub use crate::token::{generate_download_token, TOKEN_LEN};
}
