//! Invoice issuing.
//!
//! An invoice is rendered once into memory. The same bytes are then written
//! to `<invoices_dir>/invoice-<order id>.pdf` on a detached task and returned
//! to the caller, so the stored copy and the served copy are always identical
//! and neither sink can fail the other.

mod pdf;

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use thiserror::Error;
use tokio::task::JoinHandle;

use bazaar_core::OrderId;

use crate::db::Store;
use crate::models::CurrentUser;

use super::{OrderError, OrderService};

pub use pdf::generate_invoice;

/// Errors that can occur while issuing an invoice.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Looking up or authorising the order failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The PDF could not be produced.
    #[error("failed to render invoice: {0}")]
    Render(String),
}

/// A rendered invoice.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub order_id: OrderId,
    pub file_name: String,
    pub bytes: Bytes,
}

/// An invoice handed to the caller while its disk copy is being written.
#[derive(Debug)]
pub struct IssuedInvoice {
    pub invoice: Invoice,
    /// Completes once the disk copy is written (or the failure logged).
    pub persisted: JoinHandle<()>,
}

/// File name of the stored invoice for `order_id`.
#[must_use]
pub fn invoice_file_name(order_id: OrderId) -> String {
    format!("invoice-{order_id}.pdf")
}

/// Invoice service.
pub struct InvoiceService<'a> {
    orders: OrderService<'a>,
    invoices_dir: &'a Path,
}

impl<'a> InvoiceService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, invoices_dir: &'a Path) -> Self {
        Self {
            orders: OrderService::new(store),
            invoices_dir,
        }
    }

    /// Render the invoice of an order the requester owns and start storing it.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceError::Order` with `OrderError::NotFound` or
    /// `OrderError::Forbidden` when the order is absent or not the
    /// requester's, and `InvoiceError::Render` if PDF generation fails.
    /// Disk write failures are logged, never returned.
    pub async fn issue(
        &self,
        order_id: OrderId,
        requester: &CurrentUser,
    ) -> Result<IssuedInvoice, InvoiceError> {
        let order = self.orders.get_order(order_id, requester).await?;
        let bytes = Bytes::from(generate_invoice(&order)?);

        let file_name = invoice_file_name(order.id);
        let path = self.invoices_dir.join(&file_name);
        let persisted = tokio::spawn(persist(path, bytes.clone()));

        Ok(IssuedInvoice {
            invoice: Invoice {
                order_id: order.id,
                file_name,
                bytes,
            },
            persisted,
        })
    }
}

/// A temporary name next to `path`, unique to one write.
fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!("pdf.{}.tmp", uuid::Uuid::new_v4()))
}

/// Write `bytes` to `path` via a temporary file and a rename.
async fn persist(path: PathBuf, bytes: Bytes) {
    let tmp = temp_path(&path);

    let result = async {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await
    }
    .await;

    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Invoice stored"),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to store invoice");
            let _ = tokio::fs::remove_file(&tmp).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::{CartService, testing};

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("bazaar-invoices-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_stored_copy_matches_response() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "buyer@example.com").await;
        let mug = testing::product(&store, &user, "Mug", "4.50").await;
        CartService::new(&store, 99)
            .add_to_cart(&user, mug.id)
            .await
            .unwrap();
        let order_id = OrderService::new(&store).place_order(&user).await.unwrap();

        let dir = scratch_dir();
        let issued = InvoiceService::new(&store, &dir)
            .issue(order_id, &user)
            .await
            .unwrap();
        issued.persisted.await.unwrap();

        let stored = tokio::fs::read(dir.join(format!("invoice-{order_id}.pdf")))
            .await
            .unwrap();
        assert_eq!(stored, issued.invoice.bytes.to_vec());
        assert_eq!(issued.invoice.file_name, format!("invoice-{order_id}.pdf"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_temp_paths_are_unique() {
        let path = Path::new("/invoices/invoice-7.pdf");
        let first = temp_path(path);
        let second = temp_path(path);

        assert_ne!(first, second);
        assert_eq!(first.parent(), path.parent());
        assert!(first.to_string_lossy().ends_with(".tmp"));
    }

    #[tokio::test]
    async fn test_overlapping_issues_store_one_complete_copy() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "buyer@example.com").await;
        let mug = testing::product(&store, &user, "Mug", "4.50").await;
        CartService::new(&store, 99)
            .add_to_cart(&user, mug.id)
            .await
            .unwrap();
        let order_id = OrderService::new(&store).place_order(&user).await.unwrap();

        let dir = scratch_dir();
        let service = InvoiceService::new(&store, &dir);
        let (first, second) = tokio::join!(
            service.issue(order_id, &user),
            service.issue(order_id, &user)
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        first.persisted.await.unwrap();
        second.persisted.await.unwrap();

        let stored = tokio::fs::read(dir.join(invoice_file_name(order_id)))
            .await
            .unwrap();
        assert_eq!(stored, first.invoice.bytes.to_vec());

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![invoice_file_name(order_id)]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_owner_gets_forbidden_and_nothing_is_written() {
        let store = MemoryStore::new();
        let owner = testing::user(&store, "buyer@example.com").await;
        let other = testing::user(&store, "snoop@example.com").await;
        let mug = testing::product(&store, &owner, "Mug", "4.50").await;
        CartService::new(&store, 99)
            .add_to_cart(&owner, mug.id)
            .await
            .unwrap();
        let order_id = OrderService::new(&store).place_order(&owner).await.unwrap();

        let dir = scratch_dir();
        let err = InvoiceService::new(&store, &dir)
            .issue(order_id, &other)
            .await
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Order(OrderError::Forbidden)));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_unwritable_dir_still_returns_invoice() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "buyer@example.com").await;
        let mug = testing::product(&store, &user, "Mug", "4.50").await;
        CartService::new(&store, 99)
            .add_to_cart(&user, mug.id)
            .await
            .unwrap();
        let order_id = OrderService::new(&store).place_order(&user).await.unwrap();

        // A regular file where the directory should be.
        let blocker = scratch_dir();
        tokio::fs::write(&blocker, b"not a dir").await.unwrap();

        let issued = InvoiceService::new(&store, &blocker)
            .issue(order_id, &user)
            .await
            .unwrap();
        issued.persisted.await.unwrap();
        assert!(issued.invoice.bytes.starts_with(b"%PDF"));

        tokio::fs::remove_file(&blocker).await.unwrap();
    }
}
