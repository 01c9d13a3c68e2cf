//! Business logic services for storefront.
//!
//! Services borrow the [`Store`](crate::db::Store) (and, where needed, the
//! mailer or a directory) for the duration of one request. They take the
//! resolved [`CurrentUser`](crate::models::CurrentUser) by reference and never
//! read session state themselves.
//!
//! # Services
//!
//! - `auth` - Signup, login, password reset
//! - `cart` - Cart operations reconciled against live products
//! - `catalog` - Paginated browsing and per-owner product management
//! - `email` - Mail delivery (SMTP or log)
//! - `invoice` - PDF invoices for placed orders
//! - `orders` - Checkout and order history
//! - `uploads` - Product image storage

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod invoice;
pub mod orders;
pub mod uploads;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService, CartView};
pub use catalog::{CatalogError, CatalogService, ProductInput};
pub use email::{EmailError, LogMailer, Mailer, MemoryMailer, SentMail, SmtpMailer};
pub use invoice::{Invoice, InvoiceError, InvoiceService, IssuedInvoice};
pub use orders::{OrderError, OrderService};
pub use uploads::{ImageStore, ImageUpload, UploadError};
