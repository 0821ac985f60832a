//! Data models for the Aklatan server

pub mod book;
pub mod circulation;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookWithAvailability};
pub use circulation::{CartEntry, CartStatus, RequestStatus, TransactionStatus};
pub use user::{Claims, Identity, Role, Staff, User};
