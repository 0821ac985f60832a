//! Book (catalog entry) model and related types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Full book model (DB + API).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub books_id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    /// Copies currently on the shelf; decremented at issuance, never negative.
    pub copies: i32,
    pub description: Option<String>,
    pub barcode_code: Option<String>,
    pub cover_image_url: Option<String>,
    pub staff_uuid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Book list/detail representation carrying the derived availability split.
/// `available` is the stored shelf count; `borrowed` is counted from open
/// borrowed cart entries; `total` is their sum.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookWithAvailability {
    pub books_id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub barcode_code: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub available: i32,
    pub borrowed: i64,
    pub total: i64,
}

/// Availability split alone, for the per-book availability endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AvailabilitySplit {
    pub books_id: i32,
    pub available: i32,
    pub borrowed: i64,
    pub total: i64,
}

/// Book search/pagination query parameters.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive substring matched against title, author, genre and isbn.
    pub search: Option<String>,
    pub genre: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request (staff only).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Copies must not be negative"))]
    pub copies: i32,
    pub description: Option<String>,
    /// Explicit barcode; when absent the isbn is used, then a generated fallback.
    pub barcode_code: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Update book request (staff only, partial).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Copies must not be negative"))]
    pub copies: Option<i32>,
    pub description: Option<String>,
    pub barcode_code: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Fallback barcode for books registered without isbn or explicit code:
/// first three alphanumeric characters of the title uppercased (or `BK`),
/// a dash, and the current unix-epoch milliseconds.
pub fn fallback_barcode(title: &str, now: DateTime<Utc>) -> String {
    let prefix: String = title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let prefix = if prefix.is_empty() { "BK".to_string() } else { prefix };
    format!("{}-{}", prefix, now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fallback_barcode_uses_title_prefix_and_millis() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(fallback_barcode("Dune", now), "DUN-1704067200000");
    }

    #[test]
    fn fallback_barcode_skips_non_alphanumerics() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(fallback_barcode("  a b!c", now), "ABC-1704067200000");
    }

    #[test]
    fn fallback_barcode_defaults_empty_titles() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(fallback_barcode("", now), "BK-1704067200000");
        assert_eq!(fallback_barcode("!!!", now), "BK-1704067200000");
    }
}
