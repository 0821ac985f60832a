//! Catalog management service

use chrono::Utc;
use validator::Validate;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
    models::book::{
        fallback_barcode, AvailabilitySplit, Book, BookQuery, BookWithAvailability, CreateBook,
        UpdateBook,
    },
    repository::Repository,
};

/// Resolve a stored cover path to its public URL. Values that are already
/// absolute URLs pass through untouched; paths are never parsed back out.
fn resolve_cover_url(storage: &StorageConfig, path: Option<String>) -> Option<String> {
    let path = path?;
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path);
    }
    Some(format!(
        "{}/{}/{}",
        storage.public_base_url.trim_end_matches('/'),
        storage.bucket,
        path.trim_start_matches('/')
    ))
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    storage: StorageConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, storage: StorageConfig) -> Self {
        Self { repository, storage }
    }

    /// Search books with pagination and availability
    pub async fn search_books(
        &self,
        query: &BookQuery,
    ) -> AppResult<(Vec<BookWithAvailability>, i64)> {
        let (mut books, total) = self.repository.books.search(query).await?;
        for book in &mut books {
            book.cover_image_url = resolve_cover_url(&self.storage, book.cover_image_url.take());
        }
        Ok((books, total))
    }

    /// Get one book with its availability split
    pub async fn get_book(&self, id: i32) -> AppResult<BookWithAvailability> {
        let mut book = self.repository.books.get_with_availability(id).await?;
        book.cover_image_url = resolve_cover_url(&self.storage, book.cover_image_url.take());
        Ok(book)
    }

    /// Get the availability split alone
    pub async fn availability(&self, id: i32) -> AppResult<AvailabilitySplit> {
        self.repository.books.availability(id).await
    }

    /// Register a new book, attributed to the creating staff account.
    ///
    /// When no barcode is given the isbn is used, and failing that a code is
    /// generated from the title and the registration instant.
    pub async fn create_book(&self, book: CreateBook, staff_id: i32) -> AppResult<Book> {
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let staff = self.repository.users.get_staff_by_id(staff_id).await?;

        let barcode = match book.barcode_code.clone().or_else(|| book.isbn.clone()) {
            Some(code) if !code.trim().is_empty() => code,
            _ => fallback_barcode(&book.title, Utc::now()),
        };

        let mut created = self
            .repository
            .books
            .create(&book, &barcode, Some(staff.staff_uuid))
            .await?;
        created.cover_image_url = resolve_cover_url(&self.storage, created.cover_image_url.take());
        Ok(created)
    }

    /// Partially update a book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut updated = self.repository.books.update(id, &book).await?;
        updated.cover_image_url = resolve_cover_url(&self.storage, updated.cover_image_url.take());
        Ok(updated)
    }

    /// Delete a book; rejected while copies are out or loan history exists
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Mark a book as favorite for the user
    pub async fn add_favorite(&self, user_id: i32, books_id: i32) -> AppResult<()> {
        // Surface a 404 rather than a foreign key violation
        self.repository.books.get_by_id(books_id).await?;
        self.repository.books.add_favorite(user_id, books_id).await
    }

    /// Unmark a favorite
    pub async fn remove_favorite(&self, user_id: i32, books_id: i32) -> AppResult<()> {
        self.repository.books.remove_favorite(user_id, books_id).await
    }

    /// List the user's favorites with availability
    pub async fn list_favorites(&self, user_id: i32) -> AppResult<Vec<BookWithAvailability>> {
        let mut books = self.repository.books.favorites_for_user(user_id).await?;
        for book in &mut books {
            book.cover_image_url = resolve_cover_url(&self.storage, book.cover_image_url.take());
        }
        Ok(books)
    }
}
