//! Books repository for catalog and favorites database operations

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{AvailabilitySplit, Book, BookQuery, BookWithAvailability, CreateBook, UpdateBook},
};

/// Availability subquery shared by every listing: a copy is out while its
/// cart entry is `borrowed` or `overdue`.
const BORROWED_COUNT: &str = r#"
    COALESCE((
        SELECT COUNT(*) FROM booking_cart c
        WHERE c.books_id = b.books_id AND c.status IN ('borrowed', 'overdue')
    ), 0)
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE books_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by ID with its derived availability split
    pub async fn get_with_availability(&self, id: i32) -> AppResult<BookWithAvailability> {
        let query = format!(
            r#"
            SELECT b.books_id, b.title, b.author, b.genre, b.isbn, b.publisher,
                   b.published_date, b.description, b.barcode_code, b.cover_image_url,
                   b.created_at,
                   b.copies AS available,
                   {borrowed} AS borrowed,
                   b.copies + {borrowed} AS total
            FROM books b
            WHERE b.books_id = $1
            "#,
            borrowed = BORROWED_COUNT
        );

        sqlx::query_as::<_, BookWithAvailability>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get the availability split alone for one book
    pub async fn availability(&self, id: i32) -> AppResult<AvailabilitySplit> {
        let query = format!(
            r#"
            SELECT b.books_id,
                   b.copies AS available,
                   {borrowed} AS borrowed,
                   b.copies + {borrowed} AS total
            FROM books b
            WHERE b.books_id = $1
            "#,
            borrowed = BORROWED_COUNT
        );

        sqlx::query_as::<_, AvailabilitySplit>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// Search books with pagination, ordered by title.
    ///
    /// The search term matches case-insensitively against title, author,
    /// genre and isbn.
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookWithAvailability>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let pattern = query
            .search
            .as_ref()
            .map(|term| format!("%{}%", term.to_lowercase()));

        let where_clause = r#"
            ($1::text IS NULL
             OR LOWER(b.title) LIKE $1
             OR LOWER(b.author) LIKE $1
             OR LOWER(COALESCE(b.genre, '')) LIKE $1
             OR LOWER(COALESCE(b.isbn, '')) LIKE $1)
            AND ($2::text IS NULL OR LOWER(COALESCE(b.genre, '')) = LOWER($2))
        "#;

        let count_query = format!("SELECT COUNT(*) FROM books b WHERE {}", where_clause);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&pattern)
            .bind(&query.genre)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            r#"
            SELECT b.books_id, b.title, b.author, b.genre, b.isbn, b.publisher,
                   b.published_date, b.description, b.barcode_code, b.cover_image_url,
                   b.created_at,
                   b.copies AS available,
                   {borrowed} AS borrowed,
                   b.copies + {borrowed} AS total
            FROM books b
            WHERE {where_clause}
            ORDER BY b.title
            LIMIT $3 OFFSET $4
            "#,
            borrowed = BORROWED_COUNT,
            where_clause = where_clause
        );

        let books = sqlx::query_as::<_, BookWithAvailability>(&select_query)
            .bind(&pattern)
            .bind(&query.genre)
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Create a new book
    pub async fn create(
        &self,
        book: &CreateBook,
        barcode_code: &str,
        staff_uuid: Option<Uuid>,
    ) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, genre, isbn, publisher, published_date,
                copies, description, barcode_code, cover_image_url, staff_uuid
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.published_date)
        .bind(book.copies)
        .bind(&book.description)
        .bind(barcode_code)
        .bind(&book.cover_image_url)
        .bind(staff_uuid)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Partially update a book: absent fields keep their stored values
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($1::text, title),
                author = COALESCE($2::text, author),
                genre = COALESCE($3::text, genre),
                isbn = COALESCE($4::text, isbn),
                publisher = COALESCE($5::text, publisher),
                published_date = COALESCE($6::date, published_date),
                copies = COALESCE($7::integer, copies),
                description = COALESCE($8::text, description),
                barcode_code = COALESCE($9::text, barcode_code),
                cover_image_url = COALESCE($10::text, cover_image_url)
            WHERE books_id = $11
            RETURNING *
            "#,
        )
        .bind(book.title.as_deref())
        .bind(book.author.as_deref())
        .bind(book.genre.as_deref())
        .bind(book.isbn.as_deref())
        .bind(book.publisher.as_deref())
        .bind(book.published_date)
        .bind(book.copies)
        .bind(book.description.as_deref())
        .bind(book.barcode_code.as_deref())
        .bind(book.cover_image_url.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Delete a book and its pipeline leftovers.
    ///
    /// Rejected while copies are out (borrowed or overdue cart entries) and
    /// while any loan history exists, since transactions are never deleted.
    /// Favorites, activity markers, open requests and not-yet-borrowed cart
    /// entries go with the book.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM booking_cart
            WHERE books_id = $1 AND status IN ('borrowed', 'overdue')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(AppError::Conflict(format!(
                "book {} has {} active loan(s)",
                id, active
            )));
        }

        let has_history: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM transactions t
                JOIN booking_cart c ON c.booking_id = t.booking_id
                WHERE c.books_id = $1
            )
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_history {
            return Err(AppError::Conflict(format!(
                "book {} has loan history and cannot be deleted",
                id
            )));
        }

        sqlx::query("DELETE FROM favorites WHERE books_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM activity WHERE books_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM booking_requests WHERE books_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM booking_cart WHERE books_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM books WHERE books_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // FAVORITES
    // =========================================================================

    /// Mark a book as a user's favorite; repeating is a no-op
    pub async fn add_favorite(&self, user_id: i32, books_id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, books_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, books_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Unmark a favorite; absent pairs are a no-op
    pub async fn remove_favorite(&self, user_id: i32, books_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND books_id = $2")
            .bind(user_id)
            .bind(books_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// List a user's favorited books with availability, newest favorite first
    pub async fn favorites_for_user(&self, user_id: i32) -> AppResult<Vec<BookWithAvailability>> {
        let query = format!(
            r#"
            SELECT b.books_id, b.title, b.author, b.genre, b.isbn, b.publisher,
                   b.published_date, b.description, b.barcode_code, b.cover_image_url,
                   b.created_at,
                   b.copies AS available,
                   {borrowed} AS borrowed,
                   b.copies + {borrowed} AS total
            FROM favorites f
            JOIN books b ON b.books_id = f.books_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
            borrowed = BORROWED_COUNT
        );

        let books = sqlx::query_as::<_, BookWithAvailability>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }
}
