//! Circulation repository: the transactional core of the borrow pipeline.
//!
//! Every multi-table mutation runs inside a single Postgres transaction, and
//! every status advance is a conditional update matching the expected prior
//! status. `rows_affected == 0` on a conditional update means another caller
//! got there first, so the operation reports a conflict instead of writing
//! partial state.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::circulation::{
        ActivityDetails, BorrowRequest, CartEntry, CartItemDetails, CartStatus, IssuedLoan,
        PickupDetails, RequestDetails, RequestStatus, TransactionRow, TransactionStatus,
    },
};

/// A `borrowed` transaction whose due date has arrived, as seen by the sweep.
#[derive(Debug, Clone, Copy)]
pub struct DueLoan {
    pub transaction_id: i32,
    pub booking_id: i32,
    pub due_date: NaiveDate,
}

#[derive(Clone)]
pub struct CirculationRepository {
    pool: Pool<Postgres>,
}

impl CirculationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add a book to a user's cart as a `pending` entry.
    ///
    /// A (user, book) pair may have at most one open cart entry. A `borrowed`
    /// entry means the user already holds the copy; any other open entry means
    /// the pair is already somewhere in the pipeline.
    pub async fn add_to_cart(&self, user_id: i32, books_id: i32) -> AppResult<CartEntry> {
        let existing: Option<CartStatus> = sqlx::query_scalar(
            r#"
            SELECT status FROM booking_cart
            WHERE user_id = $1 AND books_id = $2 AND status <> 'returned'
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(CartStatus::Borrowed) => {
                return Err(AppError::AlreadyInCart(format!(
                    "book {} is already borrowed by user {}",
                    books_id, user_id
                )));
            }
            Some(_) => {
                return Err(AppError::AlreadyRequested(format!(
                    "book {} is already in the cart of user {}",
                    books_id, user_id
                )));
            }
            None => {}
        }

        // The partial unique index on open (user_id, books_id) pairs closes
        // the race between the check above and this insert.
        let entry = sqlx::query_as::<_, CartEntry>(
            r#"
            INSERT INTO booking_cart (user_id, books_id, status)
            VALUES ($1, $2, 'pending')
            ON CONFLICT (user_id, books_id) WHERE status <> 'returned' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::AlreadyRequested(format!(
                "book {} is already in the cart of user {}",
                books_id, user_id
            ))
        })?;

        Ok(entry)
    }

    /// Remove a pair from the cart before pickup.
    ///
    /// Only `pending` and `approval` entries can be withdrawn. The linked
    /// not-yet-done request and the pair's pending activity marker go with the
    /// cart row, so a later add starts from a clean slate.
    pub async fn remove_from_cart(&self, user_id: i32, books_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT booking_id, status FROM booking_cart
            WHERE user_id = $1 AND books_id = $2 AND status <> 'returned'
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No cart entry for book {} and user {}",
                books_id, user_id
            ))
        })?;

        let booking_id: i32 = row.get("booking_id");
        let status: CartStatus = row.get("status");

        if !status.is_removable() {
            return Err(AppError::NotRemovable(format!(
                "cart entry for book {} has status '{}'",
                books_id, status
            )));
        }

        sqlx::query(
            "DELETE FROM booking_requests WHERE user_id = $1 AND books_id = $2 AND status <> 'done'",
        )
        .bind(user_id)
        .bind(books_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM activity WHERE user_id = $1 AND books_id = $2 AND status = 'pending'",
        )
        .bind(user_id)
        .bind(books_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM booking_cart WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Get a user's open cart entries joined with book display fields.
    pub async fn cart_for_user(&self, user_id: i32) -> AppResult<Vec<CartItemDetails>> {
        let items = sqlx::query_as::<_, CartItemDetails>(
            r#"
            SELECT c.booking_id, c.books_id, c.status, b.title, b.author,
                   b.cover_image_url, c.borrow_date, c.borrow_return_date, c.created_at
            FROM booking_cart c
            JOIN books b ON b.books_id = c.books_id
            WHERE c.user_id = $1 AND c.status <> 'returned'
            ORDER BY c.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    // =========================================================================
    // Borrow requests
    // =========================================================================

    /// Escalate a `pending` cart entry into a borrow request.
    ///
    /// Both pathways create a `waiting` request and a `pending` activity
    /// marker; a direct borrow advances the cart straight to `confirm`,
    /// skipping the staff approval queue.
    pub async fn create_request(
        &self,
        user_id: i32,
        books_id: i32,
        direct: bool,
    ) -> AppResult<BorrowRequest> {
        let target = if direct {
            CartStatus::Confirm
        } else {
            CartStatus::Approval
        };

        let mut tx = self.pool.begin().await?;

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM booking_requests
                WHERE user_id = $1 AND books_id = $2 AND status <> 'done'
            )
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .fetch_one(&mut *tx)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateRequest(format!(
                "an open borrow request for book {} already exists",
                books_id
            )));
        }

        let advanced = sqlx::query(
            r#"
            UPDATE booking_cart
            SET status = $3, updated_at = NOW()
            WHERE user_id = $1 AND books_id = $2 AND status = 'pending'
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .bind(target)
        .execute(&mut *tx)
        .await?;

        if advanced.rows_affected() == 0 {
            return Err(AppError::InvalidTransition(format!(
                "no pending cart entry for book {} and user {}",
                books_id, user_id
            )));
        }

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO booking_requests (user_id, books_id, status)
            VALUES ($1, $2, 'waiting')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO activity (user_id, books_id, status) VALUES ($1, $2, 'pending')")
            .bind(user_id)
            .bind(books_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Approve a waiting request and flip the pair's activity marker.
    pub async fn approve_request(&self, request_id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE booking_requests
            SET status = 'approved'
            WHERE request_id = $1 AND status = 'waiting'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;

        let request = match request {
            Some(r) => r,
            None => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM booking_requests WHERE request_id = $1)",
                )
                .bind(request_id)
                .fetch_one(&mut *tx)
                .await?;

                return Err(if exists {
                    AppError::InvalidTransition(format!("request {} is not waiting", request_id))
                } else {
                    AppError::NotFound(format!("Request with id {} not found", request_id))
                });
            }
        };

        sqlx::query(
            r#"
            UPDATE activity
            SET status = 'borrowed'
            WHERE user_id = $1 AND books_id = $2 AND status = 'pending'
            "#,
        )
        .bind(request.user_id)
        .bind(request.books_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Get all waiting requests joined with requester and book, oldest first.
    pub async fn waiting_requests(&self) -> AppResult<Vec<RequestDetails>> {
        let requests = sqlx::query_as::<_, RequestDetails>(
            r#"
            SELECT r.request_id, r.user_id, r.books_id, r.status,
                   u.full_name, b.title, r.requested_at
            FROM booking_requests r
            JOIN users u ON u.user_id = r.user_id
            JOIN books b ON b.books_id = r.books_id
            WHERE r.status = 'waiting'
            ORDER BY r.requested_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    // =========================================================================
    // Pickup
    // =========================================================================

    /// Get a user's pickup-eligible entries, oldest first.
    ///
    /// Eligible means `confirm` (direct borrow) or `approval` with the linked
    /// request already approved.
    pub async fn pickups_for_user(&self, user_id: i32) -> AppResult<Vec<PickupDetails>> {
        let pickups = sqlx::query_as::<_, PickupDetails>(
            r#"
            SELECT c.booking_id, c.books_id, b.title, b.author, b.cover_image_url,
                   r.request_id, c.created_at
            FROM booking_cart c
            JOIN books b ON b.books_id = c.books_id
            LEFT JOIN booking_requests r
                   ON r.user_id = c.user_id AND r.books_id = c.books_id AND r.status <> 'done'
            WHERE c.user_id = $1
              AND (c.status = 'confirm' OR (c.status = 'approval' AND r.status = 'approved'))
            ORDER BY c.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pickups)
    }

    /// Issue the loan: the one operation that touches all four tables.
    ///
    /// Inside a single transaction: advance the cart entry to `borrowed` with
    /// its borrow/due dates, decrement the book's copy count, record the
    /// transaction, and close the linked request. The decrement is conditional
    /// on `copies > 0`, so two concurrent pickups of the last copy serialize
    /// on the book row and exactly one succeeds.
    pub async fn confirm_pickup(
        &self,
        user_id: i32,
        books_id: i32,
        borrow_date: NaiveDate,
        due_date: NaiveDate,
    ) -> AppResult<IssuedLoan> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT c.booking_id, c.status, r.request_id, r.status AS request_status
            FROM booking_cart c
            LEFT JOIN booking_requests r
                   ON r.user_id = c.user_id AND r.books_id = c.books_id AND r.status <> 'done'
            WHERE c.user_id = $1 AND c.books_id = $2 AND c.status <> 'returned'
            "#,
        )
        .bind(user_id)
        .bind(books_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No cart entry for book {} and user {}",
                books_id, user_id
            ))
        })?;

        let booking_id: i32 = row.get("booking_id");
        let status: CartStatus = row.get("status");
        let request_id: Option<i32> = row.get("request_id");
        let request_status: Option<RequestStatus> = row.get("request_status");

        if !status.pickup_eligible(request_status) {
            return Err(AppError::InvalidTransition(format!(
                "cart entry for book {} has status '{}' and is not ready for pickup",
                books_id, status
            )));
        }

        let decremented = sqlx::query(
            "UPDATE books SET copies = copies - 1 WHERE books_id = $1 AND copies > 0",
        )
        .bind(books_id)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            return Err(AppError::NoCopiesAvailable(format!(
                "no copies of book {} left",
                books_id
            )));
        }

        let advanced = sqlx::query(
            r#"
            UPDATE booking_cart
            SET status = 'borrowed', borrow_date = $2, borrow_return_date = $3,
                updated_at = NOW()
            WHERE booking_id = $1 AND status = $4
            "#,
        )
        .bind(booking_id)
        .bind(borrow_date)
        .bind(due_date)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        if advanced.rows_affected() == 0 {
            return Err(AppError::InvalidTransition(format!(
                "cart entry {} changed state during pickup",
                booking_id
            )));
        }

        let transaction_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO transactions (user_id, booking_id, status)
            VALUES ($1, $2, 'borrowed')
            RETURNING transaction_id
            "#,
        )
        .bind(user_id)
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(request_id) = request_id {
            sqlx::query(
                "UPDATE booking_requests SET status = 'done' WHERE request_id = $1 AND status <> 'done'",
            )
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(IssuedLoan {
            booking_id,
            transaction_id,
            books_id,
            borrow_date,
            due_date,
        })
    }

    /// Get a user's active loans (borrowed or overdue) with book details.
    pub async fn loans_for_user(&self, user_id: i32) -> AppResult<Vec<CartItemDetails>> {
        let loans = sqlx::query_as::<_, CartItemDetails>(
            r#"
            SELECT c.booking_id, c.books_id, c.status, b.title, b.author,
                   b.cover_image_url, c.borrow_date, c.borrow_return_date, c.created_at
            FROM booking_cart c
            JOIN books b ON b.books_id = c.books_id
            WHERE c.user_id = $1 AND c.status IN ('borrowed', 'overdue')
            ORDER BY c.borrow_return_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    // =========================================================================
    // Feeds
    // =========================================================================

    /// Get the full transaction feed joined with user and book, newest first.
    pub async fn transactions_feed(&self) -> AppResult<Vec<TransactionRow>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT t.transaction_id, t.booking_id, t.user_id, u.full_name, b.title,
                   t.status, c.borrow_date, c.borrow_return_date, t.created_at
            FROM transactions t
            JOIN booking_cart c ON c.booking_id = t.booking_id
            JOIN users u ON u.user_id = t.user_id
            JOIN books b ON b.books_id = c.books_id
            ORDER BY t.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Get activity entries recorded since the given instant, newest first.
    pub async fn activity_since(&self, since: DateTime<Utc>) -> AppResult<Vec<ActivityDetails>> {
        let entries = sqlx::query_as::<_, ActivityDetails>(
            r#"
            SELECT a.activity_id, u.full_name, b.title, a.status, a.created_at
            FROM activity a
            JOIN users u ON u.user_id = a.user_id
            JOIN books b ON b.books_id = a.books_id
            WHERE a.created_at >= $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    // =========================================================================
    // Sweep
    // =========================================================================

    /// Scan for `borrowed` transactions whose due date has arrived.
    pub async fn due_loans(&self, today: NaiveDate) -> AppResult<Vec<DueLoan>> {
        let rows = sqlx::query(
            r#"
            SELECT t.transaction_id, t.booking_id, c.borrow_return_date
            FROM transactions t
            JOIN booking_cart c ON c.booking_id = t.booking_id
            WHERE t.status = 'borrowed'
              AND c.borrow_return_date IS NOT NULL
              AND c.borrow_return_date <= $1
            ORDER BY c.borrow_return_date
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DueLoan {
                transaction_id: row.get("transaction_id"),
                booking_id: row.get("booking_id"),
                due_date: row.get("borrow_return_date"),
            })
            .collect())
    }

    /// Close one loan: flip the transaction and mirror onto the cart entry.
    ///
    /// Both updates are conditional on the current `borrowed` status, so a
    /// loan already closed by a concurrent pass reports `false` and nothing
    /// is written twice.
    pub async fn close_loan(
        &self,
        transaction_id: i32,
        booking_id: i32,
        next: TransactionStatus,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $2, updated_at = NOW()
            WHERE transaction_id = $1 AND status = 'borrowed'
            "#,
        )
        .bind(transaction_id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            return Ok(false);
        }

        let mirrored = match next {
            TransactionStatus::Returned => CartStatus::Returned,
            TransactionStatus::Overdue => CartStatus::Overdue,
            TransactionStatus::Borrowed => {
                return Err(AppError::InvalidTransition(
                    "a loan cannot be closed back to 'borrowed'".to_string(),
                ));
            }
        };

        sqlx::query(
            r#"
            UPDATE booking_cart
            SET status = $2, updated_at = NOW()
            WHERE booking_id = $1 AND status = 'borrowed'
            "#,
        )
        .bind(booking_id)
        .bind(mirrored)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
