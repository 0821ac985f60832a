//! Circulation lifecycle service
//!
//! Thin orchestration over the circulation repository: date math and loan
//! period validation happen here, every multi-table write stays inside the
//! repository's transactions.

use chrono::{Duration, Utc};

use crate::{
    error::{AppError, AppResult},
    models::circulation::{
        civil_today, due_date_for, ActivityDetails, BorrowRequest, CartEntry, CartItemDetails,
        IssuedLoan, PickupDetails, RequestDetails, SweepOutcome, TransactionDetails,
        TransactionStatus, MAX_LOAN_DAYS, MIN_LOAN_DAYS,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
}

impl CirculationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add a book to the user's cart
    pub async fn add_to_cart(&self, user_id: i32, books_id: i32) -> AppResult<CartEntry> {
        // Verify book exists
        self.repository.books.get_by_id(books_id).await?;
        self.repository.circulation.add_to_cart(user_id, books_id).await
    }

    /// Withdraw a not-yet-confirmed entry from the cart
    pub async fn remove_from_cart(&self, user_id: i32, books_id: i32) -> AppResult<()> {
        self.repository.circulation.remove_from_cart(user_id, books_id).await
    }

    /// Get the user's open cart entries
    pub async fn cart(&self, user_id: i32) -> AppResult<Vec<CartItemDetails>> {
        self.repository.circulation.cart_for_user(user_id).await
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Escalate a pending cart entry into the staff approval queue
    pub async fn request_borrow(&self, user_id: i32, books_id: i32) -> AppResult<BorrowRequest> {
        self.repository.circulation.create_request(user_id, books_id, false).await
    }

    /// Escalate a pending cart entry straight to pickup, skipping approval
    pub async fn direct_borrow(&self, user_id: i32, books_id: i32) -> AppResult<BorrowRequest> {
        self.repository.circulation.create_request(user_id, books_id, true).await
    }

    /// Get the staff approval queue, oldest first
    pub async fn waiting_requests(&self) -> AppResult<Vec<RequestDetails>> {
        self.repository.circulation.waiting_requests().await
    }

    /// Approve a waiting request
    pub async fn approve_request(&self, request_id: i32) -> AppResult<BorrowRequest> {
        self.repository.circulation.approve_request(request_id).await
    }

    // =========================================================================
    // Pickup and loans
    // =========================================================================

    /// Get the user's pickup-eligible entries
    pub async fn pickups(&self, user_id: i32) -> AppResult<Vec<PickupDetails>> {
        self.repository.circulation.pickups_for_user(user_id).await
    }

    /// Issue a loan for a pickup-eligible entry.
    ///
    /// The borrow date is today's civil date; the due date is `days` later,
    /// where `days` is user-chosen within the allowed loan period.
    pub async fn confirm_pickup(
        &self,
        user_id: i32,
        books_id: i32,
        days: u32,
    ) -> AppResult<IssuedLoan> {
        if !(MIN_LOAN_DAYS..=MAX_LOAN_DAYS).contains(&days) {
            return Err(AppError::Validation(format!(
                "loan period must be between {} and {} days",
                MIN_LOAN_DAYS, MAX_LOAN_DAYS
            )));
        }

        let borrow_date = civil_today();
        let due_date = due_date_for(borrow_date, days).ok_or_else(|| {
            AppError::Internal(format!("due date overflow for {} + {} days", borrow_date, days))
        })?;

        self.repository
            .circulation
            .confirm_pickup(user_id, books_id, borrow_date, due_date)
            .await
    }

    /// Get the user's active loans (borrowed or overdue)
    pub async fn loans(&self, user_id: i32) -> AppResult<Vec<CartItemDetails>> {
        self.repository.circulation.loans_for_user(user_id).await
    }

    // =========================================================================
    // Staff feeds
    // =========================================================================

    /// Get the transaction feed with effective statuses derived for today
    pub async fn transactions(&self) -> AppResult<Vec<TransactionDetails>> {
        let today = civil_today();
        let rows = self.repository.circulation.transactions_feed().await?;
        Ok(rows.into_iter().map(|row| row.into_details(today)).collect())
    }

    /// Get activity entries of the trailing 24 hours, newest first
    pub async fn recent_activity(&self) -> AppResult<Vec<ActivityDetails>> {
        let since = Utc::now() - Duration::hours(24);
        self.repository.circulation.activity_since(since).await
    }

    // =========================================================================
    // Sweep
    // =========================================================================

    /// Run one overdue/returned sweep pass.
    ///
    /// Loans due before today are marked overdue, loans due exactly today are
    /// marked returned, on both the transaction and its cart entry. Failures
    /// on individual loans are logged and skipped so one bad record cannot
    /// stall the rest of the pass.
    pub async fn sweep(&self) -> AppResult<SweepOutcome> {
        let today = civil_today();
        let due = self.repository.circulation.due_loans(today).await?;

        let mut outcome = SweepOutcome::default();
        for loan in due {
            let next = if loan.due_date < today {
                TransactionStatus::Overdue
            } else {
                TransactionStatus::Returned
            };

            match self
                .repository
                .circulation
                .close_loan(loan.transaction_id, loan.booking_id, next)
                .await
            {
                Ok(true) => match next {
                    TransactionStatus::Overdue => outcome.marked_overdue += 1,
                    _ => outcome.marked_returned += 1,
                },
                Ok(false) => {} // already closed by a concurrent pass
                Err(e) => {
                    tracing::warn!(
                        "Sweep failed for transaction {}: {}",
                        loan.transaction_id,
                        e
                    );
                    outcome.failed += 1;
                }
            }
        }

        if outcome.marked_overdue > 0 || outcome.marked_returned > 0 || outcome.failed > 0 {
            tracing::info!(
                "Sweep pass: {} overdue, {} returned, {} failed",
                outcome.marked_overdue,
                outcome.marked_returned,
                outcome.failed
            );
        }

        Ok(outcome)
    }
}
