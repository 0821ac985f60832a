//! Circulation models and the borrowing state machine.
//!
//! All status transitions in the system go through the tables defined here;
//! repository code only ever applies an advance that `can_advance_to` allows,
//! as a conditional update matching the expected prior status.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Minimum loan length in days, chosen by the user at pickup.
pub const MIN_LOAN_DAYS: u32 = 1;
/// Maximum loan length in days.
pub const MAX_LOAN_DAYS: u32 = 6;

/// Fixed civil-calendar offset for all circulation date math (UTC+8).
/// Borrow, due and overdue comparisons all use this clock so that results
/// do not drift with the timezone of whichever client or host triggers them.
const CIVIL_OFFSET_HOURS: i32 = 8;

fn civil_offset() -> FixedOffset {
    FixedOffset::east_opt(CIVIL_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix())
}

/// Civil date of an instant at the library's fixed UTC+8 offset.
pub fn civil_date_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&civil_offset()).date_naive()
}

/// Today's civil date at the library's fixed UTC+8 offset.
pub fn civil_today() -> NaiveDate {
    civil_date_of(Utc::now())
}

/// Due date for a loan issued on `borrow_date` running `days` days.
/// `None` only on calendar overflow, which validated day counts never hit.
pub fn due_date_for(borrow_date: NaiveDate, days: u32) -> Option<NaiveDate> {
    borrow_date.checked_add_days(Days::new(days as u64))
}

// =============================================================================
// Status enums
// =============================================================================

/// Cart-side pipeline status of a (user, book) pair.
///
/// `pending` entries sit in the cart; `approval` waits on staff; `confirm`
/// is immediately pickup-eligible (the direct-borrow path); `borrowed`
/// carries dates; `returned` and `overdue` are terminal. An `approval` entry
/// becomes pickup-eligible once its linked request is approved, without its
/// own status changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Pending,
    Approval,
    Confirm,
    Borrowed,
    Returned,
    Overdue,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Pending => "pending",
            CartStatus::Approval => "approval",
            CartStatus::Confirm => "confirm",
            CartStatus::Borrowed => "borrowed",
            CartStatus::Returned => "returned",
            CartStatus::Overdue => "overdue",
        }
    }

    /// Transition table of the circulation pipeline. Every status advance the
    /// system performs is one of these edges; anything else is rejected.
    pub fn can_advance_to(self, next: CartStatus) -> bool {
        use CartStatus::*;
        matches!(
            (self, next),
            (Pending, Approval)      // request borrow
                | (Pending, Confirm) // direct borrow
                | (Approval, Borrowed)
                | (Confirm, Borrowed)
                | (Borrowed, Returned)
                | (Borrowed, Overdue)
        )
    }

    /// Whether the entry still occupies the (user, book) pair. Closed loans
    /// (`returned`) are history and do not block a new cart entry.
    pub fn is_open(self) -> bool {
        !matches!(self, CartStatus::Returned)
    }

    /// Whether the user may still withdraw the entry from their cart.
    pub fn is_removable(self) -> bool {
        matches!(self, CartStatus::Pending | CartStatus::Approval)
    }

    /// Pickup eligibility: `confirm`, or `approval` whose linked request has
    /// been approved by staff.
    pub fn pickup_eligible(self, linked_request: Option<RequestStatus>) -> bool {
        match self {
            CartStatus::Confirm => true,
            CartStatus::Approval => matches!(linked_request, Some(RequestStatus::Approved)),
            _ => false,
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CartStatus::Pending),
            "approval" => Ok(CartStatus::Approval),
            "confirm" => Ok(CartStatus::Confirm),
            "borrowed" => Ok(CartStatus::Borrowed),
            "returned" => Ok(CartStatus::Returned),
            "overdue" => Ok(CartStatus::Overdue),
            _ => Err(format!("Invalid cart status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for CartStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for CartStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for CartStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Request-side status of an escalated borrow ask. Pairs without an
/// escalated ask simply have no request row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Waiting,
    Approved,
    Done,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Waiting => "waiting",
            RequestStatus::Approved => "approved",
            RequestStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(RequestStatus::Waiting),
            "approved" => Ok(RequestStatus::Approved),
            "done" => Ok(RequestStatus::Done),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Status mirror carried by the immutable transaction log. Only the sweep
/// ever persists a change here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Borrowed => "borrowed",
            TransactionStatus::Returned => "returned",
            TransactionStatus::Overdue => "overdue",
        }
    }

    /// Effective status derived from the stored status and the due date.
    /// Pure function of its inputs; display paths use this instead of
    /// persisting anything, and the sweep persists exactly this result.
    pub fn effective(self, due_date: Option<NaiveDate>, today: NaiveDate) -> TransactionStatus {
        match (self, due_date) {
            (TransactionStatus::Borrowed, Some(due)) if due < today => TransactionStatus::Overdue,
            (TransactionStatus::Borrowed, Some(due)) if due == today => TransactionStatus::Returned,
            _ => self,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "borrowed" => Ok(TransactionStatus::Borrowed),
            "returned" => Ok(TransactionStatus::Returned),
            "overdue" => Ok(TransactionStatus::Overdue),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for TransactionStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for TransactionStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for TransactionStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Marker carried by activity feed entries: `pending` while a request waits,
/// flipped to `borrowed` when staff approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Borrowed,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Borrowed => "borrowed",
        }
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ActivityStatus::Pending),
            "borrowed" => Ok(ActivityStatus::Borrowed),
            _ => Err(format!("Invalid activity status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for ActivityStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ActivityStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ActivityStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

// =============================================================================
// Row models
// =============================================================================

/// A `booking_cart` row: one (user, book) pair moving through the pipeline.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CartEntry {
    pub booking_id: i32,
    pub user_id: i32,
    pub books_id: i32,
    pub status: CartStatus,
    pub borrow_date: Option<NaiveDate>,
    pub borrow_return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `booking_requests` row: a user's escalated ask to borrow.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub request_id: i32,
    pub user_id: i32,
    pub books_id: i32,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

/// A `transactions` row: immutable record of a loan issuance.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LoanTransaction {
    pub transaction_id: i32,
    pub user_id: i32,
    pub booking_id: i32,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An `activity` row feeding the staff activity report.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ActivityRecord {
    pub activity_id: i32,
    pub user_id: i32,
    pub books_id: i32,
    pub status: ActivityStatus,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Joined detail models for API listings
// =============================================================================

/// Cart entry joined with book display fields.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CartItemDetails {
    pub booking_id: i32,
    pub books_id: i32,
    pub status: CartStatus,
    pub title: String,
    pub author: String,
    pub cover_image_url: Option<String>,
    pub borrow_date: Option<NaiveDate>,
    pub borrow_return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Waiting request joined with user and book, for the staff approval queue.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RequestDetails {
    pub request_id: i32,
    pub user_id: i32,
    pub books_id: i32,
    pub status: RequestStatus,
    pub full_name: String,
    pub title: String,
    pub requested_at: DateTime<Utc>,
}

/// Pickup-eligible entry for a user, oldest first since copies are shared.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PickupDetails {
    pub booking_id: i32,
    pub books_id: i32,
    pub title: String,
    pub author: String,
    pub cover_image_url: Option<String>,
    pub request_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Internal row for the staff transaction feed; `into_details` derives the
/// effective status for display without persisting it.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub transaction_id: i32,
    pub booking_id: i32,
    pub user_id: i32,
    pub full_name: String,
    pub title: String,
    pub status: TransactionStatus,
    pub borrow_date: Option<NaiveDate>,
    pub borrow_return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl TransactionRow {
    pub fn into_details(self, today: NaiveDate) -> TransactionDetails {
        let effective_status = self.status.effective(self.borrow_return_date, today);
        TransactionDetails {
            transaction_id: self.transaction_id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            full_name: self.full_name,
            title: self.title,
            status: self.status,
            effective_status,
            borrow_date: self.borrow_date,
            borrow_return_date: self.borrow_return_date,
            created_at: self.created_at,
        }
    }
}

/// Transaction feed row joined to user/book, carrying both the stored status
/// and the effective status derived at read time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionDetails {
    pub transaction_id: i32,
    pub booking_id: i32,
    pub user_id: i32,
    pub full_name: String,
    pub title: String,
    pub status: TransactionStatus,
    pub effective_status: TransactionStatus,
    pub borrow_date: Option<NaiveDate>,
    pub borrow_return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Activity feed entry joined to user and book names.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ActivityDetails {
    pub activity_id: i32,
    pub full_name: String,
    pub title: String,
    pub status: ActivityStatus,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful pickup confirmation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssuedLoan {
    pub booking_id: i32,
    pub transaction_id: i32,
    pub books_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Counters from one overdue/returned sweep pass.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct SweepOutcome {
    pub marked_overdue: u32,
    pub marked_returned: u32,
    pub failed: u32,
}
