//! Circulation pipeline endpoints: cart, requests, pickups, loans, sweep

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::circulation::{
        ActivityDetails, BorrowRequest, CartEntry, CartItemDetails, IssuedLoan, PickupDetails,
        RequestDetails, SweepOutcome, TransactionDetails,
    },
};

use super::AuthenticatedUser;

/// Cart mutation request
#[derive(Deserialize, ToSchema)]
pub struct CartRequest {
    /// Book ID
    pub books_id: i32,
}

/// Borrow escalation request
#[derive(Deserialize, ToSchema)]
pub struct BorrowRequestBody {
    /// Book ID
    pub books_id: i32,
}

/// Pickup confirmation request
#[derive(Deserialize, ToSchema)]
pub struct ConfirmPickupRequest {
    /// Book ID
    pub books_id: i32,
    /// Loan period in days, between 1 and 6
    pub days: u32,
}

// =============================================================================
// Cart
// =============================================================================

/// Add a book to the cart
#[utoipa::path(
    post,
    path = "/circulation/cart",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = CartRequest,
    responses(
        (status = 201, description = "Cart entry created", body = CartEntry),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Pair already in the pipeline")
    )
)]
pub async fn add_to_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CartRequest>,
) -> AppResult<(StatusCode, Json<CartEntry>)> {
    let user_id = claims.require_user()?;

    let entry = state
        .services
        .circulation
        .add_to_cart(user_id, request.books_id)
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Withdraw a book from the cart
#[utoipa::path(
    delete,
    path = "/circulation/cart/{book_id}",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Cart entry removed"),
        (status = 404, description = "No open cart entry for the pair"),
        (status = 409, description = "Entry has progressed past approval")
    )
)]
pub async fn remove_from_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<StatusCode> {
    let user_id = claims.require_user()?;

    state
        .services
        .circulation
        .remove_from_cart(user_id, book_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get the authenticated user's open cart entries
#[utoipa::path(
    get,
    path = "/circulation/cart",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open cart entries", body = Vec<CartItemDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<CartItemDetails>>> {
    let user_id = claims.require_user()?;
    let items = state.services.circulation.cart(user_id).await?;
    Ok(Json(items))
}

// =============================================================================
// Borrow requests
// =============================================================================

/// Request to borrow a carted book (staff approval required)
#[utoipa::path(
    post,
    path = "/circulation/requests",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = BorrowRequestBody,
    responses(
        (status = 201, description = "Borrow request created", body = BorrowRequest),
        (status = 409, description = "Request already open or entry not pending")
    )
)]
pub async fn request_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowRequestBody>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    let user_id = claims.require_user()?;

    let created = state
        .services
        .circulation
        .request_borrow(user_id, request.books_id)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Borrow a carted book directly, skipping staff approval
#[utoipa::path(
    post,
    path = "/circulation/borrow",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = BorrowRequestBody,
    responses(
        (status = 201, description = "Borrow request created, entry ready for pickup", body = BorrowRequest),
        (status = 409, description = "Request already open or entry not pending")
    )
)]
pub async fn direct_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowRequestBody>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    let user_id = claims.require_user()?;

    let created = state
        .services
        .circulation
        .direct_borrow(user_id, request.books_id)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get the waiting-request approval queue, oldest first
#[utoipa::path(
    get,
    path = "/circulation/requests",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Waiting requests", body = Vec<RequestDetails>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RequestDetails>>> {
    claims.require_staff()?;

    let requests = state.services.circulation.waiting_requests().await?;
    Ok(Json(requests))
}

/// Approve a waiting request
#[utoipa::path(
    post,
    path = "/circulation/requests/{id}/approve",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = BorrowRequest),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not waiting")
    )
)]
pub async fn approve_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_staff()?;

    let request = state.services.circulation.approve_request(id).await?;
    Ok(Json(request))
}

// =============================================================================
// Pickup and loans
// =============================================================================

/// Get the authenticated user's pickup-eligible entries, oldest first
#[utoipa::path(
    get,
    path = "/circulation/pickups",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Entries ready for pickup", body = Vec<PickupDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_pickups(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<PickupDetails>>> {
    let user_id = claims.require_user()?;
    let pickups = state.services.circulation.pickups(user_id).await?;
    Ok(Json(pickups))
}

/// Confirm pickup and issue the loan
#[utoipa::path(
    post,
    path = "/circulation/pickups",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = ConfirmPickupRequest,
    responses(
        (status = 201, description = "Loan issued", body = IssuedLoan),
        (status = 400, description = "Loan period out of range"),
        (status = 404, description = "No open cart entry for the pair"),
        (status = 409, description = "Entry not ready for pickup or no copies left")
    )
)]
pub async fn confirm_pickup(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ConfirmPickupRequest>,
) -> AppResult<(StatusCode, Json<IssuedLoan>)> {
    let user_id = claims.require_user()?;

    let issued = state
        .services
        .circulation
        .confirm_pickup(user_id, request.books_id, request.days)
        .await?;

    Ok((StatusCode::CREATED, Json(issued)))
}

/// Get the authenticated user's active loans
#[utoipa::path(
    get,
    path = "/circulation/loans",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrowed and overdue loans", body = Vec<CartItemDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<CartItemDetails>>> {
    let user_id = claims.require_user()?;
    let loans = state.services.circulation.loans(user_id).await?;
    Ok(Json(loans))
}

// =============================================================================
// Staff feeds and sweep
// =============================================================================

/// Get the transaction feed with stored and effective statuses
#[utoipa::path(
    get,
    path = "/circulation/transactions",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transaction feed, newest first", body = Vec<TransactionDetails>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<TransactionDetails>>> {
    claims.require_staff()?;

    let transactions = state.services.circulation.transactions().await?;
    Ok(Json(transactions))
}

/// Get borrow-pipeline activity of the trailing 24 hours
#[utoipa::path(
    get,
    path = "/circulation/activity",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Recent activity, newest first", body = Vec<ActivityDetails>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ActivityDetails>>> {
    claims.require_staff()?;

    let activity = state.services.circulation.recent_activity().await?;
    Ok(Json(activity))
}

/// Run an overdue/returned sweep pass on demand
#[utoipa::path(
    post,
    path = "/circulation/sweep",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep pass counters", body = SweepOutcome),
        (status = 403, description = "Staff only")
    )
)]
pub async fn run_sweep(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepOutcome>> {
    claims.require_staff()?;

    let outcome = state.services.circulation.sweep().await?;
    Ok(Json(outcome))
}
