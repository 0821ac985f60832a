//! API integration tests

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Bootstrap staff credentials from the default configuration.
const STAFF_EMAIL: &str = "librarian@aklatan.local";
const STAFF_PASSWORD: &str = "librarian";

/// Unique suffix so repeated runs never collide on emails or titles.
fn unique(tag: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}", tag, nanos)
}

/// Helper to get a staff token
async fn staff_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": STAFF_EMAIL,
            "password": STAFF_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Helper to sign up a fresh borrower and return their token
async fn signup_user(client: &Client) -> String {
    let email = format!("{}@example.com", unique("member"));

    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&json!({
            "full_name": "Test Member",
            "email": email,
            "password": "secret123",
            "id_number": "2024-0001"
        }))
        .send()
        .await
        .expect("Failed to send signup request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse signup response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Helper to create a book with the given shelf count, returning its id
async fn create_book(client: &Client, staff: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff))
        .json(&json!({
            "title": unique("Integration Test Book"),
            "author": "Test Author",
            "genre": "Fiction",
            "copies": copies
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse book response");
    body["books_id"].as_i64().expect("No book ID")
}

/// Helper walking one pair up to pickup eligibility via the direct pathway
async fn carted_and_ready(client: &Client, user: &str, book_id: i64) {
    let response = client
        .post(format!("{}/circulation/cart", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/circulation/borrow", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to direct borrow");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_signup_and_login() {
    let client = Client::new();
    let email = format!("{}@example.com", unique("signup"));

    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&json!({
            "full_name": "Maria Santos",
            "email": email,
            "password": "secret123",
            "id_number": "2024-0042"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["role"], "user");

    // The same credentials must log in
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "secret123"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["role"], "user");
    assert_eq!(body["full_name"], "Maria Santos");
}

#[tokio::test]
#[ignore]
async fn test_signup_duplicate_email() {
    let client = Client::new();
    let email = format!("{}@example.com", unique("dup"));

    let payload = json!({
        "full_name": "First Member",
        "email": email,
        "password": "secret123"
    });

    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/signup", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": STAFF_EMAIL,
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_staff_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": STAFF_EMAIL,
            "password": STAFF_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["role"], "staff");
}

#[tokio::test]
#[ignore]
async fn test_get_current_user() {
    let client = Client::new();
    let token = staff_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], STAFF_EMAIL);
    assert_eq!(body["role"], "staff");
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_book_crud_and_availability() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let book_id = create_book(&client, &staff, 4).await;

    // Fresh book: everything on the shelf
    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], 4);
    assert_eq!(body["borrowed"], 0);
    assert_eq!(body["total"], 4);

    // Partial update leaves unnamed fields alone
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", staff))
        .json(&json!({ "copies": 2 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["copies"], 2);
    assert_eq!(body["author"], "Test Author");

    // A never-borrowed book deletes cleanly
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_create_book_requires_staff() {
    let client = Client::new();
    let user = signup_user(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({
            "title": "Forbidden Book",
            "author": "Nobody",
            "copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_borrow_pipeline() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let user = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 2).await;

    // Cart
    let response = client
        .post(format!("{}/circulation/cart", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "pending");

    // Escalate into the approval queue
    let response = client
        .post(format!("{}/circulation/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to request borrow");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let request_id = body["request_id"].as_i64().expect("No request ID");
    assert_eq!(body["status"], "waiting");

    // Not yet pickup-eligible
    let response = client
        .get(format!("{}/circulation/pickups", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to list pickups");
    let body: Value = response.json().await.expect("Failed to parse response");
    let pending_pickup = body
        .as_array()
        .expect("Expected array")
        .iter()
        .any(|p| p["books_id"] == book_id);
    assert!(!pending_pickup);

    // Staff sees and approves the request
    let response = client
        .get(format!("{}/circulation/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to list requests");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let queued = body
        .as_array()
        .expect("Expected array")
        .iter()
        .any(|r| r["request_id"] == request_id);
    assert!(queued);

    let response = client
        .post(format!("{}/circulation/requests/{}/approve", BASE_URL, request_id))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to approve request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "approved");

    // Now pickup-eligible
    let response = client
        .get(format!("{}/circulation/pickups", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to list pickups");
    let body: Value = response.json().await.expect("Failed to parse response");
    let eligible = body
        .as_array()
        .expect("Expected array")
        .iter()
        .any(|p| p["books_id"] == book_id);
    assert!(eligible);

    // Confirm pickup with a three day loan period
    let response = client
        .post(format!("{}/circulation/pickups", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id, "days": 3 }))
        .send()
        .await
        .expect("Failed to confirm pickup");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_date: NaiveDate = body["borrow_date"]
        .as_str()
        .expect("No borrow date")
        .parse()
        .expect("Bad borrow date");
    let due_date: NaiveDate = body["due_date"]
        .as_str()
        .expect("No due date")
        .parse()
        .expect("Bad due date");
    assert_eq!(due_date - borrow_date, chrono::Duration::days(3));

    // One copy left the shelf
    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], 1);
    assert_eq!(body["borrowed"], 1);
    assert_eq!(body["total"], 2);

    // The loan shows up for the user
    let response = client
        .get(format!("{}/circulation/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to list loans");
    let body: Value = response.json().await.expect("Failed to parse response");
    let loaned = body
        .as_array()
        .expect("Expected array")
        .iter()
        .any(|l| l["books_id"] == book_id && l["status"] == "borrowed");
    assert!(loaned);

    // And in the staff transaction feed
    let response = client
        .get(format!("{}/circulation/transactions", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to list transactions");
    let body: Value = response.json().await.expect("Failed to parse response");
    let recorded = body
        .as_array()
        .expect("Expected array")
        .iter()
        .any(|t| t["books_id"] == book_id && t["status"] == "borrowed");
    assert!(recorded);
}

#[tokio::test]
#[ignore]
async fn test_cart_duplicate_conflicts() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let user = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 3).await;

    let response = client
        .post(format!("{}/circulation/cart", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(response.status(), 201);

    // Second add of the same pair conflicts
    let response = client
        .post(format!("{}/circulation/cart", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(response.status(), 409);

    // Second escalation of the same pair conflicts too
    let response = client
        .post(format!("{}/circulation/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to request borrow");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/circulation/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to request borrow");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_remove_from_cart_restores_clean_slate() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let user = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 3).await;

    // Add and escalate, then withdraw while still awaiting approval
    let response = client
        .post(format!("{}/circulation/cart", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/circulation/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to request borrow");
    assert_eq!(response.status(), 201);

    let response = client
        .delete(format!("{}/circulation/cart/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to remove from cart");
    assert_eq!(response.status(), 204);

    // The pair starts over cleanly: add and escalate again without conflicts
    let response = client
        .post(format!("{}/circulation/cart", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to re-add to cart");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/circulation/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id }))
        .send()
        .await
        .expect("Failed to re-request borrow");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_confirm_pickup_twice_conflicts() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let user = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 3).await;

    carted_and_ready(&client, &user, book_id).await;

    let response = client
        .post(format!("{}/circulation/pickups", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id, "days": 2 }))
        .send()
        .await
        .expect("Failed to confirm pickup");
    assert_eq!(response.status(), 201);

    // The entry is already borrowed, a second confirmation must not
    // decrement the shelf count again
    let response = client
        .post(format!("{}/circulation/pickups", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .json(&json!({ "books_id": book_id, "days": 2 }))
        .send()
        .await
        .expect("Failed to confirm pickup");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], 2);
}

#[tokio::test]
#[ignore]
async fn test_loan_period_bounds() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let user = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 1).await;

    carted_and_ready(&client, &user, book_id).await;

    for days in [0, 7] {
        let response = client
            .post(format!("{}/circulation/pickups", BASE_URL))
            .header("Authorization", format!("Bearer {}", user))
            .json(&json!({ "books_id": book_id, "days": days }))
            .send()
            .await
            .expect("Failed to confirm pickup");
        assert_eq!(response.status(), 400, "days={} must be rejected", days);
    }

    // Nothing was issued
    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], 1);
}

#[tokio::test]
#[ignore]
async fn test_exhausted_copies_conflict() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let first = signup_user(&client).await;
    let second = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 1).await;

    carted_and_ready(&client, &first, book_id).await;
    carted_and_ready(&client, &second, book_id).await;

    let response = client
        .post(format!("{}/circulation/pickups", BASE_URL))
        .header("Authorization", format!("Bearer {}", first))
        .json(&json!({ "books_id": book_id, "days": 3 }))
        .send()
        .await
        .expect("Failed to confirm pickup");
    assert_eq!(response.status(), 201);

    // The shelf is empty, the second borrower is turned away
    let response = client
        .post(format!("{}/circulation/pickups", BASE_URL))
        .header("Authorization", format!("Bearer {}", second))
        .json(&json!({ "books_id": book_id, "days": 3 }))
        .send()
        .await
        .expect("Failed to confirm pickup");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], 0);
    assert_eq!(body["borrowed"], 1);
}

#[tokio::test]
#[ignore]
async fn test_single_copy_race_has_one_winner() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let first = signup_user(&client).await;
    let second = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 1).await;

    carted_and_ready(&client, &first, book_id).await;
    carted_and_ready(&client, &second, book_id).await;

    let confirm = |token: String| {
        let client = client.clone();
        async move {
            client
                .post(format!("{}/circulation/pickups", BASE_URL))
                .header("Authorization", format!("Bearer {}", token))
                .json(&json!({ "books_id": book_id, "days": 3 }))
                .send()
                .await
                .expect("Failed to confirm pickup")
                .status()
        }
    };

    let (a, b) = tokio::join!(confirm(first), confirm(second));

    let wins = [a, b].iter().filter(|s| s.as_u16() == 201).count();
    let conflicts = [a, b].iter().filter(|s| s.as_u16() == 409).count();
    assert_eq!(wins, 1, "statuses: {} and {}", a, b);
    assert_eq!(conflicts, 1, "statuses: {} and {}", a, b);

    // The shelf count never goes below zero
    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], 0);
}

#[tokio::test]
#[ignore]
async fn test_sweep_is_idempotent() {
    let client = Client::new();
    let staff = staff_token(&client).await;

    let response = client
        .post(format!("{}/circulation/sweep", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to run sweep");
    assert!(response.status().is_success());

    // The first pass drained everything due, the immediate second pass
    // transitions nothing
    let response = client
        .post(format!("{}/circulation/sweep", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to run sweep");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["marked_overdue"], 0);
    assert_eq!(body["marked_returned"], 0);
}

#[tokio::test]
#[ignore]
async fn test_favorites_flow() {
    let client = Client::new();
    let staff = staff_token(&client).await;
    let user = signup_user(&client).await;
    let book_id = create_book(&client, &staff, 1).await;

    let response = client
        .put(format!("{}/favorites/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to add favorite");
    assert_eq!(response.status(), 204);

    // Adding twice is fine
    let response = client
        .put(format!("{}/favorites/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to add favorite");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/favorites", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to list favorites");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let marked = body
        .as_array()
        .expect("Expected array")
        .iter()
        .any(|b| b["books_id"] == book_id);
    assert!(marked);

    // Removing twice is fine too
    for _ in 0..2 {
        let response = client
            .delete(format!("{}/favorites/{}", BASE_URL, book_id))
            .header("Authorization", format!("Bearer {}", user))
            .send()
            .await
            .expect("Failed to remove favorite");
        assert_eq!(response.status(), 204);
    }
}

#[tokio::test]
#[ignore]
async fn test_reports() {
    let client = Client::new();
    let staff = staff_token(&client).await;

    let response = client
        .get(format!("{}/reports/dashboard", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to get dashboard");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total_books"].is_number());
    assert!(body["available_copies"].is_number());
    assert!(body["active_loans"].is_number());
    assert!(body["waiting_requests"].is_number());

    let response = client
        .get(format!("{}/reports/trends", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff))
        .send()
        .await
        .expect("Failed to get trends");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let months = body.as_array().expect("Expected array");
    assert_eq!(months.len(), 12);
    assert!(months[0]["month"].as_str().expect("No month label").len() == 7);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/circulation/cart", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{}/circulation/cart", BASE_URL))
        .header("Authorization", "Bearer not-a-token")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_staff_endpoints_forbidden_for_users() {
    let client = Client::new();
    let user = signup_user(&client).await;

    for path in [
        "/circulation/requests",
        "/circulation/transactions",
        "/circulation/activity",
        "/reports/dashboard",
        "/reports/trends",
    ] {
        let response = client
            .get(format!("{}{}", BASE_URL, path))
            .header("Authorization", format!("Bearer {}", user))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 403, "path {} must be staff only", path);
    }

    let response = client
        .post(format!("{}/circulation/sweep", BASE_URL))
        .header("Authorization", format!("Bearer {}", user))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}
