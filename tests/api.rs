//! Black-box tests of the REST surface.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio_test::assert_ok;

use coworking_booking::domain::{Booking, BookingId, ResourceId};

use common::{TestApp, monday, spawn_app};

async fn get_json(url: String) -> (StatusCode, Value) {
    let resp = assert_ok!(reqwest::get(url).await);
    let status = resp.status();
    (status, assert_ok!(resp.json::<Value>().await))
}

async fn send_json(
    client: &reqwest::Client,
    method: reqwest::Method,
    url: String,
    body: Value,
) -> (StatusCode, Value) {
    let resp = assert_ok!(client.request(method, url).json(&body).send().await);
    let status = resp.status();
    (status, assert_ok!(resp.json::<Value>().await))
}

/// Opens an inline wizard on the fixture's site for Monday and picks
/// 10:00–12:00 in the fixture room.
async fn wizard_on_two_slots(app: &TestApp, client: &reqwest::Client) -> String {
    let (status, body) = send_json(
        client,
        reqwest::Method::POST,
        app.url("/api/v1/wizards"),
        json!({
            "user_id": app.user_id,
            "company_id": app.company_id,
            "site_id": app.site_id,
            "date": monday(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["wizard"]["view"], "planning");
    let Some(wizard_id) = body["wizard_id"].as_str().map(str::to_string) else {
        panic!("wizard id in {body}");
    };

    let (status, view) = send_json(
        client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/wizards/{wizard_id}/slot-click")),
        json!({ "resource_id": app.room_id, "slot": "10:00" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["view"], "slots");
    assert_eq!(view["selected_slots"], json!(["10:00"]));

    let (status, view) = send_json(
        client,
        reqwest::Method::PUT,
        app.url(&format!("/api/v1/wizards/{wizard_id}/slots")),
        json!({ "start": "10:00", "end_hour": 12 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["selected_slots"], json!(["10:00", "11:00"]));
    assert_eq!(view["credits_needed"], json!(4.0));

    wizard_id
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = spawn_app(20.0).await;
    let (status, body) = get_json(app.url("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn business_hours_expose_calendar_geometry() {
    let app = spawn_app(20.0).await;
    let (status, body) = get_json(app.url("/config/business-hours")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["time_zone"], "Europe/Paris");
    assert_eq!(body["slots"].as_array().map(Vec::len), Some(12));
    assert_eq!(body["slots"][0], "08:00");
}

#[tokio::test]
async fn unknown_booking_returns_error_body() {
    let app = spawn_app(20.0).await;
    let (status, body) = get_json(app.url(&format!(
        "/api/v1/bookings/{}",
        uuid::Uuid::new_v4()
    )))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 2001);
}

#[tokio::test]
async fn availability_lists_booked_hours() {
    let app = spawn_app(20.0).await;
    app.seed_booking(monday(), 9, 11).await;

    let (status, body) = get_json(app.url(&format!(
        "/api/v1/resources/{}/availability?date={}",
        app.room_id,
        monday()
    )))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unavailable_slots"], json!(["09:00", "10:00"]));
    assert_eq!(body["available_slots"].as_array().map(Vec::len), Some(10));
}

#[tokio::test]
async fn editing_a_booking_frees_its_own_hours() {
    let app = spawn_app(20.0).await;
    let booking = app.seed_booking(monday(), 9, 11).await;

    let (status, body) = get_json(app.url(&format!(
        "/api/v1/resources/{}/availability?date={}&exclude_booking={}",
        app.room_id,
        monday(),
        booking.id
    )))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unavailable_slots"], json!([]));
}

#[tokio::test]
async fn excluding_another_rooms_booking_is_rejected() {
    let app = spawn_app(20.0).await;
    let foreign = Booking {
        id: BookingId::new(),
        resource_id: ResourceId::new(),
        ..app.seed_booking(monday(), 14, 16).await
    };
    app.backend.insert_booking(foreign.clone()).await;

    let (status, body) = get_json(app.url(&format!(
        "/api/v1/resources/{}/availability?date={}&exclude_booking={}",
        app.room_id,
        monday(),
        foreign.id
    )))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
}

#[tokio::test]
async fn planning_grid_marks_booked_cells() {
    let app = spawn_app(20.0).await;
    app.seed_booking(monday(), 14, 15).await;

    let (status, body) = get_json(app.url(&format!(
        "/api/v1/sites/{}/planning?date={}",
        app.site_id,
        monday()
    )))
    .await;
    assert_eq!(status, StatusCode::OK);
    let Some(rows) = body["rows"].as_array() else {
        panic!("rows in {body}");
    };
    assert_eq!(rows.len(), 1);
    let cells = &rows[0]["cells"];
    assert_eq!(cells.as_array().map(Vec::len), Some(12));
    // 14:00 is the seventh hour of 08:00–20:00.
    assert_eq!(cells[6]["slot"], "14:00");
    assert_eq!(cells[6]["state"], "booked");
    assert_eq!(cells[0]["state"], "free");
}

#[tokio::test]
async fn wizard_books_and_debits_credits() {
    let app = spawn_app(20.0).await;
    let client = reqwest::Client::new();
    let wizard_id = wizard_on_two_slots(&app, &client).await;

    let (status, view) = send_json(
        &client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/wizards/{wizard_id}/next")),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["view"], "confirm");

    let (status, outcome) = send_json(
        &client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/wizards/{wizard_id}/confirm")),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["exit"], "show_success");
    assert_eq!(outcome["wizard"]["succeeded"], true);
    assert_eq!(outcome["booking"]["credits_used"], json!(4.0));

    let (_, credits) = get_json(app.url(&format!(
        "/api/v1/companies/{}/credits",
        app.company_id
    )))
    .await;
    assert_eq!(credits["remaining"], json!(16.0));

    let (status, ledger) = get_json(app.url(&format!(
        "/api/v1/companies/{}/ledger",
        app.company_id
    )))
    .await;
    assert_eq!(status, StatusCode::OK);
    let Some(movements) = ledger["movements"].as_array() else {
        panic!("movements in {ledger}");
    };
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["type"], "reservation");
    assert_eq!(movements[0]["balance_after"], json!(16.0));

    // The inline wizard returns to planning once the success delay elapsed.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let (_, view) = get_json(app.url(&format!("/api/v1/wizards/{wizard_id}"))).await;
    assert_eq!(view["view"], "planning");
}

#[tokio::test]
async fn insufficient_credits_stay_on_slots_with_error() {
    let app = spawn_app(3.0).await;
    let client = reqwest::Client::new();
    let wizard_id = wizard_on_two_slots(&app, &client).await;

    let (status, view) = send_json(
        &client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/wizards/{wizard_id}/next")),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["view"], "slots");
    assert_eq!(view["has_enough_credits"], false);
    assert!(view["error"].is_string());
}

#[tokio::test]
async fn backend_rejection_is_shown_verbatim() {
    let app = spawn_app(20.0).await;
    let client = reqwest::Client::new();
    let wizard_id = wizard_on_two_slots(&app, &client).await;

    let (status, _) = send_json(
        &client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/wizards/{wizard_id}/next")),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    app.backend.reject_next_mutation("Créneau indisponible").await;
    let (status, outcome) = send_json(
        &client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/wizards/{wizard_id}/confirm")),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["wizard"]["view"], "confirm");
    assert_eq!(outcome["wizard"]["error"], "Créneau indisponible");
    assert!(outcome["booking"].is_null());
}

#[tokio::test]
async fn cancel_refunds_credits() {
    let app = spawn_app(20.0).await;
    let booking = app.seed_booking(monday(), 9, 10).await;
    let client = reqwest::Client::new();

    let (status, body) = send_json(
        &client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/bookings/{}/cancel", booking.id)),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = send_json(
        &client,
        reqwest::Method::POST,
        app.url(&format!("/api/v1/bookings/{}/cancel", booking.id)),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], 4003);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = spawn_app(20.0).await;
    let (status, body) = get_json(app.url("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/wizards"].is_object());
}
