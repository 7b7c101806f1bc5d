//! Inquiry, quote, booking and checkout flows through the router.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    empty_request_with_auth, future_date, get_request, json_request_with_auth, sign_webhook,
    webhook_request, TestApp, TestUser,
};
use domain::models::{Provider, UserRole};
use domain::services::MockPaymentGateway;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

struct Parties {
    client: TestUser,
    vendor: TestUser,
    provider: Provider,
}

async fn parties(app: &TestApp) -> Parties {
    let client = app.register(UserRole::Client).await;
    let vendor = app.register(UserRole::Professional).await;
    let provider = app.provider(&vendor, 40.7128, -74.0060).await;
    Parties {
        client,
        vendor,
        provider,
    }
}

async fn open_inquiry(app: &TestApp, p: &Parties) -> Value {
    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/inquiries",
            json!({
                "providerId": p.provider.id,
                "message": "Are you free for a 150 guest wedding?",
                "eventDate": future_date(),
            }),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn sent_quote(app: &TestApp, p: &Parties, inquiry_id: &str) -> Value {
    let (status, quote) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/quotes",
            json!({
                "providerId": p.provider.id,
                "inquiryId": inquiry_id,
                "totalPrice": "3200.00",
                "notes": "Full day coverage",
            }),
            &p.vendor.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", quote);
    assert_eq!(quote["status"], "DRAFT");

    let quote_id = quote["id"].as_str().unwrap();
    let (status, sent) = app
        .send(empty_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/send", quote_id),
            &p.vendor.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", sent);
    assert_eq!(sent["status"], "SENT");
    sent
}

#[tokio::test]
async fn test_inquiry_thread_between_client_and_vendor() {
    let app = TestApp::new();
    let p = parties(&app).await;

    let inquiry = open_inquiry(&app, &p).await;
    assert_eq!(inquiry["status"], "OPEN");
    assert_eq!(inquiry["messages"].as_array().unwrap().len(), 1);
    assert_eq!(inquiry["messages"][0]["seq"], 1);
    assert_eq!(inquiry["messages"][0]["senderRole"], "client");

    let inquiry_id = inquiry["id"].as_str().unwrap();
    let (status, updated) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/inquiries/{}/messages", inquiry_id),
            json!({ "text": "Yes, that date works for us." }),
            &p.vendor.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    let messages = updated["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["seq"], 2);
    assert_eq!(messages[1]["senderRole"], "vendor");

    let (status, fetched) = app
        .send(get_request(
            &format!("/api/v1/inquiries/{}", inquiry_id),
            Some(&p.client.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["messages"].as_array().unwrap().len(), 2);

    let outsider = app.register(UserRole::Client).await;
    let (status, _) = app
        .send(get_request(
            &format!("/api/v1/inquiries/{}", inquiry_id),
            Some(&outsider.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_only_clients_open_inquiries() {
    let app = TestApp::new();
    let p = parties(&app).await;

    let (status, _) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/inquiries",
            json!({ "providerId": p.provider.id, "message": "Hello" }),
            &p.vendor.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/inquiries",
            json!({ "providerId": p.provider.id, "message": "   " }),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_quote_accept_and_payment_confirms_booking() {
    let app = TestApp::new();
    let p = parties(&app).await;
    let inquiry = open_inquiry(&app, &p).await;
    let quote = sent_quote(&app, &p, inquiry["id"].as_str().unwrap()).await;
    let quote_id = quote["id"].as_str().unwrap();

    let (status, accepted) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/accept", quote_id),
            json!({}),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", accepted);
    assert_eq!(accepted["quote"]["status"], "ACCEPTED");
    assert_eq!(accepted["booking"]["status"], "PENDING_PAYMENT");
    assert_eq!(accepted["booking"]["eventDate"], future_date());
    assert!(accepted["checkoutUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://checkout.mock.local/"));

    let requests = app.payments.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].line_items[0].unit_amount, 320_000);
    assert_eq!(requests[0].currency, "usd");

    let session_id = accepted["sessionId"].as_str().unwrap().to_string();
    let booking_id = accepted["booking"]["id"].as_str().unwrap().to_string();

    let (status, ack) = app.complete_last_checkout(&session_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);

    let (status, booking) = app
        .send(get_request(
            &format!("/api/v1/bookings/{}", booking_id),
            Some(&p.client.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "CONFIRMED");
    assert_eq!(booking["paymentSessionId"], session_id.as_str());
    assert!(!booking["paidAt"].is_null());

    // A redelivered event changes nothing
    let (status, _) = app.complete_last_checkout(&session_id).await;
    assert_eq!(status, StatusCode::OK);
    let (_, again) = app
        .send(get_request(
            &format!("/api/v1/bookings/{}", booking_id),
            Some(&p.vendor.access_token),
        ))
        .await;
    assert_eq!(again["status"], "CONFIRMED");
    assert_eq!(again["paidAt"], booking["paidAt"]);

    // Accepting twice is a state error
    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/accept", quote_id),
            json!({}),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn test_decline_quote_with_reason() {
    let app = TestApp::new();
    let p = parties(&app).await;
    let inquiry = open_inquiry(&app, &p).await;
    let quote = sent_quote(&app, &p, inquiry["id"].as_str().unwrap()).await;
    let quote_id = quote["id"].as_str().unwrap();

    let (status, declined) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/decline", quote_id),
            json!({ "reason": "Over our budget" }),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", declined);
    assert_eq!(declined["status"], "DECLINED");
    assert!(declined["notes"]
        .as_str()
        .unwrap()
        .contains("Over our budget"));

    let (status, _) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/accept", quote_id),
            json!({}),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Declining twice is a state error
    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/decline", quote_id),
            json!({ "reason": "Still over budget" }),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn test_decline_without_body() {
    let app = TestApp::new();
    let p = parties(&app).await;
    let inquiry = open_inquiry(&app, &p).await;
    let quote = sent_quote(&app, &p, inquiry["id"].as_str().unwrap()).await;

    let (status, declined) = app
        .send(empty_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/decline", quote["id"].as_str().unwrap()),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", declined);
    assert_eq!(declined["status"], "DECLINED");
}

#[tokio::test]
async fn test_quote_permissions() {
    let app = TestApp::new();
    let p = parties(&app).await;
    let inquiry = open_inquiry(&app, &p).await;

    let (status, draft) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/quotes",
            json!({
                "providerId": p.provider.id,
                "inquiryId": inquiry["id"],
                "totalPrice": "900",
            }),
            &p.vendor.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let quote_id = draft["id"].as_str().unwrap();

    // Drafts are invisible to the client
    let (status, _) = app
        .send(get_request(
            &format!("/api/v1/quotes/{}", quote_id),
            Some(&p.client.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Only the provider side sends
    let (status, _) = app
        .send(empty_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/send", quote_id),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A draft cannot be accepted
    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/accept", quote_id),
            json!({}),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_state");

    // Another vendor cannot quote for this provider
    let rival = app.register(UserRole::Professional).await;
    let (status, _) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/quotes",
            json!({ "providerId": p.provider.id, "totalPrice": "10" }),
            &rival.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/quotes",
            json!({ "providerId": p.provider.id, "totalPrice": "0" }),
            &p.vendor.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_gateway_failure_keeps_booking_for_retry() {
    let app = TestApp::with(common::test_config(), MockPaymentGateway::failing());
    let p = parties(&app).await;
    let inquiry = open_inquiry(&app, &p).await;
    let quote = sent_quote(&app, &p, inquiry["id"].as_str().unwrap()).await;

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/accept", quote["id"].as_str().unwrap()),
            json!({}),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "upstream_failure");

    // The quote was accepted before the gateway call
    let (status, fetched) = app
        .send(get_request(
            &format!("/api/v1/quotes/{}", quote["id"].as_str().unwrap()),
            Some(&p.client.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "ACCEPTED");
}

#[tokio::test]
async fn test_resume_checkout_for_pending_booking() {
    let app = TestApp::new();
    let p = parties(&app).await;
    let inquiry = open_inquiry(&app, &p).await;
    let quote = sent_quote(&app, &p, inquiry["id"].as_str().unwrap()).await;

    let (_, accepted) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/quotes/{}/accept", quote["id"].as_str().unwrap()),
            json!({}),
            &p.client.access_token,
        ))
        .await;
    let booking_id = accepted["booking"]["id"].as_str().unwrap();

    let (status, resumed) = app
        .send(empty_request_with_auth(
            Method::POST,
            &format!("/api/v1/bookings/{}/checkout", booking_id),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", resumed);
    assert_ne!(resumed["sessionId"], accepted["sessionId"]);

    let (status, _) = app
        .send(empty_request_with_auth(
            Method::POST,
            &format!("/api/v1/bookings/{}/checkout", booking_id),
            &p.vendor.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_listing_checkout_materializes_booking_once() {
    let app = TestApp::new();
    let p = parties(&app).await;
    let album = app.listing(&p.provider, "Wedding album", dec!(450.00)).await;
    let film = app.listing(&p.provider, "Highlight film", dec!(1200.00)).await;

    let (status, session) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/checkout/initiate",
            json!({
                "providerId": p.provider.id,
                "listings": [
                    { "id": album.id, "headline": album.headline, "price": "450.00" },
                    { "id": film.id, "headline": film.headline, "price": "1200" },
                ],
                "eventDate": future_date(),
                "contact": { "name": "Dana Client", "email": "dana@example.com" },
            }),
            &p.client.access_token,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", session);
    let session_id = session["sessionId"].as_str().unwrap().to_string();

    let request = app.payments.requests().last().cloned().unwrap();
    let amounts: Vec<i64> = request.line_items.iter().map(|l| l.unit_amount).collect();
    assert_eq!(amounts, vec![45_000, 120_000]);

    assert_eq!(app.complete_last_checkout(&session_id).await.0, StatusCode::OK);
    assert_eq!(app.complete_last_checkout(&session_id).await.0, StatusCode::OK);

    let admin = app.admin().await;
    let (status, page) = app
        .send(get_request(
            &format!("/api/v1/admin/bookings?providerId={}", p.provider.id),
            Some(&admin.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    let booking = &page["bookings"][0];
    assert_eq!(booking["status"], "CONFIRMED");
    assert_eq!(booking["contactEmail"], "dana@example.com");
    assert_eq!(booking["listingIds"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_listing_checkout_rejects_stale_price() {
    let app = TestApp::new();
    let p = parties(&app).await;
    let album = app.listing(&p.provider, "Wedding album", dec!(450.00)).await;

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/v1/checkout/initiate",
            json!({
                "providerId": p.provider.id,
                "listings": [{ "id": album.id, "headline": album.headline, "price": "400.00" }],
                "eventDate": future_date(),
                "contact": { "name": "Dana Client", "email": "dana@example.com" },
            }),
            &p.client.access_token,
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "listings[0].price");
    assert!(app.payments.requests().is_empty());
}

#[tokio::test]
async fn test_webhook_requires_valid_signature() {
    let app = TestApp::new();
    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_forged", "payment_status": "paid", "metadata": {} } }
    })
    .to_string();

    let (status, _) = app.send(webhook_request(&payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(webhook_request(&payload, Some("t=1,v1=deadbeef")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Signed for a different body
    let signature = sign_webhook("{}");
    let (status, _) = app
        .send(webhook_request(&payload, Some(&signature)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_acknowledges_unrelated_events() {
    let app = TestApp::new();

    let payload = json!({ "type": "payment_intent.created", "data": { "object": {} } }).to_string();
    let (status, body) = app
        .send(webhook_request(&payload, Some(&sign_webhook(&payload))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    // Signed but without usable metadata
    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_orphan", "payment_status": "paid", "metadata": {} } }
    })
    .to_string();
    let (status, _) = app
        .send(webhook_request(&payload, Some(&sign_webhook(&payload))))
        .await;
    assert_eq!(status, StatusCode::OK);

    let payload = "not json";
    let (status, _) = app
        .send(webhook_request(payload, Some(&sign_webhook(payload))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
