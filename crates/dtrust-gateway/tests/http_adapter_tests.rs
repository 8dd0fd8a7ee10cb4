//! # HTTP Adapter Integration Tests
//!
//! Exercises [`HttpStripeAdapter`] and [`HttpMailDispatcher`] against
//! wiremock servers.
//!
//! Adapter trait methods are synchronous and call `Handle::block_on`
//! internally, which panics on a runtime worker thread. Every call is
//! therefore wrapped in `tokio::task::spawn_blocking`.

use std::sync::Arc;

use dtrust_core::Email;
use dtrust_gateway::{
    CheckoutRequest, CustomerRequest, GatewayError, HttpMailDispatcher, HttpStripeAdapter,
    MailRelayConfig, Notification, NotificationDispatcher, PaymentProvider, PaymentStatus,
    StripeConfig,
};
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stripe(server: &MockServer) -> Arc<HttpStripeAdapter> {
    let config = StripeConfig::local_mock(&server.uri(), "sk_test_123").expect("config");
    Arc::new(HttpStripeAdapter::new(&config).expect("adapter build"))
}

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        price_id: "price_basic".into(),
        customer_id: "cus_123".into(),
        success_url: "http://localhost:3000/payment-success".into(),
        cancel_url: "http://localhost:3000?cancel=true".into(),
        coupon_id: Some("LAUNCH".into()),
    }
}

// ── Stripe ───────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_customer_sends_form_and_idempotency_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .and(header("Authorization", "Bearer sk_test_123"))
        .and(header("Idempotency-Key", "customer-abc"))
        .and(body_string_contains("email=ada%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cus_123",
            "object": "customer",
            "email": "ada@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = stripe(&server);
    let customer = tokio::task::spawn_blocking(move || {
        adapter.create_customer(&CustomerRequest {
            name: "Ada Lovelace".into(),
            email: Email::new("ada@example.com").expect("email"),
            idempotency_key: Some("customer-abc".into()),
        })
    })
    .await
    .expect("task")
    .expect("create customer");

    assert_eq!(customer.id, "cus_123");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_checkout_session_is_subscription_mode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(body_string_contains("mode=subscription"))
        .and(body_string_contains("line_items%5B0%5D%5Bprice%5D=price_basic"))
        .and(body_string_contains("discounts%5B0%5D%5Bcoupon%5D=LAUNCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cs_test_1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1",
            "payment_status": "unpaid",
            "customer": "cus_123",
            "subscription": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = stripe(&server);
    let session = tokio::task::spawn_blocking(move || {
        adapter.create_checkout_session(&checkout_request())
    })
    .await
    .expect("task")
    .expect("checkout");

    assert_eq!(session.id, "cs_test_1");
    assert_eq!(session.payment_status, PaymentStatus::Unpaid);
    assert!(session.url.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retrieve_paid_session_and_subscription() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "subscription": "sub_1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/sub_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "sub_1",
            "status": "active",
            "plan": {"id": "price_basic", "amount": 9900, "currency": "usd"},
            "current_period_start": 1_700_000_000,
            "current_period_end": 1_700_000_000 + 365 * 86_400
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = stripe(&server);
    let (session, subscription) = tokio::task::spawn_blocking(move || {
        let session = adapter.retrieve_session("cs_test_1")?;
        let sub_id = session.subscription.clone().unwrap_or_default();
        let subscription = adapter.retrieve_subscription(&sub_id)?;
        Ok::<_, GatewayError>((session, subscription))
    })
    .await
    .expect("task")
    .expect("retrieve");

    assert!(session.payment_status.is_settled());
    assert_eq!(subscription.plan.amount, 9900);
    assert_eq!(subscription.duration_days(), 365);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_session_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"type": "invalid_request_error", "code": "resource_missing"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = stripe(&server);
    let err = tokio::task::spawn_blocking(move || adapter.retrieve_session("cs_missing"))
        .await
        .expect("task")
        .unwrap_err();

    assert!(matches!(err, GatewayError::NotFound { resource: "checkout session", .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn declined_customer_surfaces_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(402).set_body_string("card_declined"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = stripe(&server);
    let err = tokio::task::spawn_blocking(move || {
        adapter.create_customer(&CustomerRequest {
            name: "Ada".into(),
            email: Email::new("ada@example.com").expect("email"),
            idempotency_key: None,
        })
    })
    .await
    .expect("task")
    .unwrap_err();

    match err {
        GatewayError::Api { status, body, .. } => {
            assert_eq!(status, 402);
            assert_eq!(body, "card_declined");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_session_body_is_deserialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let adapter = stripe(&server);
    let err = tokio::task::spawn_blocking(move || adapter.retrieve_session("cs_bad"))
        .await
        .expect("task")
        .unwrap_err();

    assert!(matches!(err, GatewayError::Deserialization { .. }));
}

// ── Mail relay ───────────────────────────────────────────────────────────

fn mail(server: &MockServer) -> Arc<HttpMailDispatcher> {
    let config = MailRelayConfig::local_mock(&server.uri(), "relay-token").expect("config");
    Arc::new(HttpMailDispatcher::new(&config).expect("dispatcher build"))
}

fn welcome() -> Notification {
    Notification {
        to: Email::new("ada@example.com").expect("email"),
        subject: "Your verification code".into(),
        text_body: "123456".into(),
        html_body: "<b>123456</b>".into(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mail_relay_receives_json_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("Authorization", "Bearer relay-token"))
        .and(body_json(serde_json::json!({
            "from": "\"DecenTrust\" <noreply@decentrust.test>",
            "to": "ada@example.com",
            "subject": "Your verification code",
            "text": "123456",
            "html": "<b>123456</b>"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = mail(&server);
    let sent = tokio::task::spawn_blocking(move || dispatcher.send(&welcome()))
        .await
        .expect("task");
    assert!(sent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mail_relay_rejection_returns_false() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string("relay down"))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = mail(&server);
    let sent = tokio::task::spawn_blocking(move || dispatcher.send(&welcome()))
        .await
        .expect("task");
    assert!(!sent);
}
