//! Payment provider trait, wire types, and an in-memory fake.

use std::collections::HashMap;

use dtrust_core::{Email, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Request to create a billing customer.
#[derive(Debug, Clone)]
pub struct CustomerRequest {
    /// Display name.
    pub name: String,
    /// Billing email.
    pub email: Email,
    /// Key that makes a retried create return the same customer.
    pub idempotency_key: Option<String>,
}

/// Request to open a hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Price being subscribed to.
    pub price_id: String,
    /// Customer the subscription belongs to.
    pub customer_id: String,
    /// Redirect after payment.
    pub success_url: String,
    /// Redirect after cancellation.
    pub cancel_url: String,
    /// Coupon to apply.
    pub coupon_id: Option<String>,
}

/// A billing customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Provider-assigned id (`cus_...`).
    pub id: String,
    /// Email on file.
    #[serde(default)]
    pub email: Option<String>,
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds captured.
    Paid,
    /// Not yet paid.
    Unpaid,
    /// A zero-amount checkout (for example a full-discount coupon).
    NoPaymentRequired,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Whether the session counts as paid for onboarding purposes.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::NoPaymentRequired)
    }
}

/// A hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider-assigned id (`cs_...`).
    pub id: String,
    /// Hosted page the customer is redirected to.
    #[serde(default)]
    pub url: Option<String>,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// Subscription created by the session, once paid.
    #[serde(default)]
    pub subscription: Option<String>,
    /// Customer the session was opened for.
    #[serde(default)]
    pub customer: Option<String>,
}

/// The price a subscription is billed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Price id.
    pub id: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
}

/// A recurring subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider-assigned id (`sub_...`).
    pub id: String,
    /// Provider status string (`active`, `trialing`, ...).
    pub status: String,
    /// Billed price.
    pub plan: Plan,
    /// Current period start, epoch seconds.
    pub current_period_start: i64,
    /// Current period end, epoch seconds.
    pub current_period_end: i64,
}

impl Subscription {
    /// Length of the current billing period in whole days.
    pub fn duration_days(&self) -> i64 {
        (self.current_period_end - self.current_period_start) / 86_400
    }
}

/// Billing operations the onboarding saga depends on.
///
/// Implementations block the calling thread. Call from `spawn_blocking`
/// when inside an async context.
pub trait PaymentProvider: Send + Sync {
    /// Create a billing customer.
    fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, GatewayError>;

    /// Open a subscription-mode checkout session.
    fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Fetch a checkout session.
    fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, GatewayError>;

    /// Fetch a subscription.
    fn retrieve_subscription(&self, subscription_id: &str) -> Result<Subscription, GatewayError>;

    /// Adapter name for logs.
    fn provider_name(&self) -> &str;
}

/// Subscription period granted by the fake when a session is completed.
const MOCK_PERIOD_SECS: i64 = 365 * 86_400;

#[derive(Default)]
struct MockState {
    customers: Vec<Customer>,
    idempotency: HashMap<String, String>,
    sessions: HashMap<String, (CheckoutSession, String)>,
    subscriptions: HashMap<String, Subscription>,
    prices: HashMap<String, i64>,
    fail_customers: bool,
    fail_checkout: bool,
}

/// In-memory payment provider.
///
/// Sessions start `Unpaid`; tests move them forward with
/// [`MockPaymentProvider::complete_session`]. Ids are sequential
/// (`cus_mock_1`, `cs_mock_1`, `sub_mock_1`).
#[derive(Default)]
pub struct MockPaymentProvider {
    state: Mutex<MockState>,
}

impl MockPaymentProvider {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the unit amount of a price.
    pub fn with_price(self, price_id: &str, amount: i64) -> Self {
        self.state.lock().prices.insert(price_id.to_string(), amount);
        self
    }

    /// Make customer creation fail until reset.
    pub fn fail_customer_creation(&self, fail: bool) {
        self.state.lock().fail_customers = fail;
    }

    /// Make checkout creation fail until reset.
    pub fn fail_checkout_creation(&self, fail: bool) {
        self.state.lock().fail_checkout = fail;
    }

    /// Number of distinct customers created.
    pub fn customer_count(&self) -> usize {
        self.state.lock().customers.len()
    }

    /// Mark a session paid and attach a fresh subscription.
    pub fn complete_session(&self, session_id: &str) -> Result<Subscription, GatewayError> {
        let mut state = self.state.lock();
        let sub_id = format!("sub_mock_{}", state.subscriptions.len() + 1);
        let (session, price_id) = state
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                resource: "checkout session",
                id: session_id.to_string(),
            })?;
        if let Some(existing) = session.subscription.as_ref() {
            if let Some(sub) = state.subscriptions.get(existing) {
                return Ok(sub.clone());
            }
        }
        let amount = state.prices.get(&price_id).copied().unwrap_or(0);
        let start = Timestamp::now().epoch_secs();
        let subscription = Subscription {
            id: sub_id.clone(),
            status: "active".to_string(),
            plan: Plan {
                id: price_id,
                amount,
                currency: Some("usd".to_string()),
            },
            current_period_start: start,
            current_period_end: start + MOCK_PERIOD_SECS,
        };
        state.subscriptions.insert(sub_id.clone(), subscription.clone());
        if let Some((stored, _)) = state.sessions.get_mut(session_id) {
            stored.payment_status = PaymentStatus::Paid;
            stored.subscription = Some(sub_id);
        }
        Ok(subscription)
    }
}

impl PaymentProvider for MockPaymentProvider {
    fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, GatewayError> {
        let mut state = self.state.lock();
        if state.fail_customers {
            return Err(GatewayError::Api {
                operation: "create_customer",
                status: 503,
                body: "mock failure".to_string(),
            });
        }
        if let Some(key) = request.idempotency_key.as_ref() {
            if let Some(id) = state.idempotency.get(key).cloned() {
                if let Some(existing) = state.customers.iter().find(|c| c.id == id) {
                    return Ok(existing.clone());
                }
            }
        }
        let customer = Customer {
            id: format!("cus_mock_{}", state.customers.len() + 1),
            email: Some(request.email.as_str().to_string()),
        };
        if let Some(key) = request.idempotency_key.as_ref() {
            state.idempotency.insert(key.clone(), customer.id.clone());
        }
        state.customers.push(customer.clone());
        Ok(customer)
    }

    fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.lock();
        if state.fail_checkout {
            return Err(GatewayError::Api {
                operation: "create_checkout_session",
                status: 503,
                body: "mock failure".to_string(),
            });
        }
        if !state.customers.iter().any(|c| c.id == request.customer_id) {
            return Err(GatewayError::Rejected(format!(
                "no such customer: {}",
                request.customer_id
            )));
        }
        let id = format!("cs_mock_{}", state.sessions.len() + 1);
        let session = CheckoutSession {
            url: Some(format!("https://checkout.mock.test/pay/{id}")),
            id: id.clone(),
            payment_status: PaymentStatus::Unpaid,
            subscription: None,
            customer: Some(request.customer_id.clone()),
        };
        state
            .sessions
            .insert(id, (session.clone(), request.price_id.clone()));
        Ok(session)
    }

    fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, GatewayError> {
        self.state
            .lock()
            .sessions
            .get(session_id)
            .map(|(session, _)| session.clone())
            .ok_or_else(|| GatewayError::NotFound {
                resource: "checkout session",
                id: session_id.to_string(),
            })
    }

    fn retrieve_subscription(&self, subscription_id: &str) -> Result<Subscription, GatewayError> {
        self.state
            .lock()
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                resource: "subscription",
                id: subscription_id.to_string(),
            })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
