//! Stripe REST adapter.
//!
//! Create calls are form-encoded POSTs with an `Idempotency-Key` header so
//! that a transport retry cannot create a second customer. Retrieval calls
//! are plain GETs.

use serde::Deserialize;

use crate::config::{trimmed, ConfigError, StripeConfig};
use crate::error::{excerpt, GatewayError};
use crate::payment::{
    CheckoutRequest, CheckoutSession, Customer, CustomerRequest, PaymentProvider, Plan,
    Subscription,
};
use crate::retry::retry_send;

/// [`PaymentProvider`] backed by the Stripe HTTP API.
#[derive(Debug)]
pub struct HttpStripeAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStripeAdapter {
    /// Build an adapter from configuration.
    pub fn new(config: &StripeConfig) -> Result<Self, GatewayError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {}",
            config.secret_key.as_str()
        ))
        .map_err(|_| ConfigError::InvalidHeader("STRIPE_SECRET_KEY"))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|source| GatewayError::Http {
                operation: "build_client",
                source,
            })?;

        Ok(Self {
            client,
            base_url: trimmed(&config.api_url).to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        operation: &'static str,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GatewayError> {
        let resp = retry_send(operation, || build().send())
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    GatewayError::Timeout { operation }
                } else {
                    GatewayError::Http { operation, source }
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = excerpt(resp.text().await.unwrap_or_default());
        tracing::warn!(operation, status = status.as_u16(), "stripe request failed");
        Err(GatewayError::Api {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        resp: reqwest::Response,
    ) -> Result<T, GatewayError> {
        resp.json::<T>()
            .await
            .map_err(|e| GatewayError::Deserialization {
                operation,
                reason: e.to_string(),
            })
    }

    fn block_on<T>(
        fut: impl std::future::Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| GatewayError::NoRuntime)?;
        rt.block_on(fut)
    }

    async fn get_with_not_found<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        resource: &'static str,
        path: String,
        id: &str,
    ) -> Result<T, GatewayError> {
        match self.send(operation, || self.client.get(self.url(&path))).await {
            Ok(resp) => Self::decode(operation, resp).await,
            Err(GatewayError::Api { status: 404, .. }) => Err(GatewayError::NotFound {
                resource,
                id: id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Form parameters for a subscription-mode checkout session.
fn checkout_form(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("customer", request.customer_id.clone()),
        ("payment_method_types[0]", "card".to_string()),
        ("line_items[0][price]", request.price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
    ];
    if let Some(coupon) = request.coupon_id.as_ref() {
        form.push(("discounts[0][coupon]", coupon.clone()));
    }
    form
}

#[derive(Deserialize)]
struct WireSubscription {
    id: String,
    status: String,
    #[serde(default)]
    plan: Option<WirePlan>,
    #[serde(default)]
    items: Option<WireItems>,
    #[serde(default)]
    current_period_start: Option<i64>,
    #[serde(default)]
    current_period_end: Option<i64>,
}

#[derive(Deserialize)]
struct WirePlan {
    id: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Deserialize)]
struct WireItems {
    data: Vec<WireItem>,
}

#[derive(Deserialize)]
struct WireItem {
    price: WirePrice,
    #[serde(default)]
    current_period_start: Option<i64>,
    #[serde(default)]
    current_period_end: Option<i64>,
}

#[derive(Deserialize)]
struct WirePrice {
    id: String,
    #[serde(default)]
    unit_amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

impl WireSubscription {
    /// Normalize legacy (`plan`, top-level periods) and current
    /// (`items.data[0]`) response shapes.
    fn into_subscription(self) -> Result<Subscription, GatewayError> {
        let missing = |what: &str| GatewayError::Deserialization {
            operation: "retrieve_subscription",
            reason: format!("subscription {} has no {what}", self.id),
        };
        let item = self.items.as_ref().and_then(|items| items.data.first());
        let plan = match (&self.plan, item) {
            (Some(p), _) => Plan {
                id: p.id.clone(),
                amount: p.amount.unwrap_or(0),
                currency: p.currency.clone(),
            },
            (None, Some(item)) => Plan {
                id: item.price.id.clone(),
                amount: item.price.unit_amount.unwrap_or(0),
                currency: item.price.currency.clone(),
            },
            (None, None) => return Err(missing("plan")),
        };
        let start = self
            .current_period_start
            .or_else(|| item.and_then(|i| i.current_period_start))
            .ok_or_else(|| missing("current_period_start"))?;
        let end = self
            .current_period_end
            .or_else(|| item.and_then(|i| i.current_period_end))
            .ok_or_else(|| missing("current_period_end"))?;
        Ok(Subscription {
            id: self.id,
            status: self.status,
            plan,
            current_period_start: start,
            current_period_end: end,
        })
    }
}

impl PaymentProvider for HttpStripeAdapter {
    fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, GatewayError> {
        const OP: &str = "create_customer";
        let form = [
            ("name", request.name.clone()),
            ("email", request.email.as_str().to_string()),
        ];
        Self::block_on(async {
            let resp = self
                .send(OP, || {
                    let mut req = self.client.post(self.url("/v1/customers")).form(&form);
                    if let Some(key) = request.idempotency_key.as_ref() {
                        req = req.header("Idempotency-Key", key.as_str());
                    }
                    req
                })
                .await?;
            Self::decode(OP, resp).await
        })
    }

    fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        const OP: &str = "create_checkout_session";
        let form = checkout_form(request);
        Self::block_on(async {
            let resp = self
                .send(OP, || {
                    self.client
                        .post(self.url("/v1/checkout/sessions"))
                        .form(&form)
                })
                .await?;
            Self::decode(OP, resp).await
        })
    }

    fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, GatewayError> {
        Self::block_on(self.get_with_not_found(
            "retrieve_session",
            "checkout session",
            format!("/v1/checkout/sessions/{session_id}"),
            session_id,
        ))
    }

    fn retrieve_subscription(&self, subscription_id: &str) -> Result<Subscription, GatewayError> {
        let wire: WireSubscription = Self::block_on(self.get_with_not_found(
            "retrieve_subscription",
            "subscription",
            format!("/v1/subscriptions/{subscription_id}"),
            subscription_id,
        ))?;
        wire.into_subscription()
    }

    fn provider_name(&self) -> &str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_form_includes_coupon_only_when_set() {
        let mut request = CheckoutRequest {
            price_id: "price_1".into(),
            customer_id: "cus_1".into(),
            success_url: "s".into(),
            cancel_url: "c".into(),
            coupon_id: None,
        };
        let form = checkout_form(&request);
        assert!(form.contains(&("mode", "subscription".to_string())));
        assert!(form.contains(&("line_items[0][quantity]", "1".to_string())));
        assert!(!form.iter().any(|(k, _)| k.starts_with("discounts")));

        request.coupon_id = Some("FREE".into());
        let form = checkout_form(&request);
        assert!(form.contains(&("discounts[0][coupon]", "FREE".to_string())));
    }

    #[test]
    fn legacy_subscription_shape() {
        let wire: WireSubscription = serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "status": "active",
            "plan": {"id": "price_basic", "amount": 9900, "currency": "usd"},
            "current_period_start": 1_700_000_000,
            "current_period_end": 1_700_000_000 + 30 * 86_400
        }))
        .unwrap();
        let sub = wire.into_subscription().unwrap();
        assert_eq!(sub.plan.id, "price_basic");
        assert_eq!(sub.duration_days(), 30);
    }

    #[test]
    fn item_based_subscription_shape() {
        let wire: WireSubscription = serde_json::from_value(serde_json::json!({
            "id": "sub_2",
            "status": "active",
            "items": {"data": [{
                "price": {"id": "price_premium", "unit_amount": 19900},
                "current_period_start": 0,
                "current_period_end": 365 * 86_400
            }]}
        }))
        .unwrap();
        let sub = wire.into_subscription().unwrap();
        assert_eq!(sub.plan.amount, 19900);
        assert_eq!(sub.duration_days(), 365);
    }

    #[test]
    fn subscription_without_plan_is_rejected() {
        let wire: WireSubscription = serde_json::from_value(serde_json::json!({
            "id": "sub_3",
            "status": "active",
            "current_period_start": 0,
            "current_period_end": 1
        }))
        .unwrap();
        assert!(matches!(
            wire.into_subscription(),
            Err(GatewayError::Deserialization { .. })
        ));
    }
}
