//! # Subscription Coordinator
//!
//! Opens checkout sessions and reconciles paid sessions into a
//! [`SubscriptionRecord`]. Plan types come from the [`PlanCatalog`] by the
//! billed price id; client input never decides the tier.

use std::sync::Arc;

use dtrust_core::Timestamp;
use dtrust_gateway::{CheckoutRequest, PaymentProvider};
use dtrust_state::OnboardingState;
use serde::{Deserialize, Serialize};

use crate::config::{CheckoutSettings, PlanCatalog};
use crate::error::OnboardingError;
use crate::model::{DeveloperRecord, SubscriptionRecord};
use crate::outcome::{Outcome, SagaStep};
use crate::store::{modify_developer_with, OnboardingStore};

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    /// Provider session id.
    pub session_id: String,
    /// Hosted checkout page.
    pub url: Option<String>,
}

/// Result of reconciling a paid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    /// Not paid yet.
    Unpaid,
    /// Paid and recorded. `newly_recorded` is false when the same
    /// subscription was already on the developer.
    Recorded {
        /// Developer as stored after the write.
        developer: DeveloperRecord,
        /// The recorded subscription.
        subscription: SubscriptionRecord,
        /// Whether this call wrote it.
        newly_recorded: bool,
    },
}

/// Checkout creation and payment confirmation.
pub struct SubscriptionCoordinator {
    store: Arc<dyn OnboardingStore>,
    payments: Arc<dyn PaymentProvider>,
    plans: PlanCatalog,
    checkout: CheckoutSettings,
}

impl SubscriptionCoordinator {
    /// Coordinator over the given provider and plan table.
    pub fn new(
        store: Arc<dyn OnboardingStore>,
        payments: Arc<dyn PaymentProvider>,
        plans: PlanCatalog,
        checkout: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            payments,
            plans,
            checkout,
        }
    }

    /// The offered plans.
    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }

    fn developer_for_customer(&self, customer_id: &str) -> Result<DeveloperRecord, OnboardingError> {
        if customer_id.trim().is_empty() {
            return Err(OnboardingError::Validation("customerId is required".into()));
        }
        self.store
            .developer_by_customer(customer_id.trim())?
            .ok_or_else(|| OnboardingError::NotFound(format!("developer for customer {customer_id}")))
    }

    /// Reject a checkout whose identifier name is already held by an
    /// identifier of someone else. Runs before any money moves.
    fn ensure_name_available(&self, developer: &DeveloperRecord) -> Result<(), OnboardingError> {
        let name = developer.identifier_name();
        match self.store.identifier_by_name(&name)? {
            Some(existing) if existing.owner != Some(developer.id) => Err(OnboardingError::Conflict(
                format!("identifier name {name} is already taken"),
            )),
            _ => Ok(()),
        }
    }

    /// Open a checkout session for `plan` and attach it to the developer.
    ///
    /// If the session was created upstream but the developer record cannot
    /// be updated, the session is still returned as `Partial` so the
    /// checkout is not lost.
    pub fn create_checkout_session(&self, plan: &str, customer_id: &str) -> Outcome<CheckoutView> {
        let entry = match self.plans.resolve(plan) {
            Some(entry) => entry.clone(),
            None => {
                return Outcome::Error(OnboardingError::Validation(format!(
                    "unknown plan {plan:?}"
                )))
            }
        };
        let developer = match self
            .developer_for_customer(customer_id)
            .and_then(|d| self.ensure_name_available(&d).map(|()| d))
        {
            Ok(d) => d,
            Err(e) => return Outcome::Error(e),
        };

        let session = match self.payments.create_checkout_session(&CheckoutRequest {
            price_id: entry.price_id.clone(),
            customer_id: customer_id.trim().to_string(),
            success_url: self.checkout.success_url.clone(),
            cancel_url: self.checkout.cancel_url.clone(),
            coupon_id: self.checkout.coupon_id.clone(),
        }) {
            Ok(s) => s,
            Err(e) => {
                let err = OnboardingError::from_payment(e);
                tracing::error!(developer_id = %developer.id, step = %SagaStep::CreateCheckout, error = %err, "checkout session creation failed");
                return Outcome::Error(err);
            }
        };
        let view = CheckoutView {
            session_id: session.id.clone(),
            url: session.url.clone(),
        };

        let recorded = modify_developer_with(self.store.as_ref(), &developer.id, |stored| {
            stored.checkout_session_id = Some(session.id.clone());
            stored
                .lifecycle
                .advance_to(OnboardingState::PaymentPending, "create_checkout_session")?;
            stored.updated_at = Timestamp::now();
            Ok::<_, OnboardingError>(true)
        });
        match recorded {
            Ok(_) => {
                tracing::info!(developer_id = %developer.id, session_id = %session.id, plan = %entry.key, "checkout session created");
                Outcome::Success(view)
            }
            Err(e) => {
                tracing::warn!(
                    developer_id = %developer.id,
                    session_id = %session.id,
                    step = %SagaStep::RecordCheckout,
                    error = %e,
                    "checkout session created but not recorded; reconcile from session id"
                );
                Outcome::partial(view, SagaStep::RecordCheckout, &e)
            }
        }
    }

    /// Check the session with the provider and, when paid, persist the
    /// subscription snapshot on the developer.
    pub fn confirm_payment(
        &self,
        session_id: &str,
        customer_id: &str,
    ) -> Result<PaymentState, OnboardingError> {
        if session_id.trim().is_empty() {
            return Err(OnboardingError::Validation("sessionId is required".into()));
        }
        let developer = self.developer_for_customer(customer_id)?;

        let session = self
            .payments
            .retrieve_session(session_id.trim())
            .map_err(OnboardingError::from_payment)?;
        if let Some(owner) = session.customer.as_deref() {
            if owner != customer_id.trim() {
                return Err(OnboardingError::Validation(
                    "checkout session belongs to a different customer".into(),
                ));
            }
        }
        if !session.payment_status.is_settled() {
            tracing::info!(developer_id = %developer.id, session_id, status = ?session.payment_status, "payment not settled");
            return Ok(PaymentState::Unpaid);
        }

        let subscription_id = session.subscription.clone().ok_or_else(|| {
            OnboardingError::upstream(
                crate::error::Collaborator::PaymentProvider,
                format!("paid session {} has no subscription", session.id),
            )
        })?;

        if let Some(existing) = developer.subscription.as_ref() {
            if existing.subscription_id == subscription_id {
                let subscription = existing.clone();
                return Ok(PaymentState::Recorded {
                    developer,
                    subscription,
                    newly_recorded: false,
                });
            }
        }

        let upstream = self
            .payments
            .retrieve_subscription(&subscription_id)
            .map_err(OnboardingError::from_payment)?;
        let plan_type = self.plans.plan_type_for_price(&upstream.plan.id).ok_or_else(|| {
            OnboardingError::Validation(format!(
                "price {} is not in the plan catalog",
                upstream.plan.id
            ))
        })?;
        let start = Timestamp::from_epoch_secs(upstream.current_period_start)?;
        let end = Timestamp::from_epoch_secs(upstream.current_period_end)?;

        let subscription = SubscriptionRecord {
            session_id: session.id.clone(),
            subscription_id,
            plan_id: upstream.plan.id.clone(),
            plan_type,
            start_date: start,
            end_date: end,
            duration_days: upstream.duration_days(),
        };
        // Another confirmation may have recorded the same subscription and
        // moved the lifecycle on while the provider was being asked.
        let mut newly_recorded = false;
        let developer = modify_developer_with(self.store.as_ref(), &developer.id, |stored| {
            if stored.subscription.as_ref().map(|s| &s.subscription_id)
                == Some(&subscription.subscription_id)
            {
                return Ok(false);
            }
            stored.checkout_session_id = Some(subscription.session_id.clone());
            stored.subscription = Some(subscription.clone());
            stored
                .lifecycle
                .advance_to(OnboardingState::Subscribed, "confirm_payment")?;
            stored.updated_at = Timestamp::now();
            newly_recorded = true;
            Ok::<_, OnboardingError>(true)
        })?;
        if !newly_recorded {
            let subscription = developer.subscription.clone().unwrap_or(subscription);
            return Ok(PaymentState::Recorded {
                developer,
                subscription,
                newly_recorded,
            });
        }
        tracing::info!(
            developer_id = %developer.id,
            session_id = %session.id,
            plan_type = %plan_type,
            duration_days = subscription.duration_days,
            "subscription recorded"
        );
        Ok(PaymentState::Recorded {
            developer,
            subscription,
            newly_recorded: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OnboardingConfig;
    use crate::error::ErrorKind;
    use crate::model::{
        CredentialRecord, DeveloperProfile, ExtensionType, IdentifierRecord, IdentifierType,
        PlanType,
    };
    use crate::store::{MemoryStore, StoreError};
    use dtrust_core::{CredentialId, DeveloperId, Did, Email};
    use dtrust_gateway::{CustomerRequest, MockPaymentProvider};
    use dtrust_state::{IdentifierStatus, OnboardingLifecycle};

    /// Serves a fixed developer snapshot for customer lookups, as seen by a
    /// confirmation that read before a concurrent one finished.
    struct SnapshotLookups {
        inner: Arc<MemoryStore>,
        snapshot: DeveloperRecord,
    }

    impl OnboardingStore for SnapshotLookups {
        fn insert_developer(&self, record: DeveloperRecord) -> Result<(), StoreError> {
            self.inner.insert_developer(record)
        }
        fn update_developer(&self, record: &DeveloperRecord) -> Result<(), StoreError> {
            self.inner.update_developer(record)
        }
        fn modify_developer(
            &self,
            id: &DeveloperId,
            change: &mut dyn FnMut(&mut DeveloperRecord) -> bool,
        ) -> Result<DeveloperRecord, StoreError> {
            self.inner.modify_developer(id, change)
        }
        fn developer(&self, id: &DeveloperId) -> Result<Option<DeveloperRecord>, StoreError> {
            self.inner.developer(id)
        }
        fn developer_by_email(&self, email: &Email) -> Result<Option<DeveloperRecord>, StoreError> {
            self.inner.developer_by_email(email)
        }
        fn developer_by_customer(&self, _: &str) -> Result<Option<DeveloperRecord>, StoreError> {
            Ok(Some(self.snapshot.clone()))
        }
        fn developer_by_identifier_name(
            &self,
            name: &str,
        ) -> Result<Option<DeveloperRecord>, StoreError> {
            self.inner.developer_by_identifier_name(name)
        }
        fn developer_by_domain(
            &self,
            domain_name: &str,
            extension_type: ExtensionType,
        ) -> Result<Option<DeveloperRecord>, StoreError> {
            self.inner.developer_by_domain(domain_name, extension_type)
        }
        fn insert_identifier(&self, record: IdentifierRecord) -> Result<(), StoreError> {
            self.inner.insert_identifier(record)
        }
        fn update_identifier(&self, record: &IdentifierRecord) -> Result<(), StoreError> {
            self.inner.update_identifier(record)
        }
        fn identifier_by_name(&self, name: &str) -> Result<Option<IdentifierRecord>, StoreError> {
            self.inner.identifier_by_name(name)
        }
        fn identifier_by_uri(&self, uri: &Did) -> Result<Option<IdentifierRecord>, StoreError> {
            self.inner.identifier_by_uri(uri)
        }
        fn search_identifiers(
            &self,
            needle: &str,
            limit: usize,
        ) -> Result<Vec<IdentifierRecord>, StoreError> {
            self.inner.search_identifiers(needle, limit)
        }
        fn insert_credential(&self, record: CredentialRecord) -> Result<(), StoreError> {
            self.inner.insert_credential(record)
        }
        fn update_credential(&self, record: &CredentialRecord) -> Result<(), StoreError> {
            self.inner.update_credential(record)
        }
        fn credential(&self, id: &CredentialId) -> Result<Option<CredentialRecord>, StoreError> {
            self.inner.credential(id)
        }
        fn credential_by_issuance_key(
            &self,
            key: &str,
        ) -> Result<Option<CredentialRecord>, StoreError> {
            self.inner.credential_by_issuance_key(key)
        }
        fn credentials_for(&self, owner: &DeveloperId) -> Result<Vec<CredentialRecord>, StoreError> {
            self.inner.credentials_for(owner)
        }
    }

    struct Fixture {
        coordinator: SubscriptionCoordinator,
        store: Arc<MemoryStore>,
        payments: Arc<MockPaymentProvider>,
        customer_id: String,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let payments = Arc::new(
            MockPaymentProvider::new()
                .with_price("price_basic", 9_900)
                .with_price("price_premium", 19_900)
                .with_price("price_unlisted", 1),
        );
        let email = Email::new("pay@example.com").unwrap();
        let customer = payments
            .create_customer(&CustomerRequest {
                name: "Pay Er".into(),
                email: email.clone(),
                idempotency_key: None,
            })
            .unwrap();
        let mut lifecycle = OnboardingLifecycle::new();
        lifecycle.advance_to(OnboardingState::CodeIssued, "t").unwrap();
        lifecycle.advance_to(OnboardingState::EmailVerified, "t").unwrap();
        let now = Timestamp::now();
        store
            .insert_developer(DeveloperRecord {
                id: DeveloperId::new(),
                email,
                profile: DeveloperProfile::default(),
                domain_name: "pay".into(),
                extension_type: ExtensionType::Service,
                extension_name: "svc".into(),
                email_verified: true,
                challenge: None,
                payment_customer_id: Some(customer.id.clone()),
                checkout_session_id: None,
                subscription: None,
                lifecycle,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        let config = OnboardingConfig::for_tests();
        Fixture {
            coordinator: SubscriptionCoordinator::new(
                store.clone(),
                payments.clone(),
                config.plans,
                config.checkout,
            ),
            store,
            payments,
            customer_id: customer.id,
        }
    }

    #[test]
    fn unknown_plan_is_rejected_before_provider_call() {
        let f = fixture();
        let outcome = f.coordinator.create_checkout_session("platinum", &f.customer_id);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Validation));
    }

    #[test]
    fn checkout_records_session_and_state() {
        let f = fixture();
        let view = f
            .coordinator
            .create_checkout_session("premium", &f.customer_id)
            .into_value()
            .unwrap();
        let dev = f.store.developer_by_customer(&f.customer_id).unwrap().unwrap();
        assert_eq!(dev.checkout_session_id.as_deref(), Some(view.session_id.as_str()));
        assert_eq!(dev.state(), OnboardingState::PaymentPending);
    }

    #[test]
    fn unpaid_session_writes_nothing() {
        let f = fixture();
        let view = f
            .coordinator
            .create_checkout_session("basic", &f.customer_id)
            .into_value()
            .unwrap();
        let state = f.coordinator.confirm_payment(&view.session_id, &f.customer_id).unwrap();
        assert_eq!(state, PaymentState::Unpaid);
        let dev = f.store.developer_by_customer(&f.customer_id).unwrap().unwrap();
        assert!(dev.subscription.is_none());
    }

    #[test]
    fn paid_premium_session_records_premium() {
        let f = fixture();
        let view = f
            .coordinator
            .create_checkout_session("premium", &f.customer_id)
            .into_value()
            .unwrap();
        f.payments.complete_session(&view.session_id).unwrap();

        match f.coordinator.confirm_payment(&view.session_id, &f.customer_id).unwrap() {
            PaymentState::Recorded {
                subscription,
                newly_recorded,
                developer,
            } => {
                assert!(newly_recorded);
                assert_eq!(subscription.plan_type, PlanType::Premium);
                assert_eq!(subscription.duration_days, 365);
                assert_eq!(developer.state(), OnboardingState::Subscribed);
            }
            other => panic!("unexpected {other:?}"),
        }

        // Second confirmation is a no-op.
        match f.coordinator.confirm_payment(&view.session_id, &f.customer_id).unwrap() {
            PaymentState::Recorded { newly_recorded, .. } => assert!(!newly_recorded),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn price_outside_catalog_is_rejected() {
        let f = fixture();
        let session = f
            .payments
            .create_checkout_session(&CheckoutRequest {
                price_id: "price_unlisted".into(),
                customer_id: f.customer_id.clone(),
                success_url: String::new(),
                cancel_url: String::new(),
                coupon_id: None,
            })
            .unwrap();
        f.payments.complete_session(&session.id).unwrap();
        let err = f
            .coordinator
            .confirm_payment(&session.id, &f.customer_id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn unknown_customer_is_not_found() {
        let f = fixture();
        let err = f.coordinator.confirm_payment("cs_x", "cus_nobody").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn provider_failure_is_upstream() {
        let f = fixture();
        f.payments.fail_checkout_creation(true);
        let outcome = f.coordinator.create_checkout_session("basic", &f.customer_id);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Upstream));
    }

    #[test]
    fn checkout_for_taken_identifier_name_is_conflict() {
        let f = fixture();
        let now = Timestamp::now();
        f.store
            .insert_identifier(IdentifierRecord {
                name: "pay.svc".into(),
                uri: Did::new("did:dtrust:0f").unwrap(),
                document: serde_json::json!({}),
                owner: Some(DeveloperId::new()),
                identifier_type: IdentifierType::Service,
                status: IdentifierStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let outcome = f.coordinator.create_checkout_session("basic", &f.customer_id);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Conflict));
        let dev = f.store.developer_by_customer(&f.customer_id).unwrap().unwrap();
        assert!(dev.checkout_session_id.is_none());
        assert_eq!(dev.state(), OnboardingState::EmailVerified);
    }

    #[test]
    fn stale_confirmation_never_moves_lifecycle_back() {
        let f = fixture();
        let view = f
            .coordinator
            .create_checkout_session("basic", &f.customer_id)
            .into_value()
            .unwrap();
        f.payments.complete_session(&view.session_id).unwrap();
        let snapshot = f.store.developer_by_customer(&f.customer_id).unwrap().unwrap();
        assert!(snapshot.subscription.is_none());

        f.coordinator
            .confirm_payment(&view.session_id, &f.customer_id)
            .unwrap();
        f.store
            .modify_developer(&snapshot.id, &mut |d| {
                d.lifecycle
                    .advance_to(OnboardingState::IdentifierIssued, "test")
                    .unwrap();
                d.lifecycle
                    .advance_to(OnboardingState::CredentialIssued, "test")
                    .unwrap();
                true
            })
            .unwrap();

        let config = OnboardingConfig::for_tests();
        let late = SubscriptionCoordinator::new(
            Arc::new(SnapshotLookups {
                inner: f.store.clone(),
                snapshot: snapshot.clone(),
            }),
            f.payments.clone(),
            config.plans,
            config.checkout,
        );
        match late.confirm_payment(&view.session_id, &f.customer_id).unwrap() {
            PaymentState::Recorded {
                developer,
                newly_recorded,
                ..
            } => {
                assert!(!newly_recorded);
                assert_eq!(developer.state(), OnboardingState::CredentialIssued);
            }
            other => panic!("unexpected {other:?}"),
        }
        let stored = f.store.developer(&snapshot.id).unwrap().unwrap();
        assert_eq!(stored.state(), OnboardingState::CredentialIssued);
    }
}
