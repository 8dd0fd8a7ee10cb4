//! # Onboarding Saga
//!
//! Entry points for every onboarding operation. Each returns an
//! [`Outcome`] so the transport decides status codes.
//!
//! ## Lifecycle
//!
//! ```text
//! register ─▶ issue_challenge ─▶ verify_challenge ─▶ create_checkout_session
//!                                        │                      │
//!                                        │                      ▼
//!                                        │               confirm_payment ──┐
//!                                        └──────────▶ direct_issue ─────────┤
//!                                                                          ▼
//!                                  identifier ─▶ credential ─▶ notify ─▶ CredentialIssued
//! ```
//!
//! The issuance continuation is level-triggered. Each sub-step checks the
//! store before acting (identifier by name, credential by issuance key),
//! so re-invoking after a crash resumes at the first missing step without
//! duplicating anything. A failure after an earlier step committed is
//! returned as [`Outcome::Partial`]; nothing is rolled back.

use std::sync::Arc;

use dtrust_core::{CredentialId, DeveloperId, Did, Email, Timestamp, ValidationError};
use dtrust_crypto::OneTimeCode;
use dtrust_gateway::{CustomerRequest, Notification, NotificationDispatcher, PaymentProvider};
use dtrust_state::OnboardingState;
use dtrust_vc::{CredentialRegistry, IdentityRegistry, IssuerIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::OnboardingConfig;
use crate::credential::{CredentialIssuer, IssueRequest};
use crate::error::{Collaborator, OnboardingError};
use crate::identity::IdentityIssuer;
use crate::model::{
    CredentialView, DeveloperProfile, DeveloperRecord, DeveloperSummary, ExtensionType,
    IdentifierView, PublicProfile, RegistrationRequest, SubscriptionRecord,
};
use crate::notifications;
use crate::outcome::{Outcome, SagaStep};
use crate::store::{modify_developer_with, OnboardingStore, StoreError};
use crate::subscription::{CheckoutView, PaymentState, SubscriptionCoordinator};
use crate::verification::{ChallengeCheck, VerificationCodeManager};

/// The external systems the saga is wired to.
pub struct Collaborators {
    /// Record persistence.
    pub store: Arc<dyn OnboardingStore>,
    /// Payment provider.
    pub payments: Arc<dyn PaymentProvider>,
    /// Creates and resolves DIDs.
    pub identity_registry: Arc<dyn IdentityRegistry>,
    /// Signs and verifies credentials.
    pub credential_registry: Arc<dyn CredentialRegistry>,
    /// Outbound mail.
    pub notifier: Arc<dyn NotificationDispatcher>,
    /// Identity every saga credential is issued under.
    pub issuer: Arc<IssuerIdentity>,
}

/// Locates a developer for code issuance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Registered email.
    pub email: String,
    /// Registered domain label.
    pub domain_name: String,
    /// Registered extension kind.
    pub extension_type: String,
}

/// A submitted verification code.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    /// Registered email.
    pub email: String,
    /// The six-digit code from the mail.
    pub code: String,
}

/// Checkout for a plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCommand {
    /// Plan key or price id.
    #[serde(alias = "priceId")]
    pub plan: String,
    /// Payment customer created at verification.
    pub customer_id: String,
}

/// A returning checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    /// Checkout session returned by the provider.
    pub session_id: String,
    /// Customer the session was opened for.
    pub customer_id: String,
}

/// Ad-hoc credential issuance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdHocCredentialRequest {
    /// Credential type name.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Must be the configured issuer DID.
    pub issuer: String,
    /// Subject DID.
    pub subject: String,
    /// Subject claims; must be a JSON object.
    pub claims: Value,
}

/// A clicked credential verification link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialConfirmation {
    /// Compact credential from the link.
    #[serde(alias = "vcJwt")]
    pub credential_jwt: String,
    /// Unix seconds when the link was generated.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Credential id from the link.
    #[serde(alias = "uuid")]
    pub credential_id: String,
    /// Email of the owning developer.
    pub email: String,
}

/// Result of `issue_challenge`. The code itself travels only by mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeIssued {
    /// Developer the code was issued to.
    pub developer_id: DeveloperId,
    /// Code expiry; absent when already verified.
    pub expires_at: Option<Timestamp>,
    /// The email was verified earlier and no code was sent.
    pub already_verified: bool,
}

/// Result of `verify_challenge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailVerification {
    /// Verified developer.
    pub developer_id: DeveloperId,
    /// Payment customer to check out with.
    pub customer_id: String,
    /// Always true on success.
    pub verified: bool,
}

/// What the issuance continuation has committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceReport {
    /// Developer being onboarded.
    pub developer_id: DeveloperId,
    /// Recorded subscription, if any.
    pub subscription: Option<SubscriptionRecord>,
    /// Issued identifier, once created.
    pub identifier: Option<IdentifierView>,
    /// Issued credential, once signed.
    pub credential: Option<CredentialView>,
    /// Compact form of the credential.
    pub credential_jwt: Option<String>,
    /// Whether the credentials mail was accepted during this invocation.
    pub notified: bool,
}

/// An issued ad-hoc credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentialView {
    /// The stored credential.
    pub credential: CredentialView,
    /// Its compact form.
    pub credential_jwt: String,
}

/// Top-level coordinator.
pub struct OnboardingSaga {
    store: Arc<dyn OnboardingStore>,
    payments: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn NotificationDispatcher>,
    config: OnboardingConfig,
    codes: VerificationCodeManager,
    identities: IdentityIssuer,
    credentials: CredentialIssuer,
    subscriptions: SubscriptionCoordinator,
}

/// Domain and extension names: ASCII letters, digits and hyphens.
fn check_label(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidField {
            field,
            reason: "only letters, digits and '-' are allowed".to_string(),
        });
    }
    Ok(value.to_string())
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

fn invalid_code() -> OnboardingError {
    OnboardingError::Validation("invalid or expired verification code".into())
}

fn name_taken(name: &str) -> OnboardingError {
    OnboardingError::Conflict(format!("identifier name {name} is already taken"))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl OnboardingSaga {
    /// Wire the saga.
    pub fn new(collaborators: Collaborators, config: OnboardingConfig) -> Self {
        let Collaborators {
            store,
            payments,
            identity_registry,
            credential_registry,
            notifier,
            issuer,
        } = collaborators;
        Self {
            codes: VerificationCodeManager::new(store.clone(), config.code_ttl_secs),
            identities: IdentityIssuer::new(store.clone(), identity_registry),
            credentials: CredentialIssuer::new(store.clone(), credential_registry, issuer),
            subscriptions: SubscriptionCoordinator::new(
                store.clone(),
                payments.clone(),
                config.plans.clone(),
                config.checkout.clone(),
            ),
            store,
            payments,
            notifier,
            config,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &OnboardingConfig {
        &self.config
    }

    /// DID of the issuer identity.
    pub fn issuer_did(&self) -> &Did {
        self.credentials.issuer_did()
    }

    fn finish<T>(&self, operation: &'static str, outcome: Outcome<T>) -> Outcome<T> {
        match &outcome {
            Outcome::Error(e @ OnboardingError::Upstream { .. }) => {
                tracing::error!(operation, error = %e, "operation failed upstream");
            }
            Outcome::Error(e) => {
                tracing::info!(operation, kind = e.kind().as_str(), reason = %e, "operation rejected");
            }
            Outcome::Partial { failed_step, .. } => {
                tracing::warn!(operation, failed_step = %failed_step, "operation partially completed");
            }
            other => tracing::debug!(operation, status = other.status(), "operation finished"),
        }
        outcome
    }

    fn notify(&self, notification: &Notification, developer_id: DeveloperId) -> bool {
        let sent = self.notifier.send(notification);
        if !sent {
            tracing::warn!(
                developer_id = %developer_id,
                recipient = notification.to.masked(),
                subject = %notification.subject,
                "notification not delivered"
            );
        }
        sent
    }

    fn developer_by_email(&self, email: &Email) -> Result<DeveloperRecord, OnboardingError> {
        self.store
            .developer_by_email(email)?
            .ok_or_else(|| OnboardingError::NotFound("developer".into()))
    }

    fn developer_by_id(&self, id: &DeveloperId) -> Result<DeveloperRecord, OnboardingError> {
        self.store
            .developer(id)?
            .ok_or_else(|| OnboardingError::NotFound(format!("developer {id}")))
    }

    /// Advance the stored record atomically. A stale in-memory copy never
    /// overwrites fields written by another step.
    fn advance_developer(
        &self,
        id: &DeveloperId,
        target: OnboardingState,
        reason: &str,
    ) -> Result<DeveloperRecord, OnboardingError> {
        modify_developer_with(self.store.as_ref(), id, |developer| {
            let applied = developer.lifecycle.advance_to(target, reason)?.is_applied();
            if applied {
                developer.updated_at = Timestamp::now();
            }
            Ok::<_, OnboardingError>(applied)
        })
    }

    // ── Registration and email verification ────────────────────────────

    /// Create a developer record in `Registered`.
    pub fn register(&self, request: RegistrationRequest) -> Outcome<DeveloperSummary> {
        self.finish("register", self.try_register(request).into())
    }

    fn try_register(&self, request: RegistrationRequest) -> Result<DeveloperSummary, OnboardingError> {
        let first_name = required("firstName", &request.first_name)?;
        let last_name = required("lastName", &request.last_name)?;
        let email = Email::new(&request.email)?;
        let domain_name = check_label("domainName", &request.domain_name)?;
        let extension_type: ExtensionType = request.extension_type.parse()?;
        let extension_name = match optional(request.extension_name) {
            Some(name) => check_label("extensionName", &name)?,
            None => extension_type.as_str().to_string(),
        };

        if self.store.developer_by_email(&email)?.is_some() {
            return Err(OnboardingError::Conflict("developer already exists".into()));
        }
        let identifier_name = format!("{domain_name}.{extension_name}");
        if self.store.developer_by_identifier_name(&identifier_name)?.is_some()
            || self.store.identifier_by_name(&identifier_name)?.is_some()
        {
            return Err(name_taken(&identifier_name));
        }

        let now = Timestamp::now();
        let record = DeveloperRecord {
            id: DeveloperId::new(),
            email,
            profile: DeveloperProfile {
                first_name,
                last_name,
                company_name: optional(request.company_name),
                description: optional(request.description),
                web_link: optional(request.web_link),
                linked_in: optional(request.linked_in),
                github: optional(request.github),
                hugging_face: optional(request.hugging_face),
            },
            domain_name,
            extension_type,
            extension_name,
            email_verified: false,
            challenge: None,
            payment_customer_id: None,
            checkout_session_id: None,
            subscription: None,
            lifecycle: Default::default(),
            created_at: now,
            updated_at: now,
        };
        let summary = record.summary();
        match self.store.insert_developer(record) {
            Ok(()) => {}
            Err(StoreError::Conflict {
                entity: "identifier name",
                ..
            }) => return Err(name_taken(&identifier_name)),
            Err(StoreError::Conflict { .. }) => {
                return Err(OnboardingError::Conflict("developer already exists".into()))
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(developer_id = %summary.id, email = summary.email.masked(), "developer registered");
        Ok(summary)
    }

    /// Issue a verification code and mail it. The developer is located by
    /// email, domain name and extension type together.
    pub fn issue_challenge(&self, request: ChallengeRequest) -> Outcome<ChallengeIssued> {
        self.finish("issue_challenge", self.try_issue_challenge(request).into())
    }

    fn try_issue_challenge(&self, request: ChallengeRequest) -> Result<ChallengeIssued, OnboardingError> {
        let email = Email::new(&request.email)?;
        let extension_type: ExtensionType = request.extension_type.parse()?;
        let mut developer = self.developer_by_email(&email)?;
        if developer.domain_name != request.domain_name.trim()
            || developer.extension_type != extension_type
        {
            return Err(OnboardingError::NotFound("developer".into()));
        }
        if developer.email_verified {
            return Ok(ChallengeIssued {
                developer_id: developer.id,
                expires_at: None,
                already_verified: true,
            });
        }

        let code = self.codes.issue_challenge(&mut developer, Timestamp::now())?;
        let mail = notifications::verification_code(&developer.email, &code, self.config.code_ttl_secs);
        if !self.notify(&mail, developer.id) {
            // An undelivered code is useless; the stored challenge stays
            // valid so the client can simply ask again.
            return Err(OnboardingError::upstream(
                Collaborator::Notification,
                "verification code mail was not accepted",
            ));
        }
        Ok(ChallengeIssued {
            developer_id: developer.id,
            expires_at: developer.challenge.as_ref().map(|c| c.expires_at),
            already_verified: false,
        })
    }

    /// Check a submitted code. On success the challenge is invalidated
    /// first, then the payment customer is created (or reused) and the
    /// developer becomes `EmailVerified`.
    ///
    /// Wrong, expired and already-used codes are indistinguishable to the
    /// caller.
    pub fn verify_challenge(&self, request: VerifyRequest) -> Outcome<EmailVerification> {
        self.finish("verify_challenge", self.try_verify_challenge(request).into())
    }

    fn try_verify_challenge(&self, request: VerifyRequest) -> Result<EmailVerification, OnboardingError> {
        let email = Email::new(&request.email)?;
        let submitted = OneTimeCode::from_submitted(&request.code);
        let developer = self.developer_by_email(&email)?;

        let now = Timestamp::now();
        let check = self.codes.check(&developer, &submitted, now);
        if check != ChallengeCheck::Matched {
            tracing::info!(developer_id = %developer.id, reason = check.as_str(), "verification code rejected");
            return Err(invalid_code());
        }
        if !self.codes.consume(&developer)? {
            tracing::info!(developer_id = %developer.id, reason = "already_consumed", "verification code rejected");
            return Err(invalid_code());
        }

        let customer_id = match developer.payment_customer_id.clone() {
            Some(id) => id,
            None => {
                let customer = self
                    .payments
                    .create_customer(&CustomerRequest {
                        name: developer.profile.display_name(),
                        email: developer.email.clone(),
                        idempotency_key: Some(format!("dtrust-customer-{}", developer.id)),
                    })
                    .map_err(|e| {
                        let err = OnboardingError::from_payment(e);
                        tracing::error!(
                            developer_id = %developer.id,
                            step = %SagaStep::CreateCustomer,
                            error = %err,
                            "payment customer creation failed; email stays unverified"
                        );
                        err
                    })?;
                customer.id
            }
        };

        modify_developer_with(self.store.as_ref(), &developer.id, |stored| {
            stored.payment_customer_id = Some(customer_id.clone());
            stored.email_verified = true;
            stored
                .lifecycle
                .advance_to(OnboardingState::EmailVerified, "verify_challenge")?;
            stored.updated_at = now;
            Ok::<_, OnboardingError>(true)
        })?;
        tracing::info!(developer_id = %developer.id, "email verified");
        Ok(EmailVerification {
            developer_id: developer.id,
            customer_id,
            verified: true,
        })
    }

    // ── Payment ────────────────────────────────────────────────────────

    /// Open a checkout session.
    pub fn create_checkout_session(&self, command: CheckoutCommand) -> Outcome<CheckoutView> {
        self.finish(
            "create_checkout_session",
            self.subscriptions
                .create_checkout_session(&command.plan, &command.customer_id),
        )
    }

    /// Reconcile a checkout and, once paid, run the issuance continuation.
    ///
    /// Unpaid sessions yield `Pending`. Once the subscription is persisted,
    /// later failures yield `Partial`; invoking again resumes.
    pub fn confirm_payment(&self, confirmation: PaymentConfirmation) -> Outcome<IssuanceReport> {
        let outcome = match self
            .subscriptions
            .confirm_payment(&confirmation.session_id, &confirmation.customer_id)
        {
            Err(e) => Outcome::Error(e),
            Ok(PaymentState::Unpaid) => Outcome::Pending {
                reason: "payment has not been completed".into(),
            },
            Ok(PaymentState::Recorded {
                developer,
                subscription,
                newly_recorded,
            }) => {
                if newly_recorded {
                    let mail = notifications::subscription_confirmed(&developer.email, &subscription);
                    self.notify(&mail, developer.id);
                }
                self.continue_issuance(&developer, Some(subscription), true)
            }
        };
        self.finish("confirm_payment", outcome)
    }

    /// Run the issuance continuation for a verified developer without a
    /// payment. Also resumes a partially failed pipeline.
    pub fn direct_issue(&self, developer_id: &DeveloperId) -> Outcome<IssuanceReport> {
        let outcome = match self.developer_by_id(developer_id) {
            Err(e) => Outcome::Error(e),
            Ok(developer) if !developer.email_verified => Outcome::Error(
                OnboardingError::Validation("developer email is not verified".into()),
            ),
            Ok(developer) => {
                let subscription = developer.subscription.clone();
                self.continue_issuance(&developer, subscription, false)
            }
        };
        self.finish("direct_issue", outcome)
    }

    fn halt(
        &self,
        report: IssuanceReport,
        committed: bool,
        step: SagaStep,
        err: OnboardingError,
    ) -> Outcome<IssuanceReport> {
        tracing::error!(
            developer_id = %report.developer_id,
            step = %step,
            error = %err,
            "issuance step failed; re-invoke to resume"
        );
        if committed {
            Outcome::partial(report, step, &err)
        } else {
            Outcome::Error(err)
        }
    }

    fn onboarding_claims(developer: &DeveloperRecord, subscription: Option<&SubscriptionRecord>) -> Map<String, Value> {
        let start = subscription
            .map(|s| s.start_date)
            .unwrap_or_else(Timestamp::now);
        let mut claims = Map::new();
        claims.insert("email".into(), Value::String(developer.email.as_str().to_string()));
        claims.insert(
            "company".into(),
            Value::String(developer.profile.company_name.clone().unwrap_or_default()),
        );
        claims.insert("startDate".into(), Value::String(start.to_iso8601()));
        claims.insert(
            "domain".into(),
            Value::String(format!("{}{}", developer.domain_name, developer.extension_name)),
        );
        claims
    }

    /// Identifier, credential, notification. `committed` says whether an
    /// earlier step of the calling operation has already been persisted.
    fn continue_issuance(
        &self,
        developer: &DeveloperRecord,
        subscription: Option<SubscriptionRecord>,
        committed: bool,
    ) -> Outcome<IssuanceReport> {
        let mut report = IssuanceReport {
            developer_id: developer.id,
            subscription: subscription.clone(),
            identifier: None,
            credential: None,
            credential_jwt: None,
            notified: false,
        };

        let identifier = match self.identities.ensure_identifier(
            &developer.identifier_name(),
            developer.id,
            developer.extension_type.identifier_type(),
        ) {
            Ok(record) => record,
            Err(e) => return self.halt(report, committed, SagaStep::CreateIdentifier, e),
        };
        report.identifier = Some(identifier.view());
        if let Err(e) = self.advance_developer(&developer.id, OnboardingState::IdentifierIssued, "create_identifier") {
            return self.halt(report, true, SagaStep::RecordIssuance, e);
        }

        let request = IssueRequest {
            credential_type: developer.extension_type.as_str().to_string(),
            issuer: self.credentials.issuer_did().clone(),
            subject: identifier.uri.clone(),
            claims: Self::onboarding_claims(developer, subscription.as_ref()),
            owner: Some(developer.id),
            issuance_key: Some(format!("onboarding:{}", developer.id)),
        };
        let issued = match self
            .credentials
            .ensure_credential(request, self.config.subscription_validity)
        {
            Ok(issued) => issued,
            Err(e) => return self.halt(report, true, SagaStep::IssueCredential, e),
        };
        report.credential = Some(issued.record.view());
        report.credential_jwt = Some(issued.record.compact.clone());

        if let Err(e) = self.identities.activate(&identifier.uri) {
            return self.halt(report, true, SagaStep::RecordIssuance, e);
        }

        // Mail before the final transition: a crash in between re-sends
        // on resume (at-least-once) rather than never sending.
        let current = match self.developer_by_id(&developer.id) {
            Ok(d) => d,
            Err(e) => return self.halt(report, true, SagaStep::RecordIssuance, e),
        };
        if !current.lifecycle.has_reached(OnboardingState::CredentialIssued) {
            let credential_json = serde_json::to_string_pretty(&issued.record.credential)
                .unwrap_or_default();
            let mail = notifications::credentials_issued(
                &developer.email,
                &identifier.uri,
                &credential_json,
                &issued.record.id,
                &issued.record.compact,
            );
            report.notified = self.notify(&mail, developer.id);
        }
        if let Err(e) = self.advance_developer(&developer.id, OnboardingState::CredentialIssued, "issue_credential") {
            return self.halt(report, true, SagaStep::RecordIssuance, e);
        }

        tracing::info!(
            developer_id = %developer.id,
            uri = %identifier.uri,
            credential_id = %issued.record.id,
            "onboarding issuance complete"
        );
        Outcome::Success(report)
    }

    // ── Credentials ────────────────────────────────────────────────────

    /// Issue a credential with arbitrary claims under the ad-hoc policy.
    pub fn issue_ad_hoc_credential(&self, request: AdHocCredentialRequest) -> Outcome<IssuedCredentialView> {
        self.finish("issue_ad_hoc_credential", self.try_issue_ad_hoc(request).into())
    }

    fn try_issue_ad_hoc(&self, request: AdHocCredentialRequest) -> Result<IssuedCredentialView, OnboardingError> {
        let issuer = Did::new(request.issuer.trim())?;
        let subject = Did::new(request.subject.trim())?;
        let claims = match request.claims {
            Value::Object(map) => map,
            _ => {
                return Err(OnboardingError::Validation("claims must be a JSON object".into()))
            }
        };
        let issued = self.credentials.issue_credential(
            IssueRequest {
                credential_type: request.credential_type.trim().to_string(),
                issuer,
                subject,
                claims,
                owner: None,
                issuance_key: None,
            },
            self.config.ad_hoc_validity,
        )?;
        Ok(IssuedCredentialView {
            credential: issued.record.view(),
            credential_jwt: issued.record.compact,
        })
    }

    /// Verify a compact credential. Read-only.
    pub fn verify_credential(&self, compact: &str) -> Outcome<bool> {
        self.finish("verify_credential", self.credentials.verify_credential(compact).into())
    }

    /// Confirm a credential verification link: replay window, signature,
    /// ownership, then `UnVerified → Verified` and a confirmation mail.
    pub fn confirm_credential_verification(&self, confirmation: CredentialConfirmation) -> Outcome<CredentialView> {
        self.finish(
            "confirm_credential_verification",
            self.try_confirm_credential(confirmation).into(),
        )
    }

    fn try_confirm_credential(&self, confirmation: CredentialConfirmation) -> Result<CredentialView, OnboardingError> {
        let email = Email::new(&confirmation.email)?;
        let credential_id = CredentialId::new(confirmation.credential_id.trim())?;
        let developer = self.developer_by_email(&email)?;
        let (record, transition) = self.credentials.confirm_verification(
            &confirmation.credential_jwt,
            confirmation.timestamp,
            &credential_id,
            Some(developer.id),
            self.config.replay_window_secs,
        )?;
        if transition.is_applied() {
            let profile_url = format!(
                "{}/profile?name={}",
                self.config.profile_base_url,
                developer.profile_name()
            );
            self.notify(&notifications::credential_verified(&developer.email, &profile_url), developer.id);
        }
        Ok(record.view())
    }

    /// Revoke a credential.
    pub fn revoke_credential(&self, credential_id: &str) -> Outcome<CredentialView> {
        let result = CredentialId::new(credential_id.trim())
            .map_err(OnboardingError::from)
            .and_then(|id| self.credentials.revoke(&id))
            .map(|record| record.view());
        self.finish("revoke_credential", result.into())
    }

    /// A developer's credentials, newest first.
    pub fn credentials_for_developer(&self, developer_id: &DeveloperId) -> Outcome<Vec<CredentialView>> {
        let result = self
            .developer_by_id(developer_id)
            .and_then(|d| self.credentials.credentials_for(&d.id))
            .map(|records| records.iter().map(|r| r.view()).collect());
        self.finish("credentials_for_developer", result.into())
    }

    // ── Identifiers and profiles ───────────────────────────────────────

    /// Public projection of the identifier at `uri`.
    pub fn get_identifier_by_uri(&self, uri: &str) -> Outcome<IdentifierView> {
        let result = Did::new(uri.trim())
            .map_err(OnboardingError::from)
            .and_then(|did| self.identities.by_uri(&did))
            .map(|r| r.view());
        self.finish("get_identifier_by_uri", result.into())
    }

    /// Search identifiers by name.
    pub fn search_identifiers(&self, query: &str) -> Outcome<Vec<IdentifierView>> {
        let result = self
            .identities
            .search(query)
            .map(|records| records.iter().map(|r| r.view()).collect());
        self.finish("search_identifiers", result.into())
    }

    /// Re-resolve an identifier's document from the registry.
    pub fn refresh_identifier(&self, uri: &str) -> Outcome<IdentifierView> {
        let result = Did::new(uri.trim())
            .map_err(OnboardingError::from)
            .and_then(|did| self.identities.resolve_and_update(&did))
            .map(|r| r.view());
        self.finish("refresh_identifier", result.into())
    }

    /// Public profile by `<domain>.<suffix>`; suffix `m` selects `ai`,
    /// anything else `service`.
    pub fn get_profile(&self, name: &str) -> Outcome<PublicProfile> {
        self.finish("get_profile", self.try_get_profile(name).into())
    }

    fn try_get_profile(&self, name: &str) -> Result<PublicProfile, OnboardingError> {
        let (domain, suffix) = name.trim().split_once('.').ok_or_else(|| {
            OnboardingError::Validation("profile name must look like <domain>.<suffix>".into())
        })?;
        let extension_type = ExtensionType::from_profile_suffix(suffix);
        let developer = self
            .store
            .developer_by_domain(domain, extension_type)?
            .ok_or_else(|| OnboardingError::NotFound("profile".into()))?;
        let latest = self.credentials.credentials_for(&developer.id)?.into_iter().next();
        Ok(PublicProfile {
            profile: developer.profile.clone(),
            email: developer.email.clone(),
            domain_name: developer.domain_name.clone(),
            extension_type: developer.extension_type,
            extension_name: developer.extension_name.clone(),
            credential_jwt: latest.as_ref().map(|c| c.compact.clone()),
            credential_id: latest.map(|c| c.id),
        })
    }
}
