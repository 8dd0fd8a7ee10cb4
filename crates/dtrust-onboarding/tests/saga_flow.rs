//! End-to-end onboarding flows over in-memory collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dtrust_core::{CredentialId, DeveloperId, Did, Email, Timestamp};
use dtrust_crypto::Ed25519KeyPair;
use dtrust_gateway::{MockPaymentProvider, RecordingNotificationDispatcher};
use dtrust_onboarding::saga::{
    AdHocCredentialRequest, ChallengeRequest, CheckoutCommand, CredentialConfirmation,
    IssuanceReport, PaymentConfirmation, VerifyRequest,
};
use dtrust_onboarding::{
    Collaborators, CredentialRecord, DeveloperRecord, DeveloperSummary, ErrorKind, ExtensionType,
    IdentifierRecord, MemoryStore, OnboardingConfig, OnboardingSaga, OnboardingStore, Outcome,
    PlanType, RegistrationRequest, SagaStep, StoreError,
};
use dtrust_state::{CredentialStatus, IdentifierStatus, OnboardingState};
use dtrust_vc::{
    IdentifierMaterial, IdentityRegistry, IssuerIdentity, LocalCredentialRegistry,
    LocalIdentityRegistry, RegistryError,
};
use serde_json::json;

/// Identity registry that can be switched into failure.
struct SwitchableRegistry {
    inner: LocalIdentityRegistry,
    failing: AtomicBool,
    creates: AtomicUsize,
}

impl IdentityRegistry for SwitchableRegistry {
    fn create(&self) -> Result<IdentifierMaterial, RegistryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("registry timed out".into()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create()
    }

    fn resolve(&self, uri: &Did) -> Result<IdentifierMaterial, RegistryError> {
        self.inner.resolve(uri)
    }
}

/// Store whose email lookups are slow, so concurrent requests all read a
/// developer before any of them writes.
struct SlowEmailLookups {
    inner: MemoryStore,
    delay: Duration,
}

impl OnboardingStore for SlowEmailLookups {
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
        let found = self.inner.developer_by_email(email);
        std::thread::sleep(self.delay);
        found
    }
    fn developer_by_customer(&self, customer_id: &str) -> Result<Option<DeveloperRecord>, StoreError> {
        self.inner.developer_by_customer(customer_id)
    }
    fn developer_by_identifier_name(&self, name: &str) -> Result<Option<DeveloperRecord>, StoreError> {
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
    fn search_identifiers(&self, needle: &str, limit: usize) -> Result<Vec<IdentifierRecord>, StoreError> {
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
    fn credential_by_issuance_key(&self, key: &str) -> Result<Option<CredentialRecord>, StoreError> {
        self.inner.credential_by_issuance_key(key)
    }
    fn credentials_for(&self, owner: &DeveloperId) -> Result<Vec<CredentialRecord>, StoreError> {
        self.inner.credentials_for(owner)
    }
}

struct Harness<S = MemoryStore> {
    saga: Arc<OnboardingSaga>,
    store: Arc<S>,
    payments: Arc<MockPaymentProvider>,
    mail: Arc<RecordingNotificationDispatcher>,
    registry: Arc<SwitchableRegistry>,
}

fn harness() -> Harness {
    harness_over(MemoryStore::new())
}

fn harness_over<S: OnboardingStore + 'static>(store: S) -> Harness<S> {
    let store = Arc::new(store);
    let payments = Arc::new(
        MockPaymentProvider::new()
            .with_price("price_basic", 9_900)
            .with_price("price_premium", 19_900),
    );
    let mail = Arc::new(RecordingNotificationDispatcher::new());
    let registry = Arc::new(SwitchableRegistry {
        inner: LocalIdentityRegistry::new(),
        failing: AtomicBool::new(false),
        creates: AtomicUsize::new(0),
    });
    let issuer = Arc::new(IssuerIdentity::new(Ed25519KeyPair::generate()).unwrap());
    let saga = OnboardingSaga::new(
        Collaborators {
            store: store.clone(),
            payments: payments.clone(),
            identity_registry: registry.clone(),
            credential_registry: Arc::new(LocalCredentialRegistry::new()),
            notifier: mail.clone(),
            issuer,
        },
        OnboardingConfig::for_tests(),
    );
    Harness {
        saga: Arc::new(saga),
        store,
        payments,
        mail,
        registry,
    }
}

fn registration(email: &str, domain: &str, extension: &str) -> RegistrationRequest {
    RegistrationRequest {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: email.into(),
        domain_name: domain.into(),
        extension_type: extension.into(),
        company_name: Some("Analytical Engines".into()),
        ..Default::default()
    }
}

fn latest_code<S: OnboardingStore>(h: &Harness<S>, email: &str) -> String {
    let mails = h.mail.sent_to(&Email::new(email).unwrap());
    let last = mails.last().expect("a code mail was sent");
    last.text_body
        .split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 6)
        .expect("six-digit code in mail")
        .to_string()
}

fn challenge(email: &str, domain: &str, extension: &str) -> ChallengeRequest {
    ChallengeRequest {
        email: email.into(),
        domain_name: domain.into(),
        extension_type: extension.into(),
    }
}

/// Register and verify; returns the summary and the payment customer id.
fn verified_developer<S: OnboardingStore>(h: &Harness<S>, email: &str, domain: &str, extension: &str) -> (DeveloperSummary, String) {
    let summary = h
        .saga
        .register(registration(email, domain, extension))
        .into_value()
        .unwrap();
    assert!(h.saga.issue_challenge(challenge(email, domain, extension)).is_success());
    let code = latest_code(h, email);
    let verified = h
        .saga
        .verify_challenge(VerifyRequest {
            email: email.into(),
            code,
        })
        .into_value()
        .unwrap();
    (summary, verified.customer_id)
}

fn paid_session<S: OnboardingStore>(h: &Harness<S>, customer_id: &str, plan: &str) -> String {
    let view = h
        .saga
        .create_checkout_session(CheckoutCommand {
            plan: plan.into(),
            customer_id: customer_id.into(),
        })
        .into_value()
        .unwrap();
    h.payments.complete_session(&view.session_id).unwrap();
    view.session_id
}

fn confirm<S: OnboardingStore>(h: &Harness<S>, session_id: &str, customer_id: &str) -> Outcome<IssuanceReport> {
    h.saga.confirm_payment(PaymentConfirmation {
        session_id: session_id.into(),
        customer_id: customer_id.into(),
    })
}

#[test]
fn paid_onboarding_issues_identifier_and_credential() {
    let h = harness();
    let email = "ada@example.com";
    let (summary, customer) = verified_developer(&h, email, "acme", "ai");
    let session = paid_session(&h, &customer, "premium");

    let report = confirm(&h, &session, &customer).into_value().unwrap();
    let subscription = report.subscription.as_ref().unwrap();
    assert_eq!(subscription.plan_type, PlanType::Premium);
    assert_eq!(subscription.duration_days, 365);

    let identifier = report.identifier.as_ref().unwrap();
    assert_eq!(identifier.name, "acme.ai");
    assert_eq!(identifier.status, IdentifierStatus::Active);
    assert!(identifier.uri.as_str().starts_with("did:dtrust:"));

    let credential = report.credential.as_ref().unwrap();
    assert_eq!(credential.credential_type, "ai");
    assert_eq!(credential.subject, identifier.uri);
    assert_eq!(credential.status, CredentialStatus::UnVerified);
    assert!(report.notified);

    let developer = h.store.developer(&summary.id).unwrap().unwrap();
    assert_eq!(developer.state(), OnboardingState::CredentialIssued);

    let subjects: Vec<String> = h
        .mail
        .sent_to(&Email::new(email).unwrap())
        .into_iter()
        .map(|m| m.subject)
        .collect();
    assert!(subjects.iter().any(|s| s == "Machine to Machine purchase confirmation"));
    assert!(subjects.iter().any(|s| s == "Your credentials"));

    let profile = h.saga.get_profile("acme.m").into_value().unwrap();
    assert_eq!(profile.credential_jwt, report.credential_jwt);
    assert_eq!(profile.profile.company_name.as_deref(), Some("Analytical Engines"));
}

#[test]
fn verification_code_is_single_use() {
    let h = harness();
    let email = "single@example.com";
    h.saga.register(registration(email, "single", "service"));
    h.saga.issue_challenge(challenge(email, "single", "service"));
    let code = latest_code(&h, email);

    let first = h.saga.verify_challenge(VerifyRequest {
        email: email.into(),
        code: code.clone(),
    });
    assert!(first.is_success());

    let second = h.saga.verify_challenge(VerifyRequest {
        email: email.into(),
        code,
    });
    assert_eq!(second.error_kind(), Some(ErrorKind::Validation));
    assert_eq!(h.payments.customer_count(), 1);
}

#[test]
fn concurrent_submissions_of_one_code_verify_once() {
    let h = harness_over(SlowEmailLookups {
        inner: MemoryStore::new(),
        delay: Duration::from_millis(50),
    });
    let email = "double@example.com";
    h.saga.register(registration(email, "double", "ai"));
    h.saga.issue_challenge(challenge(email, "double", "ai"));
    let code = latest_code(&h, email);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let saga = h.saga.clone();
            let code = code.clone();
            std::thread::spawn(move || {
                saga.verify_challenge(VerifyRequest {
                    email: email.into(),
                    code,
                })
            })
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| o.error_kind() == Some(ErrorKind::Validation))
            .count(),
        1
    );
    assert_eq!(h.payments.customer_count(), 1);
    let developer = h.store.developer_by_email(&Email::new(email).unwrap()).unwrap().unwrap();
    assert!(developer.email_verified);
}

#[test]
fn taken_identifier_name_is_rejected_at_registration() {
    let h = harness();
    let (first, customer) = verified_developer(&h, "one@example.com", "race", "ai");

    let clash = h.saga.register(registration("two@example.com", "race", "ai"));
    assert_eq!(clash.error_kind(), Some(ErrorKind::Conflict));
    assert_eq!(h.store.developer_count(), 1);

    // Same domain under another extension type is a different name.
    assert!(h
        .saga
        .register(registration("three@example.com", "race", "service"))
        .is_success());

    let session = paid_session(&h, &customer, "basic");
    let report = confirm(&h, &session, &customer).into_value().unwrap();
    assert_eq!(report.developer_id, first.id);
    assert_eq!(report.identifier.unwrap().name, "race.ai");
}

#[test]
fn wrong_code_leaves_email_unverified() {
    let h = harness();
    let email = "wrong@example.com";
    let summary = h
        .saga
        .register(registration(email, "wrong", "ai"))
        .into_value()
        .unwrap();
    h.saga.issue_challenge(challenge(email, "wrong", "ai"));
    let code = latest_code(&h, email);
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let outcome = h.saga.verify_challenge(VerifyRequest {
        email: email.into(),
        code: wrong.into(),
    });
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Validation));
    let developer = h.store.developer(&summary.id).unwrap().unwrap();
    assert!(!developer.email_verified);
    assert_eq!(h.payments.customer_count(), 0);
}

#[test]
fn challenge_requires_matching_domain_and_extension() {
    let h = harness();
    let email = "match@example.com";
    h.saga.register(registration(email, "match", "ai"));
    let outcome = h.saga.issue_challenge(challenge(email, "match", "service"));
    assert_eq!(outcome.error_kind(), Some(ErrorKind::NotFound));
    assert!(h.mail.sent().is_empty());
}

#[test]
fn undelivered_code_mail_is_upstream_failure() {
    let h = harness();
    let email = "nomail@example.com";
    h.saga.register(registration(email, "nomail", "ai"));
    h.mail.set_failing(true);
    let outcome = h.saga.issue_challenge(challenge(email, "nomail", "ai"));
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Upstream));
}

#[test]
fn customer_failure_keeps_email_unverified_and_requires_new_code() {
    let h = harness();
    let email = "cust@example.com";
    let summary = h
        .saga
        .register(registration(email, "cust", "ai"))
        .into_value()
        .unwrap();
    h.saga.issue_challenge(challenge(email, "cust", "ai"));
    let code = latest_code(&h, email);

    h.payments.fail_customer_creation(true);
    let outcome = h.saga.verify_challenge(VerifyRequest {
        email: email.into(),
        code: code.clone(),
    });
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Upstream));
    assert!(!h.store.developer(&summary.id).unwrap().unwrap().email_verified);

    h.payments.fail_customer_creation(false);
    let replay = h.saga.verify_challenge(VerifyRequest {
        email: email.into(),
        code,
    });
    assert_eq!(replay.error_kind(), Some(ErrorKind::Validation));

    h.saga.issue_challenge(challenge(email, "cust", "ai"));
    let fresh = latest_code(&h, email);
    assert!(h
        .saga
        .verify_challenge(VerifyRequest {
            email: email.into(),
            code: fresh,
        })
        .is_success());
}

#[test]
fn duplicate_registration_is_conflict() {
    let h = harness();
    assert!(h.saga.register(registration("dup@example.com", "dup", "ai")).is_success());
    let again = h.saga.register(registration("dup@example.com", "dup", "ai"));
    assert_eq!(again.error_kind(), Some(ErrorKind::Conflict));

    let bad = h.saga.register(registration("bad@example.com", "bad", "robot"));
    assert_eq!(bad.error_kind(), Some(ErrorKind::Validation));
}

#[test]
fn unpaid_session_is_pending() {
    let h = harness();
    let (summary, customer) = verified_developer(&h, "unpaid@example.com", "unpaid", "ai");
    let view = h
        .saga
        .create_checkout_session(CheckoutCommand {
            plan: "basic".into(),
            customer_id: customer.clone(),
        })
        .into_value()
        .unwrap();

    let outcome = confirm(&h, &view.session_id, &customer);
    assert!(matches!(outcome, Outcome::Pending { .. }));
    assert_eq!(outcome.status(), "pending");
    assert_eq!(h.store.identifier_count(), 0);
    let developer = h.store.developer(&summary.id).unwrap().unwrap();
    assert!(developer.subscription.is_none());
}

#[test]
fn repeated_confirmation_converges() {
    let h = harness();
    let email = "twice@example.com";
    let (_, customer) = verified_developer(&h, email, "twice", "service");
    let session = paid_session(&h, &customer, "basic");

    let first = confirm(&h, &session, &customer).into_value().unwrap();
    let second = confirm(&h, &session, &customer).into_value().unwrap();

    assert_eq!(first.identifier, second.identifier);
    assert_eq!(first.credential, second.credential);
    assert!(!second.notified);
    assert_eq!(h.store.identifier_count(), 1);
    assert_eq!(h.store.credential_count(), 1);
    assert_eq!(h.registry.creates.load(Ordering::SeqCst), 1);

    let credential_mails = h
        .mail
        .sent_to(&Email::new(email).unwrap())
        .into_iter()
        .filter(|m| m.subject == "Your credentials")
        .count();
    assert_eq!(credential_mails, 1);
}

#[test]
fn concurrent_confirmations_create_one_identifier_and_credential() {
    let h = harness();
    let (summary, customer) = verified_developer(&h, "race@example.com", "race", "ai");
    let session = paid_session(&h, &customer, "basic");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let saga = h.saga.clone();
            let session = session.clone();
            let customer = customer.clone();
            std::thread::spawn(move || {
                saga.confirm_payment(PaymentConfirmation {
                    session_id: session,
                    customer_id: customer,
                })
            })
        })
        .collect();
    for handle in handles {
        let outcome = handle.join().unwrap();
        assert!(outcome.is_success(), "unexpected outcome {:?}", outcome.status());
    }
    assert_eq!(h.store.identifier_count(), 1);
    assert_eq!(h.store.credential_count(), 1);

    let developer = h.store.developer(&summary.id).unwrap().unwrap();
    assert_eq!(developer.state(), OnboardingState::CredentialIssued);
}

#[test]
fn registry_outage_after_payment_is_partial_and_resumable() {
    let h = harness();
    let (_, customer) = verified_developer(&h, "outage@example.com", "outage", "ai");
    let session = paid_session(&h, &customer, "premium");

    h.registry.failing.store(true, Ordering::SeqCst);
    let outcome = confirm(&h, &session, &customer);
    match &outcome {
        Outcome::Partial {
            value, failed_step, ..
        } => {
            assert_eq!(*failed_step, SagaStep::CreateIdentifier);
            assert!(value.subscription.is_some());
            assert!(value.identifier.is_none());
        }
        other => panic!("expected partial, got {}", other.status()),
    }
    assert_eq!(h.store.identifier_count(), 0);

    h.registry.failing.store(false, Ordering::SeqCst);
    let resumed = confirm(&h, &session, &customer).into_value().unwrap();
    assert!(resumed.credential.is_some());
    assert_eq!(h.store.identifier_count(), 1);
}

#[test]
fn direct_issue_without_payment() {
    let h = harness();
    let (summary, _) = verified_developer(&h, "direct@example.com", "direct", "service");

    let report = h.saga.direct_issue(&summary.id).into_value().unwrap();
    assert!(report.subscription.is_none());
    let credential = report.credential.unwrap();
    assert_eq!(credential.credential_type, "service");
    assert_eq!(
        credential.expiration_date,
        credential.issuance_date.add_months(12)
    );

    let unverified = h
        .saga
        .register(registration("late@example.com", "late", "ai"))
        .into_value()
        .unwrap();
    assert_eq!(
        h.saga.direct_issue(&unverified.id).error_kind(),
        Some(ErrorKind::Validation)
    );
}

#[test]
fn credential_confirmation_respects_replay_window() {
    let h = harness();
    let email = "confirm@example.com";
    let (summary, _) = verified_developer(&h, email, "confirm", "ai");
    let report = h.saga.direct_issue(&summary.id).into_value().unwrap();
    let compact = report.credential_jwt.clone().unwrap();
    let credential_id = report.credential.unwrap().id;

    let stale = h.saga.confirm_credential_verification(CredentialConfirmation {
        credential_jwt: compact.clone(),
        timestamp: Some(Timestamp::now().epoch_secs() - 31),
        credential_id: credential_id.to_string(),
        email: email.into(),
    });
    assert_eq!(stale.error_kind(), Some(ErrorKind::Expired));

    let fresh = h
        .saga
        .confirm_credential_verification(CredentialConfirmation {
            credential_jwt: compact,
            timestamp: Some(Timestamp::now().epoch_secs()),
            credential_id: credential_id.to_string(),
            email: email.into(),
        })
        .into_value()
        .unwrap();
    assert_eq!(fresh.status, CredentialStatus::Verified);

    let verified_mail = h
        .mail
        .sent_to(&Email::new(email).unwrap())
        .into_iter()
        .find(|m| m.subject == "Your code snippet has been verified.")
        .expect("verification mail");
    assert!(verified_mail.text_body.contains("/profile?name=confirm.m"));
}

#[test]
fn confirmation_by_another_developer_is_not_found() {
    let h = harness();
    let (owner, _) = verified_developer(&h, "owner@example.com", "owner", "ai");
    verified_developer(&h, "other@example.com", "other", "ai");
    let report = h.saga.direct_issue(&owner.id).into_value().unwrap();

    let outcome = h.saga.confirm_credential_verification(CredentialConfirmation {
        credential_jwt: report.credential_jwt.unwrap(),
        timestamp: None,
        credential_id: report.credential.unwrap().id.to_string(),
        email: "other@example.com".into(),
    });
    assert_eq!(outcome.error_kind(), Some(ErrorKind::NotFound));
}

#[test]
fn ad_hoc_credentials_use_configured_issuer() {
    let h = harness();
    let subject = "did:dtrust:0a0b".to_string();

    let issued = h
        .saga
        .issue_ad_hoc_credential(AdHocCredentialRequest {
            credential_type: "membership".into(),
            issuer: h.saga.issuer_did().to_string(),
            subject: subject.clone(),
            claims: json!({ "tier": "gold" }),
        })
        .into_value()
        .unwrap();
    assert_eq!(
        issued.credential.expiration_date,
        issued.credential.issuance_date.add_months(1)
    );
    assert_eq!(h.saga.verify_credential(&issued.credential_jwt).into_value(), Some(true));

    let foreign = h.saga.issue_ad_hoc_credential(AdHocCredentialRequest {
        credential_type: "membership".into(),
        issuer: "did:dtrust:ffff".into(),
        subject: subject.clone(),
        claims: json!({}),
    });
    assert_eq!(foreign.error_kind(), Some(ErrorKind::Validation));

    let not_object = h.saga.issue_ad_hoc_credential(AdHocCredentialRequest {
        credential_type: "membership".into(),
        issuer: h.saga.issuer_did().to_string(),
        subject,
        claims: json!(["a"]),
    });
    assert_eq!(not_object.error_kind(), Some(ErrorKind::Validation));

    let revoked = h
        .saga
        .revoke_credential(issued.credential.id.as_str())
        .into_value()
        .unwrap();
    assert_eq!(revoked.status, CredentialStatus::Revoked);
}

#[test]
fn identifier_lookup_search_and_refresh() {
    let h = harness();
    let (summary, _) = verified_developer(&h, "look@example.com", "lookup", "ai");
    let report = h.saga.direct_issue(&summary.id).into_value().unwrap();
    let uri = report.identifier.unwrap().uri;

    let view = h.saga.get_identifier_by_uri(uri.as_str()).into_value().unwrap();
    assert_eq!(view.name, "lookup.ai");
    assert_eq!(h.saga.search_identifiers("LOOK").into_value().unwrap().len(), 1);
    assert!(h.saga.refresh_identifier(uri.as_str()).is_success());

    assert_eq!(
        h.saga.get_identifier_by_uri("did:dtrust:0000").error_kind(),
        Some(ErrorKind::NotFound)
    );
    assert_eq!(h.saga.get_profile("nodot").error_kind(), Some(ErrorKind::Validation));
    assert_eq!(h.saga.get_profile("lookup.s").error_kind(), Some(ErrorKind::NotFound));

    let listed = h
        .saga
        .credentials_for_developer(&summary.id)
        .into_value()
        .unwrap();
    assert_eq!(listed.len(), 1);
}
