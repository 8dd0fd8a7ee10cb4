#![deny(missing_docs)]

//! # dtrust-gateway: Outbound Collaborator Adapters
//!
//! The onboarding saga talks to two external systems through the traits
//! defined here:
//!
//! - [`PaymentProvider`]: customer creation, checkout sessions, session and
//!   subscription retrieval. [`HttpStripeAdapter`] speaks the Stripe REST
//!   API; [`MockPaymentProvider`] is an in-memory fake.
//! - [`NotificationDispatcher`]: outbound email. [`HttpMailDispatcher`]
//!   posts to a mail relay; [`TracingNotificationDispatcher`] only logs;
//!   [`RecordingNotificationDispatcher`] records for tests.
//!
//! ## Sync traits over async HTTP
//!
//! Trait methods are synchronous so that the saga can be written as plain
//! sequential code. HTTP adapters drive `reqwest` with
//! `tokio::runtime::Handle::try_current()?.block_on(..)`; callers already
//! inside a runtime must invoke them from `spawn_blocking`.

pub mod config;
pub mod error;
pub mod notify;
pub mod payment;
pub(crate) mod retry;
pub mod stripe;

pub use config::{ConfigError, MailRelayConfig, StripeConfig};
pub use error::GatewayError;
pub use notify::{
    HttpMailDispatcher, Notification, NotificationDispatcher, RecordingNotificationDispatcher,
    TracingNotificationDispatcher,
};
pub use payment::{
    CheckoutRequest, CheckoutSession, Customer, CustomerRequest, MockPaymentProvider,
    PaymentProvider, PaymentStatus, Plan, Subscription,
};
pub use stripe::HttpStripeAdapter;
