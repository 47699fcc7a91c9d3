//! # Notifier
//!
//! Delivers offers to holders by push (device tokens) or email. Delivery
//! is best-effort: callers log and report failures and never roll back the
//! offer that triggered them.
//!
//! The [`NotifierContext`] owns the outbound clients. It is built once at
//! startup and shut down explicitly; sends after shutdown fail with
//! [`NotifyError::ShutDown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use tas_vc::OfferData;

use crate::error::NotifyError;
use crate::http::HttpClient;

/// Offer delivery channels.
pub trait Notifier: Send + Sync {
    /// Push `offer` to device `tokens`.
    fn push(&self, tokens: &[String], offer: &OfferData) -> Result<(), NotifyError>;

    /// Email `offer` to `address`.
    fn email(&self, address: &str, offer: &OfferData) -> Result<(), NotifyError>;
}

/// Outbound clients for each channel, built once at startup.
#[derive(Debug)]
pub struct NotifierContext {
    push: Option<HttpClient>,
    email: Option<HttpClient>,
    shut_down: AtomicBool,
}

impl NotifierContext {
    /// Build clients for the configured channels. `None` disables a channel.
    pub fn new(push_url: Option<&str>, email_url: Option<&str>, timeout_secs: u64) -> Result<Self, NotifyError> {
        let build = |url: Option<&str>| -> Result<Option<HttpClient>, NotifyError> {
            url.map(|u| HttpClient::new(u, timeout_secs).map_err(NotifyError::from))
                .transpose()
        };
        Ok(Self {
            push: build(push_url)?,
            email: build(email_url)?,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Stop accepting sends.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::info!("notifier context shut down");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn channel(&self, name: &'static str) -> Result<&HttpClient, NotifyError> {
        if self.is_shut_down() {
            return Err(NotifyError::ShutDown);
        }
        let client = match name {
            "push" => self.push.as_ref(),
            _ => self.email.as_ref(),
        };
        client.ok_or(NotifyError::NotConfigured(name))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    tokens: &'a [String],
    offer: &'a OfferData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailRequest<'a> {
    address: &'a str,
    offer: &'a OfferData,
}

/// [`Notifier`] posting to the push and email gateways.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    ctx: Arc<NotifierContext>,
}

impl HttpNotifier {
    /// Notifier sharing `ctx`.
    pub fn new(ctx: Arc<NotifierContext>) -> Self {
        Self { ctx }
    }

    fn post(&self, channel: &'static str, body: &impl Serialize) -> Result<(), NotifyError> {
        let client = self.ctx.channel(channel)?;
        let url = client.endpoint(&[])?;
        client.block_on(channel, client.post_unit(url, body, channel))??;
        Ok(())
    }
}

impl Notifier for HttpNotifier {
    fn push(&self, tokens: &[String], offer: &OfferData) -> Result<(), NotifyError> {
        if tokens.is_empty() {
            return Ok(());
        }
        self.post("push", &PushRequest { tokens, offer })
    }

    fn email(&self, address: &str, offer: &OfferData) -> Result<(), NotifyError> {
        self.post("email", &EmailRequest { address, offer })
    }
}

/// A delivery recorded by [`LoggingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Push to these tokens.
    Push(Vec<String>, OfferData),
    /// Email to this address.
    Email(String, OfferData),
}

/// [`Notifier`] that logs and records deliveries instead of sending them.
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    sent: Mutex<Vec<Delivery>>,
    failing: AtomicBool,
}

impl LoggingNotifier {
    /// Empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Deliveries so far.
    pub fn sent(&self) -> Vec<Delivery> {
        self.sent.lock().clone()
    }

    fn record(&self, delivery: Delivery) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::NotConfigured("logging"));
        }
        tracing::info!(?delivery, "notification recorded");
        self.sent.lock().push(delivery);
        Ok(())
    }
}

impl Notifier for LoggingNotifier {
    fn push(&self, tokens: &[String], offer: &OfferData) -> Result<(), NotifyError> {
        self.record(Delivery::Push(tokens.to_vec(), offer.clone()))
    }

    fn email(&self, address: &str, offer: &OfferData) -> Result<(), NotifyError> {
        self.record(Delivery::Email(address.to_string(), offer.clone()))
    }
}
