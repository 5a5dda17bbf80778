//! Test doubles for the request gate's collaborators.

use super::events::{GateEvent, GateObserver};
use super::identity::{Identity, IdentityProvider};
use super::sync::{SyncError, UserSync};
use crate::error::AppError;
use async_trait::async_trait;
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use cookie::Cookie;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

/// Keeps every event so tests can assert on them.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<GateEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<GateEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl GateObserver for RecordingObserver {
    fn on_event(&self, event: &GateEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Identity provider that always answers with the same identity.
#[derive(Debug)]
pub struct FixedIdentity {
    identity: Option<Identity>,
    rejections: AtomicUsize,
}

impl FixedIdentity {
    pub fn new(identity: Option<&str>) -> Self {
        Self {
            identity: identity.map(Identity::new),
            rejections: AtomicUsize::new(0),
        }
    }

    pub fn rejections(&self) -> usize {
        self.rejections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn resolve(&self, _parts: &Parts) -> Result<Option<Identity>, AppError> {
        Ok(self.identity.clone())
    }

    fn reject(&self, _parts: &Parts) -> Response {
        self.rejections.fetch_add(1, Ordering::SeqCst);
        AppError::Unauthorized("Not authenticated".to_string()).into_response()
    }
}

/// Identity provider whose backing store is unreachable.
#[derive(Debug)]
pub struct FailingIdentity;

#[async_trait]
impl IdentityProvider for FailingIdentity {
    async fn resolve(&self, _parts: &Parts) -> Result<Option<Identity>, AppError> {
        Err(AppError::Internal("session store unavailable".to_string()))
    }

    fn reject(&self, _parts: &Parts) -> Response {
        AppError::Unauthorized("Not authenticated".to_string()).into_response()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SyncOutcome {
    Status(StatusCode),
    TransportError,
}

/// Sync collaborator that records calls instead of making them.
#[derive(Debug)]
pub struct FakeSync {
    outcome: SyncOutcome,
    calls: AtomicUsize,
    pub last_url: Mutex<Option<Url>>,
}

impl FakeSync {
    pub fn new(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserSync for FakeSync {
    async fn sync_user(&self, url: &Url, _identity: &Identity) -> Result<StatusCode, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.clone());
        match self.outcome {
            SyncOutcome::Status(status) => Ok(status),
            SyncOutcome::TransportError => Err(SyncError::MissingHost),
        }
    }
}

/// Every `Set-Cookie` on a response, decoded.
pub fn set_cookies(response: &Response) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| Cookie::parse_encoded(value.to_str().unwrap().to_string()).unwrap())
        .collect()
}
