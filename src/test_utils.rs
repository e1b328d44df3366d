//! Scripted [`Transport`] for exercising bound elements without a network.
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::Semaphore;
use xbind_config::{Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// One request as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Status(u16),
}

#[derive(Default)]
struct MockState {
    routes: HashMap<(Method, String), Reply>,
    calls: Vec<Call>,
    gate: Option<Arc<Semaphore>>,
}

/// Canned responses per method and url. Unrouted urls fail with
/// [`TransportError::Request`]. While held, requests are recorded but wait
/// for [`release`](Self::release) or [`release_one`](Self::release_one).
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn route(&self, method: Method, url: &str, reply: Reply) {
        self.lock().routes.insert((method, url.to_string()), reply);
    }

    pub fn respond_get(&self, url: &str, body: impl Into<String>) {
        self.route(Method::Get, url, Reply::Body(body.into()));
    }

    pub fn respond_post(&self, url: &str, body: impl Into<String>) {
        self.route(Method::Post, url, Reply::Body(body.into()));
    }

    pub fn fail_get(&self, url: &str, status: u16) {
        self.route(Method::Get, url, Reply::Status(status));
    }

    pub fn fail_post(&self, url: &str, status: u16) {
        self.route(Method::Post, url, Reply::Status(status));
    }

    /// Make subsequent requests wait.
    pub fn hold(&self) {
        let mut state = self.lock();
        if state.gate.is_none() {
            state.gate = Some(Arc::new(Semaphore::new(0)));
        }
    }

    /// Let exactly one waiting (or the next) request through.
    pub fn release_one(&self) {
        if let Some(gate) = &self.lock().gate {
            gate.add_permits(1);
        }
    }

    /// Stop holding and let every waiting request through.
    pub fn release(&self) {
        if let Some(gate) = self.lock().gate.take() {
            gate.close();
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn count_for(&self, method: Method, url: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method && call.url == url)
            .count()
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, TransportError> {
        let (gate, reply) = {
            let mut state = self.lock();
            state.calls.push(Call {
                method,
                url: url.to_string(),
                fields: fields.to_vec(),
            });
            (
                state.gate.clone(),
                state.routes.get(&(method, url.to_string())).cloned(),
            )
        };
        if let Some(gate) = gate {
            // closed gate means released
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Status(status)) => Err(TransportError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(TransportError::Request {
                url: url.to_string(),
                message: "no mock route".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.request(Method::Get, url, &[]).await
    }

    async fn post(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, TransportError> {
        self.request(Method::Post, url, fields).await
    }
}
