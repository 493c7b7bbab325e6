//! Session manager: per-request session lifecycle.
//!
//! The manager decides which session a request belongs to and which cookie
//! the response should carry. It never writes to the transport itself; the
//! returned [`SetCookie`] is executed by the caller.

use crate::cookie::SetCookie;
use crate::error::Result;
use crate::sid::{self, IdGenerator, RandomIdGenerator};
use crate::store::{Provider, ProviderRegistry, Session};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shared, thread-safe session manager. One per session configuration.
#[derive(Debug)]
pub struct Manager {
    cookie_name: String,
    provider_name: String,
    provider: Arc<dyn Provider>,
    max_lifetime_secs: u64,
    ids: Arc<dyn IdGenerator>,
    // Serializes issuance, destruction and sweeps across all sessions.
    lock: Mutex<()>,
}

impl Manager {
    /// Build a manager on the backend registered as `provider_name`.
    pub fn new(
        registry: &ProviderRegistry,
        provider_name: &str,
        cookie_name: &str,
        max_lifetime_secs: u64,
    ) -> Result<Self> {
        let provider = registry.get(provider_name)?;
        Ok(Manager {
            cookie_name: cookie_name.to_string(),
            provider_name: provider_name.to_string(),
            provider,
            max_lifetime_secs,
            ids: Arc::new(RandomIdGenerator::default()),
            lock: Mutex::new(()),
        })
    }

    /// Replace the identifier source
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn session_count(&self) -> usize {
        self.provider.session_count()
    }

    /// Resolve the session for a request.
    ///
    /// `incoming` is the raw value of the session cookie, if the request had
    /// one. A missing, empty or malformed value starts a new session and
    /// yields the cookie to set; a well-formed one resumes (or recreates)
    /// that session and yields no cookie.
    pub fn start(&self, incoming: Option<&str>) -> Result<(Session, Option<SetCookie>)> {
        let _guard = self.guard();

        if let Some(sid) = incoming.and_then(sid::from_cookie_value) {
            let session = self.provider.read(&sid)?;
            return Ok((session, None));
        }

        let sid = self.ids.generate()?;
        let session = self.provider.init(&sid)?;
        tracing::debug!("Issued session {}", sid::short(&sid));

        let cookie = SetCookie::issue(&self.cookie_name, sid::escape(&sid), self.max_lifetime_secs);
        Ok((session, Some(cookie)))
    }

    /// End the session named by the request's cookie.
    ///
    /// Returns the cookie removal instruction, or `None` when the request
    /// carried no session cookie.
    pub fn destroy(&self, incoming: Option<&str>) -> Result<Option<SetCookie>> {
        let Some(raw) = incoming.filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        let _guard = self.guard();
        if let Some(sid) = sid::from_cookie_value(raw) {
            self.provider.destroy(&sid)?;
            tracing::debug!("Destroyed session {}", sid::short(&sid));
        }

        Ok(Some(SetCookie::removal(&self.cookie_name)))
    }

    /// Sweep sessions idle longer than the configured lifetime.
    pub fn gc(&self) -> Result<usize> {
        let _guard = self.guard();
        self.provider.gc(self.max_lifetime())
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
