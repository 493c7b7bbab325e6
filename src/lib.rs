//! sessiond - server-side session state keyed by a cookie
//!
//! This crate provides:
//! - A session store with recency ordering and idle expiry
//! - A provider contract and registry for interchangeable backends
//! - A session manager deciding which session and cookie each request gets
//! - An axum integration and a standalone HTTP server
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use sessiond::{Manager, ProviderRegistry};
//!
//! let registry = ProviderRegistry::with_memory(None);
//! let manager = Manager::new(&registry, "memory", "sid", 3600)?;
//! let (session, set_cookie) = manager.start(cookie_from_request)?;
//! session.set("user_id", 42)?;
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! sessiond --config ~/.sessiond/config.toml
//! ```

pub mod api;
pub mod config;
pub mod cookie;
pub mod error;
pub mod manager;
pub mod scheduler;
pub mod sid;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use cookie::SetCookie;
pub use error::{Result, SessionError};
pub use manager::Manager;
pub use store::{MemoryProvider, Provider, ProviderRegistry, Session};

use sid::RandomIdGenerator;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Service that wires configuration, backends, the manager and the API
pub struct Service {
    /// Configuration
    pub config: Config,

    /// Registered backends
    registry: ProviderRegistry,

    /// Session manager shared with the API and the sweeper
    manager: Arc<Manager>,
}

impl Service {
    /// Create a service with the built-in backends registered.
    pub fn new(config: Config) -> Result<Self> {
        let registry = ProviderRegistry::with_memory(
            config.session.max_entries.and_then(NonZeroUsize::new),
        );
        Self::with_registry(config, registry)
    }

    /// Create a service on a caller-supplied registry (for extra backends).
    pub fn with_registry(config: Config, registry: ProviderRegistry) -> Result<Self> {
        config.validate()?;
        let session = &config.session;

        let ids = RandomIdGenerator::new(session.id_bytes)?;
        let manager = Manager::new(
            &registry,
            &session.provider,
            &session.cookie_name,
            session.max_lifetime_secs,
        )?
        .with_id_generator(Arc::new(ids));

        tracing::info!(
            "Session manager ready (provider '{}', cookie '{}', max idle {}s)",
            session.provider,
            session.cookie_name,
            session.max_lifetime_secs
        );

        Ok(Service {
            config,
            registry,
            manager: Arc::new(manager),
        })
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Start the periodic sweeper
    pub fn start_gc(&self) -> Option<tokio::task::JoinHandle<()>> {
        scheduler::start_gc_task(
            self.manager.clone(),
            Duration::from_secs(self.config.session.gc_interval_secs),
        )
    }

    /// Run the sweeper and serve the API until shutdown
    pub async fn run(&self) -> Result<()> {
        let gc = self.start_gc();
        let served = self.start_api_server().await;
        if let Some(gc) = gc {
            gc.abort();
        }
        served
    }

    /// Start the HTTP API server
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        let state = api::AppState {
            manager: self.manager.clone(),
            api_key: self.config.server.api_key.clone(),
        };
        api::serve(addr, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_from_default_config() {
        let service = Service::new(Config::default()).unwrap();
        assert_eq!(service.manager().cookie_name(), "sessiond_sid");
        assert_eq!(service.manager().provider_name(), "memory");
        assert_eq!(service.registry().names(), vec!["memory".to_string()]);

        let (session, cookie) = service.manager().start(None).unwrap();
        // 64 random bytes -> 88 base64 characters
        assert_eq!(session.id().len(), 88);
        assert!(cookie.is_some());
    }

    #[test]
    fn test_service_rejects_unknown_provider() {
        let mut config = Config::default();
        config.session.provider = "nonexistent".to_string();
        let err = Service::new(config).err().unwrap();
        assert!(matches!(err, SessionError::UnknownProvider(_)));
    }

    #[test]
    fn test_service_rejects_zero_capacity() {
        let mut config = Config::default();
        config.session.max_entries = Some(0);
        assert!(Service::new(config).err().unwrap().is_config());
    }

    #[test]
    fn test_service_honours_capacity_and_id_length() {
        let mut config = Config::default();
        config.session.max_entries = Some(1);
        config.session.id_bytes = 32;
        let service = Service::new(config).unwrap();

        let (first, _) = service.manager().start(None).unwrap();
        assert_eq!(first.id().len(), 44);
        service.manager().start(None).unwrap();
        assert_eq!(service.manager().session_count(), 1);
    }
}
