use tokio::sync::watch;
use crate::busy::BusyStore;
use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::hooks::{Account, Activities};
use crate::interceptor::Agent;
use crate::session::{LoginPhase, Navigator, Notifier, Session};
use crate::transport::Transport;
#[cfg(feature = "http")]
use crate::error::Error;
#[cfg(feature = "http")]
use crate::session::{Router, Toasts};
#[cfg(feature = "http")]
use crate::transport::http::HttpTransport;

/// Everything a UI needs, wired once at startup and kept for the process lifetime.
pub struct ActivityClient<T, N, M> {
    agent: Agent<T>,
    busy: BusyStore,
    cache: QueryCache,
    navigator: N,
    notifier: M,
    login_phase: watch::Sender<LoginPhase>,
}

/// Client over HTTP with the headless router and toast buffer.
#[cfg(feature = "http")]
pub type HttpActivityClient = ActivityClient<HttpTransport, Router, Toasts>;

#[cfg(feature = "http")]
impl ActivityClient<HttpTransport, Router, Toasts> {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(config.base_url().clone())?;
        Ok(Self::with_parts(config, transport, Router::default(), Toasts::new()))
    }

    /// Build from `ACTIVITY_API_URL` and friends.
    pub fn from_env() -> Result<Self, Error> {
        let config = ClientConfig::from_env()?;
        Self::new(&config)
    }
}

impl<T, N, M> ActivityClient<T, N, M>
where
    T: Transport,
    N: Navigator,
    M: Notifier,
{
    /// Wire a client over any transport and UI shell.
    pub fn with_parts(config: &ClientConfig, transport: T, navigator: N, notifier: M) -> Self {
        let busy = BusyStore::new();
        #[cfg(feature = "tracing")]
        tracing::debug!(base_url = %config.base_url(), delay = ?config.response_delay, "client configured");
        ActivityClient {
            agent: Agent::new(transport, busy.clone(), config.response_delay),
            busy,
            cache: QueryCache::new(config.stale_time),
            navigator,
            notifier,
            login_phase: watch::channel(LoginPhase::Idle).0,
        }
    }

    pub fn activities(&self) -> Activities<'_, T> {
        Activities::new(&self.agent, &self.cache)
    }

    pub fn account(&self) -> Account<'_, T, N> {
        Account::new(&self.agent, &self.cache, &self.navigator)
    }

    pub fn session(&self) -> Session<'_, T, N, M> {
        Session::new(&self.agent, &self.cache, &self.navigator, &self.notifier, &self.login_phase)
    }

    pub fn busy(&self) -> &BusyStore {
        &self.busy
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn notifier(&self) -> &M {
        &self.notifier
    }

    pub fn login_phase(&self) -> watch::Receiver<LoginPhase> {
        self.login_phase.subscribe()
    }
}
