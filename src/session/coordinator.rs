use std::sync::Arc;
use tokio::sync::watch;
use crate::cache::{CacheKey, QueryCache, USER};
use crate::error::SessionPopulationError;
use crate::hooks::account::USER_INFO_PATH;
use crate::interceptor::Agent;
use crate::model::{Credentials, Registration, User};
use crate::session::navigation::{Navigator, ACTIVITIES_ROUTE, HOME_ROUTE, LOGIN_ROUTE};
use crate::session::notify::Notifier;
use crate::transport::{Transport, TransportError};

/// Cookie login endpoint of the identity API.
pub const LOGIN_PATH: &str = "/login?useCookies=true";
pub const LOGOUT_PATH: &str = "/account/logout";
pub const REGISTER_PATH: &str = "/account/register";

pub const REGISTERED_MESSAGE: &str = "Register successful - you can now login";

/// Progress of the latest login attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginPhase {
    #[default]
    Idle,
    Authenticating,
    Failed,
    /// Credentials accepted; fetching the user to seed the cache.
    PopulatingSession,
    /// Session populated (or its population failed harmlessly) and navigation issued.
    Ready,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The user now cached under `["user"]`, when user-info could be fetched.
    pub user: Option<Arc<User>>,
    pub session_error: Option<SessionPopulationError>,
    /// Where the login navigated. `None` when a logout overtook the login before it finished.
    pub destination: Option<String>,
}

/// Orders the side effects around login, logout and registration.
pub struct Session<'a, T, N, M> {
    agent: &'a Agent<T>,
    cache: &'a QueryCache,
    navigator: &'a N,
    notifier: &'a M,
    phase: &'a watch::Sender<LoginPhase>,
}

impl<'a, T, N, M> Session<'a, T, N, M>
where
    T: Transport,
    N: Navigator,
    M: Notifier,
{
    pub fn new(
        agent: &'a Agent<T>,
        cache: &'a QueryCache,
        navigator: &'a N,
        notifier: &'a M,
        phase: &'a watch::Sender<LoginPhase>,
    ) -> Self {
        Session {
            agent,
            cache,
            navigator,
            notifier,
            phase,
        }
    }

    pub fn phase(&self) -> LoginPhase {
        *self.phase.borrow()
    }

    /// Log in, then write the user entry directly, then invalidate activities, then navigate.
    ///
    /// The user entry is written by hand because the user-info query is disabled on the login
    /// screen, so invalidating it would not trigger a fetch. The write still goes through a cache
    /// ticket, so a logout that lands while user-info is in flight is not undone.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, TransportError> {
        self.phase.send_replace(LoginPhase::Authenticating);
        if let Err(err) = self.agent.post(LOGIN_PATH, credentials).await {
            self.phase.send_replace(LoginPhase::Failed);
            #[cfg(feature = "tracing")]
            tracing::info!(error = %err, "login rejected");
            return Err(err);
        }

        self.phase.send_replace(LoginPhase::PopulatingSession);
        let ticket = self.cache.begin_fetch(USER);
        let fetched = self.agent.get::<User>(USER_INFO_PATH).await;
        if ticket.is_revoked() {
            #[cfg(feature = "tracing")]
            tracing::info!("logged out while the session was being populated");
            drop(ticket);
            return Ok(LoginOutcome {
                user: None,
                session_error: None,
                destination: None,
            });
        }
        let (user, session_error) = match fetched {
            Ok(user) => (Some(ticket.complete(user, None)), None),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "failed fetching user-info after login");
                ticket.fail(err.clone());
                (None, Some(SessionPopulationError(err)))
            }
        };
        self.cache.invalidate(CacheKey::Activities);

        self.phase.send_replace(LoginPhase::Ready);
        let destination = self
            .navigator
            .location()
            .from
            .clone()
            .unwrap_or_else(|| ACTIVITIES_ROUTE.to_string());
        #[cfg(feature = "tracing")]
        tracing::info!(%destination, "logged in");
        self.navigator.navigate(&destination);

        Ok(LoginOutcome {
            user,
            session_error,
            destination: Some(destination),
        })
    }

    /// Log out, then drop the user and activities entries entirely, then go home.
    pub async fn logout(&self) -> Result<(), TransportError> {
        self.agent.post_empty(LOGOUT_PATH).await?;
        self.cache.remove(CacheKey::User);
        self.cache.remove(CacheKey::Activities);
        self.phase.send_replace(LoginPhase::Idle);
        #[cfg(feature = "tracing")]
        tracing::info!("logged out");
        self.navigator.navigate(HOME_ROUTE);
        Ok(())
    }

    /// Register an account and send the user to the login screen. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<(), TransportError> {
        self.agent.post(REGISTER_PATH, registration).await?;
        #[cfg(feature = "tracing")]
        tracing::info!(email = %registration.email, "registered");
        self.notifier.success(REGISTERED_MESSAGE);
        self.navigator.navigate(LOGIN_ROUTE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::busy::BusyStore;
    use crate::cache::{EntryStatus, ACTIVITIES};
    use crate::hooks::account::Account;
    use crate::session::navigation::{Location, Router};
    use crate::session::notify::Toasts;
    use crate::testing::{activity, user, ScriptedTransport};
    use crate::transport::Response;
    use std::time::Duration;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        busy: BusyStore,
        agent: Agent<Arc<ScriptedTransport>>,
        cache: QueryCache,
        router: Router,
        toasts: Toasts,
        phase: watch::Sender<LoginPhase>,
    }

    impl Fixture {
        fn at(location: Location) -> Self {
            let transport = Arc::new(ScriptedTransport::new());
            let busy = BusyStore::new();
            Fixture {
                agent: Agent::new(transport.clone(), busy.clone(), Duration::from_millis(1000)),
                transport,
                busy,
                cache: QueryCache::default(),
                router: Router::new(location),
                toasts: Toasts::new(),
                phase: watch::channel(LoginPhase::Idle).0,
            }
        }

        fn session(&self) -> Session<'_, Arc<ScriptedTransport>, Router, Toasts> {
            Session::new(&self.agent, &self.cache, &self.router, &self.toasts, &self.phase)
        }

        fn account(&self) -> Account<'_, Arc<ScriptedTransport>, Router> {
            Account::new(&self.agent, &self.cache, &self.router)
        }
    }

    fn creds() -> Credentials {
        Credentials {
            email: "bob@test.com".to_string(),
            password: "Pa$$w0rd".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn login_seeds_user_even_though_query_is_disabled() {
        let f = Fixture::at(Location::new(LOGIN_ROUTE));
        assert!(!f.account().is_enabled());
        f.transport.respond("POST /login?useCookies=true", Ok(Response::new(200, "")));
        f.transport.respond_json("GET /account/user-info", &user("Bob"));

        let outcome = f.session().login(&creds()).await.unwrap();

        assert_eq!(outcome.user.unwrap().display_name, "Bob");
        assert_eq!(f.cache.get(USER).unwrap().display_name, "Bob");
        assert_eq!(f.account().user_state().data.unwrap().display_name, "Bob");
        assert_eq!(outcome.destination.as_deref(), Some(ACTIVITIES_ROUTE));
        assert_eq!(f.router.location().pathname, ACTIVITIES_ROUTE);
        assert_eq!(f.session().phase(), LoginPhase::Ready);
        assert_eq!(f.transport.routes(), ["POST /login?useCookies=true", "GET /account/user-info"]);
        assert!(!f.busy.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn login_returns_to_intended_destination() {
        let f = Fixture::at(Location::new("/activities/42"));
        f.router.navigate_with_from(LOGIN_ROUTE, "/activities/42");
        f.transport.respond("POST /login?useCookies=true", Ok(Response::new(200, "")));
        f.transport.respond_json("GET /account/user-info", &user("Bob"));

        let outcome = f.session().login(&creds()).await.unwrap();

        assert_eq!(outcome.destination.as_deref(), Some("/activities/42"));
        assert_eq!(f.router.location().pathname, "/activities/42");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_login_changes_nothing() {
        let f = Fixture::at(Location::new(LOGIN_ROUTE));
        f.transport.respond(
            "POST /login?useCookies=true",
            Err(ScriptedTransport::status_error("/login?useCookies=true", 401)),
        );

        let err = f.session().login(&creds()).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(f.session().phase(), LoginPhase::Failed);
        assert_eq!(f.cache.status(CacheKey::User), EntryStatus::Absent);
        assert_eq!(f.router.history(), [LOGIN_ROUTE]);
        assert_eq!(f.transport.count("GET /account/user-info"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn user_info_failure_does_not_block_login() {
        let f = Fixture::at(Location::new(LOGIN_ROUTE));
        f.cache.seed(ACTIVITIES, vec![activity("a1", "Quiz")]);
        f.transport.respond("POST /login?useCookies=true", Ok(Response::new(200, "")));
        f.transport.respond(
            "GET /account/user-info",
            Err(ScriptedTransport::status_error("/account/user-info", 500)),
        );

        let outcome = f.session().login(&creds()).await.unwrap();

        assert!(outcome.user.is_none());
        assert_eq!(outcome.session_error.unwrap().0.status(), Some(500));
        assert_eq!(f.cache.status(CacheKey::User), EntryStatus::Absent);
        assert_eq!(f.cache.status(CacheKey::Activities), EntryStatus::Stale);
        assert_eq!(f.router.location().pathname, ACTIVITIES_ROUTE);
        assert_eq!(f.session().phase(), LoginPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn login_phases_are_observable() {
        let f = Fixture::at(Location::new(LOGIN_ROUTE));
        let login_gate = f.transport.gate("POST /login?useCookies=true");
        let user_gate = f.transport.gate("GET /account/user-info");
        let mut phases = f.phase.subscribe();
        let creds = creds();
        let session = f.session();

        let login = session.login(&creds);
        tokio::pin!(login);
        tokio::select! {
            biased;
            _ = &mut login => unreachable!(),
            _ = tokio::task::yield_now() => {}
        }
        assert_eq!(*phases.borrow_and_update(), LoginPhase::Authenticating);

        login_gate.send(Ok(Response::new(200, ""))).unwrap();
        tokio::select! {
            biased;
            _ = &mut login => unreachable!(),
            _ = tokio::time::sleep(Duration::from_millis(1500)) => {}
        }
        assert_eq!(*phases.borrow_and_update(), LoginPhase::PopulatingSession);

        user_gate.send(Response::json_ok(&user("Bob"))).unwrap();
        login.await.unwrap();
        assert_eq!(*phases.borrow_and_update(), LoginPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_removes_entries_and_goes_home() {
        let f = Fixture::at(Location::new(ACTIVITIES_ROUTE));
        f.cache.seed(USER, user("Bob"));
        f.cache.seed(ACTIVITIES, vec![activity("a1", "Quiz")]);
        f.transport.respond("POST /account/logout", Ok(Response::new(200, "")));

        f.session().logout().await.unwrap();

        assert_eq!(f.cache.status(CacheKey::User), EntryStatus::Absent);
        assert_eq!(f.cache.status(CacheKey::Activities), EntryStatus::Absent);
        assert!(f.cache.state(ACTIVITIES).data.is_none());
        assert_eq!(f.router.location().pathname, HOME_ROUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_during_session_population_is_not_undone() {
        let f = Fixture::at(Location::new(LOGIN_ROUTE));
        f.transport.respond("POST /login?useCookies=true", Ok(Response::new(200, "")));
        let user_gate = f.transport.gate("GET /account/user-info");
        f.transport.respond("POST /account/logout", Ok(Response::new(200, "")));
        let creds = creds();
        let session = f.session();

        let login = session.login(&creds);
        tokio::pin!(login);
        tokio::select! {
            biased;
            _ = &mut login => unreachable!(),
            _ = tokio::time::sleep(Duration::from_millis(1500)) => {}
        }
        assert_eq!(session.phase(), LoginPhase::PopulatingSession);

        session.logout().await.unwrap();
        assert_eq!(f.cache.status(CacheKey::User), EntryStatus::Absent);

        user_gate.send(Response::json_ok(&user("Bob"))).unwrap();
        let outcome = login.await.unwrap();

        assert!(outcome.user.is_none());
        assert!(outcome.destination.is_none());
        assert_eq!(f.cache.status(CacheKey::User), EntryStatus::Absent);
        assert!(f.cache.get(USER).is_none());
        assert_eq!(f.router.location().pathname, HOME_ROUTE);
        assert_eq!(session.phase(), LoginPhase::Idle);
        assert!(!f.busy.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_logout_keeps_session() {
        let f = Fixture::at(Location::new(ACTIVITIES_ROUTE));
        f.cache.seed(USER, user("Bob"));
        f.transport.respond(
            "POST /account/logout",
            Err(ScriptedTransport::status_error("/account/logout", 500)),
        );

        assert!(f.session().logout().await.is_err());
        assert_eq!(f.cache.status(CacheKey::User), EntryStatus::Fresh);
        assert_eq!(f.router.location().pathname, ACTIVITIES_ROUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn register_redirects_to_login_without_authenticating() {
        let f = Fixture::at(Location::new("/register"));
        f.transport.respond("POST /account/register", Ok(Response::new(200, "")));
        let registration = Registration {
            email: "tom@test.com".to_string(),
            display_name: "Tom".to_string(),
            password: "Pa$$w0rd".to_string(),
        };

        f.session().register(&registration).await.unwrap();

        assert_eq!(f.toasts.drain(), [REGISTERED_MESSAGE]);
        assert_eq!(f.router.location().pathname, LOGIN_ROUTE);
        assert_eq!(f.cache.status(CacheKey::User), EntryStatus::Absent);
        assert_eq!(f.session().phase(), LoginPhase::Idle);
        assert_eq!(f.transport.routes(), ["POST /account/register"]);
    }
}
