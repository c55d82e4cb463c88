use std::sync::Arc;
use crate::cache::{QueryCache, QueryState, USER};
use crate::interceptor::Agent;
use crate::model::User;
use crate::session::navigation::Navigator;
use crate::transport::{Transport, TransportError};

pub const USER_INFO_PATH: &str = "/account/user-info";

/// The signed-in user, behind the guarded user-info query.
pub struct Account<'a, T, N> {
    agent: &'a Agent<T>,
    cache: &'a QueryCache,
    navigator: &'a N,
}

impl<'a, T: Transport, N: Navigator> Account<'a, T, N> {
    pub fn new(agent: &'a Agent<T>, cache: &'a QueryCache, navigator: &'a N) -> Self {
        Account {
            agent,
            cache,
            navigator,
        }
    }

    /// The query only runs when nothing is cached and the UI is not on the login or register screen.
    pub fn is_enabled(&self) -> bool {
        self.cache.get(USER).is_none() && !self.navigator.location().is_auth_screen()
    }

    /// Cached user, fetching it first when the query is enabled.
    pub async fn current_user(&self) -> Result<Option<Arc<User>>, TransportError> {
        if !self.is_enabled() {
            return Ok(self.cache.get(USER));
        }
        let ticket = self.cache.begin_fetch(USER);
        match self.agent.get::<User>(USER_INFO_PATH).await {
            Ok(user) => Ok(Some(ticket.complete(user, None))),
            Err(err) => {
                ticket.fail(err.clone());
                Err(err)
            }
        }
    }

    pub fn user_state(&self) -> QueryState<User> {
        self.cache.state(USER)
    }
}
