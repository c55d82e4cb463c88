use std::sync::Arc;
use crate::cache::{CacheKey, QueryCache, QueryState, ACTIVITIES};
use crate::interceptor::Agent;
use crate::model::Activity;
use crate::transport::{Transport, TransportError};

pub const ACTIVITIES_PATH: &str = "/activities";

/// Activities resource: a cached list plus mutations that invalidate it.
pub struct Activities<'a, T> {
    agent: &'a Agent<T>,
    cache: &'a QueryCache,
}

impl<'a, T: Transport> Activities<'a, T> {
    pub fn new(agent: &'a Agent<T>, cache: &'a QueryCache) -> Self {
        Activities { agent, cache }
    }

    /// Cached list while fresh, otherwise fetched.
    pub async fn list(&self) -> Result<Arc<Vec<Activity>>, TransportError> {
        if let Some(activities) = self.cache.get_fresh(ACTIVITIES) {
            return Ok(activities);
        }
        self.refetch().await
    }

    /// Fetch regardless of freshness. Returns the newest list the cache holds once this request
    /// settles, which is this response unless a newer one already landed.
    pub async fn refetch(&self) -> Result<Arc<Vec<Activity>>, TransportError> {
        let ticket = self.cache.begin_fetch(ACTIVITIES);
        match self.agent.get_with_max_age::<Vec<Activity>>(ACTIVITIES_PATH).await {
            Ok((activities, max_age)) => Ok(ticket.complete(activities, max_age)),
            Err(err) => {
                ticket.fail(err.clone());
                Err(err)
            }
        }
    }

    pub fn state(&self) -> QueryState<Vec<Activity>> {
        self.cache.state(ACTIVITIES)
    }

    pub async fn create(&self, activity: &Activity) -> Result<(), TransportError> {
        self.agent.post(ACTIVITIES_PATH, activity).await?;
        self.cache.invalidate(CacheKey::Activities);
        Ok(())
    }

    pub async fn update(&self, activity: &Activity) -> Result<(), TransportError> {
        self.agent.put(ACTIVITIES_PATH, activity).await?;
        self.cache.invalidate(CacheKey::Activities);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.agent.delete(&format!("{ACTIVITIES_PATH}/{id}")).await?;
        self.cache.invalidate(CacheKey::Activities);
        Ok(())
    }
}
