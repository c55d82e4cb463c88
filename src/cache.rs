use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use crate::model::{Activity, User};
use crate::transport::TransportError;

/// Cache regions. Typed so a key mismatch is a compile error rather than a silent miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Activities,
    User,
}

impl CacheKey {
    /// Key segments as the UI layer names them.
    pub fn segments(&self) -> &'static [&'static str] {
        match self {
            CacheKey::Activities => &["activities"],
            CacheKey::User => &["user"],
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, segment) in self.segments().iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "\"{segment}\"")?;
        }
        write!(f, "]")
    }
}

/// A cache key together with the type of value stored under it.
pub struct Region<T> {
    key: CacheKey,
    _value: PhantomData<fn() -> T>,
}

impl<T> Region<T> {
    const fn new(key: CacheKey) -> Self {
        Region {
            key,
            _value: PhantomData,
        }
    }

    pub const fn key(&self) -> CacheKey {
        self.key
    }
}

impl<T> Clone for Region<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Region<T> {}

impl<T> std::fmt::Debug for Region<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Region({})", self.key)
    }
}

pub const ACTIVITIES: Region<Vec<Activity>> = Region::new(CacheKey::Activities);
pub const USER: Region<User> = Region::new(CacheKey::User);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Nothing cached and nothing in flight.
    Absent,
    /// No value yet, a fetch is in flight.
    Pending,
    Fresh,
    /// Has a value that must be refetched before it is trusted: invalidated or past its freshness.
    Stale,
}

/// What a UI reads for a region.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    /// Last applied value; kept while a refetch is in flight.
    pub data: Option<Arc<T>>,
    /// No value yet and a fetch is in flight.
    pub is_pending: bool,
    /// Any fetch in flight for the key, with or without a value.
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<TransportError>,
}

type Value = Arc<dyn Any + Send + Sync>;

// Tickets are numbered from 1 so `applied_seq == 0` means nothing has ever been written.
#[derive(Default)]
struct Slot {
    next_seq: u64,
    applied_seq: u64,
    // responses from tickets below this are dropped (the entry was removed after they started)
    floor_seq: u64,
    // responses from tickets below this land stale (the entry was invalidated after they started)
    stale_below: u64,
    in_flight: usize,
    value: Option<Value>,
    fresh_until: Option<Instant>,
    invalidated: bool,
    error: Option<TransportError>,
}

impl Slot {
    fn allocate(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn accepts(&self, seq: u64) -> bool {
        seq >= self.floor_seq && seq > self.applied_seq
    }

    fn is_stale(&self, now: Instant) -> bool {
        self.invalidated || self.fresh_until.is_some_and(|until| now >= until)
    }

    fn status(&self, now: Instant) -> EntryStatus {
        match (&self.value, self.in_flight) {
            (None, 0) => EntryStatus::Absent,
            (None, _) => EntryStatus::Pending,
            (Some(_), _) if self.is_stale(now) => EntryStatus::Stale,
            (Some(_), _) => EntryStatus::Fresh,
        }
    }
}

struct Inner {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    stale_time: Option<Duration>,
    revision: watch::Sender<u64>,
}

/// Client-side keyed cache shared by all hooks.
///
/// Each fetch takes a [`Ticket`] carrying a per-key sequence number. A response is applied only if
/// no newer write (response or seed) has landed for that key, so a slow, superseded request can
/// never overwrite fresher data. Lock scopes never span an await.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stale_time", &self.inner.stale_time)
            .field("revision", &*self.inner.revision.borrow())
            .finish()
    }
}

impl QueryCache {
    /// `stale_time` bounds freshness when a response carries no `max-age`; `None` keeps entries
    /// fresh until invalidated.
    pub fn new(stale_time: Option<Duration>) -> Self {
        let (revision, _) = watch::channel(0);
        QueryCache {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                stale_time,
                revision,
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|r| *r += 1);
    }

    /// Revision counter bumped on every change, for UIs that re-read on notification.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn status(&self, key: CacheKey) -> EntryStatus {
        self.slots()
            .get(&key)
            .map_or(EntryStatus::Absent, |slot| slot.status(Instant::now()))
    }

    /// True when a read should go to the network: no value, or a stale one.
    pub fn needs_fetch(&self, key: CacheKey) -> bool {
        !matches!(self.status(key), EntryStatus::Fresh)
    }

    pub fn get<T: Any + Send + Sync>(&self, region: Region<T>) -> Option<Arc<T>> {
        let slots = self.slots();
        let value = slots.get(&region.key)?.value.clone()?;
        value.downcast::<T>().ok()
    }

    /// Value only if it is fresh.
    pub fn get_fresh<T: Any + Send + Sync>(&self, region: Region<T>) -> Option<Arc<T>> {
        let slots = self.slots();
        let slot = slots.get(&region.key)?;
        if slot.is_stale(Instant::now()) {
            return None;
        }
        slot.value.clone()?.downcast::<T>().ok()
    }

    pub fn state<T: Any + Send + Sync>(&self, region: Region<T>) -> QueryState<T> {
        let slots = self.slots();
        let Some(slot) = slots.get(&region.key) else {
            return QueryState {
                data: None,
                is_pending: false,
                is_fetching: false,
                is_error: false,
                error: None,
            };
        };
        let data = slot.value.clone().and_then(|v| v.downcast::<T>().ok());
        QueryState {
            is_pending: data.is_none() && slot.in_flight > 0,
            is_fetching: slot.in_flight > 0,
            is_error: slot.error.is_some(),
            error: slot.error.clone(),
            data,
        }
    }

    /// Start a fetch for `region`. The returned ticket must be completed or failed; dropping it
    /// abandons the fetch.
    pub fn begin_fetch<T: Any + Send + Sync>(&self, region: Region<T>) -> Ticket<T> {
        let seq = {
            let mut slots = self.slots();
            let slot = slots.entry(region.key).or_default();
            slot.in_flight += 1;
            slot.allocate()
        };
        self.bump();
        Ticket {
            cache: self.clone(),
            region,
            seq,
            settled: false,
        }
    }

    /// Write a value directly, bypassing any query. Counts as the newest write for the key.
    pub fn seed<T: Any + Send + Sync>(&self, region: Region<T>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        {
            let mut slots = self.slots();
            let slot = slots.entry(region.key).or_default();
            slot.applied_seq = slot.allocate();
            slot.value = Some(value.clone());
            slot.fresh_until = self.inner.stale_time.map(|t| Instant::now() + t);
            slot.invalidated = false;
            slot.error = None;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(key = %region.key, "seeded cache entry");
        self.bump();
        value
    }

    /// Mark the entry stale so the next read refetches. Requests already in flight land stale.
    pub fn invalidate(&self, key: CacheKey) {
        {
            let mut slots = self.slots();
            let Some(slot) = slots.get_mut(&key) else {
                return;
            };
            slot.stale_below = slot.next_seq + 1;
            slot.invalidated = true;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(%key, "invalidated cache entry");
        self.bump();
    }

    /// Drop the entry entirely. Requests already in flight for the key are discarded on arrival.
    pub fn remove(&self, key: CacheKey) {
        {
            let mut slots = self.slots();
            let Some(slot) = slots.get_mut(&key) else {
                return;
            };
            slot.floor_seq = slot.next_seq + 1;
            slot.value = None;
            slot.fresh_until = None;
            slot.invalidated = false;
            slot.error = None;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(%key, "removed cache entry");
        self.bump();
    }

    fn settle(&self, key: CacheKey, seq: u64, outcome: Result<(Value, Option<Duration>), TransportError>) -> Option<Value> {
        let current = {
            let mut slots = self.slots();
            let slot = slots.entry(key).or_default();
            slot.in_flight = slot.in_flight.saturating_sub(1);
            if slot.accepts(seq) {
                match outcome {
                    Ok((value, max_age)) => {
                        let now = Instant::now();
                        slot.applied_seq = seq;
                        slot.value = Some(value);
                        slot.fresh_until = max_age.or(self.inner.stale_time).map(|t| now + t);
                        slot.invalidated = seq < slot.stale_below;
                        slot.error = None;
                    }
                    Err(err) => slot.error = Some(err),
                }
            } else {
                #[cfg(feature = "tracing")]
                tracing::debug!(%key, seq, applied = slot.applied_seq, "discarded superseded response");
            }
            slot.value.clone()
        };
        self.bump();
        current
    }
}

/// An in-flight fetch for one region.
#[must_use = "an unsettled ticket leaves its fetch abandoned"]
pub struct Ticket<T: Any + Send + Sync> {
    cache: QueryCache,
    region: Region<T>,
    seq: u64,
    settled: bool,
}

impl<T: Any + Send + Sync> Ticket<T> {
    /// Store a fetched value and return what readers should now see: this value, or a newer one
    /// if this response was superseded.
    pub fn complete(mut self, value: T, max_age: Option<Duration>) -> Arc<T> {
        self.settled = true;
        let value = Arc::new(value);
        let erased: Value = value.clone();
        let current = self.cache.settle(self.region.key(), self.seq, Ok((erased, max_age)));
        current.and_then(|v| v.downcast::<T>().ok()).unwrap_or(value)
    }

    /// Whether the entry was removed after this fetch started. A revoked ticket's response is
    /// dropped on arrival.
    pub fn is_revoked(&self) -> bool {
        self.cache
            .slots()
            .get(&self.region.key())
            .is_some_and(|slot| self.seq < slot.floor_seq)
    }

    /// Record a failed fetch. The previous value stays in place.
    pub fn fail(mut self, error: TransportError) {
        self.settled = true;
        self.cache.settle(self.region.key(), self.seq, Err(error));
    }
}

impl<T: Any + Send + Sync> Drop for Ticket<T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        {
            let mut slots = self.cache.slots();
            if let Some(slot) = slots.get_mut(&self.region.key()) {
                slot.in_flight = slot.in_flight.saturating_sub(1);
            }
        }
        self.cache.bump();
    }
}
