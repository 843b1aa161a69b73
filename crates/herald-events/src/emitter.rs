use crate::error::EmitterError;
use crate::listener::Listener;
use herald_config::{ConfigError, EmitterConfig, EmitterSettings, FailurePolicy};
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Registration<A> {
    listener: Listener<A>,
    /// Present on once-registrations. Flipped right before the single call.
    fired: Option<Arc<AtomicBool>>,
}

impl<A> Registration<A> {
    fn persistent(listener: Listener<A>) -> Self {
        Self {
            listener,
            fired: None,
        }
    }

    fn once(listener: Listener<A>) -> Self {
        Self {
            listener,
            fired: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    fn is_once_token(&self, token: &Arc<AtomicBool>) -> bool {
        matches!(&self.fired, Some(fired) if Arc::ptr_eq(fired, token))
    }
}

impl<A> Clone for Registration<A> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
            fired: self.fired.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Back,
    Front,
}

type ListenerMap<A, K> = HashMap<K, Vec<Registration<A>>>;

struct Inner<A, K> {
    event_names: Vec<K>,
    settings: EmitterSettings,
    listeners: RwLock<ListenerMap<A, K>>,
}

/// Synchronous listener registry keyed by event name.
///
/// `A` is the argument every listener receives on emission, `K` the event key.
/// Cloning the emitter yields another handle to the same registry, which is
/// how a listener reaches the emitter it is registered on. Separately
/// constructed emitters never share listeners.
///
/// The internal lock is released before any listener runs, so listeners may
/// register, remove or emit from inside a callback.
pub struct EventEmitter<A, K = String> {
    inner: Arc<Inner<A, K>>,
}

impl<A, K> EventEmitter<A, K>
where
    K: Eq + Hash + fmt::Display,
{
    /// Unbounded, non-enforcing emitter. `event_names` is advisory metadata;
    /// any key can be registered.
    pub fn new(event_names: impl IntoIterator<Item = impl Into<K>>) -> Self {
        Self::with_settings(event_names, EmitterSettings::default())
    }

    pub fn with_settings(
        event_names: impl IntoIterator<Item = impl Into<K>>,
        settings: EmitterSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                event_names: event_names.into_iter().map(Into::into).collect(),
                settings,
                listeners: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn event_names(&self) -> &[K] {
        &self.inner.event_names
    }

    pub fn settings(&self) -> EmitterSettings {
        self.inner.settings
    }

    pub fn max_listeners(&self) -> Option<usize> {
        self.inner.settings.max_listeners
    }

    pub fn enforce_limit(&self) -> bool {
        self.inner.settings.enforce_limit
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.inner.settings.failure_policy
    }

    pub fn has_listeners<Q>(&self, event: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner
            .listeners
            .read()
            .get(event)
            .is_some_and(|registrations| !registrations.is_empty())
    }

    pub fn listener_count<Q>(&self, event: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Snapshot of the listeners for `event` in invocation order.
    ///
    /// Once-registrations appear as the listener that was passed to
    /// [`once`](Self::once).
    pub fn listeners<Q>(&self, event: &Q) -> Vec<Listener<A>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner
            .listeners
            .read()
            .get(event)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|r| r.listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `Ok(true)` when `event` is at or over `max_listeners`.
    ///
    /// Under `enforce_limit` that state is an error instead.
    pub fn check_listeners_limit<Q>(&self, event: &Q) -> Result<bool, EmitterError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        let count = self.listener_count(event);
        self.check_limit(event, count)
    }

    fn check_limit<E>(&self, event: &E, count: usize) -> Result<bool, EmitterError>
    where
        E: fmt::Display + ?Sized,
    {
        let Some(limit) = self.inner.settings.max_listeners else {
            return Ok(false);
        };

        if count < limit {
            return Ok(false);
        }

        if self.inner.settings.enforce_limit {
            return Err(EmitterError::ListenerLimitExceeded {
                event: event.to_string(),
                limit,
            });
        }

        tracing::warn!(event = %event, count, limit, "listener limit reached");
        Ok(true)
    }

    pub fn add_listener(
        &self,
        event: impl Into<K>,
        listener: Listener<A>,
    ) -> Result<&Self, EmitterError> {
        self.register(event.into(), Registration::persistent(listener), Placement::Back)
    }

    pub fn on(&self, event: impl Into<K>, listener: Listener<A>) -> Result<&Self, EmitterError> {
        self.add_listener(event, listener)
    }

    /// Registers `listener` to run on the next emission of `event` only.
    pub fn once(&self, event: impl Into<K>, listener: Listener<A>) -> Result<&Self, EmitterError> {
        self.register(event.into(), Registration::once(listener), Placement::Back)
    }

    pub fn prepend_listener(
        &self,
        event: impl Into<K>,
        listener: Listener<A>,
    ) -> Result<&Self, EmitterError> {
        self.register(event.into(), Registration::persistent(listener), Placement::Front)
    }

    pub fn prepend_once_listener(
        &self,
        event: impl Into<K>,
        listener: Listener<A>,
    ) -> Result<&Self, EmitterError> {
        self.register(event.into(), Registration::once(listener), Placement::Front)
    }

    fn register(
        &self,
        event: K,
        registration: Registration<A>,
        placement: Placement,
    ) -> Result<&Self, EmitterError> {
        let mut map = self.inner.listeners.write();
        let count = map.get(&event).map_or(0, Vec::len);
        self.check_limit(&event, count)?;

        tracing::trace!(
            event = %event,
            count = count + 1,
            ?placement,
            once = registration.fired.is_some(),
            "listener registered"
        );

        let registrations = map.entry(event).or_default();
        match placement {
            Placement::Back => registrations.push(registration),
            Placement::Front => registrations.insert(0, registration),
        }

        Ok(self)
    }

    /// Removes the first registration of `listener` for `event`, pending
    /// once-registrations included. Unknown events and listeners are ignored.
    pub fn remove_listener<Q>(&self, event: &Q, listener: &Listener<A>) -> &Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        let mut map = self.inner.listeners.write();
        let Some(registrations) = map.get_mut(event) else {
            return self;
        };
        let Some(index) = registrations
            .iter()
            .position(|r| r.listener.ptr_eq(listener))
        else {
            return self;
        };

        registrations.remove(index);
        let remaining = registrations.len();
        if remaining == 0 {
            map.remove(event);
        }

        tracing::trace!(event = %event, count = remaining, "listener removed");
        self
    }

    pub fn off<Q>(&self, event: &Q, listener: &Listener<A>) -> &Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        self.remove_listener(event, listener)
    }

    /// Clears the listeners of `event`, or of every event when `None`.
    ///
    /// A bare `None` leaves `Q` unconstrained; use [`clear`](Self::clear) to
    /// drop every event's listeners.
    pub fn remove_all_listeners<Q>(&self, event: Option<&Q>) -> &Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        match event {
            Some(event) => {
                if self.inner.listeners.write().remove(event).is_some() {
                    tracing::debug!(event = %event, "removed all listeners for event");
                }
                self
            }
            None => self.clear(),
        }
    }

    /// Clears the listeners of every event.
    pub fn clear(&self) -> &Self {
        self.inner.listeners.write().clear();
        tracing::debug!("removed all listeners");
        self
    }

    /// Invokes the listeners registered for `event` in order, passing `args`.
    ///
    /// The listener sequence is captured when the call starts: listeners
    /// added meanwhile wait for the next emission, and listeners removed
    /// meanwhile still run, except once-registrations that already fired.
    /// Returns whether `event` still has listeners afterwards. An event that
    /// was never registered yields `Ok(false)`.
    pub fn emit<Q>(&self, event: &Q, args: &A) -> Result<bool, EmitterError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        let snapshot: Vec<Registration<A>> = match self.inner.listeners.read().get(event) {
            Some(registrations) => registrations.clone(),
            None => {
                tracing::trace!(event = %event, "emit without listeners");
                return Ok(false);
            }
        };

        tracing::trace!(event = %event, listeners = snapshot.len(), "emitting");

        let policy = self.inner.settings.failure_policy;
        let mut failures = Vec::new();

        for registration in &snapshot {
            let result = match &registration.fired {
                Some(fired) => {
                    if fired.swap(true, Ordering::AcqRel) {
                        continue;
                    }
                    let _retire = RetireOnDrop {
                        emitter: self,
                        event,
                        token: fired,
                    };
                    registration.listener.call(args)
                }
                None => registration.listener.call(args),
            };

            if let Err(err) = result {
                match policy {
                    FailurePolicy::Propagate => {
                        tracing::debug!(event = %event, "listener failed, aborting emission");
                        return Err(EmitterError::Listener(err));
                    }
                    FailurePolicy::Collect => failures.push(err),
                }
            }
        }

        if !failures.is_empty() {
            return Err(EmitterError::ListenerFailures {
                event: event.to_string(),
                failures,
            });
        }

        Ok(self.has_listeners(event))
    }

    fn retire<Q>(&self, event: &Q, token: &Arc<AtomicBool>)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        let mut map = self.inner.listeners.write();
        let Some(registrations) = map.get_mut(event) else {
            return;
        };
        let Some(index) = registrations.iter().position(|r| r.is_once_token(token)) else {
            return;
        };

        registrations.remove(index);
        if registrations.is_empty() {
            map.remove(event);
        }

        tracing::debug!(event = %event, "once listener retired");
    }
}

/// Retires a fired once-registration when dropped, including while a
/// panicking listener unwinds.
struct RetireOnDrop<'a, A, K, Q>
where
    K: Eq + Hash + fmt::Display + Borrow<Q>,
    Q: Hash + Eq + fmt::Display + ?Sized,
{
    emitter: &'a EventEmitter<A, K>,
    event: &'a Q,
    token: &'a Arc<AtomicBool>,
}

impl<A, K, Q> Drop for RetireOnDrop<'_, A, K, Q>
where
    K: Eq + Hash + fmt::Display + Borrow<Q>,
    Q: Hash + Eq + fmt::Display + ?Sized,
{
    fn drop(&mut self) {
        self.emitter.retire(self.event, self.token);
    }
}

impl<A> EventEmitter<A, String> {
    pub fn from_config(config: &EmitterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_settings(
            config.event_names.iter().cloned(),
            config.settings(),
        ))
    }
}

impl<A, K> Default for EventEmitter<A, K>
where
    K: Eq + Hash + fmt::Display,
{
    fn default() -> Self {
        Self::with_settings(Vec::<K>::new(), EmitterSettings::default())
    }
}

impl<A, K> Clone for EventEmitter<A, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, K: fmt::Debug> fmt::Debug for EventEmitter<A, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.inner.listeners.read();
        let counts: Vec<(&K, usize)> = map.iter().map(|(k, v)| (k, v.len())).collect();

        f.debug_struct("EventEmitter")
            .field("event_names", &self.inner.event_names)
            .field("settings", &self.inner.settings)
            .field("listeners", &counts)
            .finish()
    }
}
