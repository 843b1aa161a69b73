use std::fmt;
use std::sync::Arc;

pub type ListenerResult = anyhow::Result<()>;

type Callback<A> = dyn Fn(&A) -> ListenerResult + Send + Sync;

/// Callback registered against an event.
///
/// Clones share one callback and compare equal; handles built from separate
/// closures never do, even when the closures are identical. Keep a clone
/// around to remove the listener later.
pub struct Listener<A> {
    callback: Arc<Callback<A>>,
}

impl<A> Listener<A> {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&A) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Wraps a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self::new(move |args| {
            callback(args);
            Ok(())
        })
    }

    pub fn call(&self, args: &A) -> ListenerResult {
        (self.callback)(args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            callback: self.callback.clone(),
        }
    }
}

impl<A> PartialEq for Listener<A> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A> Eq for Listener<A> {}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}
