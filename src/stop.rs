use std::sync::{Arc, Mutex, Weak};

type StopCallback = Box<dyn FnOnce() + Send>;

struct Registry {
    stopped: bool,
    next_id: u64,
    callbacks: Vec<(u64, StopCallback)>,
}

impl Registry {
    fn new() -> Self {
        Self {
            stopped: false,
            next_id: 0,
            callbacks: Vec::new(),
        }
    }
}

/// The owning side of a cooperative cancellation pair.
///
/// Cloned sources share the same stop state. Tripping any of them runs every
/// callback registered through an associated [`StopToken`], on the tripping
/// thread, outside the source's internal lock.
#[derive(Clone)]
pub struct StopSource {
    registry: Arc<Mutex<Registry>>,
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSource {
    /// Creates a new, untripped source.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Returns a token associated with this source.
    pub fn token(&self) -> StopToken {
        StopToken {
            registry: Some(Arc::clone(&self.registry)),
        }
    }

    /// Requests a stop. Returns true if this call performed the transition;
    /// later calls are no-ops.
    pub fn request_stop(&self) -> bool {
        let callbacks = {
            let mut registry = self.registry.lock().unwrap();
            if registry.stopped {
                return false;
            }
            registry.stopped = true;
            std::mem::take(&mut registry.callbacks)
        };
        for (_, callback) in callbacks {
            callback();
        }
        true
    }

    /// Returns true if a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.registry.lock().unwrap().stopped
    }
}

/// The query side of a cooperative cancellation pair.
///
/// A default-constructed token is inert: it is never stopped and callbacks
/// registered against it never run.
#[derive(Clone, Default)]
pub struct StopToken {
    registry: Option<Arc<Mutex<Registry>>>,
}

impl StopToken {
    /// Returns true if a stop has been requested on the associated source.
    pub fn is_stopped(&self) -> bool {
        match &self.registry {
            Some(registry) => registry.lock().unwrap().stopped,
            None => false,
        }
    }

    /// Registers `callback` to run when a stop is requested.
    ///
    /// Returns `None` if the stop was already requested; the callback is
    /// dropped without being stored or invoked, so the caller can handle the
    /// cancellation itself without racing the tripping thread.
    pub fn on_stop(&self, callback: Box<dyn FnOnce() + Send>) -> Option<StopRegistration> {
        let registry = match &self.registry {
            Some(registry) => registry,
            None => {
                return Some(StopRegistration {
                    registry: Weak::new(),
                    id: 0,
                })
            }
        };

        let mut inner = registry.lock().unwrap();
        if inner.stopped {
            return None;
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.callbacks.push((id, callback));
        Some(StopRegistration {
            registry: Arc::downgrade(registry),
            id,
        })
    }
}

/// Keeps a stop callback registered; dropping it deregisters the callback.
///
/// If the stop request already extracted the callback, it still runs exactly
/// once; deregistration then has no effect.
pub struct StopRegistration {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Drop for StopRegistration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut inner = registry.lock().unwrap();
            inner.callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}
