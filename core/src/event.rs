use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Weak,
    },
};
use crossbeam_skiplist::SkipMap;

/// Represents an event that can be dispatched to listeners.
pub trait Event: fmt::Debug + Send + Sync {}

type Callback<E> = dyn Fn(&E) + Send + Sync;

// Global atomic counter to assign a unique order to each listener upon creation.
static LISTENER_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A list of listeners for a specific event type `E`.
///
/// Listeners are keyed by their registration order, so dispatch always calls them in the
/// order they were added. The list only holds weak references; a listener stays active for
/// as long as its [`Listener`] handle is alive.
pub struct ListenerList<E: Event> {
    inner: SkipMap<usize, Weak<Callback<E>>>,
}

impl<E: Event + 'static> ListenerList<E> {
    /// Creates a new, empty listener list.
    pub fn new() -> Self {
        ListenerList {
            inner: SkipMap::new(),
        }
    }

    /// Dispatches an event to all registered listeners in order.
    ///
    /// Entries whose [`Listener`] has been dropped are removed as they are encountered.
    ///
    /// Only code in this crate may emit events.
    pub(crate) fn dispatch(&self, event: &E) {
        for entry in self.inner.iter() {
            match entry.value().upgrade() {
                Some(callback) => callback(event),
                None => {
                    // SkipMap tolerates removal while iterating
                    entry.remove();
                }
            }
        }
    }

    /// Returns the number of registrations, including ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<E: Event + 'static> Default for ListenerList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for ListenerList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
         .field("listener_count", &self.inner.len())
         .finish()
    }
}

/// Represents an active listener registration.
///
/// Dropping this handle deregisters the listener; its entry is cleaned up from the
/// [`ListenerList`] on the next dispatch.
pub struct Listener<E: Event> {
    // The list holds only a Weak reference to this Arc.
    #[allow(dead_code)]
    arc: Arc<Callback<E>>,
    order: usize,
}

impl<E: Event + 'static> Listener<E> {
    /// Creates a new listener and registers it with the given `ListenerList`.
    ///
    /// Keep the returned handle alive for as long as the listener should stay active.
    pub fn new<F>(listeners: &ListenerList<E>, callback: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let order = LISTENER_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        let arc: Arc<Callback<E>> = Arc::new(callback);
        listeners.inner.insert(order, Arc::downgrade(&arc));

        Listener { arc, order }
    }
}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("order", &self.order)
            .finish()
    }
}

/// Macro to define a struct holding named `ListenerList` fields for various event types.
macro_rules! define_event_listeners {
    ($struct_name:ident { $($field_name:ident: $event_type:ty),* $(,)? }) => {
        /// Holds listener lists for various events.
        #[derive(Debug, Default)]
        pub struct $struct_name {
            $(
                pub $field_name: $crate::event::ListenerList<$event_type>,
            )*
        }

        impl $struct_name {
            /// Creates a new instance with empty listener lists.
            pub fn new() -> Self {
                Self {
                    $(
                        $field_name: $crate::event::ListenerList::new(),
                    )*
                }
            }
        }
    };
}

pub(crate) use define_event_listeners;


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    pub struct Ping(&'static str);
    impl Event for Ping {}

    #[derive(Debug, Clone)]
    pub struct Tick(u32);
    impl Event for Tick {}

    define_event_listeners!(TestEvents {
        ping: Ping,
        tick: Tick,
    });

    #[test]
    fn test_dispatch_reaches_only_matching_list() {
        let events = TestEvents::new();
        let pings = Arc::new(Mutex::new(Vec::new()));
        let ticks = Arc::new(Mutex::new(0u32));

        let sink = pings.clone();
        let _ping_listener = Listener::new(&events.ping, move |event: &Ping| {
            sink.lock().unwrap().push(event.0);
        });
        let total = ticks.clone();
        let _tick_listener = Listener::new(&events.tick, move |event: &Tick| {
            *total.lock().unwrap() += event.0;
        });

        events.ping.dispatch(&Ping("a"));
        events.tick.dispatch(&Tick(3));
        events.tick.dispatch(&Tick(4));

        assert_eq!(*pings.lock().unwrap(), vec!["a"]);
        assert_eq!(*ticks.lock().unwrap(), 7);
    }

    #[test]
    fn test_listener_cleanup_on_drop() {
        let events = TestEvents::new();
        let calls = Arc::new(AtomicUsize::new(0));

        {
            let counter = calls.clone();
            let _temp = Listener::new(&events.ping, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(events.ping.len(), 1);
        }

        // Cleanup is deferred until the next dispatch
        assert_eq!(events.ping.len(), 1);

        events.ping.dispatch(&Ping("after drop"));
        assert_eq!(events.ping.len(), 0);
        assert!(events.ping.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_order() {
        let events = TestEvents::new();
        let call_order = Arc::new(Mutex::new(Vec::new()));
        let (co_a, co_b, co_c) = (call_order.clone(), call_order.clone(), call_order.clone());

        let _listener_a = Listener::new(&events.ping, move |_| co_a.lock().unwrap().push("A"));
        let _listener_b = Listener::new(&events.ping, move |_| co_b.lock().unwrap().push("B"));
        let _listener_c = Listener::new(&events.ping, move |_| co_c.lock().unwrap().push("C"));

        events.ping.dispatch(&Ping("order"));

        assert_eq!(*call_order.lock().unwrap(), vec!["A", "B", "C"]);
    }
}
