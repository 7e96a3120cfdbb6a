use std::fmt::Debug;

use futures::stream::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A reactive property that can be watched for changes.
///
/// Setting a new value notifies every watcher; setting the current value
/// again is a no-op and does not emit. This is the backbone of the bus
/// property-changed contract: every [`crate::service::Service`] and
/// [`crate::device::Device`] field that is visible over the bus is a
/// `Property<T>`, so "emit exactly one change event per setter call that
/// actually changes the value" falls out of the type rather than being a
/// rule callers must remember to follow.
#[derive(Clone)]
pub struct Property<T: Clone + Send + Sync + 'static> {
    tx: watch::Sender<T>,
    rx: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Property<T> {
    /// Creates a new property with an initial value.
    pub fn new(initial: T) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, rx }
    }

    /// Sets a new value and notifies watchers, if the value changed.
    ///
    /// Returns `true` iff the value changed (and thus a change was
    /// emitted).
    pub fn set(&self, new_value: T) -> bool
    where
        T: PartialEq,
    {
        self.tx
            .send_if_modified(|current| {
                if *current != new_value {
                    *current = new_value;
                    true
                } else {
                    false
                }
            })
    }

    /// Returns the current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Watches for changes to this property.
    ///
    /// The stream immediately yields the current value, then yields again
    /// whenever the value changes.
    pub fn watch(&self) -> impl Stream<Item = T> + Send {
        WatchStream::new(self.rx.clone())
    }
}

impl<T: Clone + Send + Sync + Debug + 'static> Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property").field("value", &self.get()).finish()
    }
}

/// A property whose value is derived from other properties' streams.
pub struct ComputedProperty<T: Clone + Send + Sync + 'static> {
    property: Property<T>,
    _task: tokio::task::JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> ComputedProperty<T> {
    /// Creates a computed property; `compute` re-runs whenever `inputs`
    /// yields a value.
    pub fn new<S, F>(initial: T, mut inputs: S, mut compute: F) -> Self
    where
        S: Stream + Send + Unpin + 'static,
        F: FnMut() -> T + Send + 'static,
        T: PartialEq + Sync,
    {
        let property = Property::new(initial);
        let prop_clone = property.clone();

        let task = tokio::spawn(async move {
            while inputs.next().await.is_some() {
                prop_clone.set(compute());
            }
        });

        Self { property, _task: task }
    }

    /// Returns the current computed value.
    pub fn get(&self) -> T {
        self.property.get()
    }

    /// Watches for changes to the computed value.
    pub fn watch(&self) -> impl Stream<Item = T> + Send {
        self.property.watch()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for ComputedProperty<T> {
    fn drop(&mut self) {
        self._task.abort();
    }
}
