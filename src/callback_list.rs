//! A named list of predicate callbacks, all of which always run.

/// A list of named `Fn() -> bool` callbacks.
///
/// [`CallbackList::run`] invokes every callback — there is no
/// short-circuiting on the first `false` — and returns whether all of
/// them returned `true`. This is used where every registrant must observe
/// the run regardless of whether an earlier one already determined the
/// outcome (e.g. "is it safe to suspend", where every subsystem needs the
/// chance to object and log why).
#[derive(Default)]
pub struct CallbackList {
    entries: Vec<(String, Box<dyn Fn() -> bool + Send + Sync>)>,
}

impl CallbackList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `name`, replacing any existing callback
    /// with the same name.
    pub fn add(&mut self, name: impl Into<String>, callback: impl Fn() -> bool + Send + Sync + 'static) {
        let name = name.into();
        self.entries.retain(|(existing, _)| existing != &name);
        self.entries.push((name, Box::new(callback)));
    }

    /// Removes the callback registered under `name`, if any.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(existing, _)| existing != name);
    }

    /// Invokes every registered callback and returns whether all of them
    /// returned `true`.
    pub fn run(&self) -> bool {
        let mut all_true = true;
        for (_, callback) in &self.entries {
            if !callback() {
                all_true = false;
            }
        }
        all_true
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn all_true_returns_true() {
        let mut list = CallbackList::new();
        list.add("cb1", || true);
        list.add("cb2", || true);
        assert!(list.run());
    }

    #[test]
    fn all_false_returns_false() {
        let mut list = CallbackList::new();
        list.add("cb1", || false);
        list.add("cb2", || false);
        assert!(!list.run());
    }

    #[test]
    fn mixed_return_values_runs_both_no_short_circuit() {
        let cb1_ran = Arc::new(AtomicUsize::new(0));
        let cb2_ran = Arc::new(AtomicUsize::new(0));
        let (c1, c2) = (cb1_ran.clone(), cb2_ran.clone());

        let mut list = CallbackList::new();
        list.add("cb1", move || {
            c1.fetch_add(1, Ordering::SeqCst);
            true
        });
        list.add("cb2", move || {
            c2.fetch_add(1, Ordering::SeqCst);
            false
        });

        assert!(!list.run());
        assert_eq!(cb1_ran.load(Ordering::SeqCst), 1);
        assert_eq!(cb2_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_by_name_stops_future_invocations() {
        let cb1_ran = Arc::new(AtomicUsize::new(0));
        let cb2_ran = Arc::new(AtomicUsize::new(0));
        let (c1, c2) = (cb1_ran.clone(), cb2_ran.clone());

        let mut list = CallbackList::new();
        list.add("cb1", move || {
            c1.fetch_add(1, Ordering::SeqCst);
            true
        });
        list.add("cb2", move || {
            c2.fetch_add(1, Ordering::SeqCst);
            true
        });

        list.remove("cb1");
        assert!(list.run());
        assert_eq!(cb1_ran.load(Ordering::SeqCst), 0);
        assert_eq!(cb2_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn adding_under_same_name_replaces() {
        let mut list = CallbackList::new();
        list.add("cb", || true);
        list.add("cb", || false);
        assert_eq!(list.len(), 1);
        assert!(!list.run());
    }
}
