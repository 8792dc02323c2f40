use std::cell::RefCell;
use std::rc::Rc;

use super::method::IterationState;

/// Receiver of per-iteration state snapshots.
///
/// Observers are registered on a method and notified synchronously, in
/// registration order, once per completed step. They can only read the
/// snapshot; the method state is never exposed mutably.
pub trait Observer<P> {
    /// Called after every completed iteration with the current state.
    fn on_update(&mut self, state: &IterationState<'_, P>);
}

/// An ordered collection of shared observers.
pub struct Observers<P> {
    observers: Vec<Rc<RefCell<dyn Observer<P>>>>,
}

impl<P> Default for Observers<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Observers<P> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Appends an observer.
    pub fn register(&mut self, observer: Rc<RefCell<dyn Observer<P>>>) {
        self.observers.push(observer);
    }

    /// Removes an observer by pointer identity. Unknown observers are
    /// ignored.
    pub fn remove(&mut self, observer: &Rc<RefCell<dyn Observer<P>>>) {
        self.observers.retain(|other| !Rc::ptr_eq(other, observer));
    }

    /// Notifies all observers in registration order.
    pub fn notify(&self, state: &IterationState<'_, P>) {
        for observer in &self.observers {
            observer.borrow_mut().on_update(state);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    struct Tagger {
        tag: usize,
        seen: Rc<RefCell<Vec<usize>>>,
    }

    impl Observer<()> for Tagger {
        fn on_update(&mut self, _state: &IterationState<'_, ()>) {
            self.seen.borrow_mut().push(self.tag);
        }
    }

    #[test]
    fn notification_order_and_removal() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let first: Rc<RefCell<dyn Observer<()>>> = Rc::new(RefCell::new(Tagger {
            tag: 1,
            seen: seen.clone(),
        }));
        let second: Rc<RefCell<dyn Observer<()>>> = Rc::new(RefCell::new(Tagger {
            tag: 2,
            seen: seen.clone(),
        }));

        let mut observers = Observers::new();
        observers.register(first.clone());
        observers.register(second);
        assert_eq!(observers.len(), 2);

        let lambda = dvector![0.0];
        observers.notify(&IterationState::new(&lambda, 0.0, None, 1, 0));
        assert_eq!(*seen.borrow(), vec![1, 2]);

        observers.remove(&first);
        assert_eq!(observers.len(), 1);

        observers.notify(&IterationState::new(&lambda, 0.0, None, 2, 0));
        assert_eq!(*seen.borrow(), vec![1, 2, 2]);
    }
}
