//! Internal disposal bag for managing cleanup hooks.

use std::future::Future;
use std::pin::Pin;

pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Disposal hooks owned by one scope, run in LIFO order.
///
/// A scope registers a hook per disposable instance it creates, so reversing
/// the bag tears instances down in the opposite order of construction.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<Box<dyn FnOnce() + Send>>,
    asyncs: Vec<Box<dyn FnOnce() -> BoxFutureUnit + Send>>,
}

impl DisposeBag {
    pub(crate) fn push_sync(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.sync.push(f);
    }

    pub(crate) fn push_async<Fut, F>(&mut self, f: F)
    where
        Fut: Future<Output = ()> + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
    {
        self.asyncs.push(Box::new(move || Box::pin(f())));
    }

    /// Execute all sync hooks in reverse order (LIFO).
    pub(crate) fn run_all_sync_reverse(&mut self) -> usize {
        let mut ran = 0;
        while let Some(f) = self.sync.pop() {
            (f)();
            ran += 1;
        }
        ran
    }

    /// Execute all async hooks in reverse order (LIFO).
    pub(crate) async fn run_all_async_reverse(&mut self) -> usize {
        let mut ran = 0;
        while let Some(f) = self.asyncs.pop() {
            (f)().await;
            ran += 1;
        }
        ran
    }

    /// Drops pending async hooks without running them; returns how many were lost.
    pub(crate) fn discard_async(&mut self) -> usize {
        let lost = self.asyncs.len();
        self.asyncs.clear();
        lost
    }

    /// Moves `other`'s hooks on top of ours; they run before existing ones.
    pub(crate) fn append(&mut self, mut other: DisposeBag) {
        self.sync.append(&mut other.sync);
        self.asyncs.append(&mut other.asyncs);
    }

    pub(crate) fn take(&mut self) -> DisposeBag {
        std::mem::take(self)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_empty() && self.asyncs.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.sync.len() + self.asyncs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn sync_hooks_run_lifo() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for i in 0..3 {
            let order = order.clone();
            bag.push_sync(Box::new(move || order.lock().unwrap().push(i)));
        }

        assert_eq!(bag.run_all_sync_reverse(), 3);
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
        assert!(bag.is_empty());
    }

    #[tokio::test]
    async fn async_hooks_run_lifo() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for i in 0..2 {
            let order = order.clone();
            bag.push_async(move || async move { order.lock().unwrap().push(i) });
        }

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.run_all_async_reverse().await, 2);
        assert_eq!(*order.lock().unwrap(), vec![1, 0]);
    }

    #[test]
    fn appended_hooks_run_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        let o = order.clone();
        bag.push_sync(Box::new(move || o.lock().unwrap().push("owned")));

        let mut staged = DisposeBag::default();
        let o = order.clone();
        staged.push_sync(Box::new(move || o.lock().unwrap().push("staged")));
        bag.append(staged);

        assert_eq!(bag.len(), 2);
        bag.run_all_sync_reverse();
        assert_eq!(*order.lock().unwrap(), vec!["staged", "owned"]);
    }
}
