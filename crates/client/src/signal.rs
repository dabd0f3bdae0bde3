//! Single-value reactive state nodes.

use tokio::sync::watch;

/// Writable state node. Writes are synchronous and visible to every reader
/// as soon as `set` returns.
#[derive(Debug)]
pub struct Signal<T> {
    tx: watch::Sender<T>,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        let (tx, _) = watch::channel(value);
        Self { tx }
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal { rx: self.tx.subscribe() }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.tx.borrow().clone()
    }
}

/// Read-only projection of a [`Signal`].
#[derive(Debug, Clone)]
pub struct ReadSignal<T> {
    rx: watch::Receiver<T>,
}

impl<T> ReadSignal<T> {
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.rx.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.rx.borrow())
    }

    /// Waits for the next write. Returns `false` once the signal is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sees_write_immediately() {
        let signal = Signal::new(1);
        let reader = signal.read_only();
        signal.set(2);
        assert_eq!(reader.get(), 2);
        signal.set(3);
        assert_eq!(reader.with(|v| *v * 10), 30);
    }

    #[tokio::test]
    async fn test_changed_wakes_on_write() {
        let signal = Signal::new("a".to_string());
        let mut reader = signal.read_only();
        let waiter = tokio::spawn(async move {
            assert!(reader.changed().await);
            reader.get()
        });
        tokio::task::yield_now().await;
        signal.set("b".to_string());
        assert_eq!(waiter.await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_changed_reports_dropped_signal() {
        let signal = Signal::new(0);
        let mut reader = signal.read_only();
        drop(signal);
        assert!(!reader.changed().await);
    }
}
