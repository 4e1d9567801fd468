use std::sync::Mutex;

/// Result of a non-blocking publish attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    Stored,
    Dropped,
}

/// Single-slot, most-recent-wins buffer between a capture thread and
/// the worker.
///
/// A producer overwrites the previous contents unconditionally if it
/// can take the lock immediately and drops the frame otherwise; it
/// never blocks. Two instances exist in a running coordinator: one for
/// the main stream, one for the liveness stream.
pub struct FrameSlot<T> {
    inner: Mutex<Option<T>>,
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Overwrites the slot if it is not currently held by the consumer.
    pub fn try_publish(&self, value: T) -> PublishOutcome {
        match self.inner.try_lock() {
            Ok(mut guard) => {
                *guard = Some(value);
                PublishOutcome::Stored
            }
            Err(_) => PublishOutcome::Dropped,
        }
    }

    /// Non-blocking take; `None` when the slot is empty or mid-write.
    pub fn try_take(&self) -> Option<T> {
        self.inner.try_lock().ok().and_then(|mut guard| guard.take())
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_publish_then_take() {
        let slot = FrameSlot::new();
        assert_eq!(slot.try_publish(7u32), PublishOutcome::Stored);
        assert_eq!(slot.try_take(), Some(7));
        assert_eq!(slot.try_take(), None);
    }

    #[test]
    fn test_publish_overwrites_unread_value() {
        let slot = FrameSlot::new();
        slot.try_publish(1u32);
        slot.try_publish(2u32);
        assert_eq!(slot.try_take(), Some(2));
    }

    #[test]
    fn test_try_take_empty() {
        let slot: FrameSlot<u32> = FrameSlot::new();
        assert_eq!(slot.try_take(), None);
    }

    #[test]
    fn test_publish_drops_while_consumer_holds_lock() {
        let slot = Arc::new(FrameSlot::new());
        let guard = slot.inner.lock().unwrap();

        let producer = {
            let slot = slot.clone();
            thread::spawn(move || slot.try_publish(9u32))
        };
        assert_eq!(producer.join().unwrap(), PublishOutcome::Dropped);

        drop(guard);
        assert_eq!(slot.try_publish(9u32), PublishOutcome::Stored);
    }

    #[test]
    fn test_try_take_fails_while_producer_holds_lock() {
        let slot = Arc::new(FrameSlot::new());
        slot.try_publish(3u32);
        let guard = slot.inner.lock().unwrap();

        let consumer = {
            let slot = slot.clone();
            thread::spawn(move || slot.try_take())
        };
        assert_eq!(consumer.join().unwrap(), None);
        drop(guard);
        assert_eq!(slot.try_take(), Some(3));
    }
}
