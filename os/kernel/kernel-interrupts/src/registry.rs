use crate::{IDT_ENTRIES, TrapFrame};
use kernel_sync::SpinLock;

/// A kernel interrupt handler. Runs with interrupts disabled and must not
/// block.
pub type InterruptHandler = &'static (dyn Fn(&mut TrapFrame) + Sync);

/// Vector → optional handler.
///
/// Handlers are registered during bring-up, before interrupts are enabled;
/// the lock is only held long enough to copy a handler out, never while one
/// runs.
pub struct InterruptRegistry {
    handlers: SpinLock<[Option<InterruptHandler>; IDT_ENTRIES]>,
}

impl Default for InterruptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: SpinLock::new([None; IDT_ENTRIES]),
        }
    }

    /// Install `handler` for `vector`, replacing (and returning) any previous one.
    pub fn register(&self, vector: u8, handler: InterruptHandler) -> Option<InterruptHandler> {
        let previous = self.handlers.lock()[usize::from(vector)].replace(handler);
        if previous.is_some() {
            log::trace!("replaced handler for vector {vector}");
        }
        previous
    }

    /// Remove the handler for `vector`.
    pub fn unregister(&self, vector: u8) -> Option<InterruptHandler> {
        self.handlers.lock()[usize::from(vector)].take()
    }

    /// The handler for `vector`, if any.
    #[must_use]
    pub fn get(&self, vector: u8) -> Option<InterruptHandler> {
        self.handlers.lock()[usize::from(vector)]
    }

    #[must_use]
    pub fn is_registered(&self, vector: u8) -> bool {
        self.get(vector).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static FIRST: AtomicU32 = AtomicU32::new(0);
    static SECOND: AtomicU32 = AtomicU32::new(0);

    fn first(_: &mut TrapFrame) {
        FIRST.fetch_add(1, Ordering::SeqCst);
    }

    fn second(_: &mut TrapFrame) {
        SECOND.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn register_overwrites_silently() {
        let registry = InterruptRegistry::new();
        assert!(registry.register(40, &first).is_none());
        assert!(registry.register(40, &second).is_some());

        let handler = registry.get(40).unwrap();
        handler(&mut TrapFrame::for_vector(40));
        assert_eq!(FIRST.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);

        assert!(registry.unregister(40).is_some());
        assert!(!registry.is_registered(40));
    }
}
