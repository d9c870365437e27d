//! Actor trait and panic helpers shared by the run loop and call wrappers.

use std::any::Any;

/// A unit of state driven by exactly one worker thread.
pub trait Actor: Send + 'static {
    /// Called on the worker thread before the first message is processed.
    fn on_start(&mut self) {}

    /// Called on the worker thread after the stop marker is dequeued.
    fn on_stop(&mut self) {}
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::panic;

    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 7");
    }
}
