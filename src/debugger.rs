use crate::reason::QuitReason;
use tracing::{debug, info};

/// Link to an optionally-attached external development-time debugger.
pub trait DebuggerLink: Send {
    /// Forward a fatal error's text. Returns `true` if the debugger has
    /// already surfaced it to the user, which suppresses the engine's own
    /// alert dialog.
    fn forward_exception(&mut self, text: &str) -> bool;

    /// Tell the debugger the engine is exiting.
    fn send_exit(&mut self);

    /// Release the link. Called exactly once, after the exit notice.
    fn shutdown(&mut self);
}

/// Notify an attached debugger that the engine is going down.
///
/// Error-family reasons (`!…`, except the abort-key `!|`) are forwarded
/// as exceptions; the link always gets the exit notice and is released
/// exactly once. With no link attached this is a no-op. Returns whether
/// the debugger claims to have handled the error itself.
pub fn notify_debugger(link: &mut Option<Box<dyn DebuggerLink>>, reason: &QuitReason) -> bool {
    let Some(mut debugger) = link.take() else {
        return false;
    };

    let mut handled = false;
    if reason.first() == Some('!') && reason.second() != Some('|') {
        debug!("forwarding fatal error to attached debugger");
        handled = debugger.forward_exception(reason.tail(1));
    }

    debugger.send_exit();
    debugger.shutdown();
    info!(handled, "debugger link released");
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct RecordingLink {
        calls: Arc<Mutex<Vec<String>>>,
        claims_handled: bool,
    }

    impl DebuggerLink for RecordingLink {
        fn forward_exception(&mut self, text: &str) -> bool {
            self.calls.lock().push(format!("exception:{text}"));
            self.claims_handled
        }

        fn send_exit(&mut self) {
            self.calls.lock().push("exit".to_string());
        }

        fn shutdown(&mut self) {
            self.calls.lock().push("shutdown".to_string());
        }
    }

    fn attached(claims_handled: bool) -> (Option<Box<dyn DebuggerLink>>, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let link = RecordingLink {
            calls: Arc::clone(&calls),
            claims_handled,
        };
        (Some(Box::new(link)), calls)
    }

    #[test]
    fn no_link_is_a_noop() {
        let mut link: Option<Box<dyn DebuggerLink>> = None;
        assert!(!notify_debugger(&mut link, &QuitReason::new("!boom")));
        assert!(link.is_none());
    }

    #[test]
    fn script_error_is_forwarded_and_link_released_once() {
        let (mut link, calls) = attached(true);
        let handled = notify_debugger(&mut link, &QuitReason::new("!boom"));
        assert!(handled);
        assert!(link.is_none());
        assert_eq!(
            *calls.lock(),
            vec!["exception:boom", "exit", "shutdown"]
        );
    }

    #[test]
    fn abort_key_is_not_forwarded_but_exit_is_sent() {
        let (mut link, calls) = attached(true);
        let handled = notify_debugger(&mut link, &QuitReason::new("!|"));
        assert!(!handled);
        assert_eq!(*calls.lock(), vec!["exit", "shutdown"]);
    }

    #[test]
    fn normal_exit_sends_only_the_exit_notice() {
        let (mut link, calls) = attached(false);
        let handled = notify_debugger(&mut link, &QuitReason::new("|bye"));
        assert!(!handled);
        assert_eq!(*calls.lock(), vec!["exit", "shutdown"]);
    }

    #[test]
    fn unhandled_forward_reports_false() {
        let (mut link, _calls) = attached(false);
        assert!(!notify_debugger(&mut link, &QuitReason::new("!?fatal")));
    }
}
