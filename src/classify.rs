use crate::alert::AlertText;
use crate::reason::QuitReason;
use tracing::debug;

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit category decoded from the quit reason's sentinel prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCategory {
    /// `|` — normal/graceful exit; no alert is ever shown.
    NormalExit,
    /// `!|` — the player pressed the abort key.
    PlayerAbort,
    /// `!?` — fatal error raised deliberately by the game's own logic.
    ScriptFatal,
    /// `!` with any other second character — unclassified script error.
    ScriptError,
    /// `%` — warning escalated to an error by configuration.
    WarningAsError,
    /// Anything else — internal engine error.
    Internal,
}

/// Result of classifying a quit reason.
#[derive(Debug)]
pub struct Classification {
    pub category: ExitCategory,
    /// Normal exits display nothing at all.
    pub silent: bool,
    /// Alert built so far: template plus (where applicable) stack snapshot.
    pub alert: AlertText,
    /// Whether the reason tail should be appended to the alert afterwards.
    pub append_reason_tail: bool,
    /// How many leading sentinel characters the tail excludes.
    pub sentinel_len: usize,
}

fn fatal_template() -> String {
    "A fatal error has been generated by the game's own logic. \
     Please contact the game author for support.\n\n"
        .to_string()
}

fn script_error_template() -> String {
    format!(
        "An error has occurred. Please contact the game author for support, \
         as this is likely to be a scripting error and not a bug in the engine.\n\
         (Engine version {ENGINE_VERSION})\n\n"
    )
}

fn warning_template() -> String {
    format!(
        "A warning has been generated. This is not normally fatal, but you \
         have selected to treat warnings as errors.\n\
         (Engine version {ENGINE_VERSION})\n\n"
    )
}

fn internal_template() -> String {
    format!(
        "An internal error has occurred. Please note down the following \
         information and report it to the engine developers.\n\
         (Engine version {ENGINE_VERSION})\n\nError: "
    )
}

/// Decode the sentinel prefix of `reason` and build the alert text.
///
/// The grammar is a two-character state machine over the head of the
/// reason; within the `!` family, `|` is matched before `?`, which is
/// matched before the generic fallback (so `!|` can never be read as a
/// script error). `stack_snapshot` is the depth-bounded script call chain
/// from the script host; categories that do not show it simply ignore it.
/// Never fails: every non-silent category yields a non-empty template and
/// all appends truncate at the alert capacity.
pub fn classify(reason: &QuitReason, stack_snapshot: &str, alert_capacity: usize) -> Classification {
    let mut alert = AlertText::new(alert_capacity);

    let (category, append_reason_tail, sentinel_len) = match (reason.first(), reason.second()) {
        (Some('|'), _) => (ExitCategory::NormalExit, false, 1),
        (Some('!'), Some('|')) => {
            alert.push_str("Abort key pressed.\n\n");
            (ExitCategory::PlayerAbort, false, 2)
        }
        (Some('!'), Some('?')) => {
            alert.push_str(&fatal_template());
            alert.push_str(stack_snapshot);
            alert.push_str("\n");
            (ExitCategory::ScriptFatal, true, 2)
        }
        (Some('!'), _) => {
            alert.push_str(&script_error_template());
            alert.push_str(stack_snapshot);
            alert.push_str("\nError: ");
            (ExitCategory::ScriptError, true, 1)
        }
        (Some('%'), _) => {
            alert.push_str(&warning_template());
            alert.push_str(stack_snapshot);
            alert.push_str("\n");
            (ExitCategory::WarningAsError, true, 1)
        }
        _ => {
            alert.push_str(&internal_template());
            (ExitCategory::Internal, true, 0)
        }
    };

    debug!(?category, "quit reason classified");

    Classification {
        category,
        silent: category == ExitCategory::NormalExit,
        alert,
        append_reason_tail,
        sentinel_len,
    }
}
