/// Default capacity of the user-facing alert buffer, in bytes.
pub const DEFAULT_ALERT_CAPACITY: usize = 1500;

/// A bounded, append-only text buffer for the user-facing alert.
///
/// Built incrementally by the classifier and the coordinator: template
/// first, then the script-stack snapshot, then the tail of the quit
/// reason. Appends past the capacity truncate on a character boundary
/// instead of failing; alert construction must never abort a shutdown.
#[derive(Debug)]
pub struct AlertText {
    buf: String,
    capacity: usize,
}

impl AlertText {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: String::new(),
            capacity,
        }
    }

    /// Append `text`, truncating at capacity. Returns whether the whole
    /// string fit.
    pub fn push_str(&mut self, text: &str) -> bool {
        let remaining = self.capacity.saturating_sub(self.buf.len());
        if text.len() <= remaining {
            self.buf.push_str(text);
            return true;
        }
        let mut end = remaining;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.push_str(&text[..end]);
        false
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for AlertText {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}
