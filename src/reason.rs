/// Default capacity for the private quit-reason copy, in bytes.
pub const DEFAULT_REASON_CAPACITY: usize = 2048;

/// A bounded, privately-owned copy of the caller-supplied quit reason.
///
/// The copy is taken at the very start of termination: the string may
/// originate from a script or plugin that is itself torn down later in the
/// sequence, so the coordinator must not keep borrowing it. Input longer
/// than the capacity is truncated on a character boundary.
#[derive(Debug, Clone)]
pub struct QuitReason {
    text: String,
}

impl QuitReason {
    /// Copy `raw` with the default capacity.
    pub fn new(raw: &str) -> Self {
        Self::with_capacity(raw, DEFAULT_REASON_CAPACITY)
    }

    /// Copy `raw`, truncating to at most `capacity` bytes.
    pub fn with_capacity(raw: &str, capacity: usize) -> Self {
        let mut end = raw.len().min(capacity);
        while end > 0 && !raw.is_char_boundary(end) {
            end -= 1;
        }
        Self {
            text: raw[..end].to_string(),
        }
    }

    /// The full (bounded) reason text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// First sentinel character, if any.
    pub fn first(&self) -> Option<char> {
        self.text.chars().next()
    }

    /// Second sentinel character, if any.
    pub fn second(&self) -> Option<char> {
        self.text.chars().nth(1)
    }

    /// The reason text with its first `n` sentinel characters removed.
    pub fn tail(&self, n: usize) -> &str {
        let mut chars = self.text.char_indices().skip(n);
        match chars.next() {
            Some((idx, _)) => &self.text[idx..],
            None => "",
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
