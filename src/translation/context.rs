/*!
 * Context carried from one chunk translation to the next.
 */

/// Default number of characters kept from the previous translation
pub const DEFAULT_CONTEXT_CHARS: usize = 500;

/// Compute the digest passed along with the next chunk.
///
/// The previous digest is dropped; the new one is the trailing `max_chars`
/// characters of `latest_translation`, or all of it when shorter.
pub fn next_digest(_previous_digest: &str, latest_translation: &str, max_chars: usize) -> String {
    let total = latest_translation.chars().count();
    if total <= max_chars {
        return latest_translation.to_string();
    }

    match latest_translation.char_indices().nth(total - max_chars) {
        Some((start, _)) => latest_translation[start..].to_string(),
        None => String::new(),
    }
}

/// Holds the current digest for a running job.
#[derive(Debug, Clone)]
pub struct ContextTracker {
    digest: String,
    max_chars: usize,
}

impl ContextTracker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            digest: String::new(),
            max_chars,
        }
    }

    /// Current digest, empty before the first chunk
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Replace the digest with the tail of `latest_translation`.
    pub fn update(&mut self, latest_translation: &str) {
        self.digest = next_digest(&self.digest, latest_translation, self.max_chars);
    }
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_CHARS)
    }
}
