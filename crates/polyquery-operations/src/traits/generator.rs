use crate::GenerationError;

/// Turns a prompt into raw query text.
///
/// Implementations own their timeouts and retries; callers make exactly one
/// call per prompt.
pub trait QueryGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if no text could be obtained for the prompt.
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

