//! Wake word matching on transcribed text

/// How the trigger phrase must appear in a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Anywhere in the transcript, even inside a longer word
    #[default]
    Substring,
    /// Only where it is not embedded in a longer word
    WordBoundary,
}

/// Detects the trigger phrase in transcripts
#[derive(Debug, Clone)]
pub struct WakeWord {
    phrase: String,
    mode: MatchMode,
}

impl WakeWord {
    /// Create a substring matcher for `phrase`
    ///
    /// The phrase is lowercased and trimmed
    #[must_use]
    pub fn new(phrase: &str) -> Self {
        Self::with_mode(phrase, MatchMode::Substring)
    }

    /// Create a matcher with an explicit match mode
    #[must_use]
    pub fn with_mode(phrase: &str, mode: MatchMode) -> Self {
        let phrase = phrase.trim().to_lowercase();
        tracing::debug!(wake_word = %phrase, ?mode, "wake word matcher initialized");
        Self { phrase, mode }
    }

    /// The normalized trigger phrase
    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Match mode in use
    #[must_use]
    pub const fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Check whether the transcript contains the trigger phrase
    #[must_use]
    pub fn is_triggered(&self, transcript: &str) -> bool {
        if self.phrase.is_empty() {
            return false;
        }

        let normalized = transcript.to_lowercase();

        match self.mode {
            MatchMode::Substring => normalized.contains(&self.phrase),
            MatchMode::WordBoundary => normalized
                .match_indices(&self.phrase)
                .any(|(start, _)| {
                    let end = start + self.phrase.len();
                    let before = normalized[..start].chars().next_back();
                    let after = normalized[end..].chars().next();
                    !before.is_some_and(char::is_alphanumeric)
                        && !after.is_some_and(char::is_alphanumeric)
                }),
        }
    }
}
