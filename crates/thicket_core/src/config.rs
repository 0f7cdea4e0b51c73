//! Parser configuration.

/// Options controlling a single parse run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Keep going after a character no branch can consume: the character is reported and dropped.
    pub recover: bool,
    /// Fold the match history into the syntax tree whenever exactly one branch survives a character.
    /// When disabled the whole history is kept and committed at end of input.
    pub eager_commit: bool,
    /// In recovery mode, stop once this many engine errors were reported.
    pub max_errors: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            recover: false,
            eager_commit: true,
            max_errors: 100,
        }
    }
}

impl ParserConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recover(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    pub fn with_eager_commit(mut self, eager_commit: bool) -> Self {
        self.eager_commit = eager_commit;
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors.max(1);
        self
    }
}
