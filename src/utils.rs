use std::io;
use thiserror::Error;

/// Custom error types for the grammar generator
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("undefined non-terminal: {0}")]
    UndefinedNonTerminal(String),

    #[error("grammar contains no rule blocks")]
    EmptyGrammar,

    #[error("grammar rules not properly initialized")]
    Uninitialized,

    #[error("maximum recursion depth exceeded (limit {limit})")]
    RecursionDepthExceeded { limit: usize },

    #[error("no production rules found for non-terminal: {0}")]
    UnknownNonTerminal(String),

    #[error("generated text is empty")]
    EmptyOutput,

    #[error("generation failed at index {index}: {source}")]
    Generation {
        index: usize,
        #[source]
        source: Box<GrammarError>,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl GrammarError {
    /// Wrap a per-run failure with the batch index it occurred at
    pub fn at_index(self, index: usize) -> Self {
        GrammarError::Generation {
            index,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through batch wrappers
    pub fn root(&self) -> &GrammarError {
        match self {
            GrammarError::Generation { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for GrammarError {
    fn from(err: serde_json::Error) -> Self {
        GrammarError::InvalidConfig(err.to_string())
    }
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GrammarError::UndefinedNonTerminal("missing".into()).to_string(),
            "undefined non-terminal: missing"
        );
        assert_eq!(GrammarError::EmptyOutput.to_string(), "generated text is empty");
    }

    #[test]
    fn test_generation_wrapper() {
        let err = GrammarError::EmptyOutput.at_index(3);
        assert_eq!(err.to_string(), "generation failed at index 3: generated text is empty");
        assert!(matches!(err.root(), GrammarError::EmptyOutput));
    }
}
