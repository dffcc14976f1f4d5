pub type BlitResult<T> = Result<T, BlitError>;

/// Errors reported by pipeline construction and frame execution.
///
/// Only caller-visible data problems surface here (bad geometry, undersized
/// buffers, missing palette tables). Contract violations — scratch arena
/// misuse, converting from a non-RGB source, unbalanced acquire/release —
/// panic instead: they indicate a bug in the caller or the builder, never a
/// recoverable runtime data condition.
#[derive(thiserror::Error, Debug)]
pub enum BlitError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BlitError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            BlitError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            BlitError::geometry("x")
                .to_string()
                .contains("geometry error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = BlitError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
