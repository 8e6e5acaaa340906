use std::fmt;

/// The kernel's single error type (spec §10). No `thiserror`/`anyhow`: none
/// of the corpus's own crates pull either in, so the kernel follows suit
/// with a hand-rolled `Display`/`Error` impl, same as the teacher's own
/// `Result<_, &'static str>` call sites generalized to a named enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CasError {
    /// A node or operand combination that violates a structural invariant:
    /// zero denominator, mismatched tensor `(dim,rank)`, wrong rank for an
    /// operation such as trace.
    InvalidExpression(String),
    /// A numeric evaluation that cannot produce a finite result (overflow,
    /// NaN/Inf propagation through constant folding).
    EvaluationError(String),
    /// A well-formed request the kernel does not implement (nonlinear
    /// solving, unregistered function rules, log of a non-positive
    /// constant).
    NotImplemented(String),
    /// An internal invariant violation: should never be observable from a
    /// public entry point. Only ever raised from a `debug_assert!`-guarded
    /// check inside `expr_core` itself.
    Internal(String),
}

impl CasError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        CasError::InvalidExpression(msg.into())
    }

    pub fn evaluation<S: Into<String>>(msg: S) -> Self {
        CasError::EvaluationError(msg.into())
    }

    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        CasError::NotImplemented(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        CasError::Internal(msg.into())
    }
}

impl fmt::Display for CasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasError::InvalidExpression(m) => write!(f, "invalid expression: {m}"),
            CasError::EvaluationError(m) => write!(f, "evaluation error: {m}"),
            CasError::NotImplemented(m) => write!(f, "not implemented: {m}"),
            CasError::Internal(m) => write!(f, "internal error: {m}"),
        }
    }
}

impl std::error::Error for CasError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_prefixed_by_kind() {
        assert!(CasError::invalid("x").to_string().starts_with("invalid expression"));
        assert!(CasError::evaluation("x").to_string().starts_with("evaluation error"));
        assert!(CasError::not_implemented("x").to_string().starts_with("not implemented"));
        assert!(CasError::internal("x").to_string().starts_with("internal error"));
    }

    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error>(_e: &E) {}
        assert_error(&CasError::invalid("x"));
    }
}
