//! assumptions: a three-valued truth lattice over symbol properties, used to
//! guard simplification and differentiation rewrites that are only valid
//! under a domain restriction (e.g. `exp(ln(x)) = x` only for `x > 0`).
#![deny(warnings)]

use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

/// A property a symbol may be assumed to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prop {
    Positive,
    Negative,
    NonNegative,
    NonPositive,
    Nonzero,
    Real,
    Integer,
}

/// One-step implications of directly assuming a property. `Context::has`
/// walks this to answer queries about properties that were never assumed
/// directly but follow from one that was.
fn implies(p: Prop) -> &'static [Prop] {
    match p {
        Prop::Positive => &[Prop::Nonzero, Prop::NonNegative, Prop::Real],
        Prop::Negative => &[Prop::Nonzero, Prop::NonPositive, Prop::Real],
        Prop::NonNegative => &[Prop::Real],
        Prop::NonPositive => &[Prop::Real],
        Prop::Nonzero => &[Prop::Real],
        Prop::Real => &[],
        Prop::Integer => &[Prop::Real],
    }
}

/// Assumption context: which properties have been asserted for which symbols.
#[derive(Clone, Debug, Default)]
pub struct Context {
    props: HashMap<String, HashSet<Prop>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assume(&mut self, symbol: &str, prop: Prop) {
        self.props.entry(symbol.to_string()).or_default().insert(prop);
    }

    /// Does `symbol` have `prop`, directly assumed or implied by one that was?
    pub fn has(&self, symbol: &str, prop: Prop) -> Truth {
        let Some(direct) = self.props.get(symbol) else {
            return Truth::Unknown;
        };
        if direct.contains(&prop) {
            return Truth::True;
        }
        // BFS over the one-step implication relation.
        let mut seen: HashSet<Prop> = direct.iter().copied().collect();
        let mut frontier: Vec<Prop> = direct.iter().copied().collect();
        while let Some(p) = frontier.pop() {
            for &q in implies(p) {
                if q == prop {
                    return Truth::True;
                }
                if seen.insert(q) {
                    frontier.push(q);
                }
            }
        }
        Truth::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_variable_is_unknown() {
        let ctx = Context::new();
        assert_eq!(ctx.has("x", Prop::Positive), Truth::Unknown);
    }

    #[test]
    fn direct_assumption_is_true() {
        let mut ctx = Context::new();
        ctx.assume("x", Prop::Positive);
        assert_eq!(ctx.has("x", Prop::Positive), Truth::True);
    }

    #[test]
    fn positive_implies_nonzero_and_real() {
        let mut ctx = Context::new();
        ctx.assume("x", Prop::Positive);
        assert_eq!(ctx.has("x", Prop::Nonzero), Truth::True);
        assert_eq!(ctx.has("x", Prop::NonNegative), Truth::True);
        assert_eq!(ctx.has("x", Prop::Real), Truth::True);
        assert_eq!(ctx.has("x", Prop::Negative), Truth::Unknown);
    }

    #[test]
    fn context_clone_preserves_assumptions() {
        let mut ctx1 = Context::new();
        ctx1.assume("a", Prop::Positive);
        let ctx2 = ctx1.clone();
        assert_eq!(ctx2.has("a", Prop::Positive), Truth::True);
    }

    proptest::proptest! {
        #[test]
        fn prop_assume_roundtrips(n in 0usize..20) {
            let mut ctx = Context::new();
            let var = format!("x{n}");
            ctx.assume(&var, Prop::Positive);
            proptest::prop_assert_eq!(ctx.has(&var, Prop::Positive), Truth::True);
            proptest::prop_assert_eq!(ctx.has(&var, Prop::Nonzero), Truth::True);
        }
    }
}
