//! Limit evaluation for scalar expressions, generalized from the teacher's
//! `(i64,i64)`-exact-value `LimitResult` to a direction/growth-rate pair —
//! grounded on `limit_result.h`/`limit_algebra.h`'s `growth_rate` and
//! `limit_result` structs, which track how fast a diverging quantity grows
//! instead of (or in addition to) which way it diverges. No L'Hopital's
//! rule; indeterminate forms that would need it report `Indeterminate`.

use crate::evaluate::try_eval_constant;
use arith::Num;
use expr_core::{ExprId, Op, Payload, Store};

/// Where the limit variable is heading. `LimitPoint::Finite` reuses
/// substitution-by-evaluation the way the teacher's `limit_at_finite` does;
/// the `ZeroPlus`/`ZeroMinus` one-sided points exist because `1/x`'s limit
/// differs by which side of zero `x` approaches, a distinction the
/// teacher's integer-only `Finite(i64)` point could not express.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitPoint {
    Finite(i64),
    ZeroPlus,
    ZeroMinus,
    PositiveInfinity,
    NegativeInfinity,
}

/// Qualitative growth class of a diverging (or vanishing) quantity.
/// `Polynomial`/`Exponential` carry a degree/base-rate exponent so e.g.
/// `x^2` and `x^3` are both `Polynomial` but distinguishable, and products
/// compose (`x^2 * x^3 -> x^5`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthRate {
    Constant,
    Logarithmic,
    Polynomial(f64),
    Exponential(f64),
    Unknown,
}

impl GrowthRate {
    fn dominance(self) -> i8 {
        match self {
            GrowthRate::Constant => 0,
            GrowthRate::Logarithmic => 1,
            GrowthRate::Polynomial(_) => 2,
            GrowthRate::Exponential(_) => 3,
            GrowthRate::Unknown => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    Zero,
    FinitePositive,
    FiniteNegative,
    PositiveInfinity,
    NegativeInfinity,
    Indeterminate,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitResult {
    pub direction: Direction,
    pub rate: GrowthRate,
}

impl LimitResult {
    fn finite(direction: Direction) -> Self {
        LimitResult { direction, rate: GrowthRate::Constant }
    }

    fn unknown() -> Self {
        LimitResult { direction: Direction::Unknown, rate: GrowthRate::Unknown }
    }

    fn from_num(n: &Num) -> Self {
        if n.is_zero() {
            LimitResult::finite(Direction::Zero)
        } else if n.to_f64() > 0.0 {
            LimitResult::finite(Direction::FinitePositive)
        } else {
            LimitResult::finite(Direction::FiniteNegative)
        }
    }

    fn is_infinite(self) -> bool {
        matches!(self.direction, Direction::PositiveInfinity | Direction::NegativeInfinity)
    }
}

pub fn limit(store: &Store, expr: ExprId, var: &str, point: LimitPoint) -> LimitResult {
    if let Some(n) = try_eval_constant(store, expr) {
        return LimitResult::from_num(&n);
    }
    match point {
        LimitPoint::Finite(_) | LimitPoint::ZeroPlus | LimitPoint::ZeroMinus => {
            LimitResult::unknown()
        }
        LimitPoint::PositiveInfinity => limit_at_infinity(store, expr, var, true),
        LimitPoint::NegativeInfinity => limit_at_infinity(store, expr, var, false),
    }
}

fn limit_at_infinity(store: &Store, expr: ExprId, var: &str, positive: bool) -> LimitResult {
    if let Some(n) = try_eval_constant(store, expr) {
        return LimitResult::from_num(&n);
    }
    match store.get(expr).op {
        Op::SSymbol => {
            let is_var = matches!(&store.get(expr).payload, Payload::Sym(s) if s == var);
            if !is_var {
                return LimitResult::unknown();
            }
            let direction = if positive { Direction::PositiveInfinity } else { Direction::NegativeInfinity };
            LimitResult { direction, rate: GrowthRate::Polynomial(1.0) }
        }
        Op::SAssumption => LimitResult::unknown(),
        Op::SNeg => {
            let c = store.get(expr).children[0];
            apply_neg(limit_at_infinity(store, c, var, positive))
        }
        Op::SAdd => {
            let children = store.get(expr).children.clone();
            let mut acc = LimitResult::finite(Direction::Zero);
            for c in children {
                acc = combine_add(acc, limit_at_infinity(store, c, var, positive));
            }
            acc
        }
        Op::SMul => {
            let children = store.get(expr).children.clone();
            let mut acc = LimitResult::finite(Direction::FinitePositive);
            for c in children {
                acc = combine_mul(acc, limit_at_infinity(store, c, var, positive));
            }
            acc
        }
        Op::SPow => {
            let base = store.get(expr).children[0];
            let exp = store.get(expr).children[1];
            let base_limit = limit_at_infinity(store, base, var, positive);
            if let Payload::Num(Num::Integer(k)) = &store.get(exp).payload {
                return pow_limit_integer(base_limit, *k);
            }
            let exp_limit = limit_at_infinity(store, exp, var, positive);
            apply_pow(base_limit, exp_limit)
        }
        Op::SExp => {
            let c = store.get(expr).children[0];
            apply_exp(limit_at_infinity(store, c, var, positive))
        }
        Op::SLog => {
            let c = store.get(expr).children[0];
            apply_log(limit_at_infinity(store, c, var, positive))
        }
        Op::SSqrt => {
            let c = store.get(expr).children[0];
            apply_sqrt(limit_at_infinity(store, c, var, positive))
        }
        Op::SAbs => {
            let c = store.get(expr).children[0];
            apply_abs(limit_at_infinity(store, c, var, positive))
        }
        Op::SFunction => {
            let args = store.get(expr).children.clone();
            if args.len() != 1 {
                return LimitResult::unknown();
            }
            let name = match &store.get(expr).payload {
                Payload::Func(s) => s.as_str(),
                _ => return LimitResult::unknown(),
            };
            let arg_limit = limit_at_infinity(store, args[0], var, positive);
            match name {
                "sin" | "cos" => {
                    if arg_limit.is_infinite() {
                        LimitResult { direction: Direction::Indeterminate, rate: GrowthRate::Unknown }
                    } else {
                        LimitResult::unknown()
                    }
                }
                _ => LimitResult::unknown(),
            }
        }
        _ => LimitResult::unknown(),
    }
}

fn pow_limit_integer(base: LimitResult, k: i64) -> LimitResult {
    if k == 0 {
        return LimitResult::finite(Direction::FinitePositive);
    }
    let mut acc = base;
    let reps = k.unsigned_abs() as u32;
    // Each squaring adds `base`'s rate again via `combine_mul_rate`: Polynomial
    // degrees sum (matches x^(a*b)), and Exponential bases sum the same way
    // ((e^x)^3 = e^(3x)), so repeated composition never over-promotes a
    // polynomial base into an exponential rate — only an already-exponential
    // base stays exponential.
    for _ in 1..reps {
        acc = combine_mul(acc, base);
    }
    if k < 0 {
        apply_reciprocal(acc)
    } else {
        acc
    }
}

fn promote_rate(r: GrowthRate) -> GrowthRate {
    match r {
        GrowthRate::Constant => GrowthRate::Logarithmic,
        GrowthRate::Logarithmic => GrowthRate::Polynomial(1.0),
        GrowthRate::Polynomial(d) => GrowthRate::Polynomial(d + 1.0),
        GrowthRate::Exponential(b) => GrowthRate::Exponential(b + 1.0),
        GrowthRate::Unknown => GrowthRate::Unknown,
    }
}

fn demote_rate(r: GrowthRate) -> GrowthRate {
    match r {
        GrowthRate::Exponential(b) => GrowthRate::Polynomial(b.max(1.0)),
        GrowthRate::Polynomial(_) => GrowthRate::Logarithmic,
        GrowthRate::Logarithmic => GrowthRate::Constant,
        GrowthRate::Constant => GrowthRate::Constant,
        GrowthRate::Unknown => GrowthRate::Unknown,
    }
}

pub(crate) fn combine_add(a: LimitResult, b: LimitResult) -> LimitResult {
    use Direction::*;
    match (a.direction, b.direction) {
        (PositiveInfinity, NegativeInfinity) | (NegativeInfinity, PositiveInfinity) => {
            LimitResult { direction: Indeterminate, rate: GrowthRate::Unknown }
        }
        (PositiveInfinity, _) | (_, PositiveInfinity) => {
            let rate = dominant_rate(a, b, PositiveInfinity);
            LimitResult { direction: PositiveInfinity, rate }
        }
        (NegativeInfinity, _) | (_, NegativeInfinity) => {
            let rate = dominant_rate(a, b, NegativeInfinity);
            LimitResult { direction: NegativeInfinity, rate }
        }
        (Zero, Zero) => LimitResult::finite(Zero),
        (Zero, other) | (other, Zero) => LimitResult::finite(other),
        (FinitePositive, FinitePositive) => LimitResult::finite(FinitePositive),
        (FiniteNegative, FiniteNegative) => LimitResult::finite(FiniteNegative),
        (Indeterminate, _) | (_, Indeterminate) => {
            LimitResult { direction: Indeterminate, rate: GrowthRate::Unknown }
        }
        _ => LimitResult::unknown(),
    }
}

fn dominant_rate(a: LimitResult, b: LimitResult, matching: Direction) -> GrowthRate {
    let a_matches = a.direction == matching;
    let b_matches = b.direction == matching;
    match (a_matches, b_matches) {
        (true, true) => {
            if a.rate.dominance() >= b.rate.dominance() {
                a.rate
            } else {
                b.rate
            }
        }
        (true, false) => a.rate,
        (false, true) => b.rate,
        (false, false) => GrowthRate::Unknown,
    }
}

pub(crate) fn combine_mul(a: LimitResult, b: LimitResult) -> LimitResult {
    use Direction::*;
    let sign_dir = match (a.direction, b.direction) {
        (Zero, _) | (_, Zero) if !(a.is_infinite() || b.is_infinite()) => Zero,
        (Zero, PositiveInfinity | NegativeInfinity) => return resolve_vanishing_product(a, b),
        (PositiveInfinity | NegativeInfinity, Zero) => return resolve_vanishing_product(b, a),
        (FinitePositive, FinitePositive) | (FiniteNegative, FiniteNegative) => FinitePositive,
        (FinitePositive, FiniteNegative) | (FiniteNegative, FinitePositive) => FiniteNegative,
        (PositiveInfinity, PositiveInfinity) | (NegativeInfinity, NegativeInfinity) => PositiveInfinity,
        (PositiveInfinity, NegativeInfinity) | (NegativeInfinity, PositiveInfinity) => NegativeInfinity,
        (PositiveInfinity, FinitePositive) | (FinitePositive, PositiveInfinity) => PositiveInfinity,
        (PositiveInfinity, FiniteNegative) | (FiniteNegative, PositiveInfinity) => NegativeInfinity,
        (NegativeInfinity, FinitePositive) | (FinitePositive, NegativeInfinity) => NegativeInfinity,
        (NegativeInfinity, FiniteNegative) | (FiniteNegative, NegativeInfinity) => PositiveInfinity,
        (Indeterminate, _) | (_, Indeterminate) => Indeterminate,
        _ => return LimitResult::unknown(),
    };
    let rate = combine_mul_rate(a.rate, b.rate);
    LimitResult { direction: sign_dir, rate }
}

/// Resolve a `0 * infinity` product via the two factors' growth rates
/// instead of declaring it indeterminate outright: a polynomially-decaying
/// `zero` term (e.g. `1/x`) beats a logarithmically-growing `infinite` term
/// (e.g. `log(x)`) the way `log(x)/x -> 0` requires, while an
/// exponentially-growing term beats any polynomial decay. Only a genuine
/// tie (matching order, e.g. `x * (1/x)`) falls back to `Indeterminate` —
/// this engine has no coefficient tracking to resolve that case exactly.
fn resolve_vanishing_product(zero_val: LimitResult, inf_val: LimitResult) -> LimitResult {
    match (rate_order(zero_val.rate), rate_order(inf_val.rate)) {
        (Some(zo), Some(io)) => {
            let net = zo + io;
            if net > 0.0 {
                LimitResult { direction: inf_val.direction, rate: combine_mul_rate(zero_val.rate, inf_val.rate) }
            } else if net < 0.0 {
                LimitResult::finite(Direction::Zero)
            } else {
                LimitResult { direction: Direction::Indeterminate, rate: GrowthRate::Unknown }
            }
        }
        _ => LimitResult { direction: Direction::Indeterminate, rate: GrowthRate::Unknown },
    }
}

/// A signed growth order usable for comparing across `GrowthRate` classes:
/// negative for decay, zero at rest, positive for growth, with logarithmic
/// growth pinned at the same order as `Constant` since it is dominated by
/// every nonzero polynomial degree in either direction.
fn rate_order(r: GrowthRate) -> Option<f64> {
    match r {
        GrowthRate::Constant | GrowthRate::Logarithmic => Some(0.0),
        GrowthRate::Polynomial(d) => Some(d),
        GrowthRate::Exponential(b) => Some(if b >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY }),
        GrowthRate::Unknown => None,
    }
}

fn combine_mul_rate(a: GrowthRate, b: GrowthRate) -> GrowthRate {
    use GrowthRate::*;
    match (a, b) {
        (Unknown, _) | (_, Unknown) => Unknown,
        (Constant, r) | (r, Constant) => r,
        (Polynomial(d1), Polynomial(d2)) => Polynomial(d1 + d2),
        (Exponential(b1), Exponential(b2)) => Exponential(b1 + b2),
        (Exponential(b), _) | (_, Exponential(b)) => Exponential(b),
        (Polynomial(d), Logarithmic) | (Logarithmic, Polynomial(d)) => Polynomial(d),
        (Logarithmic, Logarithmic) => Logarithmic,
    }
}

pub(crate) fn apply_neg(a: LimitResult) -> LimitResult {
    use Direction::*;
    let direction = match a.direction {
        Zero => Zero,
        FinitePositive => FiniteNegative,
        FiniteNegative => FinitePositive,
        PositiveInfinity => NegativeInfinity,
        NegativeInfinity => PositiveInfinity,
        Indeterminate => Indeterminate,
        Unknown => Unknown,
    };
    LimitResult { direction, rate: a.rate }
}

pub(crate) fn apply_log(a: LimitResult) -> LimitResult {
    use Direction::*;
    match a.direction {
        PositiveInfinity => LimitResult { direction: PositiveInfinity, rate: demote_rate(a.rate) },
        Zero => LimitResult { direction: NegativeInfinity, rate: GrowthRate::Logarithmic },
        FinitePositive => LimitResult::unknown(),
        _ => LimitResult::unknown(),
    }
}

pub(crate) fn apply_exp(a: LimitResult) -> LimitResult {
    use Direction::*;
    match a.direction {
        PositiveInfinity => LimitResult { direction: PositiveInfinity, rate: promote_rate(a.rate) },
        NegativeInfinity => LimitResult::finite(Zero),
        Zero | FinitePositive | FiniteNegative => LimitResult::finite(FinitePositive),
        _ => LimitResult::unknown(),
    }
}

pub(crate) fn apply_sqrt(a: LimitResult) -> LimitResult {
    use Direction::*;
    match a.direction {
        PositiveInfinity => {
            let rate = match a.rate {
                GrowthRate::Polynomial(d) => GrowthRate::Polynomial(d / 2.0),
                GrowthRate::Exponential(b) => GrowthRate::Exponential(b / 2.0),
                other => other,
            };
            LimitResult { direction: PositiveInfinity, rate }
        }
        Zero => LimitResult::finite(Zero),
        FinitePositive => LimitResult::finite(FinitePositive),
        _ => LimitResult::unknown(),
    }
}

pub(crate) fn apply_abs(a: LimitResult) -> LimitResult {
    use Direction::*;
    let direction = match a.direction {
        FiniteNegative => FinitePositive,
        NegativeInfinity => PositiveInfinity,
        other => other,
    };
    LimitResult { direction, rate: a.rate }
}

pub(crate) fn apply_reciprocal(a: LimitResult) -> LimitResult {
    use Direction::*;
    let direction = match a.direction {
        Zero => Unknown,
        FinitePositive => FinitePositive,
        FiniteNegative => FiniteNegative,
        PositiveInfinity | NegativeInfinity => Zero,
        Indeterminate => Indeterminate,
        Unknown => Unknown,
    };
    let rate = match a.rate {
        GrowthRate::Polynomial(d) => GrowthRate::Polynomial(-d),
        GrowthRate::Exponential(b) => GrowthRate::Exponential(-b),
        other => other,
    };
    LimitResult { direction, rate }
}

pub(crate) fn apply_pow(base: LimitResult, exponent: LimitResult) -> LimitResult {
    use Direction::*;
    match (base.direction, exponent.direction) {
        (PositiveInfinity, PositiveInfinity) => {
            LimitResult { direction: PositiveInfinity, rate: GrowthRate::Exponential(1.0) }
        }
        (PositiveInfinity, FinitePositive) => {
            LimitResult { direction: PositiveInfinity, rate: GrowthRate::Unknown }
        }
        (PositiveInfinity, FiniteNegative) => LimitResult::finite(Zero),
        (FinitePositive, PositiveInfinity) => LimitResult::unknown(),
        _ => LimitResult::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expr_core::Store;

    #[test]
    fn constant_has_finite_limit() {
        let mut st = Store::new();
        let five = st.s_int(5);
        let r = limit(&st, five, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::FinitePositive);
    }

    #[test]
    fn variable_diverges_to_positive_infinity() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let r = limit(&st, x, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::PositiveInfinity);
        assert_eq!(r.rate, GrowthRate::Polynomial(1.0));
    }

    #[test]
    fn variable_diverges_to_negative_infinity_from_below() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let r = limit(&st, x, "x", LimitPoint::NegativeInfinity);
        assert_eq!(r.direction, Direction::NegativeInfinity);
    }

    #[test]
    fn reciprocal_vanishes_at_infinity() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let minus_one = st.s_int(-1);
        let inv_x = st.s_pow(x, minus_one);
        let r = limit(&st, inv_x, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::Zero);
    }

    #[test]
    fn polynomial_grows_faster_with_higher_degree() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let two = st.s_int(2);
        let x2 = st.s_pow(x, two);
        let r = limit(&st, x2, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::PositiveInfinity);
        assert_eq!(r.rate, GrowthRate::Polynomial(2.0));
    }

    #[test]
    fn exponential_dominates_polynomial_in_a_product() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let two = st.s_int(2);
        let x2 = st.s_pow(x, two);
        let ex = st.s_exp(x);
        let prod = st.s_mul(vec![x2, ex]);
        let r = limit(&st, prod, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::PositiveInfinity);
        assert!(matches!(r.rate, GrowthRate::Exponential(_)));
    }

    #[test]
    fn log_of_x_grows_logarithmically() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let lx = st.s_log(x).unwrap();
        let r = limit(&st, lx, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::PositiveInfinity);
        assert_eq!(r.rate, GrowthRate::Logarithmic);
    }

    #[test]
    fn log_grows_slower_than_the_variable_itself() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let lx = st.s_log(x).unwrap();
        let r_log = limit(&st, lx, "x", LimitPoint::PositiveInfinity);
        let r_x = limit(&st, x, "x", LimitPoint::PositiveInfinity);
        assert!(r_log.rate.dominance() < r_x.rate.dominance());
    }

    #[test]
    fn sum_of_divergent_and_finite_stays_divergent() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let five = st.s_int(5);
        let expr = st.s_add(vec![x, five]);
        let r = limit(&st, expr, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::PositiveInfinity);
    }

    #[test]
    fn log_over_x_vanishes_despite_log_diverging() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let lx = st.s_log(x).unwrap();
        let ratio = st.s_div(lx, x);
        let r = limit(&st, ratio, "x", LimitPoint::PositiveInfinity);
        assert_eq!(r.direction, Direction::Zero);
        assert_eq!(r.rate, GrowthRate::Constant);
    }

    #[test]
    fn opposite_infinities_are_indeterminate() {
        let a = LimitResult { direction: Direction::PositiveInfinity, rate: GrowthRate::Polynomial(1.0) };
        let b = LimitResult { direction: Direction::NegativeInfinity, rate: GrowthRate::Polynomial(1.0) };
        let r = combine_add(a, b);
        assert_eq!(r.direction, Direction::Indeterminate);
    }
}
