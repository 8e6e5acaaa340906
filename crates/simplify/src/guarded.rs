//! Assumption-guarded rewrites: identities that only hold under a domain
//! restriction on their operands (teacher's `is_positive_symbol` pattern,
//! generalized to also recognize embedded `SAssumption` atoms).

use assumptions::{Context, Prop, Truth};
use expr_core::{ExprId, Op, Payload, Store};

pub fn is_positive(ctx: &Context, store: &Store, id: ExprId) -> bool {
    match (&store.get(id).op, &store.get(id).payload) {
        (Op::SSymbol, Payload::Sym(s)) => matches!(ctx.has(s, Prop::Positive), Truth::True),
        (Op::SAssumption, Payload::Assumption(_, Prop::Positive)) => true,
        _ => false,
    }
}

pub fn is_nonnegative(ctx: &Context, store: &Store, id: ExprId) -> bool {
    if is_positive(ctx, store, id) {
        return true;
    }
    match (&store.get(id).op, &store.get(id).payload) {
        (Op::SSymbol, Payload::Sym(s)) => matches!(ctx.has(s, Prop::NonNegative), Truth::True),
        (Op::SAssumption, Payload::Assumption(_, Prop::NonNegative)) => true,
        _ => false,
    }
}

/// `log(x*y) = log x + log y`, `log(x * y^-1) = log x - log y`,
/// `log(x^k) = k * log x` — each only when every scalar factor touched is
/// provably positive. Returns `None` when no rule fires.
pub fn log_product_quotient_power(
    store: &mut Store,
    ctx: &Context,
    arg: ExprId,
) -> Option<ExprId> {
    match store.get(arg).op {
        Op::SPow => {
            let base = store.get(arg).children[0];
            let exp = store.get(arg).children[1];
            if is_positive(ctx, store, base) {
                let log_base = store.s_log(base).expect("base already proven positive");
                return Some(store.s_mul(vec![exp, log_base]));
            }
            None
        }
        Op::SMul => {
            let factors = store.get(arg).children.clone();
            // quotient form: exactly one factor is `y^-1` with y positive.
            if factors.len() == 2 {
                for (x_like, y_pow_like) in [(factors[0], factors[1]), (factors[1], factors[0])] {
                    if let Op::SPow = store.get(y_pow_like).op {
                        let base_y = store.get(y_pow_like).children[0];
                        let exp_y = store.get(y_pow_like).children[1];
                        let exp_is_neg_one = matches!(
                            (&store.get(exp_y).op, &store.get(exp_y).payload),
                            (Op::SNum, Payload::Num(n)) if *n == arith::Num::Integer(-1)
                        );
                        if exp_is_neg_one
                            && is_positive(ctx, store, x_like)
                            && is_positive(ctx, store, base_y)
                        {
                            let log_x = store.s_log(x_like).expect("x proven positive");
                            let log_y = store.s_log(base_y).expect("y proven positive");
                            let neg_log_y = store.s_neg(log_y);
                            return Some(store.s_add(vec![log_x, neg_log_y]));
                        }
                    }
                }
            }
            if factors.iter().all(|&f| is_positive(ctx, store, f)) {
                let logs: Vec<ExprId> =
                    factors.iter().map(|&f| store.s_log(f).expect("factor proven positive")).collect();
                return Some(store.s_add(logs));
            }
            None
        }
        _ => None,
    }
}

/// `(x^2)^(1/2) -> x` when `x` is provably non-negative, else `abs(x)`.
pub fn sqrt_of_square(store: &mut Store, ctx: &Context, base: ExprId, exp: ExprId) -> Option<ExprId> {
    let is_half = matches!(
        (&store.get(exp).op, &store.get(exp).payload),
        (Op::SNum, Payload::Num(n)) if *n == arith::Num::rational(1, 2).expect("1/2 is valid")
    );
    if !is_half {
        return None;
    }
    if let Op::SPow = store.get(base).op {
        let inner_base = store.get(base).children[0];
        let inner_exp = store.get(base).children[1];
        let exp_is_two = matches!(
            (&store.get(inner_exp).op, &store.get(inner_exp).payload),
            (Op::SNum, Payload::Num(arith::Num::Integer(2)))
        );
        if exp_is_two {
            return Some(if is_nonnegative(ctx, store, inner_base) {
                inner_base
            } else {
                store.s_abs(inner_base)
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_power_rule_fires_when_positive() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let three = st.s_int(3);
        let x3 = st.s_pow(x, three);
        let mut ctx = Context::new();
        ctx.assume("x", Prop::Positive);
        let r = log_product_quotient_power(&mut st, &ctx, x3);
        assert!(r.is_some());
    }

    #[test]
    fn log_power_rule_silent_without_assumption() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let three = st.s_int(3);
        let x3 = st.s_pow(x, three);
        let ctx = Context::new();
        let r = log_product_quotient_power(&mut st, &ctx, x3);
        assert!(r.is_none());
    }
}
