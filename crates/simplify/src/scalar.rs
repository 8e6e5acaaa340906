//! Scalar-algebra simplification: like-term/like-factor collection plus
//! assumption-guarded rewrites. Construction-time canonicalization (operand
//! flattening, sorting, numeric folding) already happened in `expr_core`'s
//! smart constructors; this pass adds the semantics a builder cannot see:
//! collecting coefficients across distinct `Add`/`Mul` operands and
//! consulting an `assumptions::Context`.

use crate::guarded;
use arith::Num;
use assumptions::Context;
use expr_core::{CasError, ExprId, Op, Payload, Store};
use std::collections::HashMap;

pub fn simplify(store: &mut Store, id: ExprId) -> Result<ExprId, CasError> {
    simplify_with(store, id, &Context::default())
}

pub fn simplify_with(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    match store.get(id).op {
        Op::SAdd => simplify_add(store, id, ctx),
        Op::SMul => simplify_mul(store, id, ctx),
        Op::SPow => simplify_pow(store, id, ctx),
        Op::SLog => simplify_log(store, id, ctx),
        Op::SAbs => simplify_abs(store, id, ctx),
        Op::SNeg => {
            let child = store.get(id).children[0];
            let c = simplify_with(store, child, ctx)?;
            Ok(store.s_neg(c))
        }
        Op::SExp => {
            let child = store.get(id).children[0];
            let c = simplify_with(store, child, ctx)?;
            Ok(store.s_exp(c))
        }
        Op::SSqrt => {
            let child = store.get(id).children[0];
            let c = simplify_with(store, child, ctx)?;
            Ok(store.s_sqrt(c))
        }
        Op::SFunction => {
            let name = match &store.get(id).payload {
                Payload::Func(s) => s.clone(),
                _ => return Err(CasError::internal("function node without Func payload")),
            };
            let args = store.get(id).children.clone();
            let mut new_args = Vec::with_capacity(args.len());
            for a in args {
                new_args.push(simplify_with(store, a, ctx)?);
            }
            Ok(store.s_function(name, new_args))
        }
        Op::SDiff => {
            let expr = store.get(id).children[0];
            let var = store.get(id).children[1];
            let e = simplify_with(store, expr, ctx)?;
            Ok(store.s_diff_node(e, var))
        }
        _ => Ok(id),
    }
}

fn simplify_pow(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let base_id = store.get(id).children[0];
    let exp_id = store.get(id).children[1];
    let base = simplify_with(store, base_id, ctx)?;
    let exp = simplify_with(store, exp_id, ctx)?;
    if let Some(r) = guarded::sqrt_of_square(store, ctx, base, exp) {
        return Ok(r);
    }
    Ok(store.s_pow(base, exp))
}

fn simplify_log(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let arg_id = store.get(id).children[0];
    let arg = simplify_with(store, arg_id, ctx)?;
    if let Some(r) = guarded::log_product_quotient_power(store, ctx, arg) {
        return Ok(r);
    }
    store.s_log(arg)
}

fn simplify_abs(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let arg_id = store.get(id).children[0];
    let arg = simplify_with(store, arg_id, ctx)?;
    if guarded::is_nonnegative(ctx, store, arg) {
        return Ok(arg);
    }
    Ok(store.s_abs(arg))
}

fn simplify_add(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let child_ids = store.get(id).children.clone();
    let mut terms = Vec::with_capacity(child_ids.len());
    for c in child_ids {
        terms.push(simplify_with(store, c, ctx)?);
    }
    let mut by_base: HashMap<ExprId, Num> = HashMap::new();
    let mut order: Vec<ExprId> = Vec::new();
    for t in terms {
        let (coeff, base) = split_coeff(store, t);
        let entry = by_base.entry(base).or_insert_with(|| {
            order.push(base);
            Num::Integer(0)
        });
        *entry = entry.add(&coeff);
    }
    let mut new_terms: Vec<ExprId> = Vec::new();
    for base in order {
        let n = by_base[&base];
        if n.is_zero() {
            continue;
        }
        let coeff_id = store.s_num(n);
        let term = if is_one(store, base) {
            coeff_id
        } else if n.is_one() {
            base
        } else {
            store.s_mul(vec![coeff_id, base])
        };
        new_terms.push(term);
    }
    if new_terms.is_empty() {
        return Ok(store.s_zero());
    }
    Ok(store.s_add(new_terms))
}

fn simplify_mul(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let child_ids = store.get(id).children.clone();
    let mut factors = Vec::with_capacity(child_ids.len());
    for c in child_ids {
        factors.push(simplify_with(store, c, ctx)?);
    }
    let mut exp_map: HashMap<ExprId, ExprId> = HashMap::new();
    let mut base_order: Vec<ExprId> = Vec::new();
    let mut passthrough: Vec<ExprId> = Vec::new();
    for f in factors {
        let (base, exp) = match store.get(f).op {
            Op::SPow => {
                let n = store.get(f);
                (n.children[0], n.children[1])
            }
            Op::SNum => {
                passthrough.push(f);
                continue;
            }
            _ => {
                let one = store.s_one();
                (f, one)
            }
        };
        let acc = exp_map.remove(&base).unwrap_or_else(|| {
            base_order.push(base);
            store.s_zero()
        });
        let sum = store.s_add(vec![acc, exp]);
        let sum_s = simplify_with(store, sum, ctx)?;
        exp_map.insert(base, sum_s);
    }
    let mut rebuilt = passthrough;
    for base in base_order {
        let exp = exp_map[&base];
        let term = if is_one(store, exp) { base } else { store.s_pow(base, exp) };
        rebuilt.push(term);
    }
    Ok(store.s_mul(rebuilt))
}

/// Split `term` into `(coeff, base)` with `term == coeff * base`.
fn split_coeff(store: &mut Store, id: ExprId) -> (Num, ExprId) {
    match (&store.get(id).op, store.get(id).payload.clone()) {
        (Op::SNum, Payload::Num(n)) => (n, store.s_one()),
        (Op::SMul, _) => {
            let mut coeff = Num::Integer(1);
            let mut rest = Vec::new();
            for f in store.get(id).children.clone() {
                if let (Op::SNum, Payload::Num(n)) = (&store.get(f).op, &store.get(f).payload) {
                    coeff = coeff.mul(n);
                } else {
                    rest.push(f);
                }
            }
            let base = if rest.is_empty() { store.s_one() } else { store.s_mul(rest) };
            (coeff, base)
        }
        _ => (Num::Integer(1), id),
    }
}

fn is_one(store: &Store, id: ExprId) -> bool {
    matches!((&store.get(id).op, &store.get(id).payload), (Op::SNum, Payload::Num(n)) if n.is_one())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assumptions::Prop;

    #[test]
    fn collects_like_terms() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let two_x = st.s_mul(vec![st.s_int(2), x]);
        let three_x = st.s_mul(vec![st.s_int(3), x]);
        let expr = st.s_add(vec![two_x, three_x]);
        let s = simplify(&mut st, expr).unwrap();
        let five_x = st.s_mul(vec![st.s_int(5), x]);
        assert_eq!(s, five_x);
    }

    #[test]
    fn idempotent() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let two_x = st.s_mul(vec![st.s_int(2), x]);
        let three_x = st.s_mul(vec![st.s_int(3), x]);
        let half = st.s_rat(1, 2).unwrap();
        let expr = st.s_add(vec![two_x, three_x, half]);
        let s1 = simplify(&mut st, expr).unwrap();
        let s2 = simplify(&mut st, s1).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn cancels_to_zero() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let two_x = st.s_mul(vec![st.s_int(2), x]);
        let minus_two_x = st.s_mul(vec![st.s_int(-2), x]);
        let expr = st.s_add(vec![two_x, minus_two_x]);
        let s = simplify(&mut st, expr).unwrap();
        assert_eq!(s, st.s_zero());
    }

    #[test]
    fn combines_powers() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let x2 = st.s_pow(x, st.s_int(2));
        let x3 = st.s_pow(x, st.s_int(3));
        let expr = st.s_mul(vec![x2, x3]);
        let s = simplify(&mut st, expr).unwrap();
        let x5 = st.s_pow(x, st.s_int(5));
        assert_eq!(s, x5);
    }

    #[test]
    fn sqrt_square_to_abs_without_assumption() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let x2 = st.s_pow(x, st.s_int(2));
        let sqrt_x2 = st.s_sqrt(x2);
        let s = simplify(&mut st, sqrt_x2).unwrap();
        let abs_x = st.s_abs(x);
        assert_eq!(s, abs_x);
    }

    #[test]
    fn sqrt_square_to_x_with_nonneg_assumption() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let x2 = st.s_pow(x, st.s_int(2));
        let sqrt_x2 = st.s_sqrt(x2);
        let mut ctx = Context::new();
        ctx.assume("x", Prop::NonNegative);
        let s = simplify_with(&mut st, sqrt_x2, &ctx).unwrap();
        assert_eq!(s, x);
    }

    #[test]
    fn log_product_rule_with_positivity() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let y = st.s_sym("y");
        let prod = st.s_mul(vec![x, y]);
        let log_expr = store_log(&mut st, prod);
        let mut ctx = Context::new();
        ctx.assume("x", Prop::Positive);
        ctx.assume("y", Prop::Positive);
        let s = simplify_with(&mut st, log_expr, &ctx).unwrap();
        let log_x = st.s_log(x).unwrap();
        let log_y = st.s_log(y).unwrap();
        let expected = st.s_add(vec![log_x, log_y]);
        assert_eq!(s, expected);
    }

    fn store_log(st: &mut Store, x: ExprId) -> ExprId {
        st.s_log(x).unwrap()
    }
}
