//! `tensor_to_scalar` simplification: recurse into children and apply the
//! one identity the scalar-valued algebra needs that the tensor algebra's
//! own canonicalization cannot provide — cyclic invariance of the trace,
//! `tr(A*B*...*Z) = tr(B*...*Z*A)`. `expr_core::t_mul` deliberately leaves
//! tensor-contraction operand order untouched (contraction is not
//! commutative), so `tr(AB)` and `tr(BA)` only collapse to the same node
//! once this pass rotates each trace argument's top-level factor chain to
//! a canonical starting point before re-interning it.

use assumptions::Context;
use expr_core::{CasError, ExprId, Op, Store};

pub fn simplify(store: &mut Store, id: ExprId) -> Result<ExprId, CasError> {
    simplify_with(store, id, &Context::default())
}

pub fn simplify_with(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    match store.get(id).op {
        Op::TsNeg => {
            let c = store.get(id).children[0];
            let s = simplify_with(store, c, ctx)?;
            Ok(store.ts_neg(s))
        }
        Op::TsExp => {
            let c = store.get(id).children[0];
            let s = simplify_with(store, c, ctx)?;
            Ok(store.ts_exp(s))
        }
        Op::TsLog => {
            let c = store.get(id).children[0];
            let s = simplify_with(store, c, ctx)?;
            store.ts_log(s)
        }
        Op::TsTrace => {
            let tensor = store.get(id).children[0];
            let t_simplified = crate::tensor::simplify_with(store, tensor, ctx)?;
            let rotated = canonical_rotation(store, t_simplified);
            store.ts_trace(rotated)
        }
        Op::TsPow => {
            let base = store.get(id).children[0];
            let exp = store.get(id).children[1];
            let b = simplify_with(store, base, ctx)?;
            Ok(store.ts_pow(b, exp))
        }
        Op::TsAdd => simplify_add(store, id, ctx),
        Op::TsMul => simplify_mul(store, id, ctx),
        _ => Ok(id),
    }
}

/// `tensor_to_scalar` has no generic numeric atom (only `zero`/`one`), so
/// there is no coefficient to collect the way `scalar`/`tensor` do.
/// Cancellation is still tracked as a signed integer multiplicity per
/// distinct base term: `t + t - t - t` collapses to `0` even though
/// `3 * t` has no representation to collapse into.
fn simplify_add(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let child_ids = store.get(id).children.clone();
    let mut terms = Vec::with_capacity(child_ids.len());
    for c in child_ids {
        terms.push(simplify_with(store, c, ctx)?);
    }
    let mut counts: std::collections::HashMap<ExprId, i64> = std::collections::HashMap::new();
    let mut order: Vec<ExprId> = Vec::new();
    for t in terms {
        let (base, sign) = match store.get(t).op {
            Op::TsNeg => (store.get(t).children[0], -1),
            _ => (t, 1),
        };
        let entry = counts.entry(base).or_insert_with(|| {
            order.push(base);
            0
        });
        *entry += sign;
    }
    let mut rebuilt = Vec::new();
    for base in order {
        let n = counts[&base];
        let copies = if n >= 0 { base } else { store.ts_neg(base) };
        for _ in 0..n.unsigned_abs() {
            rebuilt.push(copies);
        }
    }
    Ok(store.ts_add(rebuilt))
}

fn simplify_mul(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let child_ids = store.get(id).children.clone();
    let mut factors = Vec::with_capacity(child_ids.len());
    for c in child_ids {
        factors.push(simplify_with(store, c, ctx)?);
    }
    store.ts_mul(factors)
}

/// If `tensor` is a top-level contraction chain `TMul([f0..fn])`, rotate it
/// to start at its structurally-smallest factor (by digest) and rebuild.
/// A non-`TMul` tensor (a bare symbol, a sum, ...) is returned unchanged —
/// cyclic invariance only concerns a flat product chain under trace.
fn canonical_rotation(store: &mut Store, tensor: ExprId) -> ExprId {
    let Op::TMul = store.get(tensor).op else {
        return tensor;
    };
    let chain = store.get(tensor).children.clone();
    if chain.len() < 2 {
        return tensor;
    }
    let min_idx = (0..chain.len())
        .min_by_key(|&i| store.get(chain[i]).digest)
        .expect("chain is non-empty");
    let mut rotated = Vec::with_capacity(chain.len());
    rotated.extend_from_slice(&chain[min_idx..]);
    rotated.extend_from_slice(&chain[..min_idx]);
    store.t_mul(rotated).unwrap_or(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_is_cyclically_invariant() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let b = st.t_sym("B", 3, 2);
        let ab = st.t_mul(vec![a, b]).unwrap();
        let ba = st.t_mul(vec![b, a]).unwrap();
        let tr_ab = st.ts_trace(ab).unwrap();
        let tr_ba = st.ts_trace(ba).unwrap();
        let s_ab = simplify(&mut st, tr_ab).unwrap();
        let s_ba = simplify(&mut st, tr_ba).unwrap();
        assert_eq!(s_ab, s_ba);
    }

    #[test]
    fn trace_difference_cancels_to_zero() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let b = st.t_sym("B", 3, 2);
        let ab = st.t_mul(vec![a, b]).unwrap();
        let ba = st.t_mul(vec![b, a]).unwrap();
        let tr_ab = st.ts_trace(ab).unwrap();
        let tr_ba = st.ts_trace(ba).unwrap();
        let diff = st.ts_sub(tr_ab, tr_ba);
        let s = simplify(&mut st, diff).unwrap();
        assert_eq!(s, st.ts_zero());
    }

    #[test]
    fn idempotent() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let tr = st.ts_trace(a).unwrap();
        let s1 = simplify(&mut st, tr).unwrap();
        let s2 = simplify(&mut st, s1).unwrap();
        assert_eq!(s1, s2);
    }
}
