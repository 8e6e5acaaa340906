//! Tensor-algebra simplification: recurse into children, collect additive
//! terms sharing the same tensor factor by combining their scalar
//! coefficients (the tensor analogue of `scalar::simplify_add`'s
//! coeff/base split — generalized from a numeric base to a tensor-valued
//! one), and recanonicalize through `expr_core`'s builders so contraction
//! chains stay in their non-commutative construction order.

use assumptions::Context;
use expr_core::{CasError, ExprId, Op, Store};
use std::collections::HashMap;

pub fn simplify(store: &mut Store, id: ExprId) -> Result<ExprId, CasError> {
    simplify_with(store, id, &Context::default())
}

pub fn simplify_with(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    match store.get(id).op {
        Op::TNeg => {
            let c = store.get(id).children[0];
            let s = simplify_with(store, c, ctx)?;
            Ok(store.t_neg(s))
        }
        Op::TDeviatoric => {
            let c = store.get(id).children[0];
            let s = simplify_with(store, c, ctx)?;
            Ok(store.t_deviatoric(s))
        }
        Op::TVolumetric => {
            let c = store.get(id).children[0];
            let s = simplify_with(store, c, ctx)?;
            Ok(store.t_volumetric(s))
        }
        Op::TAdd => simplify_add(store, id, ctx),
        Op::TMul => simplify_mul(store, id, ctx),
        Op::TScalarMul => {
            let s_id = store.get(id).children[0];
            let t_id = store.get(id).children[1];
            let s = crate::scalar::simplify_with(store, s_id, ctx)
                .map_err(|_| CasError::internal("scalar simplify inside tensor_scalar_mul"))?;
            let t = simplify_with(store, t_id, ctx)?;
            Ok(store.t_scalar_mul(s, t))
        }
        _ => Ok(id),
    }
}

fn simplify_add(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let child_ids = store.get(id).children.clone();
    let mut terms = Vec::with_capacity(child_ids.len());
    for c in child_ids {
        terms.push(simplify_with(store, c, ctx)?);
    }
    let mut by_tensor: HashMap<ExprId, ExprId> = HashMap::new();
    let mut order: Vec<ExprId> = Vec::new();
    for t in terms {
        let (coeff, base) = split_coeff(store, t);
        let acc = by_tensor.remove(&base).unwrap_or_else(|| {
            order.push(base);
            store.s_zero()
        });
        let sum = store.s_add(vec![acc, coeff]);
        let sum_s = crate::scalar::simplify_with(store, sum, ctx)
            .map_err(|_| CasError::internal("scalar simplify inside tensor_add coefficient fold"))?;
        by_tensor.insert(base, sum_s);
    }
    let mut new_terms = Vec::new();
    for base in order {
        let coeff = by_tensor[&base];
        new_terms.push(store.t_scalar_mul(coeff, base));
    }
    if new_terms.is_empty() {
        return Err(CasError::internal("tensor add with no operands after collection"));
    }
    store.t_add(new_terms)
}

fn simplify_mul(store: &mut Store, id: ExprId, ctx: &Context) -> Result<ExprId, CasError> {
    let child_ids = store.get(id).children.clone();
    let mut factors = Vec::with_capacity(child_ids.len());
    for c in child_ids {
        factors.push(simplify_with(store, c, ctx)?);
    }
    store.t_mul(factors)
}

/// Split a tensor-valued term into `(scalar coeff, tensor base)` with
/// `term == coeff . base`.
fn split_coeff(store: &mut Store, id: ExprId) -> (ExprId, ExprId) {
    match store.get(id).op {
        Op::TScalarMul => {
            let s = store.get(id).children[0];
            let t = store.get(id).children[1];
            (s, t)
        }
        Op::TNeg => {
            let inner = store.get(id).children[0];
            let (coeff, base) = split_coeff(store, inner);
            (store.s_neg(coeff), base)
        }
        _ => (store.s_one(), id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_like_tensor_terms() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let two = st.s_int(2);
        let three = st.s_int(3);
        let two_a = st.t_scalar_mul(two, a);
        let three_a = st.t_scalar_mul(three, a);
        let expr = st.t_add(vec![two_a, three_a]).unwrap();
        let s = simplify(&mut st, expr).unwrap();
        let five = st.s_int(5);
        let expected = st.t_scalar_mul(five, a);
        assert_eq!(s, expected);
    }

    #[test]
    fn cancels_opposite_tensor_terms() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let na = st.t_neg(a);
        let expr = st.t_add(vec![a, na]).unwrap();
        let s = simplify(&mut st, expr).unwrap();
        assert!(matches!(st.get(s).op, Op::TZero));
    }

    #[test]
    fn idempotent() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let b = st.t_sym("B", 3, 2);
        let expr = st.t_add(vec![a, b]).unwrap();
        let s1 = simplify(&mut st, expr).unwrap();
        let s2 = simplify(&mut st, s1).unwrap();
        assert_eq!(s1, s2);
    }
}
