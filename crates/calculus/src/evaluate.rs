//! Constant folding over the scalar algebra, generalized from the teacher's
//! `(i64,i64)`-rational-only `try_eval_constant` to `arith::Num` (exact
//! rationals and reals both fold). Most of this is redundant with
//! `expr_core`'s builders, which already fold pure-numeric `Add`/`Mul`/`Pow`
//! at construction time — this pass exists for the case a tree was built
//! by hand (e.g. via `Store::intern` through another crate) rather than
//! through the smart constructors, and for `calculus::limit`'s use as a
//! "is this subexpression actually just a number" probe.

use arith::Num;
use expr_core::{ExprId, Op, Payload, Store};

pub fn try_eval_constant(store: &Store, expr: ExprId) -> Option<Num> {
    match (&store.get(expr).op, &store.get(expr).payload) {
        (Op::SNum, Payload::Num(n)) => Some(n.clone()),
        (Op::SSymbol, _) | (Op::SAssumption, _) => None,
        (Op::SAdd, _) => {
            let children = store.get(expr).children.clone();
            let mut sum = Num::Integer(0);
            for c in children {
                sum = sum.add(&try_eval_constant(store, c)?);
            }
            Some(sum)
        }
        (Op::SMul, _) => {
            let children = store.get(expr).children.clone();
            let mut product = Num::Integer(1);
            for c in children {
                product = product.mul(&try_eval_constant(store, c)?);
            }
            Some(product)
        }
        (Op::SNeg, _) => {
            let c = store.get(expr).children[0];
            Some(try_eval_constant(store, c)?.negate())
        }
        (Op::SPow, _) => {
            let children = store.get(expr).children.clone();
            let base = try_eval_constant(store, children[0])?;
            let exp = try_eval_constant(store, children[1])?;
            Some(base.pow(&exp))
        }
        _ => None,
    }
}

pub fn try_eval_float(store: &Store, expr: ExprId) -> Option<f64> {
    Some(try_eval_constant(store, expr)?.to_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_integer() {
        let mut st = Store::new();
        let five = st.s_int(5);
        assert_eq!(try_eval_constant(&st, five), Some(Num::Integer(5)));
    }

    #[test]
    fn eval_add() {
        let mut st = Store::new();
        let two = st.s_int(2);
        let three = st.s_int(3);
        let sum = st.s_add(vec![two, three]);
        assert_eq!(try_eval_constant(&st, sum), Some(Num::Integer(5)));
    }

    #[test]
    fn eval_with_variable_fails() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let two = st.s_int(2);
        let expr = st.s_add(vec![x, two]);
        assert_eq!(try_eval_constant(&st, expr), None);
    }

    #[test]
    fn eval_float() {
        let mut st = Store::new();
        let three = st.s_int(3);
        assert_eq!(try_eval_float(&st, three), Some(3.0));
    }
}
