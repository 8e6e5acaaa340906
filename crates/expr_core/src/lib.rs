#![deny(warnings)]
//! expr_core: hash-consed, immutable expression kernel spanning three
//! coupled algebras (scalar, tensor, tensor-to-scalar).
//! - `Op`/`Payload`/`Node`/`ExprId`
//! - `Store`: arena + interner, canonical smart constructors per algebra
//! - Deterministic digest (FNV-1a 64) and a strict-weak-order structural key
//!   used to canonicalize commutative operands (Add/Mul/tensor Add)
//! - Plain-text render sink (`Store::to_string`)

use arith::Num;
use assumptions::Prop;
use std::collections::HashMap;
use std::fmt;

mod error;
pub use error::CasError;

// ---------- IDs & node kinds ----------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    // Scalar
    SNum,
    SSymbol,
    SAssumption,
    SNeg,
    SAbs,
    SExp,
    SLog,
    SSqrt,
    SFunction,
    SPow,
    SDiff,
    SAdd,
    SMul,
    // Tensor
    TZero,
    TSymbol,
    TIdentity,
    TNeg,
    TDeviatoric,
    TVolumetric,
    TAdd,
    TMul,
    // TensorToScalar
    TsZero,
    TsOne,
    TsSymbol,
    TsNeg,
    TsExp,
    TsLog,
    TsTrace,
    TsPow,
    TsAdd,
    TsMul,
    // Cross-algebra bridges
    TScalarMul,
}

/// Which of the three coupled algebras a node's *result* belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algebra {
    Scalar,
    Tensor,
    TensorToScalar,
}

impl Op {
    pub fn algebra(&self) -> Algebra {
        use Op::*;
        match self {
            SNum | SSymbol | SAssumption | SNeg | SAbs | SExp | SLog | SSqrt | SFunction | SPow
            | SDiff | SAdd | SMul => Algebra::Scalar,
            TZero | TSymbol | TIdentity | TNeg | TDeviatoric | TVolumetric | TAdd | TMul
            | TScalarMul => Algebra::Tensor,
            TsZero | TsOne | TsSymbol | TsNeg | TsExp | TsLog | TsTrace | TsPow | TsAdd
            | TsMul => Algebra::TensorToScalar,
        }
    }

    /// Stable small integer tag, used for both the digest and the structural
    /// ordering key. Order here has no semantic meaning beyond stability.
    fn tag(&self) -> u32 {
        use Op::*;
        match self {
            SNum => 0,
            SSymbol => 1,
            SAssumption => 2,
            SNeg => 3,
            SAbs => 4,
            SExp => 5,
            SLog => 6,
            SSqrt => 7,
            SFunction => 8,
            SPow => 9,
            SDiff => 10,
            SAdd => 11,
            SMul => 12,
            TZero => 13,
            TSymbol => 14,
            TIdentity => 15,
            TNeg => 16,
            TDeviatoric => 17,
            TVolumetric => 18,
            TAdd => 19,
            TMul => 20,
            TsZero => 21,
            TsOne => 22,
            TsSymbol => 23,
            TsNeg => 24,
            TsExp => 25,
            TsLog => 26,
            TsTrace => 27,
            TsPow => 28,
            TsAdd => 29,
            TsMul => 30,
            TScalarMul => 31,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Payload {
    None,
    Num(Num),
    Sym(String),
    Assumption(String, Prop),
    Func(String),
    TensorZero(usize, usize),
    TensorSymbol(String, usize, usize),
    TensorIdentity(usize, usize),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub op: Op,
    pub payload: Payload,
    pub children: Vec<ExprId>,
    pub digest: u64,
    /// Set for every node whose *result* belongs to the tensor algebra
    /// (spec: "every node carries ... dim and rank" for tensor nodes).
    pub dim_rank: Option<(usize, usize)>,
}

#[derive(Hash, PartialEq, Eq)]
struct NodeKey {
    op: Op,
    payload: Payload,
    child_digests: Vec<u64>,
}

// ---------- Store (arena + interner) ----------

#[derive(Default)]
pub struct Store {
    nodes: Vec<Node>,
    interner: HashMap<NodeKey, ExprId>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ExprId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn algebra(&self, id: ExprId) -> Algebra {
        self.get(id).op.algebra()
    }

    // ---- Interning ----
    fn intern(&mut self, op: Op, payload: Payload, children: Vec<ExprId>) -> ExprId {
        self.intern_with_rank(op, payload, children, None)
    }

    fn intern_with_rank(
        &mut self,
        op: Op,
        payload: Payload,
        children: Vec<ExprId>,
        dim_rank: Option<(usize, usize)>,
    ) -> ExprId {
        let child_digests: Vec<u64> = children.iter().map(|id| self.get(*id).digest).collect();
        let key = NodeKey { op, payload: payload.clone(), child_digests: child_digests.clone() };
        if let Some(&id) = self.interner.get(&key) {
            return id;
        }
        let digest = digest_node(op, &payload, &child_digests);
        let id = ExprId(self.nodes.len());
        self.nodes.push(Node { op, payload, children, digest, dim_rank });
        self.interner.insert(key, id);
        id
    }

    // ======================================================================
    // Scalar algebra
    // ======================================================================

    pub fn s_int(&mut self, n: i64) -> ExprId {
        self.intern(Op::SNum, Payload::Num(Num::Integer(n)), vec![])
    }

    pub fn s_real(&mut self, r: f64) -> ExprId {
        self.intern(Op::SNum, Payload::Num(Num::Real(r)), vec![])
    }

    /// `rational(a,0)` fails with `InvalidExpression`; `rational(a,b)` with
    /// `a%b==0` folds to an integer (spec §4.3).
    pub fn s_rat(&mut self, num: i64, den: i64) -> Result<ExprId, CasError> {
        let n = Num::rational(num, den)
            .ok_or_else(|| CasError::invalid(format!("rational with zero denominator {num}/{den}")))?;
        Ok(self.intern(Op::SNum, Payload::Num(n), vec![]))
    }

    pub fn s_num(&mut self, n: Num) -> ExprId {
        self.intern(Op::SNum, Payload::Num(n), vec![])
    }

    pub fn s_zero(&mut self) -> ExprId {
        self.s_int(0)
    }

    pub fn s_one(&mut self) -> ExprId {
        self.s_int(1)
    }

    pub fn s_sym<S: Into<String>>(&mut self, name: S) -> ExprId {
        self.intern(Op::SSymbol, Payload::Sym(name.into()), vec![])
    }

    pub fn s_assumption<S: Into<String>>(&mut self, name: S, prop: Prop) -> ExprId {
        self.intern(Op::SAssumption, Payload::Assumption(name.into(), prop), vec![])
    }

    /// `neg(invalid)` has no analogue here (no "invalid handle" state is
    /// representable once a node is interned); `neg(zero)=zero`,
    /// `neg(neg x)=x`, numeric constants fold immediately.
    pub fn s_neg(&mut self, x: ExprId) -> ExprId {
        match (&self.get(x).op, &self.get(x).payload) {
            (Op::SNum, Payload::Num(n)) => self.s_num(n.negate()),
            (Op::SNeg, _) => self.get(x).children[0],
            _ => self.intern(Op::SNeg, Payload::None, vec![x]),
        }
    }

    /// `abs(x)=x` for a numeric constant known to be non-negative (folds to
    /// the positive value for negative constants); `abs(neg x) = abs(x)`;
    /// `abs(x)=x` when `x` is itself an embedded non-negative assumption
    /// atom. Richer, context-driven `abs` rewrites live in `simplify`.
    pub fn s_abs(&mut self, x: ExprId) -> ExprId {
        match (&self.get(x).op, self.get(x).payload.clone()) {
            (Op::SNum, Payload::Num(n)) => {
                let abs_n = if matches!(n.sign(), arith::Sign::Negative) { n.negate() } else { n };
                self.s_num(abs_n)
            }
            (Op::SNeg, _) => {
                let inner = self.get(x).children[0];
                self.s_abs(inner)
            }
            (Op::SAssumption, Payload::Assumption(_, prop))
                if matches!(prop, Prop::Positive | Prop::NonNegative) =>
            {
                x
            }
            _ => self.intern(Op::SAbs, Payload::None, vec![x]),
        }
    }

    /// `exp(0)=1`. `exp(log x) = x` requires a positivity proof the builder
    /// cannot see on its own; that rewrite lives in `simplify` (guarded by
    /// an `assumptions::Context`). Here we only fold the case where the
    /// argument is literally an embedded positive assumption of `log`'s
    /// argument being undone, i.e. `exp(log(assumption))`.
    pub fn s_exp(&mut self, x: ExprId) -> ExprId {
        if let (Op::SNum, Payload::Num(n)) = (&self.get(x).op, &self.get(x).payload) {
            if n.is_zero() {
                return self.s_one();
            }
        }
        if let Op::SLog = self.get(x).op {
            let inner = self.get(x).children[0];
            if let (Op::SAssumption, Payload::Assumption(_, prop)) =
                (&self.get(inner).op, &self.get(inner).payload)
            {
                if matches!(prop, Prop::Positive) {
                    return inner;
                }
            }
        }
        self.intern(Op::SExp, Payload::None, vec![x])
    }

    /// `log(1)=0`; `log(exp x) = x` (always valid: `exp` is a total
    /// function and this identity holds for all real `x`, no assumption
    /// needed, unlike the converse).
    pub fn s_log(&mut self, x: ExprId) -> Result<ExprId, CasError> {
        if let (Op::SNum, Payload::Num(n)) = (&self.get(x).op, &self.get(x).payload) {
            if n.is_one() {
                return Ok(self.s_zero());
            }
            if matches!(n.sign(), arith::Sign::Negative) {
                return Err(CasError::not_implemented("log of a negative constant"));
            }
        }
        if let Op::SExp = self.get(x).op {
            return Ok(self.get(x).children[0]);
        }
        Ok(self.intern(Op::SLog, Payload::None, vec![x]))
    }

    pub fn s_sqrt(&mut self, x: ExprId) -> ExprId {
        let half = self.s_rat(1, 2).expect("1/2 is never invalid");
        self.s_pow(x, half)
    }

    pub fn s_function<S: Into<String>>(&mut self, name: S, args: Vec<ExprId>) -> ExprId {
        self.intern(Op::SFunction, Payload::Func(name.into()), args)
    }

    /// `pow(x,0)=1` (except `0^0`, which stays unevaluated by documented
    /// convention — see DESIGN.md); `pow(x,1)=x`; `pow(0,k>0)=0`;
    /// `pow(1,_)=1`; integer/rational base with integer exponent folds
    /// exactly; `pow(pow(b,e1),e2) = pow(b, e1*e2)` only when both exponents
    /// are integers, since that merge takes no fractional root and so never
    /// needs a sign assumption on `b` (e.g. `(x^2)^(1/2)` must stay unfolded
    /// so the `abs`/assumption-guarded rewrites in `simplify` can see it).
    pub fn s_pow(&mut self, base: ExprId, exp: ExprId) -> ExprId {
        let base_is_zero = matches!(
            (&self.get(base).op, &self.get(base).payload),
            (Op::SNum, Payload::Num(n)) if n.is_zero()
        );
        let exp_is_zero =
            matches!((&self.get(exp).op, &self.get(exp).payload), (Op::SNum, Payload::Num(n)) if n.is_zero());
        if exp_is_zero {
            if base_is_zero {
                return self.intern(Op::SPow, Payload::None, vec![base, exp]);
            }
            return self.s_one();
        }
        if let (Op::SNum, Payload::Num(n)) = (&self.get(exp).op, &self.get(exp).payload) {
            if n.is_one() {
                return base;
            }
        }
        if base_is_zero {
            if let (Op::SNum, Payload::Num(n)) = (&self.get(exp).op, &self.get(exp).payload) {
                if matches!(n.sign(), arith::Sign::Positive) {
                    return self.s_zero();
                }
            }
        }
        if let (Op::SNum, Payload::Num(n)) = (&self.get(base).op, &self.get(base).payload) {
            if n.is_one() {
                return self.s_one();
            }
        }
        // Fold numeric^numeric exactly when possible.
        if let (
            (Op::SNum, Payload::Num(b)),
            (Op::SNum, Payload::Num(e)),
        ) = ((&self.get(base).op, &self.get(base).payload), (&self.get(exp).op, &self.get(exp).payload))
        {
            if matches!(e, Num::Integer(_)) {
                let folded = b.pow(e);
                return self.s_num(folded);
            }
        }
        // pow(pow(b,e1),e2) -> pow(b, e1*e2), only when e1 and e2 are both
        // integers (no fractional root taken, so no sign ambiguity on b).
        if let Op::SPow = self.get(base).op {
            let inner_base = self.get(base).children[0];
            let inner_exp = self.get(base).children[1];
            let both_integer = matches!(
                (&self.get(inner_exp).op, &self.get(inner_exp).payload),
                (Op::SNum, Payload::Num(Num::Integer(_)))
            ) && matches!(
                (&self.get(exp).op, &self.get(exp).payload),
                (Op::SNum, Payload::Num(Num::Integer(_)))
            );
            if both_integer {
                let combined_exp = self.s_mul(vec![inner_exp, exp]);
                return self.s_pow(inner_base, combined_exp);
            }
        }
        self.intern(Op::SPow, Payload::None, vec![base, exp])
    }

    /// An unevaluated derivative marker `diff(expr, var)`: the scalar
    /// algebra's own binary node kind for representing a derivative the
    /// kernel does not know how to evaluate symbolically yet.
    pub fn s_diff_node(&mut self, expr: ExprId, var: ExprId) -> ExprId {
        self.intern(Op::SDiff, Payload::None, vec![expr, var])
    }

    pub fn s_add<I: IntoIterator<Item = ExprId>>(&mut self, it: I) -> ExprId {
        let mut terms: Vec<ExprId> = Vec::new();
        let mut acc = Num::Integer(0);
        for t in it {
            match (&self.get(t).op, self.get(t).payload.clone()) {
                (Op::SAdd, _) => {
                    for c in self.get(t).children.clone() {
                        terms.push(c);
                    }
                }
                (Op::SNum, Payload::Num(n)) => acc = acc.add(&n),
                _ => terms.push(t),
            }
        }
        if !acc.is_zero() {
            terms.push(self.s_num(acc));
        }
        terms.retain(|&id| {
            !matches!((&self.get(id).op, &self.get(id).payload), (Op::SNum, Payload::Num(n)) if n.is_zero())
        });
        if terms.is_empty() {
            return self.s_zero();
        }
        if terms.len() == 1 {
            return terms[0];
        }
        terms.sort_by(|a, b| self.order_key(*a).cmp(&self.order_key(*b)));
        self.intern(Op::SAdd, Payload::None, terms)
    }

    pub fn s_sub(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let nb = self.s_neg(b);
        self.s_add(vec![a, nb])
    }

    pub fn s_mul<I: IntoIterator<Item = ExprId>>(&mut self, it: I) -> ExprId {
        let mut factors: Vec<ExprId> = Vec::new();
        let mut acc = Num::Integer(1);
        for f in it {
            match (&self.get(f).op, self.get(f).payload.clone()) {
                (Op::SMul, _) => {
                    for c in self.get(f).children.clone() {
                        factors.push(c);
                    }
                }
                (Op::SNum, Payload::Num(n)) => {
                    if n.is_zero() {
                        return self.s_zero();
                    }
                    acc = acc.mul(&n);
                }
                _ => factors.push(f),
            }
        }
        if acc.is_zero() {
            return self.s_zero();
        }
        if !acc.is_one() {
            factors.push(self.s_num(acc));
        }
        factors.retain(|&id| {
            !matches!((&self.get(id).op, &self.get(id).payload), (Op::SNum, Payload::Num(n)) if n.is_one())
        });
        if factors.is_empty() {
            return self.s_one();
        }
        if factors.len() == 1 {
            return factors[0];
        }
        factors.sort_by(|a, b| self.order_key(*a).cmp(&self.order_key(*b)));
        self.intern(Op::SMul, Payload::None, factors)
    }

    pub fn s_div(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let minus_one = self.s_int(-1);
        let inv_b = self.s_pow(b, minus_one);
        self.s_mul(vec![a, inv_b])
    }

    // ======================================================================
    // Tensor algebra
    // ======================================================================

    pub fn t_zero(&mut self, dim: usize, rank: usize) -> ExprId {
        self.intern_with_rank(Op::TZero, Payload::TensorZero(dim, rank), vec![], Some((dim, rank)))
    }

    pub fn t_sym<S: Into<String>>(&mut self, name: S, dim: usize, rank: usize) -> ExprId {
        self.intern_with_rank(
            Op::TSymbol,
            Payload::TensorSymbol(name.into(), dim, rank),
            vec![],
            Some((dim, rank)),
        )
    }

    pub fn t_identity(&mut self, dim: usize, rank: usize) -> ExprId {
        self.intern_with_rank(
            Op::TIdentity,
            Payload::TensorIdentity(dim, rank),
            vec![],
            Some((dim, rank)),
        )
    }

    pub fn t_neg(&mut self, x: ExprId) -> ExprId {
        if let Op::TNeg = self.get(x).op {
            return self.get(x).children[0];
        }
        if let Op::TZero = self.get(x).op {
            return x;
        }
        let dr = self.get(x).dim_rank;
        self.intern_with_rank(Op::TNeg, Payload::None, vec![x], dr)
    }

    pub fn t_deviatoric(&mut self, x: ExprId) -> ExprId {
        let dr = self.get(x).dim_rank;
        self.intern_with_rank(Op::TDeviatoric, Payload::None, vec![x], dr)
    }

    pub fn t_volumetric(&mut self, x: ExprId) -> ExprId {
        let dr = self.get(x).dim_rank;
        self.intern_with_rank(Op::TVolumetric, Payload::None, vec![x], dr)
    }

    /// All operands must share `(dim,rank)`, per spec's tensor-compatibility
    /// invariant; mismatches are an `InvalidExpression`, never a panic.
    pub fn t_add<I: IntoIterator<Item = ExprId>>(&mut self, it: I) -> Result<ExprId, CasError> {
        let mut terms: Vec<ExprId> = Vec::new();
        for t in it {
            match self.get(t).op {
                Op::TAdd => {
                    for c in self.get(t).children.clone() {
                        terms.push(c);
                    }
                }
                _ => terms.push(t),
            }
        }
        let mut common: Option<(usize, usize)> = None;
        for &t in &terms {
            let dr = self.get(t).dim_rank.ok_or_else(|| {
                CasError::invalid("tensor add operand carries no (dim,rank)")
            })?;
            match common {
                None => common = Some(dr),
                Some(c) if c == dr => {}
                Some(c) => {
                    return Err(CasError::invalid(format!(
                        "tensor add of incompatible (dim,rank): {c:?} vs {dr:?}"
                    )))
                }
            }
        }
        let Some((dim, rank)) = common else {
            return Err(CasError::invalid("tensor add with no operands has no (dim,rank)"));
        };
        terms.retain(|&id| !matches!(self.get(id).op, Op::TZero));
        if terms.is_empty() {
            return Ok(self.t_zero(dim, rank));
        }
        if terms.len() == 1 {
            return Ok(terms[0]);
        }
        terms.sort_by(|a, b| self.order_key(*a).cmp(&self.order_key(*b)));
        Ok(self.intern_with_rank(Op::TAdd, Payload::None, terms, Some((dim, rank))))
    }

    pub fn t_sub(&mut self, a: ExprId, b: ExprId) -> Result<ExprId, CasError> {
        let nb = self.t_neg(b);
        self.t_add(vec![a, nb])
    }

    /// Left-associative pairwise contraction chain (spec §4.4 "Tensor Mul").
    /// `rank_out = rank_a + rank_b - 2` per pairwise full contraction (the
    /// kernel's contraction rule contracts exactly one shared index pair
    /// per adjacent factor, mirroring a chained matrix/tensor product like
    /// `A*B*C`); `dim` must agree across all factors. A zero factor of
    /// matching dim collapses the whole chain to the resulting tensor zero.
    /// A scalar factor is routed to `TScalarMul` instead of a tensor `TMul`
    /// child.
    pub fn t_mul<I: IntoIterator<Item = ExprId>>(&mut self, it: I) -> Result<ExprId, CasError> {
        let mut tensor_factors: Vec<ExprId> = Vec::new();
        let mut scalar_factors: Vec<ExprId> = Vec::new();
        for f in it {
            match self.get(f).op.algebra() {
                Algebra::Tensor => match self.get(f).op {
                    Op::TMul => {
                        for c in self.get(f).children.clone() {
                            tensor_factors.push(c);
                        }
                    }
                    Op::TScalarMul => {
                        let s = self.get(f).children[0];
                        let t = self.get(f).children[1];
                        scalar_factors.push(s);
                        tensor_factors.push(t);
                    }
                    _ => tensor_factors.push(f),
                },
                Algebra::Scalar => scalar_factors.push(f),
                Algebra::TensorToScalar => {
                    return Err(CasError::invalid(
                        "tensor_to_scalar factor is not a legal tensor-mul operand",
                    ))
                }
            }
        }
        if tensor_factors.is_empty() {
            return Err(CasError::invalid("tensor mul requires at least one tensor factor"));
        }
        let mut dim: Option<usize> = None;
        let mut rank = self.get(tensor_factors[0]).dim_rank.map(|(_, r)| r).unwrap_or(0);
        for (i, &f) in tensor_factors.iter().enumerate() {
            let (d, r) = self
                .get(f)
                .dim_rank
                .ok_or_else(|| CasError::invalid("tensor mul operand carries no (dim,rank)"))?;
            match dim {
                None => dim = Some(d),
                Some(dd) if dd == d => {}
                Some(dd) => {
                    return Err(CasError::invalid(format!(
                        "tensor contraction dim mismatch: {dd} vs {d}"
                    )))
                }
            }
            if i != 0 {
                let combined = rank as i64 + r as i64 - 2;
                if combined < 0 {
                    return Err(CasError::invalid(format!(
                        "tensor contraction would leave negative rank ({rank} + {r} - 2)"
                    )));
                }
                rank = combined as usize;
            }
        }
        let dim = dim.expect("tensor_factors is non-empty");
        if tensor_factors.iter().any(|&f| matches!(self.get(f).op, Op::TZero)) {
            let zero = self.t_zero(dim, rank);
            return Ok(zero);
        }
        // Tensor contraction is not commutative (A*B != B*A in general), so
        // unlike scalar/tensor-add the factor order is never sorted here —
        // only flattened. Cyclic trace invariance (tr(AB) = tr(BA)) is a
        // distinct algebraic identity handled in `simplify`, not a property
        // of this constructor.
        let tensor_part = if tensor_factors.len() == 1 {
            tensor_factors[0]
        } else {
            self.intern_with_rank(Op::TMul, Payload::None, tensor_factors, Some((dim, rank)))
        };
        if scalar_factors.is_empty() {
            return Ok(tensor_part);
        }
        let scalar_part = self.s_mul(scalar_factors);
        Ok(self.t_scalar_mul(scalar_part, tensor_part))
    }

    /// Bridge constructing a tensor from a tensor and a scalar-valued
    /// multiplier (spec §4.2). The multiplier is ordinarily drawn from the
    /// scalar algebra, but since `tensor_to_scalar` is, by name and
    /// purpose, also scalar-valued, it is accepted here too — this avoids
    /// needing a third bridge kind to express quantities like
    /// `identity(X) / trace(X)` (see DESIGN.md). `0 * T = 0`, `1 * T = T`
    /// fold for either algebra's zero/one.
    pub fn t_scalar_mul(&mut self, scalar: ExprId, tensor: ExprId) -> ExprId {
        match self.get(scalar).op {
            Op::SNum => {
                if let Payload::Num(n) = &self.get(scalar).payload {
                    if n.is_zero() {
                        let (dim, rank) = self.get(tensor).dim_rank.unwrap_or((0, 0));
                        return self.t_zero(dim, rank);
                    }
                    if n.is_one() {
                        return tensor;
                    }
                }
            }
            Op::TsZero => {
                let (dim, rank) = self.get(tensor).dim_rank.unwrap_or((0, 0));
                return self.t_zero(dim, rank);
            }
            Op::TsOne => return tensor,
            _ => {}
        }
        if let Op::TScalarMul = self.get(tensor).op {
            let inner_scalar = self.get(tensor).children[0];
            let inner_tensor = self.get(tensor).children[1];
            let both_scalar =
                self.get(scalar).op.algebra() == Algebra::Scalar
                    && self.get(inner_scalar).op.algebra() == Algebra::Scalar;
            let both_ts = self.get(scalar).op.algebra() == Algebra::TensorToScalar
                && self.get(inner_scalar).op.algebra() == Algebra::TensorToScalar;
            if both_scalar {
                let combined = self.s_mul(vec![scalar, inner_scalar]);
                return self.t_scalar_mul(combined, inner_tensor);
            }
            if both_ts {
                let combined = self
                    .ts_mul(vec![scalar, inner_scalar])
                    .unwrap_or(scalar);
                return self.t_scalar_mul(combined, inner_tensor);
            }
        }
        let dr = self.get(tensor).dim_rank;
        self.intern_with_rank(Op::TScalarMul, Payload::None, vec![scalar, tensor], dr)
    }

    // ======================================================================
    // TensorToScalar algebra
    // ======================================================================

    pub fn ts_zero(&mut self) -> ExprId {
        self.intern(Op::TsZero, Payload::None, vec![])
    }

    pub fn ts_one(&mut self) -> ExprId {
        self.intern(Op::TsOne, Payload::None, vec![])
    }

    pub fn ts_sym<S: Into<String>>(&mut self, name: S) -> ExprId {
        self.intern(Op::TsSymbol, Payload::Sym(name.into()), vec![])
    }

    pub fn ts_neg(&mut self, x: ExprId) -> ExprId {
        if let Op::TsZero = self.get(x).op {
            return x;
        }
        if let Op::TsNeg = self.get(x).op {
            return self.get(x).children[0];
        }
        self.intern(Op::TsNeg, Payload::None, vec![x])
    }

    pub fn ts_exp(&mut self, x: ExprId) -> ExprId {
        if let Op::TsZero = self.get(x).op {
            return self.ts_one();
        }
        if let Op::TsLog = self.get(x).op {
            return self.get(x).children[0];
        }
        self.intern(Op::TsExp, Payload::None, vec![x])
    }

    pub fn ts_log(&mut self, x: ExprId) -> Result<ExprId, CasError> {
        if let Op::TsOne = self.get(x).op {
            return Ok(self.ts_zero());
        }
        if let Op::TsZero = self.get(x).op {
            return Err(CasError::not_implemented("log of tensor_to_scalar zero"));
        }
        if let Op::TsExp = self.get(x).op {
            return Ok(self.get(x).children[0]);
        }
        Ok(self.intern(Op::TsLog, Payload::None, vec![x]))
    }

    /// `tr(A) -> tensor_to_scalar`, the only way to leave the tensor
    /// algebra besides an explicit scalar extraction. Requires a rank-2
    /// tensor operand (trace is defined for matrices).
    pub fn ts_trace(&mut self, tensor: ExprId) -> Result<ExprId, CasError> {
        let (_, rank) = self
            .get(tensor)
            .dim_rank
            .ok_or_else(|| CasError::invalid("trace operand carries no (dim,rank)"))?;
        if rank != 2 {
            return Err(CasError::invalid(format!("trace requires rank 2, got rank {rank}")));
        }
        if let Op::TZero = self.get(tensor).op {
            return Ok(self.ts_zero());
        }
        Ok(self.intern(Op::TsTrace, Payload::None, vec![tensor]))
    }

    pub fn ts_pow(&mut self, base: ExprId, exp: ExprId) -> ExprId {
        if let (Op::SNum, Payload::Num(n)) = (&self.get(exp).op, &self.get(exp).payload) {
            if n.is_zero() {
                return self.ts_one();
            }
            if n.is_one() {
                return base;
            }
        }
        self.intern(Op::TsPow, Payload::None, vec![base, exp])
    }

    pub fn ts_add<I: IntoIterator<Item = ExprId>>(&mut self, it: I) -> ExprId {
        let mut terms: Vec<ExprId> = Vec::new();
        for t in it {
            match self.get(t).op {
                Op::TsAdd => {
                    for c in self.get(t).children.clone() {
                        terms.push(c);
                    }
                }
                Op::TsZero => {}
                _ => terms.push(t),
            }
        }
        if terms.is_empty() {
            return self.ts_zero();
        }
        if terms.len() == 1 {
            return terms[0];
        }
        terms.sort_by(|a, b| self.order_key(*a).cmp(&self.order_key(*b)));
        self.intern(Op::TsAdd, Payload::None, terms)
    }

    pub fn ts_sub(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let nb = self.ts_neg(b);
        self.ts_add(vec![a, nb])
    }

    pub fn ts_mul<I: IntoIterator<Item = ExprId>>(&mut self, it: I) -> Result<ExprId, CasError> {
        let mut factors: Vec<ExprId> = Vec::new();
        for f in it {
            match self.get(f).op {
                Op::TsMul => {
                    for c in self.get(f).children.clone() {
                        factors.push(c);
                    }
                }
                Op::TsOne => {}
                Op::TsZero => return Ok(self.ts_zero()),
                _ => factors.push(f),
            }
        }
        if factors.is_empty() {
            return Ok(self.ts_one());
        }
        if factors.len() == 1 {
            return Ok(factors[0]);
        }
        factors.sort_by(|a, b| self.order_key(*a).cmp(&self.order_key(*b)));
        Ok(self.intern(Op::TsMul, Payload::None, factors))
    }

    // ======================================================================
    // Structural ordering (spec §4.2): strict weak order used to sort
    // commutative operands. `(kind_id, dim, rank, arity, sorted children
    // digests, name/value)`. Two structurally-equal atoms compare Equal,
    // never Less (fixes the source's `scalar_one < scalar_one == true` bug;
    // see DESIGN.md).
    // ======================================================================

    fn order_key(&self, id: ExprId) -> OrderKey {
        let n = self.get(id);
        let (dim, rank) = n.dim_rank.unwrap_or((0, 0));
        let name_or_value = match &n.payload {
            Payload::Sym(s) | Payload::Func(s) => s.clone(),
            Payload::Assumption(s, _) => s.clone(),
            Payload::TensorSymbol(s, _, _) => s.clone(),
            Payload::Num(num) => format!("{num:?}"),
            Payload::TensorZero(..) | Payload::TensorIdentity(..) | Payload::None => String::new(),
        };
        OrderKey {
            kind: n.op.tag(),
            dim,
            rank,
            arity: n.children.len(),
            child_digests: n.children.iter().map(|c| self.get(*c).digest).collect(),
            name_or_value,
        }
    }

    // ---- Plain-text render sink (spec §4.7) ----
    pub fn to_string(&self, id: ExprId) -> String {
        render_text(self, id, 0)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    kind: u32,
    dim: usize,
    rank: usize,
    arity: usize,
    child_digests: Vec<u64>,
    name_or_value: String,
}

fn prec(op: Op) -> u8 {
    use Op::*;
    match op {
        SAdd | TAdd | TsAdd => 1,
        SMul | TMul | TsMul | TScalarMul => 2,
        SPow | TsPow => 3,
        _ => 4,
    }
}

fn render_text(st: &Store, id: ExprId, parent_prec: u8) -> String {
    let n = st.get(id);
    let s = match (&n.op, &n.payload) {
        (Op::SNum, Payload::Num(Num::Integer(k))) => k.to_string(),
        (Op::SNum, Payload::Num(Num::Rational(q))) => format!("{}/{}", q.0, q.1),
        (Op::SNum, Payload::Num(Num::Real(r))) => format!("{r}"),
        (Op::SSymbol, Payload::Sym(name)) => name.clone(),
        (Op::SAssumption, Payload::Assumption(name, _)) => name.clone(),
        (Op::SFunction, Payload::Func(name)) => {
            let args =
                n.children.iter().map(|c| render_text(st, *c, 0)).collect::<Vec<_>>().join(", ");
            format!("{name}({args})")
        }
        (Op::SNeg, _) => format!("-{}", render_text(st, n.children[0], prec(Op::SNeg))),
        (Op::SAbs, _) => format!("abs({})", render_text(st, n.children[0], 0)),
        (Op::SExp, _) => format!("exp({})", render_text(st, n.children[0], 0)),
        (Op::SLog, _) => format!("log({})", render_text(st, n.children[0], 0)),
        (Op::SSqrt, _) => format!("sqrt({})", render_text(st, n.children[0], 0)),
        (Op::SDiff, _) => format!(
            "diff({}, {})",
            render_text(st, n.children[0], 0),
            render_text(st, n.children[1], 0)
        ),
        (Op::SAdd, _) => {
            n.children.iter().map(|c| render_text(st, *c, prec(Op::SAdd))).collect::<Vec<_>>().join(" + ")
        }
        (Op::SMul, _) => {
            n.children.iter().map(|c| render_text(st, *c, prec(Op::SMul))).collect::<Vec<_>>().join(" * ")
        }
        (Op::SPow, _) => {
            let b = render_text(st, n.children[0], prec(Op::SPow));
            let e = render_text(st, n.children[1], prec(Op::SPow));
            format!("{b}^{e}")
        }
        (Op::TZero, _) => "0".to_string(),
        (Op::TSymbol, Payload::TensorSymbol(name, ..)) => name.clone(),
        (Op::TIdentity, Payload::TensorIdentity(..)) => "I".to_string(),
        (Op::TNeg, _) => format!("-{}", render_text(st, n.children[0], prec(Op::TNeg))),
        (Op::TDeviatoric, _) => format!("dev({})", render_text(st, n.children[0], 0)),
        (Op::TVolumetric, _) => format!("vol({})", render_text(st, n.children[0], 0)),
        (Op::TAdd, _) => {
            n.children.iter().map(|c| render_text(st, *c, prec(Op::TAdd))).collect::<Vec<_>>().join(" + ")
        }
        (Op::TMul, _) => {
            n.children.iter().map(|c| render_text(st, *c, prec(Op::TMul))).collect::<Vec<_>>().join(" * ")
        }
        (Op::TScalarMul, _) => {
            let s = render_text(st, n.children[0], prec(Op::TScalarMul));
            let t = render_text(st, n.children[1], prec(Op::TScalarMul));
            format!("{s} * {t}")
        }
        (Op::TsZero, _) => "0".to_string(),
        (Op::TsOne, _) => "1".to_string(),
        (Op::TsSymbol, Payload::Sym(name)) => name.clone(),
        (Op::TsNeg, _) => format!("-{}", render_text(st, n.children[0], prec(Op::TsNeg))),
        (Op::TsExp, _) => format!("exp({})", render_text(st, n.children[0], 0)),
        (Op::TsLog, _) => format!("log({})", render_text(st, n.children[0], 0)),
        (Op::TsTrace, _) => format!("tr({})", render_text(st, n.children[0], 0)),
        (Op::TsPow, _) => {
            let b = render_text(st, n.children[0], prec(Op::TsPow));
            let e = render_text(st, n.children[1], prec(Op::TsPow));
            format!("{b}^{e}")
        }
        (Op::TsAdd, _) => {
            n.children.iter().map(|c| render_text(st, *c, prec(Op::TsAdd))).collect::<Vec<_>>().join(" + ")
        }
        (Op::TsMul, _) => {
            n.children.iter().map(|c| render_text(st, *c, prec(Op::TsMul))).collect::<Vec<_>>().join(" * ")
        }
        _ => "<malformed>".to_string(),
    };
    if prec(n.op) < parent_prec {
        format!("({s})")
    } else {
        s
    }
}

// ---------- Deterministic digest (FNV-1a 64) ----------

fn digest_node(op: Op, payload: &Payload, child_digests: &[u64]) -> u64 {
    let mut h = Fnv64::new();
    h.write_u32(op.tag());
    match payload {
        Payload::None => h.write_u8(0),
        Payload::Num(n) => {
            h.write_u8(1);
            match n {
                Num::Integer(i) => {
                    h.write_u8(0);
                    h.write_i64(*i);
                }
                Num::Rational(q) => {
                    h.write_u8(1);
                    h.write_i64(q.0);
                    h.write_i64(q.1);
                }
                Num::Real(r) => {
                    h.write_u8(2);
                    h.write_u64(r.to_bits());
                }
            }
        }
        Payload::Sym(s) | Payload::Func(s) => {
            h.write_u8(2);
            h.write_bytes(s.as_bytes());
        }
        Payload::Assumption(s, p) => {
            h.write_u8(3);
            h.write_bytes(s.as_bytes());
            h.write_u8(*p as u8);
        }
        Payload::TensorZero(d, r) => {
            h.write_u8(4);
            h.write_u64(*d as u64);
            h.write_u64(*r as u64);
        }
        Payload::TensorSymbol(s, d, r) => {
            h.write_u8(5);
            h.write_bytes(s.as_bytes());
            h.write_u64(*d as u64);
            h.write_u64(*r as u64);
        }
        Payload::TensorIdentity(d, r) => {
            h.write_u8(6);
            h.write_u64(*d as u64);
            h.write_u64(*r as u64);
        }
    }
    for &cd in child_digests {
        h.write_u64(cd);
    }
    h.finish()
}

struct Fnv64(u64);
impl Fnv64 {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
    fn write_u8(&mut self, x: u8) {
        self.0 ^= x as u64;
        self.0 = self.0.wrapping_mul(0x100000001b3);
    }
    fn write_u32(&mut self, x: u32) {
        for b in x.to_le_bytes() {
            self.write_u8(b);
        }
    }
    fn write_i64(&mut self, x: i64) {
        self.write_u64(x as u64);
    }
    fn write_u64(&mut self, x: u64) {
        for b in x.to_le_bytes() {
            self.write_u8(b);
        }
    }
    fn write_bytes(&mut self, bs: &[u8]) {
        for &b in bs {
            self.write_u8(b)
        }
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store({} nodes)", self.nodes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing_atoms() {
        let mut st = Store::new();
        let x1 = st.s_sym("x");
        let x2 = st.s_sym("x");
        assert_eq!(x1, x2);
        assert_eq!(st.get(x1).digest, st.get(x2).digest);
    }

    #[test]
    fn canonical_singletons_via_hash_consing() {
        let mut st = Store::new();
        let z1 = st.s_zero();
        let z2 = st.s_int(0);
        assert_eq!(z1, z2, "zero is a process-wide singleton by construction");
        let tz1 = st.t_zero(3, 2);
        let tz2 = st.t_zero(3, 2);
        assert_eq!(tz1, tz2);
    }

    #[test]
    fn add_canonical_and_commutative() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let y = st.s_sym("y");
        let a = st.s_add(vec![x, y]);
        let b = st.s_add(vec![y, x]);
        assert_eq!(a, b);
    }

    #[test]
    fn add_flattens_and_folds_numerics() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let y = st.s_sym("y");
        let one = st.s_int(1);
        let two = st.s_int(2);
        let a = st.s_add(vec![x, y]);
        let c = st.s_add(vec![a, one, two]);
        let three = st.s_int(3);
        let d = st.s_add(vec![x, y, three]);
        assert_eq!(c, d);
    }

    #[test]
    fn mul_zero_annihilates_and_one_drops() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let zero = st.s_zero();
        let five = st.s_int(5);
        assert_eq!(st.s_mul(vec![x, zero, five]), st.s_zero());
        let one = st.s_one();
        let two = st.s_int(2);
        let rat = st.s_rat(1, 3).unwrap();
        let m = st.s_mul(vec![two, x, rat, one]);
        let rat23 = st.s_rat(2, 3).unwrap();
        let expected = st.s_mul(vec![x, rat23]);
        assert_eq!(m, expected);
    }

    #[test]
    fn no_redundant_negation() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let nx = st.s_neg(x);
        let nnx = st.s_neg(nx);
        assert_eq!(nnx, x);
    }

    #[test]
    fn single_child_add_mul_collapse() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let zero = st.s_zero();
        let a = st.s_add(vec![x, zero]);
        assert_eq!(a, x);
        let one = st.s_one();
        let m = st.s_mul(vec![x, one]);
        assert_eq!(m, x);
    }

    #[test]
    fn pow_rules() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let one = st.s_one();
        assert_eq!(st.s_pow(x, one), x);
        let zero = st.s_zero();
        assert_eq!(st.s_pow(x, zero), st.s_one());
        let zero2 = st.s_zero();
        let p00 = st.s_pow(zero, zero2);
        assert!(matches!(st.get(p00).op, Op::SPow), "0^0 stays unevaluated by convention");
    }

    #[test]
    fn pow_of_pow_multiplies_exponents() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let two = st.s_int(2);
        let three = st.s_int(3);
        let inner = st.s_pow(x, two);
        let outer = st.s_pow(inner, three);
        let six = st.s_int(6);
        let expected = st.s_pow(x, six);
        assert_eq!(outer, expected);
    }

    #[test]
    fn rational_zero_denominator_is_invalid_expression() {
        let mut st = Store::new();
        assert!(matches!(st.s_rat(1, 0), Err(CasError::InvalidExpression(_))));
    }

    #[test]
    fn rational_reduces_to_integer() {
        let mut st = Store::new();
        let r = st.s_rat(4, 2).unwrap();
        assert_eq!(r, st.s_int(2));
    }

    #[test]
    fn log_of_negative_constant_not_implemented() {
        let mut st = Store::new();
        let neg_two = st.s_int(-2);
        assert!(matches!(st.s_log(neg_two), Err(CasError::NotImplemented(_))));
    }

    #[test]
    fn log_exp_always_cancels() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let ex = st.s_exp(x);
        let lx = st.s_log(ex).unwrap();
        assert_eq!(lx, x);
    }

    #[test]
    fn exp_log_cancels_only_with_positive_assumption() {
        let mut st = Store::new();
        let x = st.s_assumption("x", Prop::Positive);
        let lx = st.s_log(x).unwrap();
        let ex = st.s_exp(lx);
        assert_eq!(ex, x);

        let y = st.s_sym("y");
        let ly = st.s_log(y).unwrap();
        let ey = st.s_exp(ly);
        assert_ne!(ey, y, "without a positivity proof, exp(log y) must not fold");
    }

    #[test]
    fn tensor_add_requires_matching_dim_rank() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let b = st.t_sym("B", 3, 1);
        assert!(matches!(st.t_add(vec![a, b]), Err(CasError::InvalidExpression(_))));
    }

    #[test]
    fn tensor_add_ok_preserves_dim_rank() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let b = st.t_sym("B", 3, 2);
        let sum = st.t_add(vec![a, b]).unwrap();
        assert_eq!(st.get(sum).dim_rank, Some((3, 2)));
    }

    #[test]
    fn tensor_mul_zero_collapses() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let z = st.t_zero(3, 2);
        let prod = st.t_mul(vec![a, z]).unwrap();
        assert!(matches!(st.get(prod).op, Op::TZero));
    }

    #[test]
    fn tensor_mul_dim_mismatch_is_invalid() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let b = st.t_sym("B", 4, 2);
        assert!(matches!(st.t_mul(vec![a, b]), Err(CasError::InvalidExpression(_))));
    }

    #[test]
    fn tensor_mul_contracts_rank() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let b = st.t_sym("B", 3, 2);
        let prod = st.t_mul(vec![a, b]).unwrap();
        assert_eq!(st.get(prod).dim_rank, Some((3, 2)));
    }

    #[test]
    fn scalar_tensor_mul_routes_to_bridge() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let c = st.s_int(2);
        let prod = st.t_mul(vec![a, c]).unwrap();
        assert!(matches!(st.get(prod).op, Op::TScalarMul));
    }

    #[test]
    fn trace_requires_rank_2() {
        let mut st = Store::new();
        let v = st.t_sym("v", 3, 1);
        assert!(matches!(st.ts_trace(v), Err(CasError::InvalidExpression(_))));
    }

    #[test]
    fn trace_of_tensor_zero_is_ts_zero() {
        let mut st = Store::new();
        let z = st.t_zero(3, 2);
        let tr = st.ts_trace(z).unwrap();
        assert_eq!(tr, st.ts_zero());
    }

    #[test]
    fn printer_precedence() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let y = st.s_sym("y");
        let two = st.s_int(2);
        let sum = st.s_add(vec![y, two]);
        let prod = st.s_mul(vec![x, sum]);
        assert_eq!(st.to_string(prod), "x * (2 + y)");
    }

    #[test]
    fn structural_order_is_strict_weak_order() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let y = st.s_sym("y");
        let z = st.s_sym("z");
        let kx = st.order_key(x);
        let ky = st.order_key(y);
        let kz = st.order_key(z);
        // irreflexive
        assert!(!(kx < kx));
        // asymmetric
        if kx < ky {
            assert!(!(ky < kx));
        }
        // transitive on this sample
        if kx < ky && ky < kz {
            assert!(kx < kz);
        }
    }

    #[test]
    fn equal_atoms_are_incomparable_not_less() {
        let mut st = Store::new();
        let one_a = st.s_one();
        let one_b = st.s_one();
        let ka = st.order_key(one_a);
        let kb = st.order_key(one_b);
        assert!(!(ka < kb), "equal atoms must not be Less under strict weak order");
        assert!(!(kb < ka));
    }

    proptest::proptest! {
        #[test]
        fn prop_add_commutative_random_ints(a in -50i64..50, b in -50i64..50) {
            let mut st = Store::new();
            let x = st.s_int(a);
            let y = st.s_int(b);
            let lhs = st.s_add(vec![x, y]);
            let rhs = st.s_add(vec![y, x]);
            proptest::prop_assert_eq!(lhs, rhs);
        }

        #[test]
        fn prop_neg_neg_is_identity(a in -50i64..50) {
            let mut st = Store::new();
            let x = st.s_int(a);
            let nn = st.s_neg(st.s_neg(x));
            proptest::prop_assert_eq!(nn, x);
        }
    }
}
