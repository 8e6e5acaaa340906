//! Scalar differentiation rules (teacher's per-`Op` dispatch, generalized
//! with a registrable table of named-function rules) plus the tensor and
//! `tensor_to_scalar` derivative rules the spec's three coupled algebras
//! need. Every path ends by running the matching `simplify` pass, same as
//! the teacher's `diff` calling `simplify` after every composite rule.

use assumptions::Context;
use expr_core::{CasError, ExprId, Op, Payload, Store};
use std::collections::HashMap;

/// `d/du[f(u)]`, given the inner argument `u` — the registrant supplies
/// only the outer rule; the caller (chain rule) multiplies by `du/dvar`.
pub type FunctionRule = fn(&mut Store, ExprId) -> ExprId;

/// Holds the registry of named-function differentiation rules. `exp`,
/// `log`/`ln`, `sqrt` and `abs` are dedicated `expr_core` node kinds (not
/// named `Function` nodes — see expr_core's `SPEC_FULL` §3 deviation) so
/// their rules live directly in the `SExp`/`SLog`/`SSqrt`/`SAbs` match
/// arms below; only genuinely named functions (`sin`, `cos`, `tan`, and
/// any user-registered name) go through this table.
pub struct Differentiator {
    function_rules: HashMap<String, FunctionRule>,
}

impl Default for Differentiator {
    fn default() -> Self {
        let mut d = Differentiator { function_rules: HashMap::new() };
        d.register_function_rule("sin", |store, u| store.s_function("cos", vec![u]));
        d.register_function_rule("cos", |store, u| {
            let su = store.s_function("sin", vec![u]);
            store.s_neg(su)
        });
        d.register_function_rule("tan", |store, u| {
            let cu = store.s_function("cos", vec![u]);
            let two = store.s_int(2);
            let cu2 = store.s_pow(cu, two);
            let minus_one = store.s_int(-1);
            store.s_pow(cu2, minus_one)
        });
        d
    }
}

impl Differentiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function_rule<S: Into<String>>(&mut self, name: S, rule: FunctionRule) {
        self.function_rules.insert(name.into(), rule);
    }

    pub fn diff_scalar(&self, store: &mut Store, id: ExprId, var: ExprId) -> Result<ExprId, CasError> {
        self.diff_scalar_with(store, id, var, &Context::default())
    }

    pub fn diff_scalar_with(
        &self,
        store: &mut Store,
        id: ExprId,
        var: ExprId,
        ctx: &Context,
    ) -> Result<ExprId, CasError> {
        match store.get(var).op {
            Op::SSymbol | Op::SAssumption => {}
            _ => return Err(CasError::invalid("diff variable must be a scalar symbol")),
        }
        self.diff_scalar_rec(store, id, var, ctx)
    }

    /// Hash-consing means every occurrence of the same named symbol (or
    /// assumption atom) is literally the same `ExprId`, so the variable
    /// being differentiated against is identified by id, not by name.
    fn diff_scalar_rec(
        &self,
        store: &mut Store,
        id: ExprId,
        var: ExprId,
        ctx: &Context,
    ) -> Result<ExprId, CasError> {
        let raw = match store.get(id).op {
            Op::SNum => return Ok(store.s_zero()),
            Op::SSymbol | Op::SAssumption => {
                return Ok(if id == var { store.s_one() } else { store.s_zero() });
            }
            Op::SNeg => {
                let c = store.get(id).children[0];
                let dc = self.diff_scalar_rec(store, c, var, ctx)?;
                store.s_neg(dc)
            }
            Op::SAdd => {
                let children = store.get(id).children.clone();
                let mut terms = Vec::with_capacity(children.len());
                for c in children {
                    terms.push(self.diff_scalar_rec(store, c, var, ctx)?);
                }
                store.s_add(terms)
            }
            Op::SMul => {
                let factors = store.get(id).children.clone();
                let mut sum_terms = Vec::with_capacity(factors.len());
                for i in 0..factors.len() {
                    let mut term_factors = Vec::with_capacity(factors.len());
                    for (j, &f) in factors.iter().enumerate() {
                        if i == j {
                            term_factors.push(self.diff_scalar_rec(store, f, var, ctx)?);
                        } else {
                            term_factors.push(f);
                        }
                    }
                    sum_terms.push(store.s_mul(term_factors));
                }
                store.s_add(sum_terms)
            }
            Op::SPow => {
                let base = store.get(id).children[0];
                let exp = store.get(id).children[1];
                match (&store.get(exp).op, store.get(exp).payload.clone()) {
                    (Op::SNum, Payload::Num(arith::Num::Integer(k))) => {
                        if k == 0 {
                            store.s_zero()
                        } else {
                            let k_val = store.s_int(k);
                            let k_minus_1 = store.s_int(k - 1);
                            let pow_term = store.s_pow(base, k_minus_1);
                            let dbase = self.diff_scalar_rec(store, base, var, ctx)?;
                            store.s_mul(vec![k_val, pow_term, dbase])
                        }
                    }
                    _ => {
                        // general power rule: u^v * (v' ln u + v u'/u)
                        let du = self.diff_scalar_rec(store, base, var, ctx)?;
                        let dv = self.diff_scalar_rec(store, exp, var, ctx)?;
                        let ln_u = store.s_log(base)?;
                        let dv_ln_u = store.s_mul(vec![dv, ln_u]);
                        let minus_one = store.s_int(-1);
                        let u_inv = store.s_pow(base, minus_one);
                        let u_prime_over_u = store.s_mul(vec![du, u_inv]);
                        let v_term = store.s_mul(vec![exp, u_prime_over_u]);
                        let bracket = store.s_add(vec![dv_ln_u, v_term]);
                        let u_pow_v = store.s_pow(base, exp);
                        store.s_mul(vec![u_pow_v, bracket])
                    }
                }
            }
            Op::SExp => {
                let u = store.get(id).children[0];
                let du = self.diff_scalar_rec(store, u, var, ctx)?;
                let exp_u = store.s_exp(u);
                store.s_mul(vec![exp_u, du])
            }
            Op::SLog => {
                let u = store.get(id).children[0];
                let du = self.diff_scalar_rec(store, u, var, ctx)?;
                let minus_one = store.s_int(-1);
                let u_inv = store.s_pow(u, minus_one);
                store.s_mul(vec![du, u_inv])
            }
            Op::SSqrt => {
                let u = store.get(id).children[0];
                let du = self.diff_scalar_rec(store, u, var, ctx)?;
                let sqrt_u = store.s_sqrt(u);
                let two = store.s_int(2);
                let denom = store.s_mul(vec![two, sqrt_u]);
                let minus_one = store.s_int(-1);
                let inv_denom = store.s_pow(denom, minus_one);
                store.s_mul(vec![du, inv_denom])
            }
            Op::SAbs => {
                // (|u|)' = u' * u / |u| (the sign of u); undefined at u=0,
                // a limitation shared with every CAS that folds abs this way.
                let u = store.get(id).children[0];
                let du = self.diff_scalar_rec(store, u, var, ctx)?;
                let abs_u = store.s_abs(u);
                let minus_one = store.s_int(-1);
                let inv_abs_u = store.s_pow(abs_u, minus_one);
                store.s_mul(vec![du, u, inv_abs_u])
            }
            Op::SFunction => {
                let name = match &store.get(id).payload {
                    Payload::Func(s) => s.clone(),
                    _ => return Err(CasError::internal("function node without Func payload")),
                };
                let args = store.get(id).children.clone();
                if args.len() != 1 {
                    return Ok(store.s_zero());
                }
                let u = args[0];
                match self.function_rules.get(name.as_str()) {
                    Some(rule) => {
                        let du = self.diff_scalar_rec(store, u, var, ctx)?;
                        let outer = rule(store, u);
                        store.s_mul(vec![outer, du])
                    }
                    None => return Ok(store.s_diff_node(id, var)),
                }
            }
            Op::SDiff => return Ok(store.s_diff_node(id, var)),
            _ => return Err(CasError::invalid("node is not a scalar expression")),
        };
        simplify::scalar::simplify_with(store, raw, ctx)
    }

    /// `d(T)/dT = identity(dim,rank)` by convention (the kernel has no
    /// fourth-order-tensor representation, so "the tensor derivative of a
    /// tensor with respect to itself" collapses to the rank-2 identity
    /// shortcut used throughout the worked examples); linear operators
    /// (`add`, `neg`, `dev`, `vol`, scalar multiples) differentiate
    /// termwise; general tensor-tensor contraction derivatives are not
    /// implemented.
    pub fn diff_tensor(&self, store: &mut Store, id: ExprId, var: ExprId) -> Result<ExprId, CasError> {
        self.diff_tensor_with(store, id, var, &Context::default())
    }

    pub fn diff_tensor_with(
        &self,
        store: &mut Store,
        id: ExprId,
        var: ExprId,
        ctx: &Context,
    ) -> Result<ExprId, CasError> {
        let (dim, rank) = store
            .get(var)
            .dim_rank
            .ok_or_else(|| CasError::invalid("tensor diff variable carries no (dim,rank)"))?;
        if id == var {
            return Ok(store.t_identity(dim, rank));
        }
        let raw = match store.get(id).op {
            Op::TZero | Op::TSymbol | Op::TIdentity => store.t_zero(dim, rank),
            Op::TNeg => {
                let c = store.get(id).children[0];
                let dc = self.diff_tensor_with(store, c, var, ctx)?;
                store.t_neg(dc)
            }
            Op::TDeviatoric => {
                let c = store.get(id).children[0];
                let dc = self.diff_tensor_with(store, c, var, ctx)?;
                store.t_deviatoric(dc)
            }
            Op::TVolumetric => {
                let c = store.get(id).children[0];
                let dc = self.diff_tensor_with(store, c, var, ctx)?;
                store.t_volumetric(dc)
            }
            Op::TAdd => {
                let children = store.get(id).children.clone();
                let mut terms = Vec::with_capacity(children.len());
                for c in children {
                    terms.push(self.diff_tensor_with(store, c, var, ctx)?);
                }
                store.t_add(terms)?
            }
            Op::TScalarMul => {
                let s = store.get(id).children[0];
                let t = store.get(id).children[1];
                let dt = self.diff_tensor_with(store, t, var, ctx)?;
                store.t_scalar_mul(s, dt)
            }
            Op::TMul => {
                return Err(CasError::not_implemented(
                    "derivative of a tensor contraction with respect to a tensor variable",
                ))
            }
            _ => return Err(CasError::invalid("node is not a tensor expression")),
        };
        simplify::tensor::simplify_with(store, raw, ctx)
    }

    /// `d(tr X)/dX = identity(dim,rank)`; `d(log f(X))/dX = df/dX / f(X)`,
    /// routing the `tensor_to_scalar` divisor straight through
    /// `t_scalar_mul` (accepted there precisely so this identity is
    /// constructible — see `expr_core::Store::t_scalar_mul`).
    pub fn diff_tensor_to_scalar(
        &self,
        store: &mut Store,
        id: ExprId,
        var: ExprId,
    ) -> Result<ExprId, CasError> {
        self.diff_tensor_to_scalar_with(store, id, var, &Context::default())
    }

    pub fn diff_tensor_to_scalar_with(
        &self,
        store: &mut Store,
        id: ExprId,
        var: ExprId,
        ctx: &Context,
    ) -> Result<ExprId, CasError> {
        let (dim, rank) = store
            .get(var)
            .dim_rank
            .ok_or_else(|| CasError::invalid("tensor diff variable carries no (dim,rank)"))?;
        let raw = match store.get(id).op {
            Op::TsZero | Op::TsOne | Op::TsSymbol => store.t_zero(dim, rank),
            Op::TsNeg => {
                let c = store.get(id).children[0];
                let dc = self.diff_tensor_to_scalar_with(store, c, var, ctx)?;
                store.t_neg(dc)
            }
            Op::TsAdd => {
                let children = store.get(id).children.clone();
                let mut terms = Vec::with_capacity(children.len());
                for c in children {
                    terms.push(self.diff_tensor_to_scalar_with(store, c, var, ctx)?);
                }
                store.t_add(terms)?
            }
            Op::TsTrace => {
                let tensor = store.get(id).children[0];
                if tensor == var {
                    store.t_identity(dim, rank)
                } else {
                    return Err(CasError::not_implemented(
                        "derivative of trace of a non-identity tensor expression",
                    ));
                }
            }
            Op::TsLog => {
                let f = store.get(id).children[0];
                let df = self.diff_tensor_to_scalar_with(store, f, var, ctx)?;
                let inv_f = store.ts_pow(f, store.s_int(-1));
                store.t_scalar_mul(inv_f, df)
            }
            Op::TsExp => {
                let f = store.get(id).children[0];
                let df = self.diff_tensor_to_scalar_with(store, f, var, ctx)?;
                let exp_f = store.ts_exp(f);
                store.t_scalar_mul(exp_f, df)
            }
            _ => {
                return Err(CasError::not_implemented(
                    "derivative of this tensor_to_scalar node shape",
                ))
            }
        };
        simplify::tensor::simplify_with(store, raw, ctx)
    }
}
