//! LaTeX printer for Symmetrica-kernel expressions. Minimal, deterministic,
//! precedence-aware, generalized from the teacher's scalar-only printer to
//! all three coupled algebras plus the `TScalarMul` bridge. Tensor-valued
//! nodes are wrapped in a configurable font per rank (`LatexConfig`),
//! grounded on the same idea as the teacher's function-name table
//! (`sin`/`cos`/`exp`/`ln` get LaTeX macro names) but keyed on rank instead
//! of name.

use expr_core::{ExprId, Op, Payload, Store};
use std::collections::HashMap;

/// Maps tensor rank to the LaTeX font command wrapping a tensor's rendered
/// name. Defaults to `\boldsymbol` for every rank except 4, which defaults
/// to `\mathbb` (a common convention for fourth-order elasticity/stiffness
/// tensors) — both overridable per rank.
#[derive(Clone, Debug)]
pub struct LatexConfig {
    tensor_fonts: HashMap<usize, String>,
}

impl Default for LatexConfig {
    fn default() -> Self {
        LatexConfig { tensor_fonts: HashMap::new() }
    }
}

impl LatexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_font_for_rank<S: Into<String>>(&mut self, rank: usize, macro_name: S) {
        self.tensor_fonts.insert(rank, macro_name.into());
    }

    pub fn font_for_rank(&self, rank: usize) -> &str {
        if let Some(f) = self.tensor_fonts.get(&rank) {
            return f;
        }
        if rank == 4 {
            "\\mathbb"
        } else {
            "\\boldsymbol"
        }
    }
}

fn prec(op: Op) -> u8 {
    match op {
        Op::SAdd | Op::TAdd | Op::TsAdd => 1,
        Op::SMul | Op::TMul | Op::TsMul | Op::TScalarMul => 2,
        Op::SPow | Op::TsPow => 3,
        _ => 4,
    }
}

fn esc_ident(s: &str) -> String {
    s.replace('_', "\\_")
}

fn func_head(name: &str) -> String {
    match name {
        "sin" => "\\sin".to_string(),
        "cos" => "\\cos".to_string(),
        "tan" => "\\tan".to_string(),
        _ => esc_ident(name),
    }
}

pub fn to_latex(store: &Store, id: ExprId, cfg: &LatexConfig) -> String {
    go(store, id, cfg, 0)
}

fn go(store: &Store, id: ExprId, cfg: &LatexConfig, parent_prec: u8) -> String {
    let node = store.get(id);
    let op = node.op;
    let s = match (&op, &node.payload) {
        (Op::SNum, Payload::Num(n)) => render_num(n),
        (Op::SSymbol, Payload::Sym(name)) => esc_ident(name),
        (Op::SAssumption, Payload::Assumption(name, _)) => esc_ident(name),
        (Op::SNeg, _) => format!("-{}", go(store, node.children[0], cfg, prec(Op::SNeg))),
        (Op::SAbs, _) => format!("\\left|{}\\right|", go(store, node.children[0], cfg, 0)),
        (Op::SExp, _) => format!("\\exp\\left({}\\right)", go(store, node.children[0], cfg, 0)),
        (Op::SLog, _) => format!("\\ln\\left({}\\right)", go(store, node.children[0], cfg, 0)),
        (Op::SSqrt, _) => format!("\\sqrt{{{}}}", go(store, node.children[0], cfg, 0)),
        (Op::SFunction, Payload::Func(name)) => {
            let args = node.children.iter().map(|&c| go(store, c, cfg, 0)).collect::<Vec<_>>().join(", ");
            format!("{}\\left({}\\right)", func_head(name), args)
        }
        (Op::SDiff, _) => {
            let expr = go(store, node.children[0], cfg, 0);
            let var = go(store, node.children[1], cfg, 0);
            format!("\\frac{{d}}{{d {}}}\\left({}\\right)", var, expr)
        }
        (Op::SAdd, _) => render_add(store, &node.children, cfg),
        (Op::SMul, _) => render_mul(store, &node.children, cfg),
        (Op::SPow, _) => render_pow(store, node.children[0], node.children[1], cfg),
        (Op::TZero, Payload::TensorZero(_, rank)) => format!("{}{{0}}", cfg.font_for_rank(*rank)),
        (Op::TSymbol, Payload::TensorSymbol(name, _, rank)) => {
            format!("{}{{{}}}", cfg.font_for_rank(*rank), esc_ident(name))
        }
        (Op::TIdentity, Payload::TensorIdentity(_, rank)) => format!("{}{{I}}", cfg.font_for_rank(*rank)),
        (Op::TNeg, _) => format!("-{}", go(store, node.children[0], cfg, prec(Op::TNeg))),
        (Op::TDeviatoric, _) => format!("\\operatorname{{dev}}\\left({}\\right)", go(store, node.children[0], cfg, 0)),
        (Op::TVolumetric, _) => format!("\\operatorname{{vol}}\\left({}\\right)", go(store, node.children[0], cfg, 0)),
        (Op::TAdd, _) => render_add(store, &node.children, cfg),
        (Op::TMul, _) => render_mul(store, &node.children, cfg),
        (Op::TScalarMul, _) => render_mul(store, &node.children, cfg),
        (Op::TsZero, _) => "0".to_string(),
        (Op::TsOne, _) => "1".to_string(),
        (Op::TsSymbol, Payload::Sym(name)) => esc_ident(name),
        (Op::TsNeg, _) => format!("-{}", go(store, node.children[0], cfg, prec(Op::TsNeg))),
        (Op::TsExp, _) => format!("\\exp\\left({}\\right)", go(store, node.children[0], cfg, 0)),
        (Op::TsLog, _) => format!("\\ln\\left({}\\right)", go(store, node.children[0], cfg, 0)),
        (Op::TsTrace, _) => format!("\\operatorname{{tr}}\\left({}\\right)", go(store, node.children[0], cfg, 0)),
        (Op::TsPow, _) => render_pow(store, node.children[0], node.children[1], cfg),
        (Op::TsAdd, _) => render_add(store, &node.children, cfg),
        (Op::TsMul, _) => render_mul(store, &node.children, cfg),
        _ => "\\text{<unknown>}".to_string(),
    };
    if prec(op) < parent_prec {
        format!("\\left({}\\right)", s)
    } else {
        s
    }
}

fn render_num(n: &arith::Num) -> String {
    match n {
        arith::Num::Integer(k) => k.to_string(),
        arith::Num::Rational(q) => format!("\\frac{{{}}}{{{}}}", q.0, q.1),
        arith::Num::Real(r) => format!("{r}"),
    }
}

fn render_add(store: &Store, children: &[ExprId], cfg: &LatexConfig) -> String {
    children.iter().map(|&c| go(store, c, cfg, prec(Op::SAdd))).collect::<Vec<_>>().join(" + ")
}

fn render_mul(store: &Store, children: &[ExprId], cfg: &LatexConfig) -> String {
    let parts: Vec<String> = children
        .iter()
        .map(|&c| {
            let inner = go(store, c, cfg, 0);
            let child_op = store.get(c).op;
            if matches!(child_op, Op::SAdd | Op::TAdd | Op::TsAdd) {
                format!("\\left({}\\right)", inner)
            } else {
                inner
            }
        })
        .collect();
    parts.join(" \\cdot ")
}

fn render_pow(store: &Store, base: ExprId, exp: ExprId, cfg: &LatexConfig) -> String {
    let base_prec = prec(store.get(base).op);
    let base_s = go(store, base, cfg, 0);
    let base_s = if base_prec < prec(Op::SPow) { format!("\\left({}\\right)", base_s) } else { base_s };
    let exp_s = go(store, exp, cfg, 0);
    format!("{}^{{{}}}", base_s, exp_s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_symbol_and_power() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let three = st.s_int(3);
        let x3 = st.s_pow(x, three);
        let s = to_latex(&st, x3, &LatexConfig::default());
        assert_eq!(s, "x^{3}");
    }

    #[test]
    fn scalar_function_names() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let lnx = st.s_log(x).unwrap();
        let s = to_latex(&st, lnx, &LatexConfig::default());
        assert_eq!(s, "\\ln\\left(x\\right)");
    }

    #[test]
    fn symbol_underscore_escape() {
        let mut st = Store::new();
        let x1 = st.s_sym("x_1");
        let s = to_latex(&st, x1, &LatexConfig::default());
        assert_eq!(s, "x\\_1");
    }

    #[test]
    fn tensor_symbol_uses_default_font() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let s = to_latex(&st, a, &LatexConfig::default());
        assert_eq!(s, "\\boldsymbol{A}");
    }

    #[test]
    fn rank_four_tensor_uses_blackboard_font_by_default() {
        let mut st = Store::new();
        let c = st.t_sym("C", 3, 4);
        let s = to_latex(&st, c, &LatexConfig::default());
        assert_eq!(s, "\\mathbb{C}");
    }

    #[test]
    fn custom_font_override() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let mut cfg = LatexConfig::default();
        cfg.set_font_for_rank(2, "\\mathbf");
        let s = to_latex(&st, a, &cfg);
        assert_eq!(s, "\\mathbf{A}");
    }

    #[test]
    fn trace_renders_as_operatorname() {
        let mut st = Store::new();
        let a = st.t_sym("A", 3, 2);
        let tr = st.ts_trace(a).unwrap();
        let s = to_latex(&st, tr, &LatexConfig::default());
        assert!(s.starts_with("\\operatorname{tr}"));
        assert!(s.contains("\\boldsymbol{A}"));
    }

    #[test]
    fn add_wraps_in_parens_inside_mul() {
        let mut st = Store::new();
        let x = st.s_sym("x");
        let one = st.s_int(1);
        let xp1 = st.s_add(vec![x, one]);
        let y = st.s_sym("y");
        let expr = st.s_mul(vec![xp1, y]);
        let s = to_latex(&st, expr, &LatexConfig::default());
        assert!(s.contains("\\left(") && s.contains("\\cdot y"));
    }
}
