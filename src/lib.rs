//! Root facade for the kernel: one place to reach every crate's public
//! entry point without tracking which sub-crate owns it. Each sub-crate
//! stays independently usable; this just collects their surfaces the way
//! a reader coming in cold would expect to find them (`to_text`/`to_latex`
//! rather than having to know `to_text` lives on `Store` itself).
#![deny(warnings)]

pub use arith::{Num, Q};
pub use assumptions::{Context, Prop, Truth};
pub use expr_core::{Algebra, CasError, ExprId, Node, Op, Payload, Store};

pub use calculus::{Differentiator, Direction, FunctionRule, GrowthRate, LimitPoint, LimitResult};
pub use io::{to_latex, LatexConfig};
pub use solver::solve_linear_tensor;

/// Render `expr`'s canonical plain-text form. A thin alias over
/// `Store::to_string` so callers reaching for `to_text` alongside
/// `to_latex` find it without having to know it lives on `Store`.
pub fn to_text(store: &Store, expr: ExprId) -> String {
    store.to_string(expr)
}

pub mod simplify_scalar {
    pub use simplify::scalar::{simplify, simplify_with};
}

pub mod simplify_tensor {
    pub use simplify::tensor::{simplify, simplify_with};
}

pub mod simplify_tensor_to_scalar {
    pub use simplify::tensor_to_scalar::{simplify, simplify_with};
}

/// Compute `limit(expr, x -> point)` over the scalar algebra, where `x` is
/// named by `var`.
pub fn limit(store: &Store, expr: ExprId, var: &str, point: LimitPoint) -> LimitResult {
    calculus::limit::limit(store, expr, var, point)
}
