//! Differentiation and limit evaluation on top of `expr_core`'s three
//! algebras. `diff` holds the `Differentiator` registry-based dispatcher;
//! `limit` holds the growth-rate-aware limit engine; `evaluate` is the
//! shared constant-folding probe both lean on.
#![deny(warnings)]

pub mod diff;
pub mod evaluate;
pub mod limit;

pub use diff::{Differentiator, FunctionRule};
pub use limit::{Direction, GrowthRate, LimitPoint, LimitResult};
