//! Render sinks for Symmetrica-kernel expressions. The plain-text sink
//! lives on `expr_core::Store::to_string` itself (the kernel's own
//! canonical debug/print form); this crate adds the LaTeX sink plus its
//! per-rank tensor font configuration.
#![deny(warnings)]

pub mod latex;

pub use latex::{to_latex, LatexConfig};
