//! Expression language
//!
//! A side-effect-free subset of CEL over [`invr_domain::value::Value`]:
//! literals, field access, indexing, arithmetic, comparisons, logical
//! operators, conditionals, string predicates and collection macros.
//!
//! ```ignore
//! use invr_engine::expression::{Evaluator, Scope};
//!
//! let evaluator = Evaluator::new();
//! let scope = Scope::for_record(&invoice);
//! let tax = evaluator.evaluate("total_amount * 0.06", &scope)?;
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
mod functions;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use ast::Expr;
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use parser::parse;
pub use scope::Scope;
