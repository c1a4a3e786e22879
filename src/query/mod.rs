//! Boolean query language: lexing, infix to postfix, evaluation
//!
//! Queries combine terms with `AND`, `OR`, `NOT` and parentheses:
//!
//! ```text
//! (cats OR dogs) AND NOT birds
//! ```

pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use evaluator::{Operand, QueryContext};
pub use lexer::{Lexer, Token};
pub use parser::{format_postfix, QueryParser, QueryToken};
