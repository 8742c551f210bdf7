//! SQL safety layer
//!
//! Candidate text flows one way: [`extract_sql`] picks it out of a model
//! response, [`SqlValidator`] turns it into an [`AcceptedStatement`] or a
//! rejection, and [`StatementRewriter`] bounds the result set. The execution
//! engine only takes the rewriter's output.

pub mod extract;
pub mod lexer;
pub mod rewriter;
pub mod validator;

pub use extract::extract_sql;
pub use rewriter::{RewrittenStatement, StatementRewriter};
pub use validator::{AcceptedStatement, SqlValidator, ValidationVerdict};
