//! The speculative AST-rewriting engine behind `goshrink`.
//!
//! Given a parsed package and a predicate (a command whose combined output
//! must match a regular expression), the engine repeatedly proposes local
//! simplifications from a fixed catalog, serializes each candidate to a
//! scratch directory, runs the predicate, and keeps the mutation only when
//! the output still matches.  A full pass that accepts nothing ends the
//! run.
//!
//! The engine is single-threaded; the only blocking point is the predicate
//! run, which completes before control returns.  Candidate-level failures
//! (I/O, spawn errors) are silently treated as rejections; only setup
//! problems, a predicate that never matched to begin with, and the
//! could-not-reduce outcome surface as errors.

pub mod driver;
pub mod error;
pub mod fold;
pub mod parents;
pub mod reduce;
pub mod track;

mod mutate;
mod transform;

pub use driver::{FnOracle, Oracle, ShellOracle};
pub use error::Error;
pub use reduce::{Options, Reducer};
