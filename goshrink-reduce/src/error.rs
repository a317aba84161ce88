//! Terminal errors.  Candidate-level failures never appear here; the
//! candidate driver absorbs them as rejections.

use goshrink_syntax::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("creating scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("unusable shell command line {0:?}")]
    Shell(String),

    #[error("running the initial predicate: {0}")]
    Predicate(#[source] std::io::Error),

    /// The very first predicate run produced no output at all.
    #[error("expected an error to occur")]
    ExpectedError,

    /// The very first predicate run produced output the pattern misses.
    #[error("the error output does not match the pattern")]
    ErrorMismatch,

    /// A whole run accepted no edit; the inputs are left untouched.
    #[error("could not reduce the program any further")]
    CouldNotReduce,

    #[error("writing reduced source to {path}: {err}")]
    WriteOutput {
        path: std::path::PathBuf,
        #[source]
        err: std::io::Error,
    },
}
