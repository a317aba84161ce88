//! Frontend for the Go-family subset that `goshrink` reduces.
//!
//! The reducer core treats this crate as three services: a parser that turns
//! a directory of source files into one arena-backed tree per file, a
//! printer with a raw mode (speculative serialization) and a formatted mode
//! (final output), and a name resolver that produces the Defs/Uses maps the
//! reducer's reference tracker is built from.  None of the services consult
//! an external toolchain; source the grammar does not cover is a parse
//! error, and unresolved names are soft errors the caller may ignore.

pub mod ast;
pub mod lit;
pub mod parser;
pub mod printer;
pub mod resolve;
pub mod scanner;
pub mod token;

pub use ast::{Arena, DeclId, ExprId, File, NodeRef, Package, SpecId, StmtId};
pub use parser::{parse_dir, parse_file, ParseError};
pub use printer::Mode;
pub use resolve::{ObjId, Object, TypeInfo};
pub use token::Pos;
