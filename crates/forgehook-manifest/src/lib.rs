//! Build manifest documents: a comment-preserving YAML tree and the
//! source-pinning rewrite applied before a manifest is submitted to CI.

mod emit;
mod error;
mod node;
mod parse;
mod rewrite;

pub use emit::emit;
pub use error::{ManifestError, Result};
pub use node::{Document, Entry, Mapping, Node, Scalar, Sequence, Value};
pub use parse::parse;
pub use rewrite::{ManifestRewriter, RepoSource};
