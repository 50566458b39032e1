//! Tag spans of a text with names, then relate the tagged spans with
//! interval algebra and boolean queries.
//!
//! ```text
//! let mut tagger = Tagger::new("cat sat mat", true);
//! tagger.tag_re("word", r"\w+", 0, false)?;
//! let rows = Query::new(&["word".into(), lit("mat")], "before(0,1)", &tagger).execute()?;
//! ```

pub mod base;
pub mod error;
pub mod loclist;
pub mod patterns;
pub mod query;
pub mod relation;
pub mod tagger;

pub use crate::base::{expand, merge, Comparator, Loc};
pub use crate::error::{Error, Result, Warning};
pub use crate::query::{Query, State};
pub use crate::relation::BuiltinRelation;
pub use crate::tagger::{lit, TagRef, Tagger};
