//! Table Module
//!
//! Rows on top of the index: schema-driven row encoding, predicate
//! evaluation and routing of reads through index scans.
//!
//! ## Read routing
//! - A predicate on the primary key becomes an index point/range scan;
//!   the remaining predicates filter the decoded rows
//! - Without one, every leaf is walked through the leaf chain

mod codec;
mod handle;
mod predicate;
mod result;

pub use self::codec::{decode_row, encode_row};
pub use self::handle::{Table, TableOptions};
pub use self::predicate::{Bound, Predicate};
pub use self::result::ResultSet;
