//! An employee roster keyed by integer id, stored in an AVL tree.
//!
//! The tree keeps the binary search order and the AVL height balance after
//! every insert and remove, so lookups, inserts and removals stay logarithmic.
//!
//! ```
//! use avl_roster::{Record, Roster, TreeError};
//!
//! let report = Roster::load(vec![
//!     Record::new(10, "Ada", "10/12/1815", "London"),
//!     Record::new(20, "Alan", "23/06/1912", "London"),
//!     Record::new(10, "Grace", "09/12/1906", "New York"),
//! ]);
//! assert_eq!(report.duplicates, vec![10]);
//!
//! let mut roster = report.roster;
//! assert_eq!(roster.find_record(10).unwrap().name, "Ada");
//! roster.remove_record(10).unwrap();
//! assert_eq!(roster.find_record(10), Err(TreeError::NotFound));
//! ```

mod error;
mod iter;
mod record;
mod tree;

pub use error::TreeError;
pub use iter::{InOrder, Iter, LevelOrder, NodeRef};
pub use record::{Employee, LoadReport, NodeLinks, Record, Roster};
pub use tree::AvlTree;
