//! buildgraph_rs: the in-memory core of a build graph.
//!
//! An open-addressing [`HashTable`] underlies three structures: a
//! [`PointerSet`] of identity-compared handles, the label-keyed [`RecordMap`]
//! owning every [`BuilderRecord`], and the string [`Interner`]. Records track
//! how build items resolve as their dependencies finish loading; the driver
//! that loads build files and decides what to do next lives outside this crate.
//!
//! ```
//! use buildgraph_rs::{Interner, Item, ItemType, Label, LocalInterner, Origin, RecordMap};
//!
//! #[derive(Debug)]
//! struct Decl(ItemType);
//!
//! impl Item for Decl {
//!     fn item_type(&self) -> ItemType {
//!         self.0
//!     }
//! }
//!
//! let interner = Interner::new();
//! let mut atoms = LocalInterner::new(&interner);
//! let foo = Label::parse(&mut atoms, "//src:foo").unwrap();
//! let bar = Label::parse(&mut atoms, "//src:bar").unwrap();
//!
//! let mut map = RecordMap::new();
//! let (_, foo) = map.try_emplace(foo, Origin::unknown(), ItemType::Target);
//! let (_, bar) = map.try_emplace(bar, Origin::unknown(), ItemType::Config);
//! map.add_dep(foo, bar);
//!
//! map[foo].set_item(Box::new(Decl(ItemType::Target))).unwrap();
//! map[bar].set_item(Box::new(Decl(ItemType::Config))).unwrap();
//!
//! let mut order = Vec::new();
//! map.resolve(bar, |record| order.push(record.label().to_string()));
//! assert_eq!(order, ["//src:bar", "//src:foo"]);
//! ```

pub mod atom;
pub mod error;
pub mod label;
pub mod pointer_set;
pub mod record;
pub mod record_map;
pub mod table;

pub use atom::{Atom, Intern, Interner, InternerConfig, LocalInterner};
pub use error::{GraphError, LabelError};
pub use label::{Label, Origin};
pub use pointer_set::{Handle, PointerSet};
pub use record::{BuilderRecord, Item, ItemType, RecordId};
pub use record_map::RecordMap;
pub use table::{HashTable, Slot, TableNode};
