#![warn(missing_docs)]

//! Typed reading and writing of CodeWalker XML collision and fragment files.
//!
//! Schema records declare their properties once in a static table
//! ([`element::Fields`]); generic walkers bind them to XML in declaration
//! order. On top of that sit the bounds schema (`.ybn.xml`) and the
//! fragment/physics schema (`.yft.xml`).
//!
//! Damaged leaf values do not abort a load: they are collected as
//! [`ReadValueError`]s next to the partially decoded document. Index links
//! (group parents, polygon vertices) are only resolved by the separate
//! `validate` methods.
//!
//! # Example
//!
//! ```no_run
//! use cwxml::{XmlFile, Ybn};
//!
//! let document = Ybn::from_xml_file("prop_crate.ybn.xml").unwrap();
//! for error in &document.errors {
//!     eprintln!("{error}");
//! }
//! for child in &document.root.composite.children {
//!     println!("{}", child.type_name());
//! }
//! document.root.write_xml("prop_crate_copy.ybn.xml").unwrap();
//! ```

mod error;
mod files;
mod validate;

pub mod bound;
pub mod codecs;
pub mod config;
pub mod drawable;
pub mod element;
pub mod flags;
pub mod fragment;
pub mod list;
pub mod property;
pub mod xml;

pub use bound::{BoundComposite, BoundFile, BoundItem, Polygon};
pub use config::{ReadOptions, WriteOptions};
pub use element::{ElementTree, ReadContext};
pub use error::{CwXmlError, IntegrityError, ReadValueError, Result};
pub use files::{find_fragment_file, has_extension, hi_detail_path, Document, XmlFile, Ybn, Yft};
pub use fragment::{Fragment, Lod};
pub use validate::GroupForest;
pub use xml::Element;
