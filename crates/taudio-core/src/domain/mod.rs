//! Domain types for the document library.
//!
//! These types represent user-visible audio documents and the voices that
//! can speak them, independent of any storage or transport concern.

pub mod document;
pub mod voice;
