//! Pipeline module - row processing, batch runs and source cleanup.
//!
//! A run reads rows from a [`RowSource`](crate::client::RowSource), turns
//! every pending entry into an Anki note through a [`RowPipeline`], and
//! finally removes the rows that made it into Anki from the source.

mod batch;
mod cleanup;
mod row;

#[cfg(test)]
mod fakes;

pub use batch::*;
pub use cleanup::*;
pub use row::*;
