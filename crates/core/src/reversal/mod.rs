//! Compensating entries for posted journals.
//!
//! A posted entry is never edited. Reversal builds a mirror entry with debits and
//! credits swapped, which the store posts through the regular posting path.

pub mod service;

#[cfg(test)]
mod service_props;

pub use service::{OriginalLine, Reversibility, ReversalInput, ReversalService};
