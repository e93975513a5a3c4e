//! Core ledger logic for Bukubesar.
//!
//! This crate contains pure business logic with ZERO database dependencies.
//! All domain types, validation rules, and calculations live here; the `db`
//! crate applies them inside its transactions.
//!
//! # Modules
//!
//! - `ledger` - Double-entry validation, sign convention, posting plans
//! - `reversal` - Compensating entries for posted journals
//! - `reconcile` - Cached-versus-calculated balance comparison
//! - `subsidiary` - Subsidiary ledger link rules
//! - `audit` - Event log record shapes

pub mod audit;
pub mod ledger;
pub mod reconcile;
pub mod reversal;
pub mod subsidiary;
