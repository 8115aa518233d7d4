//! Domain model for the braided note hierarchy.
//!
//! # Responsibility
//! - Define canonical note and branch records shared by store, cache and
//!   services.
//! - Keep identity opaque: ids are stable strings, never structural.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId` that is never reused.
//! - Every parent attachment is its own `Branch` record; a note with several
//!   parents owns several branches.

pub mod branch;
pub mod note;
