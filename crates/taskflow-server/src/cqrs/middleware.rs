//! CQRS markers
//!
//! Every request type sent through the mediator is tagged as either a
//! [`Command`] (mutates state) or a [`Query`] (read-only).

/// Write operation
pub trait Command {}

/// Read-only operation
pub trait Query {}
