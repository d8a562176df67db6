//! Gatekeeper - conditional door scheduling
//!
//! Doors carry a set of predicates (time of day, weather, location, items,
//! permissions, expressions) that vote on whether the door should be open.
//! A single-threaded scheduler evaluates a slice of the registered doors
//! every cycle and toggles those whose desired state changed.

pub mod core;
pub mod door;
pub mod expression;
pub mod host;
pub mod predicate;
pub mod scheduler;
