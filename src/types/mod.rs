//! Shared data structures for fitness-for-service assessment
//!
//! This module defines the core types flowing through the assessment
//! pipeline:
//! - Equipment design record and geometry (resolver input)
//! - Material reference, table points and resolved properties
//! - Inspection records with per-CML thickness readings
//! - Job envelope, assessment options and calculation result
//! - Immutable audit entries for the hash-chained log

mod equipment;
mod material;
mod inspection;
mod assessment;
mod audit;

pub use equipment::*;
pub use material::*;
pub use inspection::*;
pub use assessment::*;
pub use audit::*;
