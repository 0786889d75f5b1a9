//! Incident Module — data model shared by every pipeline stage
//!
//! - [`types`]: the closed classification vocabulary and `IncidentContext`
//! - [`record`]: `ResponseRecord`, its timeline entries and status graph

pub mod record;
pub mod types;

pub use record::{
    ActionResult, IllegalTransition, PersistedResponse, ResponseAction, ResponseRecord,
    ResponseStatus,
};
pub use types::{ImpactLevel, IncidentContext, IncidentType, PartialIncidentContext, Severity};
