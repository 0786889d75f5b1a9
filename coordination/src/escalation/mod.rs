//! Escalation — deterministic policy for incident escalation and sizing
//!
//! Pure functions only; nothing in this module performs I/O.
//!
//! # Escalation Ladder
//!
//! ```text
//! classify ─┬─ catastrophic severity            ─┐
//!           ├─ critical severity + critical biz ─┼─► escalation_required = true
//!           └─ data_loss_risk / security        ─┘
//!                     │
//! pipeline  ── validation fails ─────────────────► escalation_required = true
//!                     │
//! terminal  ── escalation_required ? escalated : resolved
//! ```

pub mod estimate;
pub mod policy;

pub use estimate::ResolutionPolicy;
pub use policy::{
    describe_escalation, initial_triggers, requires_initial_escalation, EscalationTrigger,
    ALWAYS_ESCALATE,
};
