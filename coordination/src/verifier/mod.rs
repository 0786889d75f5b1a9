//! Verifier Module — post-fix validation gates
//!
//! Re-runs the project's own build, dependency and test tooling after the
//! fixing phase. The report is the sole input to the resolve/escalate
//! decision together with the initial escalation triggers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use coordination::verifier::{ValidationPipeline, Validator};
//!
//! let pipeline = ValidationPipeline::new(config, runner);
//! let report = pipeline.validate(&incident).await;
//! println!("{}", report.summary());
//! ```

pub mod pipeline;
pub mod report;

pub use pipeline::{Gate, ValidationPipeline, Validator};
pub use report::{GateOutcome, GateResult, ValidationReport};
