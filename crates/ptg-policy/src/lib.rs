//! PTG Policy - Trust-scoring admission engine for message senders
//!
//! Every arrival from a sender is scored against a Poisson arrival model:
//!
//! - **Regularity**: two-tailed exponential-CDF p-value of the inter-arrival delta
//! - **Trust**: streak-based reward on regular arrivals, multiplicative decay otherwise
//! - **Tiering**: a pluggable threshold tracker separates high and low priority senders
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ptg_policy::{DecisionRequest, PolicyConfig, PolicyService};
//!
//! let service = PolicyService::new(PolicyConfig::percentile())?;
//! let decision = service.decide(&DecisionRequest::new("10.0.0.1", 1.02))?;
//! println!("{} (trust {:.3})", decision.action, decision.trust);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod classifier;
mod clock;
mod config;
mod error;
pub mod regularity;
mod service;
pub mod tracker;
mod trust;
mod wire;

pub use classifier::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use service::*;
pub use tracker::{
    PercentileReport, RankedMember, ThresholdTracker, TrackerDiagnostics, TrustChange, TrustRange,
    build_tracker,
};
pub use trust::*;
pub use wire::*;
