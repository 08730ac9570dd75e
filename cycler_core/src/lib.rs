#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core cycling control logic (transport-agnostic).
//!
//! This crate provides the instrument-independent cycling engine. All
//! hardware interactions go through `cycler_traits::Instrument` and
//! `cycler_traits::OperatorKeys`.
//!
//! ## Architecture
//!
//! - **Supply front end**: actuation translation and measurement (`supply`)
//! - **Estimation**: 3-point internal-resistance protocol (`estimator`)
//! - **Energy**: per-interval charge/energy accumulation (`energy`)
//! - **Phases**: six-phase state machine and inflection watch (`phase`)
//! - **Reporting loop**: 1 Hz polling with tagged tick outcomes (`report`)
//! - **Cycle driver**: phase sequencing and abort policy (`runner`)

pub mod builder;
pub mod config;
pub mod conversions;
pub mod energy;
pub mod error;
pub mod estimator;
pub mod link_error;
pub mod mocks;
pub mod phase;
pub mod report;
pub mod runner;
pub mod session;
pub mod status;
pub mod supply;

pub use builder::CyclerBuilder;
pub use config::{CellCfg, ChargeCfg, DischargeCfg, ReportCfg, SupplyCfg};
pub use energy::EnergyTotals;
pub use error::{AbortReason, BuildError, CyclerError};
pub use estimator::{IrEstimate, IrEstimator};
pub use phase::{ChargeStop, PeakWatch, Phase, TerminateRule, WatchStep};
pub use runner::{CycleOutcome, Cycler, PhaseOutcome};
pub use session::CellSession;
pub use status::{IntervalOutcome, TickOutcome};
pub use supply::Supply;
