//! Builder for `Cycler`. All fields are validated on `build()`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use cycler_traits::clock::{Clock, MonotonicClock};
use cycler_traits::{Instrument, OperatorKeys};

use crate::config::{CellCfg, ChargeCfg, DischargeCfg, ReportCfg, SupplyCfg};
use crate::error::{BuildError, Result};
use crate::estimator::IrEstimator;
use crate::phase::Phase;
use crate::runner::Cycler;
use crate::session::CellSession;
use crate::supply::Supply;

impl<I: Instrument, K: OperatorKeys> Cycler<I, K> {
    /// Start building a Cycler.
    pub fn builder() -> CyclerBuilder<I, K> {
        CyclerBuilder::new()
    }
}

pub struct CyclerBuilder<I, K> {
    link: Option<I>,
    keys: Option<K>,
    cell: Option<CellCfg>,
    supply: SupplyCfg,
    estimator: IrEstimator,
    discharge: DischargeCfg,
    charge: ChargeCfg,
    report: ReportCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<I, K> Default for CyclerBuilder<I, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, K> CyclerBuilder<I, K> {
    pub fn new() -> Self {
        Self {
            link: None,
            keys: None,
            cell: None,
            supply: SupplyCfg::default(),
            estimator: IrEstimator::default(),
            discharge: DischargeCfg::default(),
            charge: ChargeCfg::default(),
            report: ReportCfg::default(),
            clock: None,
            shutdown: None,
        }
    }

    pub fn with_link(mut self, link: I) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_keys(mut self, keys: K) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_cell(mut self, cell: CellCfg) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn with_supply(mut self, supply: SupplyCfg) -> Self {
        self.supply = supply;
        self
    }

    pub fn with_estimator(mut self, estimator: IrEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_discharge(mut self, discharge: DischargeCfg) -> Self {
        self.discharge = discharge;
        self
    }

    pub fn with_charge(mut self, charge: ChargeCfg) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_report(mut self, report: ReportCfg) -> Self {
        self.report = report;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }
}

impl<I: Instrument, K: OperatorKeys> CyclerBuilder<I, K> {
    pub fn build(self) -> Result<Cycler<I, K>> {
        let link = self
            .link
            .ok_or_else(|| eyre::Report::new(BuildError::MissingInstrument))?;
        let keys = self
            .keys
            .ok_or_else(|| eyre::Report::new(BuildError::MissingKeys))?;
        let cell = self
            .cell
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCell))?;

        if !(cell.capacity_ah > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "cell capacity must be positive",
            )));
        }
        if !(cell.v_max > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "charge ceiling must be positive",
            )));
        }
        if !(self.supply.i_max_amps > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "channel current limit must be positive",
            )));
        }
        if !(self.estimator.bump_amps > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "estimator bump must be positive",
            )));
        }
        if self.estimator.bump_amps >= self.supply.i_max_amps {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "estimator bump must leave fast-charge headroom",
            )));
        }

        let display_secs = self.report.display_on_secs;
        Ok(Cycler {
            supply: Supply::new(link, self.supply),
            keys,
            clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            estimator: self.estimator,
            discharge: self.discharge,
            charge: self.charge,
            report: self.report,
            session: CellSession::new(cell.capacity_ah, cell.v_max),
            phase: Phase::Idle,
            display_secs,
            shutdown: self.shutdown,
            last_charge_stop: None,
        })
    }
}
