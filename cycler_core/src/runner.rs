//! Cycle driver: sequences the phases, applies each phase's termination
//! heuristic, and decides what an abort means at the cycle level.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::{ChargeCfg, DischargeCfg, ReportCfg};
use crate::error::{AbortReason, Result};
use crate::estimator::IrEstimator;
use crate::phase::{ChargeStop, PeakWatch, Phase, TerminateRule};
use crate::session::CellSession;
use crate::status::IntervalOutcome;
use crate::supply::Supply;
use cycler_traits::clock::Clock;
use cycler_traits::{Instrument, OperatorKeys};

/// How a phase group ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Aborted(AbortReason),
}

/// How a full cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    CellRemoved,
    ShutdownRequested,
}

/// The cycling controller. Owns the supply front end, the operator keyboard,
/// and the session; everything else is configuration.
pub struct Cycler<I: Instrument, K: OperatorKeys> {
    pub(crate) supply: Supply<I>,
    pub(crate) keys: K,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) estimator: IrEstimator,
    pub(crate) discharge: DischargeCfg,
    pub(crate) charge: ChargeCfg,
    pub(crate) report: ReportCfg,
    pub(crate) session: CellSession,
    pub(crate) phase: Phase,
    pub(crate) display_secs: i64,
    pub(crate) shutdown: Option<Arc<AtomicBool>>,
    pub(crate) last_charge_stop: Option<ChargeStop>,
}

impl<I: Instrument, K: OperatorKeys> core::fmt::Debug for Cycler<I, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cycler")
            .field("phase", &self.phase)
            .field("v_external", &self.session.v_external)
            .field("mah", &self.session.totals.mah)
            .finish()
    }
}

impl<I: Instrument, K: OperatorKeys> Cycler<I, K> {
    pub fn session(&self) -> &CellSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Telemetry: why the most recent fast charge terminated, if one has.
    pub fn last_charge_stop(&self) -> Option<ChargeStop> {
        self.last_charge_stop
    }

    /// Bring the instrument up. Fatal on failure: there is nothing to do
    /// without it.
    pub fn initialize(&mut self) -> Result<String> {
        self.supply.initialize()
    }

    /// Serve cells until shutdown: wait for an insert, cycle until the cell
    /// is removed, park the supply, repeat.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.shutdown_requested() {
                break;
            }
            if !self.wait_for_cell()? {
                break;
            }
            self.display_secs = self.report.display_on_secs;
            self.session.prev_v_external = self.supply.read_voltage()?;

            loop {
                match self.run_cycle()? {
                    CycleOutcome::Completed => {
                        if self.shutdown_requested() {
                            self.supply.park()?;
                            return Ok(());
                        }
                    }
                    CycleOutcome::CellRemoved => break,
                    CycleOutcome::ShutdownRequested => {
                        self.supply.park()?;
                        return Ok(());
                    }
                }
            }
            self.supply.park()?;
        }
        self.supply.park()?;
        Ok(())
    }

    /// One full cycle. An operator toggle skips to the next phase group; an
    /// open circuit ends the cycle so the driver can wait for a new cell.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        match self.run_discharge_group()? {
            PhaseOutcome::Aborted(AbortReason::OpenCircuit) => {
                return Ok(CycleOutcome::CellRemoved);
            }
            PhaseOutcome::Aborted(AbortReason::Shutdown) => {
                return Ok(CycleOutcome::ShutdownRequested);
            }
            PhaseOutcome::Aborted(AbortReason::OperatorToggle) => {
                tracing::info!("toggle: switching to charge");
            }
            PhaseOutcome::Completed => {}
        }
        match self.run_charge_group()? {
            PhaseOutcome::Aborted(AbortReason::OpenCircuit) => {
                return Ok(CycleOutcome::CellRemoved);
            }
            PhaseOutcome::Aborted(AbortReason::Shutdown) => {
                return Ok(CycleOutcome::ShutdownRequested);
            }
            PhaseOutcome::Aborted(AbortReason::OperatorToggle) => {
                tracing::info!("toggle: ending charge");
            }
            PhaseOutcome::Completed => {}
        }
        self.enter(Phase::Idle);
        Ok(CycleOutcome::Completed)
    }

    // ── Discharge group ──────────────────────────────────────────────────

    fn run_discharge_group(&mut self) -> Result<PhaseOutcome> {
        self.session.totals.reset();

        self.enter(Phase::Discharge);
        let i_max = self.supply.cfg().i_max_amps;
        let amps = -(i_max.min(self.session.capacity_ah * self.discharge.main_rate_c));
        let rule = TerminateRule::Floor(self.discharge.main_floor_v);
        if let Some(abort) = self.drain_to_floor(
            self.discharge.main_interval_min,
            amps,
            rule,
            self.discharge.main_floor_v,
        )? {
            return Ok(PhaseOutcome::Aborted(abort));
        }

        // Slow deep discharge to break up electrode crystallization.
        self.enter(Phase::ReconditionDischarge);
        let amps = -(i_max.min(self.session.capacity_ah * self.discharge.recondition_rate_c));
        let rule = TerminateRule::Floor(self.discharge.recondition_floor_v);
        if let Some(abort) = self.drain_to_floor(
            self.discharge.recondition_interval_min,
            amps,
            rule,
            self.discharge.recondition_floor_v,
        )? {
            return Ok(PhaseOutcome::Aborted(abort));
        }

        Ok(PhaseOutcome::Completed)
    }

    fn drain_to_floor(
        &mut self,
        interval_min: u32,
        amps: f32,
        rule: TerminateRule,
        floor_v: f32,
    ) -> Result<Option<AbortReason>> {
        loop {
            match self.run_interval(interval_min, amps, rule)? {
                IntervalOutcome::Aborted(reason) => return Ok(Some(reason)),
                IntervalOutcome::Terminated => break,
                IntervalOutcome::Elapsed => {
                    if self.session.v_external <= floor_v {
                        break;
                    }
                }
            }
        }
        self.boundary_interval(amps, rule)
    }

    // ── Charge group ─────────────────────────────────────────────────────

    fn run_charge_group(&mut self) -> Result<PhaseOutcome> {
        self.session.totals.reset();
        self.last_charge_stop = None;
        let rule = TerminateRule::Ceiling(self.session.v_max);

        // Forming charge: the cell is too depleted for fast charge until its
        // internal voltage recovers.
        self.enter(Phase::FormCharge);
        let i_max = self.supply.cfg().i_max_amps;
        let form_amps = i_max.min(self.session.capacity_ah * self.charge.form_rate_c);
        while self.session.v_internal < self.charge.form_exit_v_internal {
            if let IntervalOutcome::Aborted(reason) =
                self.run_interval(self.charge.interval_min, form_amps, rule)?
            {
                return Ok(PhaseOutcome::Aborted(reason));
            }
        }

        self.enter(Phase::FastCharge);
        let fast_amps = (i_max - self.estimator.bump_amps)
            .min(self.session.capacity_ah * self.charge.fast_rate_c);
        let mut watch = PeakWatch::new(
            self.charge.rise_tolerance_v,
            self.charge.drop_v,
            self.charge.plateau_mins,
        );
        let stop = loop {
            match self.run_interval(self.charge.interval_min, fast_amps, rule)? {
                IntervalOutcome::Aborted(reason) => return Ok(PhaseOutcome::Aborted(reason)),
                IntervalOutcome::Terminated => break ChargeStop::Ceiling,
                IntervalOutcome::Elapsed => {}
            }
            if let Some(stop) = self.fast_charge_stop(&mut watch) {
                break stop;
            }
        };
        self.last_charge_stop = Some(stop);
        tracing::info!(
            reason = %stop,
            mah = self.session.totals.mah,
            v_peak = watch.peak(),
            "fast charge terminated"
        );
        if let Some(abort) = self.boundary_interval(fast_amps, rule)? {
            return Ok(PhaseOutcome::Aborted(abort));
        }

        // Low-rate top-off to recover Coulombic losses, skipped when the
        // terminals are already at the ceiling.
        self.enter(Phase::TopOff);
        if self.session.v_external < self.session.v_max {
            let topoff_amps = i_max.min(self.session.capacity_ah * self.charge.topoff_rate_c);
            let mut remaining_min = i64::from(self.charge.topoff_budget_min);
            loop {
                remaining_min -= i64::from(self.charge.topoff_interval_min);
                if remaining_min < 0 {
                    break;
                }
                match self.run_interval(self.charge.topoff_interval_min, topoff_amps, rule)? {
                    IntervalOutcome::Aborted(reason) => return Ok(PhaseOutcome::Aborted(reason)),
                    IntervalOutcome::Terminated => break,
                    IntervalOutcome::Elapsed => {}
                }
                if self.session.totals.mah
                    >= self.session.capacity_mah() * self.charge.topoff_capacity_fraction
                {
                    break;
                }
            }
            if let Some(abort) = self.boundary_interval(topoff_amps, rule)? {
                return Ok(PhaseOutcome::Aborted(abort));
            }
        }

        Ok(PhaseOutcome::Completed)
    }

    /// Post-interval fast-charge termination checks, first match wins.
    fn fast_charge_stop(&mut self, watch: &mut PeakWatch) -> Option<ChargeStop> {
        if self.session.v_external >= self.session.v_max {
            return Some(ChargeStop::Ceiling);
        }
        if self.session.v_internal >= self.charge.v_internal_max {
            return Some(ChargeStop::InternalVolts);
        }
        if self.session.totals.mah >= self.session.capacity_mah() * self.charge.capacity_fraction {
            return Some(ChargeStop::CapacityLimit);
        }

        let armed = self.session.v_internal > self.charge.gate_v_internal
            && self.session.totals.mah
                > self.session.capacity_mah() * self.charge.gate_capacity_fraction;
        let step = watch.observe(self.session.v_external, armed, self.charge.interval_min);
        if step.watching {
            // Keep the instrument display alive while termination is close.
            self.display_secs = i64::from(self.charge.interval_min) * 60;
        }
        step.stop
    }

    // ── Shared plumbing ──────────────────────────────────────────────────

    /// Zero-length interval at a phase boundary: logs one status line and
    /// integrates the final tick.
    fn boundary_interval(&mut self, amps: f32, rule: TerminateRule) -> Result<Option<AbortReason>> {
        match self.run_interval(0, amps, rule)? {
            IntervalOutcome::Aborted(reason) => Ok(Some(reason)),
            _ => Ok(None),
        }
    }

    fn enter(&mut self, phase: Phase) {
        tracing::info!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    pub(crate) fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Park on the insert prompt until the sense reading says a cell is in
    /// the fixture. Returns false when shutdown was requested instead.
    fn wait_for_cell(&mut self) -> Result<bool> {
        self.supply.display_text("Insert cell")?;
        loop {
            if self.shutdown_requested() {
                return Ok(false);
            }
            if self.supply.cell_present()? {
                tracing::info!("cell detected");
                return Ok(true);
            }
            self.clock.sleep(Duration::from_millis(10));
        }
    }
}
