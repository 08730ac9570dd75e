//! The reporting/polling loop: one estimator pass and a status line per
//! interval, then 1 Hz ticks until the phase predicate, an abort, or the
//! wall-clock deadline.

use std::time::Duration;

use crate::error::{AbortReason, Result};
use crate::phase::TerminateRule;
use crate::runner::Cycler;
use crate::status::{IntervalOutcome, TickOutcome};
use cycler_traits::{Instrument, OperatorKeys};

impl<I: Instrument, K: OperatorKeys> Cycler<I, K> {
    /// Drive one reporting interval at the given operating point.
    ///
    /// Energy is integrated only when the deadline is reached, over the
    /// actual elapsed milliseconds so scheduling jitter shifts the
    /// integration window rather than corrupting it. A terminated or aborted
    /// interval leaves the accumulators untouched.
    pub fn run_interval(
        &mut self,
        minutes: u32,
        amps: f32,
        rule: TerminateRule,
    ) -> Result<IntervalOutcome> {
        let epoch = self.clock.now();

        let comply = self.supply.comply_for(self.session.v_max, amps);
        let estimator = self.estimator;
        let est = estimator.measure(&mut self.supply, comply, amps)?;
        self.session.absorb(est);

        let dv_mv = (est.v_external - self.session.prev_v_external) * 1000.0;
        tracing::info!(
            phase = %self.phase,
            v_ext = est.v_external,
            dv_mv,
            isr_mohm = est.isr_ohms * 1000.0,
            v_int = est.v_internal,
            mah = self.session.totals.mah,
            mwh = self.session.totals.mwh,
            "status"
        );
        self.session.prev_v_external = est.v_external;

        let mut amp_sum = 0.0f32;
        let mut amp_count = 0u32;
        let deadline_ms = u64::from(minutes) * 60_000;

        loop {
            match self.poll_tick(amps, rule, &mut amp_sum, &mut amp_count)? {
                TickOutcome::Aborted(reason) => return Ok(IntervalOutcome::Aborted(reason)),
                TickOutcome::IntervalComplete => return Ok(IntervalOutcome::Terminated),
                TickOutcome::Continue => {}
            }

            self.clock.sleep(Duration::from_secs(1));
            self.display_secs -= 1;

            let elapsed_ms = self.clock.ms_since(epoch);
            if elapsed_ms >= deadline_ms {
                let avg_amps = if amp_count > 0 {
                    amp_sum / amp_count as f32
                } else {
                    0.0
                };
                self.session
                    .totals
                    .accumulate(avg_amps, self.session.v_internal, elapsed_ms);
                return Ok(IntervalOutcome::Elapsed);
            }
        }
    }

    /// One 1 Hz tick: termination predicate, open-circuit check, operator
    /// key, display countdown.
    fn poll_tick(
        &mut self,
        amps: f32,
        rule: TerminateRule,
        amp_sum: &mut f32,
        amp_count: &mut u32,
    ) -> Result<TickOutcome> {
        let v_external = self.supply.read_voltage()?;
        self.session.track_terminal(v_external, amps);
        if rule.matches(v_external) {
            return Ok(TickOutcome::IntervalComplete);
        }

        let measured = self.supply.read_current(amps)?;
        if measured.abs() < self.report.open_circuit_amps {
            tracing::warn!(amps = measured, "open circuit");
            return Ok(TickOutcome::Aborted(AbortReason::OpenCircuit));
        }
        *amp_sum += measured;
        *amp_count += 1;

        if self.shutdown_requested() {
            return Ok(TickOutcome::Aborted(AbortReason::Shutdown));
        }
        if let Some(key) = self.keys.poll_key() {
            if key == self.report.toggle_key {
                return Ok(TickOutcome::Aborted(AbortReason::OperatorToggle));
            }
            if let Some(digit) = key.to_digit(10) {
                self.display_secs = i64::from(digit);
            }
        }

        if self.display_secs > 0 {
            let text = format!(
                "{:.4}V {:.0}mO",
                self.session.v_external,
                self.session.isr_ohms * 1000.0
            );
            self.supply.display_text(&text)?;
        } else if self.display_secs == 0 {
            self.supply.display_off()?;
        }

        Ok(TickOutcome::Continue)
    }
}
