//! 3-point internal-resistance estimation.
//!
//! Terminal voltage alone is dominated by IR drop; the estimator perturbs the
//! commanded current and extrapolates the open-circuit voltage at the base
//! current. The settle/bump/settle order is load-bearing: averaging the two
//! settled readings cancels the linear drift of a slowly charging or
//! discharging cell that would bias a 2-point estimate.

use crate::error::{CyclerError, Result};
use crate::supply::Supply;
use cycler_traits::Instrument;

/// One estimator pass. Stale as soon as more current flows without a fresh
/// pass.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct IrEstimate {
    pub isr_ohms: f32,
    /// Open-circuit voltage extrapolated at the base current.
    pub v_internal: f32,
    /// Last settled terminal reading; reported as this tick's voltage.
    pub v_external: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct IrEstimator {
    /// Perturbation current, amps.
    pub bump_amps: f32,
    /// Worst plausible cell resistance; sizes the compliance headroom so the
    /// bumped current is not ceiling-limited.
    pub max_isr_ohms: f32,
}

impl Default for IrEstimator {
    fn default() -> Self {
        Self {
            bump_amps: 0.1,
            max_isr_ohms: 5.0,
        }
    }
}

impl IrEstimator {
    /// Run the perturb/measure protocol at the given operating point.
    ///
    /// The bump is clamped to |amps| so a near-zero base current is never
    /// reversed in sign; a zero effective bump would divide by zero and is
    /// rejected instead.
    pub fn measure<I: Instrument>(
        &self,
        supply: &mut Supply<I>,
        comply_volts: f32,
        amps: f32,
    ) -> Result<IrEstimate> {
        let di = self.bump_amps.min(amps.abs());
        if di <= 0.0 {
            return Err(eyre::Report::new(CyclerError::State(
                "zero perturbation current".into(),
            )));
        }

        supply.apply(comply_volts, amps)?;
        let v1 = supply.read_voltage()?;

        supply.apply(comply_volts + self.max_isr_ohms * di, amps + di)?;
        let v_bump = supply.read_voltage()?;

        supply.apply(comply_volts, amps)?;
        let v2 = supply.read_voltage()?;

        let isr_ohms = (v_bump - (v1 + v2) / 2.0) / di;
        Ok(IrEstimate {
            isr_ohms,
            v_internal: v2 - isr_ohms * amps,
            v_external: v2,
        })
    }
}
