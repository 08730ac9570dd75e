//! `From` implementations bridging `cycler_config` types to `cycler_core`
//! types.
//!
//! These eliminate manual field-by-field mapping in the CLI.

use crate::config::{CellCfg, ChargeCfg, DischargeCfg, ReportCfg, SupplyCfg};
use crate::estimator::IrEstimator;

// ── CellCfg ──────────────────────────────────────────────────────────────────

impl From<&cycler_config::Cell> for CellCfg {
    fn from(c: &cycler_config::Cell) -> Self {
        Self {
            capacity_ah: c.capacity_ah,
            v_max: c.v_max,
        }
    }
}

// ── SupplyCfg ────────────────────────────────────────────────────────────────

impl From<&cycler_config::Link> for SupplyCfg {
    fn from(c: &cycler_config::Link) -> Self {
        Self {
            charge_channel: c.charge_channel.clone(),
            sink_channel: c.sink_channel.clone(),
            sense_channel: c.sense_channel.clone(),
            i_max_amps: c.i_max_amps,
            regulator_drop_v: c.regulator_drop_v,
            lead_resistance_ohms: c.lead_resistance_ohms,
            read_timeout_ms: c.read_timeout_ms,
            sense_volts: c.sense_volts,
            sense_amps: c.sense_amps,
            cell_present_below_v: c.cell_present_below_v,
        }
    }
}

// ── IrEstimator ──────────────────────────────────────────────────────────────

impl From<&cycler_config::Estimator> for IrEstimator {
    fn from(c: &cycler_config::Estimator) -> Self {
        Self {
            bump_amps: c.bump_amps,
            max_isr_ohms: c.max_isr_ohms,
        }
    }
}

// ── DischargeCfg ─────────────────────────────────────────────────────────────

impl From<&cycler_config::Discharge> for DischargeCfg {
    fn from(c: &cycler_config::Discharge) -> Self {
        Self {
            main_rate_c: c.main_rate_c,
            main_floor_v: c.main_floor_v,
            main_interval_min: c.main_interval_min,
            recondition_rate_c: c.recondition_rate_c,
            recondition_floor_v: c.recondition_floor_v,
            recondition_interval_min: c.recondition_interval_min,
        }
    }
}

// ── ChargeCfg ────────────────────────────────────────────────────────────────

impl From<&cycler_config::Charge> for ChargeCfg {
    fn from(c: &cycler_config::Charge) -> Self {
        Self {
            form_rate_c: c.form_rate_c,
            form_exit_v_internal: c.form_exit_v_internal,
            fast_rate_c: c.fast_rate_c,
            interval_min: c.interval_min,
            v_internal_max: c.v_internal_max,
            capacity_fraction: c.capacity_fraction,
            rise_tolerance_v: c.rise_tolerance_v,
            drop_v: c.drop_v,
            gate_v_internal: c.gate_v_internal,
            gate_capacity_fraction: c.gate_capacity_fraction,
            plateau_mins: c.plateau_mins,
            topoff_rate_c: c.topoff_rate_c,
            topoff_interval_min: c.topoff_interval_min,
            topoff_budget_min: c.topoff_budget_min,
            topoff_capacity_fraction: c.topoff_capacity_fraction,
        }
    }
}

// ── ReportCfg ────────────────────────────────────────────────────────────────

impl From<&cycler_config::Report> for ReportCfg {
    fn from(c: &cycler_config::Report) -> Self {
        Self {
            open_circuit_amps: c.open_circuit_amps,
            display_on_secs: c.display_on_secs,
            toggle_key: c.toggle_key,
        }
    }
}
