#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the cell cycling rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every empirically tuned termination threshold lives here with its
//!   canonical default, so chemistry- or cell-specific retuning never needs a
//!   rebuild.
use serde::Deserialize;

/// Cell under test. No defaults: capacity and ceiling are per-cell facts the
/// operator must state.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Cell {
    /// Nominal capacity C in amp-hours.
    pub capacity_ah: f32,
    /// Charge ceiling voltage at the terminals.
    pub v_max: f32,
}

/// Serial link and supply channel topology.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Link {
    /// Serial device path.
    pub port: String,
    pub baud: u32,
    /// Round-trip budget for one query, in milliseconds.
    pub read_timeout_ms: u64,
    /// Channel that sources charge current.
    pub charge_channel: String,
    /// Channel that sinks discharge current through the in-line regulator.
    pub sink_channel: String,
    /// Dedicated 4-wire voltage sense channel.
    pub sense_channel: String,
    /// Physical per-channel current limit in amps.
    pub i_max_amps: f32,
    /// Forward drop of the in-line regulator on the sink path, volts.
    pub regulator_drop_v: f32,
    /// Lead/meter series resistance compensated into the compliance ceiling.
    pub lead_resistance_ohms: f32,
    /// Sense channel programming (volts, amps).
    pub sense_volts: f32,
    pub sense_amps: f32,
    /// An empty fixture floats at the sense supply voltage; a reading below
    /// this threshold means a cell is present.
    pub cell_present_below_v: f32,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud: 9600,
            read_timeout_ms: 300,
            charge_channel: "P25V".to_string(),
            sink_channel: "N25V".to_string(),
            sense_channel: "P6V".to_string(),
            i_max_amps: 1.0,
            regulator_drop_v: 4.6,
            lead_resistance_ohms: 0.2,
            sense_volts: 4.4,
            sense_amps: 0.002,
            cell_present_below_v: 4.3,
        }
    }
}

/// Internal-resistance estimator knobs.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Estimator {
    /// Perturbation current, amps. Clamped to |base current| at run time.
    pub bump_amps: f32,
    /// Worst plausible cell resistance; sizes the compliance headroom for the
    /// bumped reading.
    pub max_isr_ohms: f32,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            bump_amps: 0.1,
            max_isr_ohms: 5.0,
        }
    }
}

/// Discharge phase parameters. Rates are fractions of C.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Discharge {
    pub main_rate_c: f32,
    pub main_floor_v: f32,
    pub main_interval_min: u32,
    pub recondition_rate_c: f32,
    pub recondition_floor_v: f32,
    pub recondition_interval_min: u32,
}

impl Default for Discharge {
    fn default() -> Self {
        Self {
            main_rate_c: 0.5,
            main_floor_v: 1.0,
            main_interval_min: 2,
            recondition_rate_c: 0.05,
            recondition_floor_v: 0.4,
            recondition_interval_min: 5,
        }
    }
}

/// Charge phase parameters and termination thresholds.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Charge {
    /// Forming charge rate while the cell is too depleted for fast charge.
    pub form_rate_c: f32,
    /// Internal voltage at which forming charge hands over to fast charge.
    pub form_exit_v_internal: f32,
    /// Fast charge rate cap as a fraction of C (also capped by i_max - bump).
    pub fast_rate_c: f32,
    pub interval_min: u32,
    /// Hard internal-voltage termination.
    pub v_internal_max: f32,
    /// Hard capacity termination as a fraction of C.
    pub capacity_fraction: f32,
    /// A rise of at least this much per interval counts as a fresh peak and
    /// resets the plateau counter.
    pub rise_tolerance_v: f32,
    /// Negative-delta-V termination: drop below the tracked peak.
    pub drop_v: f32,
    /// Inflection checks are armed only above this internal voltage...
    pub gate_v_internal: f32,
    /// ...and above this fraction of capacity delivered.
    pub gate_capacity_fraction: f32,
    /// Plateau timeout in cumulative reporting minutes once armed.
    pub plateau_mins: u32,
    pub topoff_rate_c: f32,
    pub topoff_interval_min: u32,
    pub topoff_budget_min: u32,
    pub topoff_capacity_fraction: f32,
}

impl Default for Charge {
    fn default() -> Self {
        Self {
            form_rate_c: 0.1,
            form_exit_v_internal: 1.0,
            fast_rate_c: 1.0,
            interval_min: 1,
            v_internal_max: 1.6,
            capacity_fraction: 1.1,
            rise_tolerance_v: 0.0005,
            drop_v: 0.001,
            gate_v_internal: 1.45,
            gate_capacity_fraction: 0.7,
            plateau_mins: 20,
            topoff_rate_c: 0.1,
            topoff_interval_min: 5,
            topoff_budget_min: 240,
            topoff_capacity_fraction: 1.2,
        }
    }
}

/// Reporting loop knobs.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Report {
    /// Current magnitude below which the cell is treated as removed, amps.
    pub open_circuit_amps: f32,
    /// Initial instrument display countdown, seconds.
    pub display_on_secs: i64,
    /// Operator key that requests a manual phase switch.
    pub toggle_key: char,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            open_circuit_amps: 0.004,
            display_on_secs: 15,
            toggle_key: 't',
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub cell: Cell,
    #[serde(default)]
    pub link: Link,
    #[serde(default)]
    pub estimator: Estimator,
    #[serde(default)]
    pub discharge: Discharge,
    #[serde(default)]
    pub charge: Charge,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        if !(self.cell.capacity_ah > 0.0) {
            eyre::bail!("cell.capacity_ah must be > 0");
        }
        if !(self.cell.v_max > 0.0) {
            eyre::bail!("cell.v_max must be > 0");
        }
        if !(self.link.i_max_amps > 0.0) {
            eyre::bail!("link.i_max_amps must be > 0");
        }
        if self.link.read_timeout_ms == 0 {
            eyre::bail!("link.read_timeout_ms must be > 0");
        }
        if self.link.lead_resistance_ohms < 0.0 {
            eyre::bail!("link.lead_resistance_ohms must be >= 0");
        }
        if !(self.estimator.bump_amps > 0.0) {
            eyre::bail!("estimator.bump_amps must be > 0");
        }
        if !(self.estimator.max_isr_ohms > 0.0) {
            eyre::bail!("estimator.max_isr_ohms must be > 0");
        }
        if !(self.discharge.main_rate_c > 0.0) || !(self.discharge.recondition_rate_c > 0.0) {
            eyre::bail!("discharge rates must be > 0");
        }
        if self.discharge.recondition_floor_v >= self.discharge.main_floor_v {
            eyre::bail!("discharge.recondition_floor_v must be below main_floor_v");
        }
        if !(self.charge.form_rate_c > 0.0)
            || !(self.charge.fast_rate_c > 0.0)
            || !(self.charge.topoff_rate_c > 0.0)
        {
            eyre::bail!("charge rates must be > 0");
        }
        if self.charge.interval_min == 0 {
            eyre::bail!("charge.interval_min must be > 0");
        }
        if !(self.charge.capacity_fraction > 0.0) {
            eyre::bail!("charge.capacity_fraction must be > 0");
        }
        if self.charge.gate_capacity_fraction >= self.charge.capacity_fraction {
            eyre::bail!("charge.gate_capacity_fraction must be below capacity_fraction");
        }
        if self.charge.gate_v_internal >= self.charge.v_internal_max {
            eyre::bail!("charge.gate_v_internal must be below v_internal_max");
        }
        if !(self.charge.rise_tolerance_v > 0.0) || !(self.charge.drop_v > 0.0) {
            eyre::bail!("charge.rise_tolerance_v and charge.drop_v must be > 0");
        }
        if self.charge.plateau_mins == 0 {
            eyre::bail!("charge.plateau_mins must be > 0");
        }
        if self.charge.topoff_interval_min == 0
            || self.charge.topoff_budget_min < self.charge.topoff_interval_min
        {
            eyre::bail!("charge top-off budget must cover at least one interval");
        }
        if !(self.report.open_circuit_amps > 0.0) {
            eyre::bail!("report.open_circuit_amps must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let cfg = load_toml(
            r#"
[cell]
capacity_ah = 3.5
v_max = 1.7
"#,
        )
        .expect("parse TOML");
        assert_eq!(cfg.link.charge_channel, "P25V");
        assert_eq!(cfg.charge.plateau_mins, 20);
        cfg.validate().expect("defaults are valid");
    }
}
