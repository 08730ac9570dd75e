//! Runtime configuration types for the cycling engine.
//!
//! These are the structs the controller actually consumes. They are separate
//! from the TOML-deserialized schema in `cycler_config`; see `conversions`
//! for the bridging `From` impls.

/// Cell under test. Required: there is no sensible default capacity.
#[derive(Debug, Clone, Copy)]
pub struct CellCfg {
    /// Nominal capacity C in amp-hours.
    pub capacity_ah: f32,
    /// Charge ceiling voltage at the terminals.
    pub v_max: f32,
}

/// Supply topology and fixed electrical compensation.
#[derive(Debug, Clone)]
pub struct SupplyCfg {
    pub charge_channel: String,
    pub sink_channel: String,
    pub sense_channel: String,
    /// Physical per-channel current limit, amps. Commanded magnitude never
    /// exceeds this.
    pub i_max_amps: f32,
    /// Forward drop of the in-line regulator on the sink path, volts.
    pub regulator_drop_v: f32,
    /// Lead/meter resistance pre-compensated into the compliance ceiling.
    pub lead_resistance_ohms: f32,
    /// Round-trip budget for one query, ms.
    pub read_timeout_ms: u64,
    /// Sense channel programming.
    pub sense_volts: f32,
    pub sense_amps: f32,
    /// Sense reading below this means a cell is in the fixture.
    pub cell_present_below_v: f32,
}

impl Default for SupplyCfg {
    fn default() -> Self {
        Self {
            charge_channel: "P25V".to_string(),
            sink_channel: "N25V".to_string(),
            sense_channel: "P6V".to_string(),
            i_max_amps: 1.0,
            regulator_drop_v: 4.6,
            lead_resistance_ohms: 0.2,
            read_timeout_ms: 300,
            sense_volts: 4.4,
            sense_amps: 0.002,
            cell_present_below_v: 4.3,
        }
    }
}

/// Discharge phase parameters. Rates are fractions of C.
#[derive(Debug, Clone, Copy)]
pub struct DischargeCfg {
    pub main_rate_c: f32,
    pub main_floor_v: f32,
    pub main_interval_min: u32,
    pub recondition_rate_c: f32,
    pub recondition_floor_v: f32,
    pub recondition_interval_min: u32,
}

impl Default for DischargeCfg {
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

/// Charge phase parameters and termination thresholds. All empirically tuned
/// and chemistry-specific; defaults are the canonical NiMH values.
#[derive(Debug, Clone, Copy)]
pub struct ChargeCfg {
    /// Forming rate while the cell is too depleted for fast charge.
    pub form_rate_c: f32,
    /// Internal voltage that ends the forming charge.
    pub form_exit_v_internal: f32,
    /// Fast rate cap as a fraction of C; also capped by i_max minus the
    /// estimator bump.
    pub fast_rate_c: f32,
    pub interval_min: u32,
    /// Hard internal-voltage termination.
    pub v_internal_max: f32,
    /// Hard capacity termination as a fraction of C.
    pub capacity_fraction: f32,
    /// Rise per interval that counts as a fresh peak and resets the plateau
    /// counter.
    pub rise_tolerance_v: f32,
    /// Negative-delta-V drop below the tracked peak.
    pub drop_v: f32,
    /// Inflection checks arm only above this internal voltage...
    pub gate_v_internal: f32,
    /// ...and this fraction of capacity delivered.
    pub gate_capacity_fraction: f32,
    /// Plateau timeout in cumulative reporting minutes once armed.
    pub plateau_mins: u32,
    pub topoff_rate_c: f32,
    pub topoff_interval_min: u32,
    pub topoff_budget_min: u32,
    pub topoff_capacity_fraction: f32,
}

impl Default for ChargeCfg {
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

/// Reporting/polling loop knobs.
#[derive(Debug, Clone, Copy)]
pub struct ReportCfg {
    /// Current magnitude below which the cell is treated as removed, amps.
    pub open_circuit_amps: f32,
    /// Display countdown armed when a cell is inserted, seconds.
    pub display_on_secs: i64,
    /// Key that requests a manual phase switch.
    pub toggle_key: char,
}

impl Default for ReportCfg {
    fn default() -> Self {
        Self {
            open_circuit_amps: 0.004,
            display_on_secs: 15,
            toggle_key: 't',
        }
    }
}
