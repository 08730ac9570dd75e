//! Phase state machine and the fast-charge inflection watch.

use std::fmt;

/// Exactly one phase is active at a time. Transitions are one-way; the only
/// way back to Discharge is a cycle restart from Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discharge,
    ReconditionDischarge,
    FormCharge,
    FastCharge,
    TopOff,
    Idle,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Discharge => Phase::ReconditionDischarge,
            Phase::ReconditionDischarge => Phase::FormCharge,
            Phase::FormCharge => Phase::FastCharge,
            Phase::FastCharge => Phase::TopOff,
            Phase::TopOff => Phase::Idle,
            Phase::Idle => Phase::Discharge,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Discharge => "discharge",
            Phase::ReconditionDischarge => "recondition",
            Phase::FormCharge => "form-charge",
            Phase::FastCharge => "fast-charge",
            Phase::TopOff => "top-off",
            Phase::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Why the fast charge stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStop {
    /// Terminal voltage reached the ceiling.
    Ceiling,
    /// Internal voltage estimate reached its hard limit.
    InternalVolts,
    /// Delivered charge reached the capacity fraction limit.
    CapacityLimit,
    /// Terminal voltage dropped below the tracked peak.
    NegativeDeltaV,
    /// Peak failed to advance for the plateau timeout.
    Plateau,
}

impl fmt::Display for ChargeStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChargeStop::Ceiling => "voltage ceiling",
            ChargeStop::InternalVolts => "internal voltage limit",
            ChargeStop::CapacityLimit => "capacity limit",
            ChargeStop::NegativeDeltaV => "negative delta-V",
            ChargeStop::Plateau => "plateau timeout",
        };
        f.write_str(name)
    }
}

/// Per-tick cheap termination predicate for the active phase.
#[derive(Debug, Clone, Copy)]
pub enum TerminateRule {
    /// Discharging: stop once terminal voltage is at or below the floor.
    Floor(f32),
    /// Charging: stop once terminal voltage is at or above the ceiling.
    Ceiling(f32),
}

impl TerminateRule {
    pub fn matches(&self, v_external: f32) -> bool {
        match *self {
            TerminateRule::Floor(floor) => v_external <= floor,
            TerminateRule::Ceiling(ceiling) => v_external >= ceiling,
        }
    }
}

/// Result of feeding one interval's terminal voltage to the peak watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchStep {
    pub stop: Option<ChargeStop>,
    /// True when the armed end-of-charge checks ran this interval; the caller
    /// re-arms the display so the operator can watch termination.
    pub watching: bool,
}

/// Terminal-voltage peak tracker for the negative-delta-V / plateau
/// signatures.
///
/// A rise of at least the tolerance counts as a fresh peak and resets the
/// plateau counter; smaller rises still track the peak. The end-of-charge
/// checks run only while armed (internal voltage and delivered charge above
/// their gates) so early-charge ISR noise cannot fire them.
#[derive(Debug, Clone)]
pub struct PeakWatch {
    v_peak: f32,
    level_mins: u32,
    rise_tolerance_v: f32,
    drop_v: f32,
    plateau_mins: u32,
}

impl PeakWatch {
    pub fn new(rise_tolerance_v: f32, drop_v: f32, plateau_mins: u32) -> Self {
        Self {
            v_peak: 0.0,
            level_mins: 0,
            rise_tolerance_v,
            drop_v,
            plateau_mins,
        }
    }

    pub fn peak(&self) -> f32 {
        self.v_peak
    }

    pub fn observe(&mut self, v_external: f32, armed: bool, interval_min: u32) -> WatchStep {
        if v_external >= self.v_peak + self.rise_tolerance_v {
            self.v_peak = v_external;
            self.level_mins = 0;
            return WatchStep {
                stop: None,
                watching: false,
            };
        }
        if v_external > self.v_peak {
            self.v_peak = v_external;
            return WatchStep {
                stop: None,
                watching: false,
            };
        }
        if !armed {
            return WatchStep {
                stop: None,
                watching: false,
            };
        }
        let stop = if v_external <= self.v_peak - self.drop_v {
            Some(ChargeStop::NegativeDeltaV)
        } else {
            self.level_mins += interval_min;
            if self.level_mins >= self.plateau_mins {
                Some(ChargeStop::Plateau)
            } else {
                None
            }
        };
        WatchStep {
            stop,
            watching: true,
        }
    }
}
