use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use cycler_core::mocks::NoopKeys;
use cycler_core::{
    AbortReason, CellCfg, Cycler, IntervalOutcome, ReportCfg, SupplyCfg, TerminateRule,
};
use cycler_traits::clock::test_clock::TestClock;
use cycler_traits::{Instrument, OperatorKeys};

/// Ideal-cell model link: terminal voltage follows the applied current, EMF
/// optionally drifts per current readback, and the reported current can be
/// overridden to fake an open circuit.
struct ModelRig {
    emf: f32,
    isr: f32,
    drift_per_amp_read: f32,
    curr_override: Option<f32>,
    applied: f32,
    sent: Rc<RefCell<Vec<String>>>,
    curr_reads: Rc<RefCell<u32>>,
}

impl ModelRig {
    fn new(emf: f32, isr: f32) -> Self {
        Self {
            emf,
            isr,
            drift_per_amp_read: 0.0,
            curr_override: None,
            applied: 0.0,
            sent: Rc::new(RefCell::new(Vec::new())),
            curr_reads: Rc::new(RefCell::new(0)),
        }
    }
}

impl Instrument for ModelRig {
    fn send(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.borrow_mut().push(command.to_string());
        for piece in command.split(';') {
            let Some(rest) = piece.strip_prefix("APPL ") else {
                continue;
            };
            let mut parts = rest.split(',');
            let name = parts.next().unwrap_or("");
            let _volts: f32 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
            let amps: f32 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
            match name {
                "P25V" if amps > 0.0 => self.applied = amps,
                "N25V" if amps > 0.0 => self.applied = -amps,
                "P25V" => self.applied = 0.0,
                _ => {}
            }
        }
        Ok(())
    }

    fn query(
        &mut self,
        command: &str,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.sent.borrow_mut().push(command.to_string());
        if command.starts_with("MEAS:VOLT?") {
            let v = self.emf + self.isr * self.applied;
            return Ok(format!("{v:.6}"));
        }
        if command.starts_with("MEAS:CURR?") {
            *self.curr_reads.borrow_mut() += 1;
            self.emf += self.drift_per_amp_read * self.applied;
            let magnitude = self.curr_override.unwrap_or_else(|| self.applied.abs());
            return Ok(format!("{magnitude:.6}"));
        }
        Ok(String::new())
    }
}

struct ScriptKeys {
    queue: VecDeque<char>,
}

impl ScriptKeys {
    fn new(keys: &[char]) -> Self {
        Self {
            queue: keys.iter().copied().collect(),
        }
    }
}

impl OperatorKeys for ScriptKeys {
    fn poll_key(&mut self) -> Option<char> {
        self.queue.pop_front()
    }
}

fn build<K: OperatorKeys>(rig: ModelRig, keys: K, i_max: f32, report: ReportCfg) -> Cycler<ModelRig, K> {
    Cycler::builder()
        .with_link(rig)
        .with_keys(keys)
        .with_cell(CellCfg {
            capacity_ah: 3.5,
            v_max: 1.7,
        })
        .with_supply(SupplyCfg {
            i_max_amps: i_max,
            ..SupplyCfg::default()
        })
        .with_report(report)
        .with_clock(Arc::new(TestClock::new()))
        .build()
        .expect("build cycler")
}

#[test]
fn discharge_terminates_on_first_reading_at_the_floor() {
    // Terminal voltage pinned at exactly 1.0 V: the interval must end on the
    // very first tick, before any current flows into the accumulators.
    let rig = ModelRig::new(1.0, 0.0);
    let curr_reads = rig.curr_reads.clone();
    let mut cycler = build(rig, NoopKeys, 2.0, ReportCfg::default());

    let outcome = cycler
        .run_interval(2, -1.75, TerminateRule::Floor(1.0))
        .expect("interval");
    assert_eq!(outcome, IntervalOutcome::Terminated);
    assert_eq!(*curr_reads.borrow(), 0);
    assert_eq!(cycler.session().totals.mah, 0.0);
}

#[test]
fn interval_integrates_energy_over_actual_elapsed_time() {
    // Just above the floor: the full 2-minute interval elapses and the
    // average discharge current is integrated.
    let rig = ModelRig::new(1.01, 0.0);
    let mut cycler = build(rig, NoopKeys, 2.0, ReportCfg::default());

    let outcome = cycler
        .run_interval(2, -1.75, TerminateRule::Floor(1.0))
        .expect("interval");
    assert_eq!(outcome, IntervalOutcome::Elapsed);
    let expected_mah = -1.75 * 120_000.0 / 3600.0;
    let mah = cycler.session().totals.mah;
    assert!((mah - expected_mah).abs() < 0.1, "mah {mah}");
    // Energy weighted by the internal-voltage estimate.
    let expected_mwh = 1.01 * expected_mah;
    assert!((cycler.session().totals.mwh - expected_mwh).abs() < 0.5);
}

#[test]
fn open_circuit_aborts_on_the_first_qualifying_tick() {
    // 2 mA sense reading: cell removed. The interval reports the abort right
    // away and the accumulators keep their pre-tick values.
    let mut rig = ModelRig::new(1.2, 0.0);
    rig.curr_override = Some(0.002);
    let curr_reads = rig.curr_reads.clone();
    let mut cycler = build(rig, NoopKeys, 1.0, ReportCfg::default());

    let outcome = cycler
        .run_interval(1, -0.5, TerminateRule::Floor(1.0))
        .expect("interval");
    assert_eq!(outcome, IntervalOutcome::Aborted(AbortReason::OpenCircuit));
    assert_eq!(*curr_reads.borrow(), 1);
    assert_eq!(cycler.session().totals.mah, 0.0);
    assert_eq!(cycler.session().totals.mwh, 0.0);
}

#[test]
fn toggle_key_aborts_the_interval() {
    let rig = ModelRig::new(1.2, 0.0);
    let mut cycler = build(rig, ScriptKeys::new(&['t']), 1.0, ReportCfg::default());

    let outcome = cycler
        .run_interval(1, 0.35, TerminateRule::Ceiling(1.7))
        .expect("interval");
    assert_eq!(outcome, IntervalOutcome::Aborted(AbortReason::OperatorToggle));
    assert_eq!(cycler.session().totals.mah, 0.0);
}

#[test]
fn digit_key_arms_the_display_countdown() {
    let rig = ModelRig::new(1.2, 0.0);
    let sent = rig.sent.clone();
    let report = ReportCfg {
        display_on_secs: 0,
        ..ReportCfg::default()
    };
    let mut cycler = build(rig, ScriptKeys::new(&['3']), 1.0, report);

    let outcome = cycler
        .run_interval(1, 0.35, TerminateRule::Ceiling(1.7))
        .expect("interval");
    assert_eq!(outcome, IntervalOutcome::Elapsed);

    let sent = sent.borrow();
    let texts = sent.iter().filter(|c| c.starts_with("DISP:TEXT")).count();
    let offs = sent.iter().filter(|c| c.as_str() == "DISP Off").count();
    // Three seconds of live display after the '3' key, then one blanking.
    assert_eq!(texts, 3);
    assert_eq!(offs, 1);
}

#[test]
fn display_line_carries_voltage_and_resistance() {
    let rig = ModelRig::new(1.2, 0.05);
    let sent = rig.sent.clone();
    let report = ReportCfg {
        display_on_secs: 2,
        ..ReportCfg::default()
    };
    let mut cycler = build(rig, NoopKeys, 1.0, report);

    cycler
        .run_interval(0, 0.35, TerminateRule::Ceiling(1.7))
        .expect("interval");
    let sent = sent.borrow();
    let text = sent
        .iter()
        .find(|c| c.starts_with("DISP:TEXT"))
        .expect("display refresh");
    assert!(text.contains('V') && text.contains("mO"), "got: {text}");
}
