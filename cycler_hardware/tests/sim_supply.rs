use std::time::Duration;

use cycler_hardware::{SimCell, SimulatedSupply};
use cycler_traits::Instrument;
use rstest::rstest;

const T: Duration = Duration::from_millis(100);

fn rigged() -> SimulatedSupply {
    let mut sim = SimulatedSupply::new(SimCell {
        emf: 1.25,
        isr_ohms: 0.1,
        drift_v_per_amp_read: 0.0,
    });
    sim.send("OUTP ON").expect("outp");
    sim
}

#[test]
fn identifies_itself() {
    let mut sim = rigged();
    let idn = sim.query("*IDN?", T).expect("idn");
    assert!(idn.contains("E3631A"), "got: {idn}");
}

#[test]
fn charge_current_raises_terminal_voltage() {
    let mut sim = rigged();
    sim.send("APPL P25V,1.800,0.500;APPL N25V,0,0").expect("appl");
    let v: f32 = sim.query("MEAS:VOLT? P6V", T).expect("volt").parse().expect("parse");
    assert!((v - 1.30).abs() < 1e-3, "1.25 + 0.1*0.5, got {v}");
}

#[test]
fn supply_folds_back_to_the_programmed_ceiling() {
    let mut sim = rigged();
    // 0.5 A would need 1.30 V at the terminals; ceiling is 1.27 V.
    sim.send("APPL P25V,1.270,0.500;APPL N25V,0,0").expect("appl");
    let i: f32 = sim.query("MEAS:CURR? P25V", T).expect("curr").parse().expect("parse");
    assert!((i - 0.2).abs() < 1e-3, "(1.27-1.25)/0.1, got {i}");
}

#[test]
fn sink_channel_discharges_and_reports_magnitude() {
    let mut sim = rigged();
    sim.send("APPL P25V,1.700,0;APPL N25V,-4.6,0.175").expect("appl");
    let v: f32 = sim.query("MEAS:VOLT? P6V", T).expect("volt").parse().expect("parse");
    assert!((v - (1.25 - 0.1 * 0.175)).abs() < 1e-3);
    let i: f32 = sim.query("MEAS:CURR? N25V", T).expect("curr").parse().expect("parse");
    assert!((i - 0.175).abs() < 1e-3);
}

#[test]
fn empty_fixture_floats_at_the_sense_programming() {
    let mut sim = rigged();
    sim.send("APPL P6V,4.4,0.002").expect("appl");
    sim.remove_cell();
    let v: f32 = sim.query("MEAS:VOLT? P6V", T).expect("volt").parse().expect("parse");
    assert!((v - 4.4).abs() < 1e-3, "floats at sense supply, got {v}");
    let i: f32 = sim.query("MEAS:CURR? P25V", T).expect("curr").parse().expect("parse");
    assert_eq!(i, 0.0);
}

#[test]
fn display_text_latches_until_blanked() {
    let mut sim = rigged();
    sim.send("DISP:TEXT \"1.2500V 100mO\"").expect("text");
    assert_eq!(sim.display(), Some("1.2500V 100mO"));
    sim.send("DISP Off").expect("off");
    assert_eq!(sim.display(), None);
}

#[test]
fn reset_clears_programming() {
    let mut sim = rigged();
    sim.send("APPL P25V,1.800,0.500;APPL N25V,0,0").expect("appl");
    sim.send("*RST").expect("rst");
    let i: f32 = sim.query("MEAS:CURR? P25V", T).expect("curr").parse().expect("parse");
    assert_eq!(i, 0.0);
}

#[rstest]
#[case("MEAS:VOLT? P25V")]
#[case("NONSENSE?")]
fn unknown_queries_do_not_panic(#[case] cmd: &str) {
    let mut sim = rigged();
    let _ = sim.query(cmd, T).expect("query");
}

#[test]
fn emf_drifts_with_delivered_charge() {
    let mut sim = SimulatedSupply::new(SimCell {
        emf: 1.25,
        isr_ohms: 0.0,
        drift_v_per_amp_read: 0.01,
    });
    sim.send("OUTP ON").expect("outp");
    sim.send("APPL P25V,2.000,1.000;APPL N25V,0,0").expect("appl");
    for _ in 0..10 {
        let _ = sim.query("MEAS:CURR? P25V", T).expect("curr");
    }
    let v: f32 = sim.query("MEAS:VOLT? P6V", T).expect("volt").parse().expect("parse");
    assert!((v - 1.35).abs() < 1e-3, "ten 1 A readbacks, got {v}");
}
