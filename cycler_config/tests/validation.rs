use cycler_config::load_toml;

#[test]
fn rejects_non_positive_capacity() {
    let toml = r#"
[cell]
capacity_ah = 0.0
v_max = 1.7
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject capacity_ah=0");
    assert!(format!("{err}").contains("capacity_ah must be > 0"));
}

#[test]
fn rejects_gate_above_internal_limit() {
    let toml = r#"
[cell]
capacity_ah = 3.5
v_max = 1.7

[charge]
gate_v_internal = 1.65
v_internal_max = 1.6
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("gate must stay below the limit");
    assert!(format!("{err}").contains("gate_v_internal"));
}

#[test]
fn rejects_recondition_floor_above_main_floor() {
    let toml = r#"
[cell]
capacity_ah = 3.5
v_max = 1.7

[discharge]
main_floor_v = 1.0
recondition_floor_v = 1.2
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("recondition must go deeper");
    assert!(format!("{err}").contains("recondition_floor_v"));
}

#[test]
fn rejects_topoff_budget_smaller_than_interval() {
    let toml = r#"
[cell]
capacity_ah = 3.5
v_max = 1.7

[charge]
topoff_interval_min = 5
topoff_budget_min = 3
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect_err("budget below one interval");
}

#[test]
fn canonical_thresholds_are_the_defaults() {
    let toml = r#"
[cell]
capacity_ah = 3.5
v_max = 1.7
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("defaults valid");
    assert!((cfg.charge.capacity_fraction - 1.1).abs() < 1e-6);
    assert!((cfg.charge.gate_v_internal - 1.45).abs() < 1e-6);
    assert!((cfg.charge.v_internal_max - 1.6).abs() < 1e-6);
    assert!((cfg.discharge.main_rate_c - 0.5).abs() < 1e-6);
    assert!((cfg.report.open_circuit_amps - 0.004).abs() < 1e-6);
    assert_eq!(cfg.report.toggle_key, 't');
}

#[test]
fn overrides_parse_from_toml() {
    let toml = r#"
[cell]
capacity_ah = 0.3
v_max = 1.6

[link]
port = "/dev/ttyS0"
i_max_amps = 0.5

[charge]
plateau_mins = 30

[report]
toggle_key = " "
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.link.port, "/dev/ttyS0");
    assert!((cfg.link.i_max_amps - 0.5).abs() < 1e-6);
    assert_eq!(cfg.charge.plateau_mins, 30);
    assert_eq!(cfg.report.toggle_key, ' ');
}

#[test]
fn shipped_example_config_is_valid() {
    let text = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../etc/cycler.toml"
    ))
    .expect("read etc/cycler.toml");
    let cfg = load_toml(&text).expect("parse shipped config");
    cfg.validate().expect("shipped config valid");
}
