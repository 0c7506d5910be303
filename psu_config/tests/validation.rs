use std::io::Write;

use psu_config::{
    ChargeVoltageCfg, ChemistryCfg, PackModel, PsuModel, load_file, load_params_json, load_toml,
};
use rstest::rstest;

const FULL: &str = r#"
[psu]
model = "batt-pack"

[batt_pack]
model = "v1"

[gauge]
des_cap_mah = 6200.0
sense_res_ohm = 0.01
chrg_term_ma = 40.0
empty_v_target = 3.3
recovery_v = 3.5
charge_voltage = "4.2"
chemistry = "licoo2"
charge_min_percent = 5.0

[monitor]
interval_ms = 500
shutdown_grace_ms = 2000
ignore_standby = true

[persistence]
dir = "/tmp/psu"

[hardware]
i2c_bus = 1
gauge_addr = 0x36
dry_run_shutdown = true

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_document() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.batt_pack.model, PackModel::V1);
    let gauge = cfg.gauge.as_ref().expect("gauge section");
    assert_eq!(gauge.charge_voltage, ChargeVoltageCfg::V4_2);
    assert_eq!(gauge.chemistry, ChemistryCfg::LiCoO2);
    assert_eq!(gauge.charge_min_percent, Some(5.0));
    assert!(cfg.monitor.ignore_standby);
    assert!(!cfg.monitor.ignore_threshold);
    assert!(cfg.hardware.dry_run_shutdown);
}

#[test]
fn header_board_needs_no_battery_sections() {
    let cfg = load_toml("[psu]\nmodel = \"header\"\n").expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.psu.model, PsuModel::Header);
}

#[test]
fn rejects_unknown_psu_model() {
    assert!(load_toml("[psu]\nmodel = \"opcube\"\n").is_err());
}

#[test]
fn charge_voltage_accepts_high_voltage_alias() {
    let toml = r#"
[gauge]
des_cap_mah = 1200.0
sense_res_ohm = 0.01
chrg_term_ma = 10.0
empty_v_target = 3.3
recovery_v = 3.8
charge_voltage = "4.35"
chemistry = "nca-ncr"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let gauge = cfg.gauge.expect("gauge section");
    assert_eq!(gauge.charge_voltage, ChargeVoltageCfg::V4_4);
    assert_eq!(gauge.chemistry, ChemistryCfg::NcaNcr);
}

#[rstest]
#[case("[monitor]\ninterval_ms = 0\n", "monitor.interval_ms must be >= 1")]
#[case(
    "[monitor]\nshutdown_grace_ms = 120000\n",
    "monitor.shutdown_grace_ms must be <= 60000"
)]
#[case("[persistence]\ndir = \"  \"\n", "persistence.dir must not be empty")]
#[case("[hardware]\ngauge_addr = 200\n", "hardware.gauge_addr must be a 7-bit address")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn rejects_out_of_range_sections(#[case] toml: &str, #[case] expected: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(expected),
        "unexpected error: {err}"
    );
}

fn gauge_doc(des_cap: f64, sense_res: f64, empty_v: f64, charge_min: f32) -> String {
    format!(
        "[gauge]\ndes_cap_mah = {des_cap:?}\nsense_res_ohm = {sense_res:?}\nchrg_term_ma = 10.0\n\
         empty_v_target = {empty_v:?}\nrecovery_v = 3.8\ncharge_min_percent = {charge_min:?}\n"
    )
}

#[rstest]
#[case(gauge_doc(1200.0, 0.0, 3.3, 1.0), "gauge.sense_res_ohm must be > 0")]
#[case(gauge_doc(0.0, 0.01, 3.3, 1.0), "gauge.des_cap_mah must be > 0")]
#[case(gauge_doc(40000.0, 0.01, 3.3, 1.0), "does not fit the design capacity register")]
#[case(gauge_doc(1200.0, 0.01, 6.0, 1.0), "gauge.empty_v_target must be in")]
#[case(gauge_doc(1200.0, 0.01, 3.3, 120.0), "gauge.charge_min_percent must be in")]
fn rejects_bad_gauge_override(#[case] toml: String, #[case] expected: &str) {
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(expected),
        "unexpected error: {err}"
    );
}

#[test]
fn load_file_parses_and_validates() {
    let mut f = tempfile::NamedTempFile::new().expect("temp file");
    write!(f, "{FULL}").expect("write");
    let cfg = load_file(f.path()).expect("load");
    assert_eq!(cfg.monitor.interval_ms, 500);

    let mut bad = tempfile::NamedTempFile::new().expect("temp file");
    write!(bad, "[monitor]\ninterval_ms = 0\n").expect("write");
    let err = load_file(bad.path()).expect_err("invalid");
    assert!(format!("{err}").contains("interval_ms"));
}

#[test]
fn load_file_reports_missing_path() {
    let err = load_file(std::path::Path::new("/nonexistent/psu.toml")).expect_err("missing");
    assert!(format!("{err}").contains("read config"));
}

#[test]
fn params_record_parses_documented_example() {
    let json = r#"{"calibrated-on": "2021-01-02T09:34:48Z",
        "r-comp-0": 201, "temp-co": 9278, "full-cap-rep": 1790, "full-cap-nom": 4896, "cycles": 210}"#;
    let p = load_params_json(json).expect("parse params");
    assert_eq!(p.r_comp_0, 201);
    assert_eq!(p.temp_co, 9278);
    assert_eq!(p.full_cap_rep, 1790);
    assert_eq!(p.full_cap_nom, 4896);
    assert_eq!(p.cycles, 210);
    let stamp = p.calibrated_on.expect("timestamp");
    assert_eq!(stamp.to_rfc3339(), "2021-01-02T09:34:48+00:00");

    let again = load_params_json(&p.to_json().expect("serialize")).expect("reparse");
    assert_eq!(again, p);
}

#[test]
fn params_record_without_timestamp_is_accepted() {
    let json = r#"{"r-comp-0": 156, "temp-co": 9278, "full-cap-rep": 3471, "full-cap-nom": 1933, "cycles": 100}"#;
    let p = load_params_json(json).expect("parse params");
    assert!(p.calibrated_on.is_none());
}

#[test]
fn params_record_rejects_out_of_range_values() {
    let json = r#"{"r-comp-0": 70000, "temp-co": 1, "full-cap-rep": 1, "full-cap-nom": 1, "cycles": 1}"#;
    assert!(load_params_json(json).is_err());
}

#[test]
fn shipped_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/psu.toml")).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.psu.model, PsuModel::BattPack);
    assert_eq!(cfg.batt_pack.model, PackModel::V2);
    assert!(cfg.gauge.is_none());
    assert_eq!(cfg.persistence.dir, "/var/lib/psu");
}
