use stamp_gate::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../stamp-gate.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(!cfg.paths.scratch_dir.is_empty());
    assert_eq!(cfg.converter.timeout_seconds, 120);
    assert_eq!(cfg.converter.env.get("HOME").map(String::as_str), Some("/tmp"));
    assert_eq!(cfg.watermark.x_ratio, 0.25);
    assert_eq!(cfg.watermark.y_ratio, 0.5);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let raw = "[delivery]\nbucket = \"b\"\nkey_prefix = \"p-\"\nregion = \"\"\n";
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.delivery.bucket, "b");
    assert_eq!(cfg.watermark.font_size, 50.0);
    assert_eq!(cfg.watermark.rotation_degrees, 45.0);
    assert!(!cfg.debug.keep_scratch);
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    std::fs::write(
        &path,
        "[converter]\nsoffice_exe = \"/opt/x/soffice\"\ntimeout_seconds = 5\ndefault_input_ext = \"odt\"\n",
    )
    .unwrap();
    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.converter.soffice_exe, "/opt/x/soffice");
    assert_eq!(cfg.converter.default_input_ext, "odt");
    assert_eq!(cfg.converter.env.get("HOME").map(String::as_str), Some("/tmp"));
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let raw = "[fetch]\ntimeout_seconds = 10\n\n[converter]\nsoffice_exe = \"/opt/lo/soffice\"\n\n[watermark]\ntext = \"DRAFT\"\n";
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.fetch.timeout_seconds, 10);
    assert_eq!(cfg.fetch.max_bytes, 100 * 1024 * 1024);
    assert_eq!(cfg.converter.soffice_exe, "/opt/lo/soffice");
    assert_eq!(cfg.converter.timeout_seconds, 120);
    assert_eq!(cfg.converter.default_input_ext, "docx");
    assert_eq!(cfg.converter.env.get("HOME").map(String::as_str), Some("/tmp"));
    assert_eq!(cfg.watermark.text, "DRAFT");
    assert_eq!(cfg.watermark.opacity, 0.3);
}
