#![cfg(unix)]

use stamp_gate::{
    config::Config,
    convert::{Converter, SofficeConverter},
    error::ErrorKind,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Stand-in for `soffice` that honours `--outdir` the way LibreOffice does.
const WRITES_PDF: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) out="$2"; shift 2 ;;
    --*) shift ;;
    *) in="$1"; shift ;;
  esac
done
stem=$(basename "$in")
stem=${stem%.*}
printf '%%PDF-1.4\n%%fake\n' > "$out/$stem.pdf"
"#;

const FAILS: &str = "#!/bin/sh\necho 'source file could not be loaded' >&2\nexit 1\n";

const SUCCEEDS_WITHOUT_OUTPUT: &str = "#!/bin/sh\nexit 0\n";

const HANGS: &str = "#!/bin/sh\nexec sleep 30\n";

const PRINTS_VERSION: &str = "#!/bin/sh\necho 'LibreOffice 7.6.4.1 60(Build:1)'\n";

fn install_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("soffice");
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn converter(exe: &Path, timeout_seconds: u64) -> SofficeConverter {
    let mut cfg = Config::default();
    cfg.converter.soffice_exe = exe.display().to_string();
    cfg.converter.timeout_seconds = timeout_seconds;
    SofficeConverter::new(&cfg)
}

fn staged_input(dir: &Path) -> (PathBuf, PathBuf) {
    let input = dir.join("source.docx");
    std::fs::write(&input, b"PK\x03\x04").unwrap();
    let out_dir = dir.join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    (input, out_dir)
}

#[test]
fn converted_pdf_lands_next_to_the_stem() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = install_script(tmp.path(), WRITES_PDF);
    let (input, out_dir) = staged_input(tmp.path());

    let produced = converter(&exe, 10).convert(&input, &out_dir).unwrap();
    assert_eq!(produced, out_dir.join("source.pdf"));
    assert!(std::fs::read(&produced).unwrap().starts_with(b"%PDF"));
}

#[test]
fn non_zero_exit_is_a_conversion_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = install_script(tmp.path(), FAILS);
    let (input, out_dir) = staged_input(tmp.path());

    let err = converter(&exe, 10).convert(&input, &out_dir).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert!(err.to_string().contains("could not be loaded"), "{err}");
}

#[test]
fn clean_exit_without_output_is_a_conversion_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = install_script(tmp.path(), SUCCEEDS_WITHOUT_OUTPUT);
    let (input, out_dir) = staged_input(tmp.path());

    let err = converter(&exe, 10).convert(&input, &out_dir).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
}

#[test]
fn hung_converter_is_killed_at_the_timeout() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = install_script(tmp.path(), HANGS);
    let (input, out_dir) = staged_input(tmp.path());

    let started = Instant::now();
    let err = converter(&exe, 1).convert(&input, &out_dir).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[test]
fn missing_input_is_rejected_before_launch() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = install_script(tmp.path(), WRITES_PDF);

    let err = converter(&exe, 10)
        .convert(&tmp.path().join("absent.docx"), tmp.path())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert!(!tmp.path().join("absent.pdf").exists());
}

#[test]
fn missing_executable_is_a_conversion_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let (input, out_dir) = staged_input(tmp.path());

    let err = converter(&tmp.path().join("no-such-soffice"), 10)
        .convert(&input, &out_dir)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
}

#[test]
fn doctor_reports_version_or_failure() {
    let tmp = tempfile::tempdir().unwrap();

    let good = install_script(tmp.path(), PRINTS_VERSION);
    let diag = converter(&good, 10).doctor();
    assert!(diag.ok);
    assert_eq!(diag.version.as_deref(), Some("LibreOffice 7.6.4.1 60(Build:1)"));

    let bad_dir = tmp.path().join("bad");
    std::fs::create_dir_all(&bad_dir).unwrap();
    let bad = install_script(&bad_dir, FAILS);
    let diag = converter(&bad, 10).doctor();
    assert!(!diag.ok);
    assert!(diag.error.unwrap().contains("could not be loaded"));
}
