use std::process::Command;

fn run(data: &std::path::Path, args: &[&str]) -> serde_json::Value {
    let out = Command::new(env!("CARGO_BIN_EXE_factlens"))
        .args(args)
        .env("FACTLENS_DATA_DIR", data)
        .output()
        .expect("run factlens");
    assert!(
        out.status.success(),
        "factlens {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("parse json")
}

#[test]
fn feedback_tallies_accumulate_per_page() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let base = ["feedback", "--url", "https://example.com/a", "--title", "A"];

    let mut agree = base.to_vec();
    agree.push("--agree");
    run(tmp.path(), &agree);
    let v = run(tmp.path(), &agree);
    assert_eq!(v["tally"]["agree_count"].as_u64(), Some(2));

    let mut disagree = base.to_vec();
    disagree.push("--disagree");
    let v = run(tmp.path(), &disagree);
    assert_eq!(v["tally"]["agree_count"].as_u64(), Some(2));
    assert_eq!(v["tally"]["disagree_count"].as_u64(), Some(1));
    assert_eq!(v["key"].as_str().map(|k| k.len()), Some(64));
}

#[test]
fn feedback_requires_a_verdict() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = Command::new(env!("CARGO_BIN_EXE_factlens"))
        .args(["feedback", "--url", "https://example.com/a"])
        .env("FACTLENS_DATA_DIR", tmp.path())
        .output()
        .expect("run factlens feedback");
    assert!(!out.status.success());
}

#[test]
fn settings_update_persists_and_hides_key() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let v = run(tmp.path(), &["settings"]);
    assert_eq!(v["telemetry"].as_bool(), Some(false));
    assert_eq!(v["snopes_api_key_configured"].as_bool(), Some(false));

    run(
        tmp.path(),
        &["settings", "--snopes-opt-in", "true", "--snopes-api-key", "secret-123"],
    );
    let v = run(tmp.path(), &["settings"]);
    assert_eq!(v["snopes_opt_in"].as_bool(), Some(true));
    assert_eq!(v["snopes_api_key_configured"].as_bool(), Some(true));
    assert!(!v.to_string().contains("secret-123"));
}

#[test]
fn history_clear_empties_store() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let page = tmp.path().join("p.html");
    std::fs::write(&page, "<body><p>Plain words here.</p></body>").unwrap();
    for _ in 0..3 {
        run(
            tmp.path(),
            &["scan", "--html", page.to_str().unwrap(), "--save-history"],
        );
    }
    let v = run(tmp.path(), &["history"]);
    assert_eq!(v["entries"].as_array().map(|a| a.len()), Some(3));
    let v = run(tmp.path(), &["history", "--clear"]);
    assert_eq!(v["entries"].as_array().map(|a| a.len()), Some(0));
}
