use std::process::Command;

fn hard75_bin() -> &'static str {
    env!("CARGO_BIN_EXE_hard75")
}

fn run_hard75(args: &[&str], envs: &[(&str, &str)]) -> std::process::Output {
    let mut cmd = Command::new(hard75_bin());
    cmd.env_remove("GEMINI_API_KEY");
    cmd.args(args);
    for (k, v) in envs {
        cmd.env(k, v);
    }
    cmd.output().expect("failed to run hard75 binary")
}

fn stdout_str(out: &std::process::Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn stderr_str(out: &std::process::Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

fn json(out: &std::process::Output) -> serde_json::Value {
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr_str(out));
    serde_json::from_str(stdout_str(out).trim()).unwrap()
}

#[test]
fn seventy_five_days_reach_mission_complete() {
    let tmp = tempfile::tempdir().unwrap();
    let state = tmp.path().join("state").join("tracker-v1.json");
    let state = state.to_string_lossy().to_string();
    let evidence = tmp.path().join("photos").to_string_lossy().to_string();
    let photo = tmp.path().join("pic.jpg");
    std::fs::write(&photo, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
    let photo = photo.to_string_lossy().to_string();

    let env = [
        ("HARD75_STATE_PATH", state.as_str()),
        ("HARD75_EVIDENCE_DIR", evidence.as_str()),
        ("HARD75_NOW", "2026-03-01T21:00:00Z"),
        ("NO_COLOR", "1"),
    ];

    for day in 1..=75u32 {
        for task in ["outdoor-workout", "indoor-workout", "hydration", "reading", "diet"] {
            let out = run_hard75(&["--offline", "toggle", task], &env);
            assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr_str(&out));
        }

        let out = run_hard75(&["--offline", "evidence", "attach", &photo], &env);
        assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr_str(&out));

        let v = json(&run_hard75(
            &["--offline", "--format", "json", "complete"],
            &env,
        ));
        assert_eq!(v["applied"], true, "day {}", day);
        if day < 75 {
            assert_eq!(v["status"]["day"], day + 1);
        } else {
            assert_eq!(v["status"]["finished"], true);
            assert!(v["status"]["day"].is_null());
        }
    }

    let out = run_hard75(&["--offline", "status"], &env);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout_str(&out).contains("MISSION COMPLETE"));

    // Nothing is active any more.
    let v = json(&run_hard75(
        &["--offline", "--format", "json", "toggle", "reading"],
        &env,
    ));
    assert_eq!(v["applied"], false);
    assert_eq!(v["ignored"], "challenge_finished");

    let v = json(&run_hard75(&["--offline", "--format", "json", "history"], &env));
    let rows = v["history"].as_array().unwrap();
    assert_eq!(v["current_day_index"], 75);
    assert_eq!(rows.len(), 75);
    assert!(rows.iter().all(|r| r["status"] == "completed"));

    let v = json(&run_hard75(&["--offline", "--format", "json", "show", "75"], &env));
    assert_eq!(v["evidence_bytes"], 4);

    // A new campaign starts from the end screen.
    let v = json(&run_hard75(
        &["--offline", "--format", "json", "reset", "--yes"],
        &env,
    ));
    assert_eq!(v["status"]["day"], 1);
    assert_eq!(v["status"]["days_completed"], 0);
}

#[test]
fn unreachable_provider_falls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let state = tmp.path().join("tracker-v1.json");
    let state = state.to_string_lossy().to_string();

    let env = [
        ("HARD75_STATE_PATH", state.as_str()),
        ("GEMINI_API_KEY", "test-key"),
        ("HARD75_ADVISORY_BASE_URL", "http://127.0.0.1:9/v1beta/models"),
        ("HARD75_ADVISORY_TIMEOUT_SECS", "2"),
    ];

    let v = json(&run_hard75(&["--format", "json", "status"], &env));
    assert_eq!(v["advisory"], "Stay hard. Keep pushing.");

    let v = json(&run_hard75(&["--format", "json", "reset", "--yes"], &env));
    assert_eq!(v["advisory"], "Get back up. Day 1 starts now.");
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let state = tmp.path().join("tracker-v1.json");
    let state = state.to_string_lossy().to_string();

    let out = run_hard75(
        &["status"],
        &[
            ("HARD75_STATE_PATH", state.as_str()),
            ("HARD75_ADVISORY_TIMEOUT_SECS", "soon"),
        ],
    );
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_str(&out).contains("HARD75_ADVISORY_TIMEOUT_SECS"));
}
