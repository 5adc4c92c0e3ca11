use std::{fs, path::PathBuf, process::Command};

use nova_defence_core::{Balancing, Credits, WELCOME_BANNER};

fn run_cli(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_nova-defence"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch nova-defence");
    assert!(
        output.status.success(),
        "nova-defence exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is utf-8")
}

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("nova-defence-{}-{name}", std::process::id()));
    fs::write(&path, contents).expect("write balancing file");
    path
}

#[test]
fn default_balancing_survives_a_toml_round_trip() {
    let source = toml::to_string(&Balancing::default()).expect("serialize balancing");
    let parsed: Balancing = toml::from_str(&source).expect("parse serialized balancing");

    assert!(parsed.validate().is_empty());
    assert_eq!(parsed.rng_seed, Balancing::default().rng_seed);
    assert_eq!(parsed.defense_orb, Balancing::default().defense_orb);
    assert_eq!(parsed.mounts.pulsars, Balancing::default().mounts.pulsars);
    assert_eq!(
        parsed.mounts.complexities,
        Balancing::default().mounts.complexities
    );
}

#[test]
fn short_session_prints_banner_and_summary() {
    let stdout = run_cli(&["--waves", "1", "--time-limit", "40", "--dt-ms", "50"]);

    assert!(stdout.starts_with(WELCOME_BANNER), "{stdout}");
    assert!(stdout.contains("=== SESSION SUMMARY ==="), "{stdout}");
    assert!(stdout.contains("Waves completed:"), "{stdout}");
}

#[test]
fn balancing_file_overrides_starting_credits() {
    let mut balancing = Balancing::default();
    balancing.starting_credits = Credits::new(7);
    balancing.free_defense_orbs = 0;
    let path = scratch_file(
        "credits.toml",
        &toml::to_string(&balancing).expect("serialize balancing"),
    );

    let stdout = run_cli(&[
        "--config",
        path.to_str().expect("utf-8 temp path"),
        "--waves",
        "1",
        "--time-limit",
        "1",
        "--reserve",
        "1000",
    ]);
    let _ = fs::remove_file(&path);

    assert!(stdout.contains("Spendable:       7"), "{stdout}");
    assert!(stdout.contains("Stored credits:  0"), "{stdout}");
}

#[test]
fn unreadable_balancing_file_fails_with_context() {
    let path = scratch_file("broken.toml", "starting_credits = \"lots\"");
    let output = Command::new(env!("CARGO_BIN_EXE_nova-defence"))
        .args(["--config", path.to_str().expect("utf-8 temp path")])
        .output()
        .expect("failed to launch nova-defence");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse balancing file"), "{stderr}");
}
