use std::process::Command;

// Startup failures must be visible to calling scripts as an exit
// status, not only as a message on stderr.

#[test]
fn missing_driver_exits_nonzero() {
    let out = Command::new(env!("CARGO_BIN_EXE_dali_gateway"))
        .args(["-d", "nosuchdriver"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Failed to open DALI device"), "{}", stderr);
    // The driver listing still goes to stdout to help the caller.
    assert!(String::from_utf8_lossy(&out.stdout).contains("Available drivers:"));
}

#[test]
fn unreadable_config_exits_nonzero() {
    let out = Command::new(env!("CARGO_BIN_EXE_dali_gateway"))
        .args(["--config", "/nonexistent/dali_gateway.json"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to read config"));
}

#[test]
fn send_line_reports_refused_connection() {
    let out = Command::new(env!("CARGO_BIN_EXE_send_line"))
        .args(["d105", "-c", "127.0.0.1:1"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to connect"));
}
