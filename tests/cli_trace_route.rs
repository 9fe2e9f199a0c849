use serde_json::Value;
use std::process::{Command, Output};

fn trace_route(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trace_route"))
        .args(args)
        .arg("--quiet")
        .output()
        .expect("run trace_route")
}

#[test]
fn trace_route_prints_sandwich_detour_as_json() {
    let output = trace_route(&[
        "--dims", "4,4", "--failed-link", "0-1", "--src", "0", "--dst", "1", "--json",
    ]);
    assert!(
        output.status.success(),
        "trace_route failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let v: Value = serde_json::from_slice(&output.stdout).expect("parse route json");
    assert_eq!(v["routing"], "sandwich");
    let next: Vec<u64> = v["hops"]
        .as_array()
        .expect("hops array")
        .iter()
        .map(|h| h["next"].as_u64().expect("next id"))
        .collect();
    assert_eq!(next, vec![4, 5, 1]);
    assert_eq!(v["hops"][0]["port"]["direction"], "East");
    assert_eq!(v["hops"][0]["crossed_dateline"], false);
}

#[test]
fn trace_route_reports_dateline_crossing() {
    let output = trace_route(&["--dims", "4", "--src", "0", "--dst", "3"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "hop at=0 next=3 direction=LocalWest channel=1 dateline=true",
            "route src=0 dst=3 hops=1 routing=dormin",
        ]
    );
}

#[test]
fn trace_route_rejects_unsupported_tori() {
    let output = trace_route(&["--dims", "2,2,2,2", "--src", "0", "--dst", "1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at most three dimensions"), "stderr={stderr}");

    let output = trace_route(&["--dims", "4,4", "--src", "0", "--dst", "99"]);
    assert!(!output.status.success());
}
