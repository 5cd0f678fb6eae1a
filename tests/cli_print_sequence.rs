use assert_cmd::Command;
use serde_json::Value;

fn run(args: &[&str]) -> Value {
    let out = Command::cargo_bin("nback")
        .unwrap()
        .args(args)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

fn lag_matches(values: &[Value], lag: usize) -> usize {
    (lag..values.len())
        .filter(|&i| values[i] == values[i - lag])
        .count()
}

#[test]
fn prints_a_visual_sequence_with_exact_matches() {
    let json = run(&[
        "--print-sequence",
        "-n",
        "2",
        "--events",
        "10",
        "-g",
        "3",
        "-p",
        "30",
        "-m",
        "visual",
    ]);
    assert_eq!(json["modality"], "Visual");
    assert!(json["audio"].is_null());
    let visual = json["visual"].as_array().unwrap();
    assert_eq!(visual.len(), 10);
    assert!(visual
        .iter()
        .all(|v| (1..=9).contains(&v.as_u64().unwrap())));
    assert_eq!(lag_matches(visual, 2), 2);
}

#[test]
fn prints_both_channels_for_audio_visual() {
    let json = run(&[
        "--print-sequence",
        "-n",
        "1",
        "--events",
        "6",
        "-g",
        "4",
        "-p",
        "100",
        "-m",
        "audio-visual",
    ]);
    let visual = json["visual"].as_array().unwrap();
    let audio = json["audio"].as_array().unwrap();
    assert_eq!(lag_matches(visual, 1), 5);
    assert_eq!(lag_matches(audio, 1), 5);
    assert!(audio.iter().all(|v| (1..=8).contains(&v.as_u64().unwrap())));
}

#[test]
fn rejects_out_of_range_lag() {
    Command::cargo_bin("nback")
        .unwrap()
        .args(["--print-sequence", "-n", "9"])
        .assert()
        .failure();
}
