use std::path::PathBuf;
use std::process::Command;

const GRAPH: &str = "graph 3\n\
                     node 0 0 checker squares_u int 6 squares_v int 6 endparameters\n\
                     node 0 140 noise scale int 4 seed int 7 endparameters\n\
                     node 240 70 blend mode enum 2 endparameters\n\
                     connections 2\n\
                     0 2 0\n\
                     1 2 1\n";

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tessera"))
}

#[test]
fn cli_render_writes_png_and_matching_checksums() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let graph_path = dir.join("graph.tsg");
    std::fs::write(&graph_path, GRAPH).unwrap();

    let out_direct = dir.join("direct.png");
    let out_tiled = dir.join("tiled.png");
    let _ = std::fs::remove_file(&out_direct);
    let _ = std::fs::remove_file(&out_tiled);

    let direct = bin()
        .args(["render", "--in"])
        .arg(&graph_path)
        .args(["--size", "64", "--checksum", "--out"])
        .arg(&out_direct)
        .output()
        .unwrap();
    assert!(direct.status.success(), "{direct:?}");
    assert!(out_direct.exists());

    let tiled = bin()
        .args(["render", "--in"])
        .arg(&graph_path)
        .args(["--size", "64", "--tiled", "--tile-size", "16", "--border", "2"])
        .args(["--checksum", "--out"])
        .arg(&out_tiled)
        .output()
        .unwrap();
    assert!(tiled.status.success(), "{tiled:?}");

    // Cache-backed rendering produces byte-identical output.
    assert_eq!(
        String::from_utf8_lossy(&direct.stdout),
        String::from_utf8_lossy(&tiled.stdout)
    );
}

#[test]
fn cli_validate_reports_structure() {
    let dir = PathBuf::from("target").join("cli_smoke_validate");
    std::fs::create_dir_all(&dir).unwrap();
    let graph_path = dir.join("graph.tsg");
    std::fs::write(&graph_path, GRAPH).unwrap();

    let out = bin()
        .args(["validate", "--in"])
        .arg(&graph_path)
        .output()
        .unwrap();
    assert!(out.status.success(), "{out:?}");

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["nodes"], 3);
    assert_eq!(summary["connections"], 2);
    assert_eq!(summary["channels"][2]["complete"], true);
}

#[test]
fn cli_rejects_unknown_kind() {
    let dir = PathBuf::from("target").join("cli_smoke_bad");
    std::fs::create_dir_all(&dir).unwrap();
    let graph_path = dir.join("bad.tsg");
    std::fs::write(&graph_path, "graph 1\nnode 0 0 swirl endparameters\nconnections 0\n")
        .unwrap();

    let out = bin()
        .args(["validate", "--in"])
        .arg(&graph_path)
        .output()
        .unwrap();
    assert!(!out.status.success());
}
