//! Static scope audit over the engine sources.
//!
//! The engine must not compute trust or scores from observed behaviour,
//! adapt thresholds, promote levels on its own, or talk to the network.
//! Any of these identifiers appearing in `src/` fails the build.

use std::fs;
use std::path::{Path, PathBuf};

const FORBIDDEN: &[&str] = &[
    "adaptive_threshold",
    "adaptive_budget",
    "predict_budget",
    "behavioral_score",
    "behavioural_score",
    "auto_promote",
    "promote_level",
    "reqwest",
    "hyper::",
    "TcpStream",
    "UdpSocket",
    "std::net",
];

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("read src dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn engine_sources_stay_inside_fire_line() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut files = Vec::new();
    rust_sources(&src, &mut files);
    assert!(files.len() > 10, "expected engine sources under {src:?}");

    let mut violations = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file).expect("read source");
        for (lineno, line) in text.lines().enumerate() {
            for needle in FORBIDDEN {
                if line.contains(needle) {
                    violations.push(format!("{}:{}: {needle}", file.display(), lineno + 1));
                }
            }
        }
    }
    assert!(violations.is_empty(), "fire-line violations:\n{}", violations.join("\n"));
}

#[test]
fn manifest_has_no_network_client() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let text = fs::read_to_string(manifest).expect("read manifest");
    for client in ["reqwest", "hyper", "ureq", "surf"] {
        assert!(!text.contains(client), "network client '{client}' in manifest");
    }
}
