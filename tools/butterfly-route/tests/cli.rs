//! End-to-end runs of the butterfly-route binary on a generated grid

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const SOUTH_WEST: &str = "50.85,4.35";
// node 25 of a 5x5 grid with 100 m spacing
const NORTH_EAST: &str = "50.8536,4.3557";

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_butterfly-route"))
}

fn generate(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("grid.json");
    let out = bin()
        .args(["generate", "--rows", "5", "--cols", "5", "--oneway", "0", "--output"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    path
}

fn run(graph: &Path, args: &[&str]) -> Output {
    bin().args(&args[..1]).arg("--graph").arg(graph).args(&args[1..]).output().unwrap()
}

fn json(out: &Output) -> Value {
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn test_route_across_grid() {
    let dir = TempDir::new().unwrap();
    let graph = generate(&dir);
    let route = json(&run(&graph, &["route", "--from", SOUTH_WEST, "--to", NORTH_EAST]));

    let nodes = route["nodes"].as_array().unwrap();
    assert_eq!(nodes.first().unwrap(), 1);
    assert_eq!(nodes.last().unwrap(), 25);
    // eight blocks at least
    assert!(nodes.len() >= 9);
    assert!(route["cost"].as_f64().unwrap() > 0.0);
    assert!(route["distance_m"].as_f64().unwrap() > 700.0);
}

#[test]
fn test_departure_time_route() {
    let dir = TempDir::new().unwrap();
    let graph = generate(&dir);
    let route = json(&run(
        &graph,
        &["route", "--from", SOUTH_WEST, "--to", NORTH_EAST, "--depart-at", "2024-01-03T08:00"],
    ));
    assert_eq!(route["nodes"].as_array().unwrap().last().unwrap(), 25);
}

#[test]
fn test_matrix_shape() {
    let dir = TempDir::new().unwrap();
    let graph = generate(&dir);
    let targets = format!("{SOUTH_WEST};{NORTH_EAST}");
    let matrix = json(&run(&graph, &["matrix", "--sources", NORTH_EAST, "--targets", &targets]));

    let rows = matrix["costs"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].as_array().unwrap().len(), 2);
    assert!(rows[0][0].as_f64().unwrap() > 0.0);
    assert!(matrix.get("partial").is_none());
}

#[test]
fn test_isochrone_contours_grow() {
    let dir = TempDir::new().unwrap();
    let graph = generate(&dir);
    let iso = json(&run(&graph, &["isochrone", "--from", SOUTH_WEST, "--thresholds", "60,20"]));

    let contours = iso["contours"].as_array().unwrap();
    assert_eq!(contours.len(), 2);
    assert_eq!(contours[0]["threshold"].as_f64().unwrap(), 20.0);
    let inner = contours[0]["edges"].as_array().unwrap().len();
    let outer = contours[1]["edges"].as_array().unwrap().len();
    assert!(outer >= inner);
    assert!(outer > 0);
}

#[test]
fn test_centroid_of_two_corners() {
    let dir = TempDir::new().unwrap();
    let graph = generate(&dir);
    let locations = format!("{SOUTH_WEST};{NORTH_EAST}");
    let meeting = json(&run(&graph, &["centroid", "--locations", &locations]));

    assert_eq!(meeting["routes"].as_array().unwrap().len(), 2);
    assert!(meeting["edge"].is_object());
    assert!(meeting["cost"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_bad_coordinate_fails() {
    let dir = TempDir::new().unwrap();
    let graph = generate(&dir);
    let out = run(&graph, &["route", "--from", "somewhere", "--to", NORTH_EAST]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("lat,lon"));
}

#[test]
fn test_missing_graph_fails() {
    let dir = TempDir::new().unwrap();
    let out = run(
        &dir.path().join("missing.json"),
        &["route", "--from", SOUTH_WEST, "--to", NORTH_EAST],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to read graph"));
}
