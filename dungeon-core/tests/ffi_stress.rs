//! Fuzz-style stress tests for FFI surface.
//!
//! Validates that rapid-fire calls, extreme inputs, malformed JSON,
//! and concurrent access to floor contexts don't cause crashes, panics,
//! or leaks.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::thread;

use dungeon_core::bridge::*;

// ============================================================
// Helpers
// ============================================================

const ROOM_DAG: &str = r#"{"rootHint":"stress","nodes":[
    {"id":1,"name":"hub","isRoom":true,"width":4,"height":4,"children":["hall"]},
    {"id":2,"name":"hall","isRoom":false,"length":3,"parentDoorOffset":2}
]}"#;

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn is_valid_json(ptr: *mut c_char) -> bool {
    if ptr.is_null() {
        return false;
    }
    let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("");
    let valid = serde_json::from_str::<serde_json::Value>(s).is_ok();
    free_string(ptr);
    valid
}

fn ptr_to_string(ptr: *mut c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let s = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .unwrap_or("")
        .to_owned();
    free_string(ptr);
    s
}

fn response(ptr: *mut c_char) -> serde_json::Value {
    serde_json::from_str(&ptr_to_string(ptr)).unwrap()
}

/// Chain of `n` one-cell hallways below a small room
fn chain_dag(n: usize) -> String {
    let mut nodes = vec![serde_json::json!({
        "name": "root", "isRoom": true, "width": 3, "height": 3, "children": ["h0"]
    })];
    for i in 0..n {
        let children: Vec<String> = if i + 1 < n { vec![format!("h{}", i + 1)] } else { vec![] };
        nodes.push(serde_json::json!({
            "name": format!("h{i}"), "isRoom": false, "length": 1, "children": children
        }));
    }
    serde_json::json!({ "rootHint": "chain", "nodes": nodes }).to_string()
}

// ============================================================
// Rapid-fire stress: call FFI functions N times in tight loops
// ============================================================

const RAPID_ITERS: usize = 200;

#[test]
fn stress_generate_layout_rapid() {
    let dag = cstr(ROOM_DAG);
    for _ in 0..RAPID_ITERS {
        let ptr = generate_dungeon_layout(dag.as_ptr());
        assert!(!ptr.is_null());
        let value = response(ptr);
        assert_eq!(value["ok"], true);
        assert_eq!(value["layout"]["root"], "hub");
    }
}

#[test]
fn stress_fallback_rapid_with_varying_seeds() {
    let dag = cstr(r#"{"nodes":[]}"#);
    for seed in 0..RAPID_ITERS as u64 {
        let value = response(generate_dungeon_layout_or_fallback(dag.as_ptr(), seed));
        assert_eq!(value["ok"], true);
        assert_eq!(value["degraded"], true);
        assert_eq!(value["error"]["kind"], "missing_root");
        assert!(!value["layout"]["rooms"].as_array().unwrap().is_empty());
    }
}

#[test]
fn stress_fallback_is_stable_per_seed() {
    let dag = cstr(r#"{"rootHint":"x","nodes":[]}"#);
    for seed in [0u64, 1, 42, u64::MAX] {
        let a = ptr_to_string(generate_dungeon_layout_or_fallback(dag.as_ptr(), seed));
        let b = ptr_to_string(generate_dungeon_layout_or_fallback(dag.as_ptr(), seed));
        assert_eq!(a, b, "seed {seed}");
    }
}

#[test]
fn stress_version_rapid() {
    for _ in 0..RAPID_ITERS {
        let version = ptr_to_string(get_version());
        assert!(!version.is_empty());
    }
}

#[test]
fn stress_long_chain_through_ffi() {
    let dag = cstr(&chain_dag(2_000));
    let value = response(generate_dungeon_layout(dag.as_ptr()));
    assert_eq!(value["ok"], true);
    assert_eq!(value["layout"]["hallways"].as_array().unwrap().len(), 2_000);
}

// ============================================================
// Malformed and null input
// ============================================================

#[test]
fn null_inputs_return_null() {
    assert!(generate_dungeon_layout(std::ptr::null()).is_null());
    assert!(generate_dungeon_layout_or_fallback(std::ptr::null(), 7).is_null());
    assert!(floor_context_create(std::ptr::null(), std::ptr::null()).is_null());
    assert!(floor_context_layout_json(std::ptr::null()).is_null());
    free_string(std::ptr::null_mut());
    floor_context_free(std::ptr::null_mut());
    logging_init(std::ptr::null());
}

#[test]
fn malformed_json_is_reported_not_panicked() {
    let inputs = [
        "",
        "{",
        "null",
        "[]",
        r#"{"nodes":"many"}"#,
        r#"{"nodes":[{"name":"a"}]}"#,
        r#"{"nodes":[{"name":"a","isRoom":true,"width":"wide","height":2}]}"#,
        r#"{"nodes":[{"name":"a","isRoom":true,"width":99999999999999,"height":2}]}"#,
        r#"{"nodes":[{"name":"","isRoom":true,"width":2,"height":2}]}"#,
    ];
    for input in inputs {
        let dag = cstr(input);
        let value = response(generate_dungeon_layout(dag.as_ptr()));
        assert_eq!(value["ok"], false, "{input}");
        assert_eq!(value["error"]["kind"], "invalid_json", "{input}");

        let fallback = response(generate_dungeon_layout_or_fallback(dag.as_ptr(), 1));
        assert_eq!(fallback["ok"], false, "{input}");
        assert!(fallback["layout"].is_null());

        assert!(floor_context_create(dag.as_ptr(), std::ptr::null()).is_null());
    }
}

#[test]
fn layout_errors_carry_their_kind() {
    let cases = [
        (r#"{"nodes":[]}"#, "missing_root"),
        (
            r#"{"nodes":[{"name":"a","isRoom":true,"width":2,"height":2,"children":["b"]}]}"#,
            "dangling_reference",
        ),
        (
            r#"{"nodes":[{"name":"a","isRoom":true,"width":2,"height":2,"children":["b"]},
                {"name":"b","isRoom":false,"length":1},{"name":"b","isRoom":false,"length":2}]}"#,
            "duplicate_name",
        ),
        (
            r#"{"nodes":[{"name":"a","isRoom":true,"width":100000,"height":2}]}"#,
            "invalid_node",
        ),
    ];
    for (input, kind) in cases {
        let dag = cstr(input);
        let value = response(generate_dungeon_layout(dag.as_ptr()));
        assert_eq!(value["ok"], false, "{input}");
        assert_eq!(value["error"]["kind"], kind, "{input}");
        assert!(value["layout"].is_null());
    }
}

#[test]
fn extreme_coordinates_do_not_panic() {
    let dag = cstr(ROOM_DAG);
    let handle = floor_context_create(dag.as_ptr(), std::ptr::null());
    assert!(!handle.is_null());

    let values = [0.0f32, -1.0e9, 1.0e9, f32::MIN_POSITIVE, -0.0, 1.0e-30];
    for &a in &values {
        for &b in &values {
            let h = floor_context_floor_height(handle, a, 0.0, b);
            assert!(h.is_finite());
            let _ = floor_context_is_on_ground(handle, a, h, b);
            let r = floor_context_resolve_step(handle, 4.0, 0.0, 4.0, a, 0.0, b);
            assert!(r.axis <= 3);
            let r = floor_context_move_agent(handle, 4.0, 0.0, 4.0, a, 0.0, b);
            assert!(r.axis <= 3);
        }
    }
    floor_context_free(handle);
}

// ============================================================
// Floor context lifecycle
// ============================================================

#[test]
fn create_and_free_many_contexts() {
    let dag = cstr(ROOM_DAG);
    for _ in 0..RAPID_ITERS {
        let handle = floor_context_create(dag.as_ptr(), std::ptr::null());
        assert!(!handle.is_null());
        assert!(is_valid_json(floor_context_layout_json(handle)));
        floor_context_free(handle);
    }
}

#[test]
fn rejected_layout_yields_null_context() {
    let dag = cstr(r#"{"nodes":[{"name":"a","isRoom":false,"length":2,"children":["a2"]}]}"#);
    assert!(floor_context_create(dag.as_ptr(), std::ptr::null()).is_null());
}

#[test]
fn bad_geometry_json_yields_null_context() {
    let dag = cstr(ROOM_DAG);
    for geometry in ["{", r#"{"walls":"none"}"#, r#"{"walls":[{"x":1}]}"#, "42"] {
        let geo = cstr(geometry);
        assert!(
            floor_context_create(dag.as_ptr(), geo.as_ptr()).is_null(),
            "{geometry}"
        );
    }
}

#[test]
fn explicit_geometry_places_interior_wall() {
    let dag = cstr(ROOM_DAG);
    // Cell (2, 1) spans x [4, 6), z [2, 4) at the default cell size
    let geo = cstr(r#"{"walls":[{"x":2,"y":1}],"ceilings":[]}"#);
    let handle = floor_context_create(dag.as_ptr(), geo.as_ptr());
    assert!(!handle.is_null());

    let r = floor_context_move_agent(handle, 1.0, 0.0, 3.0, 5.0, 0.0, 3.0);
    assert!(r.collided);
    assert_eq!(r.axis, 1);
    assert!(r.x < 4.0);

    // Only the listed wall exists: moving west off the room is unobstructed
    let r = floor_context_resolve_step(handle, 1.0, 0.0, 3.0, 0.8, 0.0, 3.0);
    assert!(!r.collided);
    floor_context_free(handle);
}

#[test]
fn config_json_limits_sweeps_without_tunneling() {
    let dag = cstr(r#"{"rootHint":"box","nodes":[{"name":"r","isRoom":true,"width":4,"height":4}]}"#);
    let config = cstr(r#"{"collision":{"max_sweep_samples":4}}"#);
    let handle = floor_context_create_with_config(dag.as_ptr(), std::ptr::null(), config.as_ptr());
    assert!(!handle.is_null());

    for far in [50.0, 1.0e4, 1.0e6] {
        let r = floor_context_sweep_step(handle, 4.0, 0.0, 4.0, far, 0.0, 4.0);
        assert!(r.collided, "{far}");
        assert_eq!(r.axis, 1);
        assert!(r.x < 8.0, "{far}");
    }
    floor_context_free(handle);
}

#[test]
fn invalid_config_json_yields_null_context() {
    let dag = cstr(ROOM_DAG);
    for config in ["{", r#"{"collision":{"max_sweep_samples":0}}"#, r#"{"collision":{"cell_size":-1}}"#] {
        let cfg = cstr(config);
        assert!(
            floor_context_create_with_config(dag.as_ptr(), std::ptr::null(), cfg.as_ptr()).is_null(),
            "{config}"
        );
        let r = response(generate_dungeon_layout_with_config(dag.as_ptr(), cfg.as_ptr()));
        assert_eq!(r["error"]["kind"], "invalid_config", "{config}");
    }
}

#[test]
fn null_handle_queries_pass_through() {
    let null = std::ptr::null();
    assert_eq!(floor_context_floor_height(null, 1.0, 2.0, 3.0), 0.0);
    assert!(!floor_context_is_on_ground(null, 1.0, 0.0, 3.0));
    let r = floor_context_sweep_step(null, 0.0, 0.0, 0.0, 9.0, 1.0, -4.0);
    assert!(!r.collided);
    assert_eq!((r.x, r.y, r.z, r.axis), (9.0, 1.0, -4.0, 0));
}

// ============================================================
// Concurrency
// ============================================================

#[test]
fn concurrent_generation_is_consistent() {
    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(|| {
                let dag = cstr(ROOM_DAG);
                (0..50)
                    .map(|_| ptr_to_string(generate_dungeon_layout(dag.as_ptr())))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn concurrent_queries_share_one_context() {
    let dag = cstr(ROOM_DAG);
    let handle = floor_context_create(dag.as_ptr(), std::ptr::null());
    assert!(!handle.is_null());
    // Raw pointers are not Send; hand the address across instead
    let address = handle as usize;

    let workers: Vec<_> = (0..8)
        .map(|t| {
            thread::spawn(move || {
                let ctx = address as *const _;
                for i in 0..200 {
                    let dx = ((i + t) % 7) as f32 - 3.0;
                    let r = floor_context_sweep_step(ctx, 4.0, 0.0, 4.0, 4.0 + dx * 4.0, 0.0, 4.0);
                    assert!(r.x.is_finite());
                    let r = floor_context_resolve_step(ctx, 4.0, 0.0, 4.0, 4.0 + dx * 0.1, 0.0, 4.0);
                    assert!(!r.collided);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    floor_context_free(handle);
}
