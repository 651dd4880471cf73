//! FFI Bridge Layer: dungeon core <-> game client
//!
//! C-ABI functions for hosts that load the core as a shared library.
//! Layouts cross the boundary as JSON; collision queries go through an opaque
//! floor-context handle and plain floats so they stay allocation-free per tick.
//! All JSON-returning functions hand back heap strings; free them with
//! `free_string`. Null or malformed input never panics: it yields null or a
//! neutral result. The `_with_config` variants take a `DungeonConfig` JSON;
//! null there means the defaults.

use serde::{Deserialize, Serialize};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use tracing::warn;

use crate::collision::{CollisionAxis, StepResult};
use crate::config::{ConfigError, DungeonConfig};
use crate::floor::{FloorContext, FloorGeometry};
use crate::generation::dag::DagDocument;
use crate::generation::error::LayoutError;
use crate::generation::layout::{FloorLayout, LayoutGenerator};
use crate::logging::{self, LogLevel, TracingConfig};
use bevy::math::Vec3;

// ========================
// Data transfer types
// ========================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl From<&LayoutError> for ErrorInfo {
    fn from(err: &LayoutError) -> Self {
        let kind = serde_json::to_value(err.kind())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Reply to the layout generation calls. With fallback, `ok` stays true and
/// `error` describes why the fallback was used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub ok: bool,
    pub degraded: bool,
    pub layout: Option<FloorLayout>,
    pub error: Option<ErrorInfo>,
}

impl LayoutResponse {
    fn failed(kind: &str, message: String) -> Self {
        Self {
            ok: false,
            degraded: false,
            layout: None,
            error: Some(ErrorInfo {
                kind: kind.to_string(),
                message,
            }),
        }
    }

    fn invalid_json(err: serde_json::Error) -> Self {
        Self::failed("invalid_json", err.to_string())
    }

    fn invalid_config(err: ConfigError) -> Self {
        Self::failed("invalid_config", err.to_string())
    }
}

/// Collision result in C layout. `axis`: 0 none, 1 x, 2 y, 3 z.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FfiStepResult {
    pub collided: bool,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub axis: u8,
}

impl From<StepResult> for FfiStepResult {
    fn from(r: StepResult) -> Self {
        Self {
            collided: r.collided,
            x: r.corrected.x,
            y: r.corrected.y,
            z: r.corrected.z,
            axis: r.axis as u8,
        }
    }
}

impl FfiStepResult {
    fn passthrough(pos: Vec3) -> Self {
        Self {
            collided: false,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            axis: CollisionAxis::None as u8,
        }
    }
}

// ========================
// Helper: safe JSON return
// ========================

fn json_to_cstring<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn parse_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_owned()) }
}

/// Null config means defaults
fn parse_config(ptr: *const c_char) -> Result<DungeonConfig, ConfigError> {
    match parse_cstr(ptr) {
        None => Ok(DungeonConfig::default()),
        Some(json) => DungeonConfig::from_json(&json),
    }
}

fn context_ref<'a>(handle: *const FloorContext) -> Option<&'a FloorContext> {
    unsafe { handle.as_ref() }
}

// ========================
// C-ABI: Core
// ========================

#[no_mangle]
pub extern "C" fn get_version() -> *mut c_char {
    CString::new(env!("CARGO_PKG_VERSION"))
        .unwrap_or_default()
        .into_raw()
}

/// Free a string allocated by Rust.
/// ptr must come from a prior call into this library, or be null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}

/// Initialize logging at a level (0=Trace, 1=Debug, 2=Info, 3=Warn, 4=Error)
#[no_mangle]
pub extern "C" fn init_logging(level_id: u32) {
    logging::init_tracing(&TracingConfig::with_level(LogLevel::from_id(level_id)));
}

/// Initialize logging from a JSON `TracingConfig`; ignored if unparsable
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn logging_init(config_json: *const c_char) {
    let Some(json) = parse_cstr(config_json) else {
        return;
    };
    match serde_json::from_str::<TracingConfig>(&json) {
        Ok(config) => logging::init_tracing(&config),
        Err(err) => warn!(error = %err, "ignoring malformed logging config"),
    }
}

// ========================
// C-ABI: Layout
// ========================

/// Place a DAG document. Returns `LayoutResponse` JSON, or null for null input.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_dungeon_layout(dag_json: *const c_char) -> *mut c_char {
    generate_dungeon_layout_with_config(dag_json, std::ptr::null())
}

/// [`generate_dungeon_layout`] with the layout settings of `config_json`.
/// An invalid config is reported with kind `invalid_config`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_dungeon_layout_with_config(
    dag_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    let Some(json) = parse_cstr(dag_json) else {
        return std::ptr::null_mut();
    };
    let config = match parse_config(config_json) {
        Ok(config) => config,
        Err(err) => return json_to_cstring(&LayoutResponse::invalid_config(err)),
    };
    let response = match DagDocument::from_json(&json) {
        Ok(doc) => match LayoutGenerator::new(config.layout).generate(&doc) {
            Ok(layout) => LayoutResponse {
                ok: true,
                degraded: false,
                layout: Some(layout),
                error: None,
            },
            Err(err) => LayoutResponse {
                ok: false,
                degraded: false,
                layout: None,
                error: Some(ErrorInfo::from(&err)),
            },
        },
        Err(err) => LayoutResponse::invalid_json(err),
    };
    json_to_cstring(&response)
}

/// Place a DAG document, substituting the seeded fallback floor on any
/// layout error. Malformed JSON is still reported as an error.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_dungeon_layout_or_fallback(dag_json: *const c_char, seed: u64) -> *mut c_char {
    generate_dungeon_layout_or_fallback_with_config(dag_json, std::ptr::null(), seed)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_dungeon_layout_or_fallback_with_config(
    dag_json: *const c_char,
    config_json: *const c_char,
    seed: u64,
) -> *mut c_char {
    let Some(json) = parse_cstr(dag_json) else {
        return std::ptr::null_mut();
    };
    let config = match parse_config(config_json) {
        Ok(config) => config,
        Err(err) => return json_to_cstring(&LayoutResponse::invalid_config(err)),
    };
    let response = match DagDocument::from_json(&json) {
        Ok(doc) => {
            let outcome = LayoutGenerator::new(config.layout).generate_or_fallback(&doc, seed);
            LayoutResponse {
                ok: true,
                degraded: outcome.is_degraded(),
                error: outcome.degraded.as_ref().map(ErrorInfo::from),
                layout: Some(outcome.layout),
            }
        }
        Err(err) => LayoutResponse::invalid_json(err),
    };
    json_to_cstring(&response)
}

// ========================
// C-ABI: Floor context
// ========================

/// Build a floor context from a DAG and optional geometry JSON
/// (`{"walls":[{"x":..,"y":..}],"ceilings":[..]}`). Null geometry derives
/// perimeter walls. Returns null if the DAG is unusable; release with
/// `floor_context_free`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_create(
    dag_json: *const c_char,
    geometry_json: *const c_char,
) -> *mut FloorContext {
    floor_context_create_with_config(dag_json, geometry_json, std::ptr::null())
}

/// [`floor_context_create`] with layout and collision settings from
/// `config_json`. Null if the config is invalid.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_create_with_config(
    dag_json: *const c_char,
    geometry_json: *const c_char,
    config_json: *const c_char,
) -> *mut FloorContext {
    let Some(json) = parse_cstr(dag_json) else {
        return std::ptr::null_mut();
    };
    let config = match parse_config(config_json) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "floor_context_create: invalid config");
            return std::ptr::null_mut();
        }
    };
    let doc = match DagDocument::from_json(&json) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(error = %err, "floor_context_create: malformed DAG");
            return std::ptr::null_mut();
        }
    };
    let geometry = match parse_cstr(geometry_json) {
        None => FloorGeometry::Derived,
        Some(text) => match serde_json::from_str::<FloorGeometry>(&text) {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!(error = %err, "floor_context_create: malformed geometry");
                return std::ptr::null_mut();
            }
        },
    };
    match FloorContext::load(&doc, geometry, &config) {
        Ok(context) => Box::into_raw(Box::new(context)),
        Err(err) => {
            warn!(floor = %doc.root_hint, error = %err, "floor_context_create: layout rejected");
            std::ptr::null_mut()
        }
    }
}

/// Release a handle from `floor_context_create`. Null is a no-op.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_free(handle: *mut FloorContext) {
    if !handle.is_null() {
        unsafe {
            drop(Box::from_raw(handle));
        }
    }
}

/// Layout JSON of a context, or null
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_layout_json(handle: *const FloorContext) -> *mut c_char {
    match context_ref(handle) {
        Some(context) => json_to_cstring(context.layout()),
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_floor_height(handle: *const FloorContext, x: f32, y: f32, z: f32) -> f32 {
    context_ref(handle)
        .map(|c| c.collision().floor_height_at(Vec3::new(x, y, z)))
        .unwrap_or(0.0)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_is_on_ground(handle: *const FloorContext, x: f32, y: f32, z: f32) -> bool {
    context_ref(handle)
        .map(|c| c.collision().is_on_ground(Vec3::new(x, y, z)))
        .unwrap_or(false)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_resolve_step(
    handle: *const FloorContext,
    cx: f32,
    cy: f32,
    cz: f32,
    px: f32,
    py: f32,
    pz: f32,
) -> FfiStepResult {
    let proposed = Vec3::new(px, py, pz);
    match context_ref(handle) {
        Some(c) => c.collision().resolve_step(Vec3::new(cx, cy, cz), proposed).into(),
        None => FfiStepResult::passthrough(proposed),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_sweep_step(
    handle: *const FloorContext,
    fx: f32,
    fy: f32,
    fz: f32,
    tx: f32,
    ty: f32,
    tz: f32,
) -> FfiStepResult {
    let to = Vec3::new(tx, ty, tz);
    match context_ref(handle) {
        Some(c) => c.collision().sweep_step(Vec3::new(fx, fy, fz), to).into(),
        None => FfiStepResult::passthrough(to),
    }
}

/// Resolve or sweep depending on the displacement, as the movement system does
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn floor_context_move_agent(
    handle: *const FloorContext,
    cx: f32,
    cy: f32,
    cz: f32,
    px: f32,
    py: f32,
    pz: f32,
) -> FfiStepResult {
    let proposed = Vec3::new(px, py, pz);
    match context_ref(handle) {
        Some(c) => c.collision().move_agent(Vec3::new(cx, cy, cz), proposed).into(),
        None => FfiStepResult::passthrough(proposed),
    }
}
