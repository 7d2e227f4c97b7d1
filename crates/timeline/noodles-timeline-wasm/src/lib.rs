use js_sys::JSON;
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use noodles_timeline_core::{
    load_timeline, save_timeline_json, CurveView, Inputs, Outputs, PointerEvent, Timeline,
    TimelineConfig, TimelineEngine, TreeNode, UniformInfo,
};

#[wasm_bindgen]
pub struct NoodlesTimeline {
    core: TimelineEngine,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

/// Summary of a document load; skipped entries are reported as text.
#[derive(Serialize)]
struct LoadReport {
    key: String,
    tracks: usize,
    keys: usize,
    issues: Vec<String>,
}

impl NoodlesTimeline {
    fn active_timeline(&mut self) -> Result<&mut Timeline, JsError> {
        self.core
            .active_mut()
            .ok_or_else(|| JsError::new("no active timeline; call open() first"))
    }
}

#[wasm_bindgen]
impl NoodlesTimeline {
    /// Create an engine. Pass a TimelineConfig-shaped object or undefined/null for defaults.
    /// Example:
    ///   new NoodlesTimeline({ frame_rate_ms: 16, loop_playback: false })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<NoodlesTimeline, JsError> {
        console_error_panic_hook::set_once();

        let cfg: TimelineConfig = if jsvalue_is_undefined_or_null(&config) {
            TimelineConfig::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };

        Ok(NoodlesTimeline {
            core: TimelineEngine::new(cfg),
        })
    }

    /// Open (or create) the timeline for a shader key.
    #[wasm_bindgen]
    pub fn open(&mut self, key: String) {
        self.core.open(&key);
    }

    #[wasm_bindgen]
    pub fn close(&mut self, key: String) -> bool {
        self.core.close(&key).is_some()
    }

    #[wasm_bindgen(js_name = set_active)]
    pub fn set_active(&mut self, key: String) -> bool {
        self.core.set_active(&key)
    }

    /// Report the uniforms the active shader declares (array of UniformInfo).
    #[wasm_bindgen(js_name = sync_uniforms)]
    pub fn sync_uniforms(&mut self, uniforms: JsValue) -> Result<(), JsError> {
        let infos: Vec<UniformInfo> =
            swb::from_value(uniforms).map_err(|e| JsError::new(&format!("uniforms error: {e}")))?;
        self.active_timeline()?.sync_uniforms(&infos);
        Ok(())
    }

    #[wasm_bindgen(js_name = add_key)]
    pub fn add_key(
        &mut self,
        uniform: String,
        channel: u32,
        frame: i32,
        value: f32,
    ) -> Result<(), JsError> {
        self.active_timeline()?.add_key(&uniform, channel as usize, frame, value);
        Ok(())
    }

    #[wasm_bindgen(js_name = remove_key)]
    pub fn remove_key(
        &mut self,
        uniform: String,
        channel: u32,
        frame: i32,
    ) -> Result<bool, JsError> {
        Ok(self
            .active_timeline()?
            .remove_key(&uniform, channel as usize, frame)
            .is_some())
    }

    /// Animated value, or undefined when the channel has no keys.
    #[wasm_bindgen]
    pub fn evaluate(
        &mut self,
        uniform: String,
        channel: u32,
        frame: i32,
    ) -> Result<Option<f32>, JsError> {
        Ok(self.active_timeline()?.evaluate(&uniform, channel as usize, frame))
    }

    /// Step by dt (milliseconds) with Inputs JSON. Returns Outputs JSON.
    #[wasm_bindgen]
    pub fn update(&mut self, dt_ms: f32, inputs_json: JsValue) -> Result<JsValue, JsError> {
        let inputs: Inputs = if jsvalue_is_undefined_or_null(&inputs_json) {
            Inputs::default()
        } else {
            swb::from_value(inputs_json).map_err(|e| JsError::new(&format!("inputs error: {e}")))?
        };
        let out: &Outputs = self.core.update(dt_ms, inputs);
        swb::to_value(out).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }

    /// Feed a PointerEvent in widget-local pixels, drawn with `view` (CurveView).
    /// Returns the resulting EditState.
    #[wasm_bindgen]
    pub fn pointer(&mut self, event: JsValue, view: JsValue) -> Result<JsValue, JsError> {
        let event: PointerEvent =
            swb::from_value(event).map_err(|e| JsError::new(&format!("pointer event error: {e}")))?;
        let view: CurveView =
            swb::from_value(view).map_err(|e| JsError::new(&format!("curve view error: {e}")))?;
        let state = self.active_timeline()?.handle_pointer(&event, &view);
        swb::to_value(state).map_err(|e| JsError::new(&format!("edit state error: {e}")))
    }

    #[wasm_bindgen(js_name = delete_selected)]
    pub fn delete_selected(&mut self) -> Result<u32, JsError> {
        Ok(self.active_timeline()?.delete_selected_keys() as u32)
    }

    /// Serialize the active timeline to its document JSON.
    #[wasm_bindgen]
    pub fn save(&mut self) -> Result<String, JsError> {
        let tl = self.active_timeline()?;
        save_timeline_json(tl).map_err(|e| JsError::new(&format!("save error: {e}")))
    }

    /// Load a document (JSON string or already-parsed object) under `key`,
    /// replacing any timeline open there. Returns a load report.
    #[wasm_bindgen]
    pub fn load(&mut self, key: String, document: JsValue) -> Result<JsValue, JsError> {
        if jsvalue_is_undefined_or_null(&document) {
            return Err(JsError::new("load: document is null/undefined"));
        }
        let text = match document.as_string() {
            Some(s) => s,
            None => JSON::stringify(&document)
                .map_err(|e| JsError::new(&format!("load stringify error: {:?}", e)))?
                .as_string()
                .ok_or_else(|| JsError::new("load: stringify produced non-string"))?,
        };
        let root: TreeNode = serde_json::from_str(&text)
            .map_err(|e| JsError::new(&format!("load parse error: {e}")))?;
        let (timeline, issues) = load_timeline(&root, self.core.config());
        let report = LoadReport {
            key: key.clone(),
            tracks: timeline.tracks().len(),
            keys: timeline.key_count(),
            issues: issues.iter().map(ToString::to_string).collect(),
        };
        self.core.insert(&key, timeline);
        swb::to_value(&report).map_err(|e| JsError::new(&format!("load report error: {e}")))
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
