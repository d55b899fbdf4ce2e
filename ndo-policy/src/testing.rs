//! An in-memory controller for exercising the lifecycle without a network.

use std::sync::Mutex;

use async_trait::async_trait;
use json_patch::{AddOperation, Patch, PatchOperation};
use serde_json::{json, Value};

use crate::{
    transport::{Method, Transport},
    Error, Result,
};

#[derive(Default)]
struct State {
    /// `(id, document)` in registration order.
    templates: Vec<(String, Value)>,
    requests: Vec<(Method, String)>,
    /// Status and message returned for every PATCH, if set.
    patch_failure: Option<(u16, String)>,
}

#[derive(Default)]
pub struct MemoryController {
    state: Mutex<State>,
}

impl MemoryController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. Its summary is derived from the document.
    pub fn with_template(self, id: &str, document: Value) -> Self {
        self.lock().templates.push((id.to_string(), document));
        self
    }

    /// Reject every PATCH with `status` and `message`.
    pub fn failing_patches(self, status: u16, message: &str) -> Self {
        self.lock().patch_failure = Some((status, message.to_string()));
        self
    }

    pub fn template(&self, id: &str) -> Value {
        self.lock()
            .templates
            .iter()
            .find(|(t, _)| t == id)
            .map(|(_, doc)| doc.clone())
            .unwrap_or(Value::Null)
    }

    pub fn patch_count(&self) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|(method, _)| *method == Method::Patch)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

fn failure(method: Method, path: &str, status: u16, message: &str) -> Error {
    Error::Transport {
        method,
        path: path.to_string(),
        status,
        message: message.to_string(),
    }
}

/// The controller accepts `replace` on a leaf that does not exist yet and
/// treats it as `add`.
fn lenient(document: &Value, op: PatchOperation) -> PatchOperation {
    match op {
        PatchOperation::Replace(replace) if document.pointer(replace.path.as_str()).is_none() => {
            PatchOperation::Add(AddOperation {
                path: replace.path,
                value: replace.value,
            })
        }
        op => op,
    }
}

#[async_trait]
impl Transport for MemoryController {
    async fn request(&self, path: &str, method: Method, data: Option<&Value>) -> Result<Value> {
        let mut state = self.lock();
        state.requests.push((method, path.to_string()));

        if path == "templates/summaries" {
            return Ok(Value::Array(
                state
                    .templates
                    .iter()
                    .map(|(id, doc)| {
                        json!({
                            "templateId": id,
                            "templateName": doc["templateName"],
                            "templateType": doc["templateType"],
                        })
                    })
                    .collect(),
            ));
        }

        if method == Method::Patch {
            if let Some((status, message)) = &state.patch_failure {
                return Err(failure(method, path, *status, message));
            }
        }

        let id = path.strip_prefix("templates/").unwrap_or(path);
        let Some((_, document)) = state.templates.iter_mut().find(|(t, _)| t == id) else {
            return Err(failure(method, path, 404, "template not found"));
        };
        match method {
            Method::Get => Ok(document.clone()),
            Method::Patch => {
                let ops: Patch = serde_json::from_value(data.cloned().unwrap_or(Value::Null))
                    .map_err(|e| failure(method, path, 400, &e.to_string()))?;
                let mut updated = document.clone();
                for op in ops.0 {
                    let op = lenient(&updated, op);
                    json_patch::patch(&mut updated, std::slice::from_ref(&op))
                        .map_err(|e| failure(method, path, 400, &e.to_string()))?;
                }
                *document = updated.clone();
                Ok(updated)
            }
        }
    }
}
