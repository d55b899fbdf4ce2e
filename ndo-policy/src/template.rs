use json_patch::jsonptr::PointerBuf;
use ndo_core::{
    locate::{matching_indices, KeyValue},
    Error as CoreError,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    transport::{Method, Transport},
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateType {
    FabricPolicy,
}

impl TemplateType {
    /// The `templateType` value used by the controller.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::FabricPolicy => "fabricPolicy",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TemplateType::FabricPolicy => "Fabric Policy template",
        }
    }
}

/// A fetched template document.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub document: Value,
}

impl Template {
    /// Request path of the template, for reads and patches.
    pub fn path(&self) -> String {
        format!("templates/{}", self.id)
    }

    /// The collection at `pointer`; missing or non-array collections are
    /// empty.
    pub fn collection(&self, pointer: &PointerBuf) -> &[Value] {
        self.document
            .pointer(pointer.as_str())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }
}

/// Resolves template names to template documents.
pub struct TemplateClient<'t, T: Transport + ?Sized> {
    transport: &'t T,
}

impl<'t, T: Transport + ?Sized> TemplateClient<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        TemplateClient { transport }
    }

    /// Fetch the template `name` and check that it has the expected type.
    pub async fn fetch(&self, template_type: TemplateType, name: &str) -> Result<Template> {
        let summaries = self
            .transport
            .request("templates/summaries", Method::Get, None)
            .await?;
        let summaries = summaries.as_array().ok_or_else(|| {
            CoreError::Configuration("templates/summaries did not return a list".to_string())
        })?;

        let by_name = matching_indices(summaries, &[KeyValue::new("templateName", name)]);
        let by_type = matching_indices(
            summaries,
            &[
                KeyValue::new("templateName", name),
                KeyValue::new("templateType", template_type.as_str()),
            ],
        );
        let summary = match (by_type.as_slice(), by_name.as_slice()) {
            ([index], _) => &summaries[*index],
            ([], []) => {
                return Err(CoreError::NotFound {
                    description: template_type.description().to_string(),
                    key: format!("name '{}'", name),
                }
                .into())
            }
            ([], [index, ..]) => {
                return Err(Error::validation(format!(
                    "template '{}' is of type {}, expected {}",
                    name,
                    summaries[*index]
                        .get("templateType")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown"),
                    template_type.as_str()
                )))
            }
            (indices, _) => {
                return Err(CoreError::AmbiguousMatch {
                    description: template_type.description().to_string(),
                    key: format!("name '{}'", name),
                    indices: indices.to_vec(),
                }
                .into())
            }
        };

        let id = summary
            .get("templateId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CoreError::Configuration(format!("template '{}' has no templateId", name))
            })?
            .to_string();
        debug!(template = name, %id, "fetching template");

        let template = Template {
            document: self
                .transport
                .request(&format!("templates/{}", id), Method::Get, None)
                .await?,
            id,
            name: name.to_string(),
        };
        validate_template(&template, template_type)?;
        Ok(template)
    }
}

fn validate_template(template: &Template, template_type: TemplateType) -> Result<()> {
    match template.get_str("templateType") {
        Some(t) if t == template_type.as_str() => Ok(()),
        Some(t) => Err(Error::validation(format!(
            "template '{}' is of type {}, expected {}",
            template.name,
            t,
            template_type.as_str()
        ))),
        None => Err(CoreError::Configuration(format!(
            "template '{}' has no templateType",
            template.name
        ))
        .into()),
    }
}
