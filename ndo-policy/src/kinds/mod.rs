//! The policy kinds that can be managed, one module each.

use json_patch::jsonptr::PointerBuf;
use serde::Deserialize;

mod mac_sec_policy;
mod node_setting;

pub use mac_sec_policy::{InterfaceType, MacSecKeyParams, MacSecPolicy, MacSecPolicyParams};
pub use node_setting::{NodeSetting, NodeSettingParams, PtpParams, SynceParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Enabled,
    Disabled,
}

impl AdminState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminState::Enabled => "enabled",
            AdminState::Disabled => "disabled",
        }
    }
}

/// Toggle of an optional sub-section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionState {
    /// All of the section's companion fields must be supplied.
    Enabled,
    /// The section is removed from the object.
    Disabled,
}

/// Pointer to a collection inside a fabric policy template.
fn fabric_policy_collection(name: &str) -> PointerBuf {
    PointerBuf::from_tokens(vec!["fabricPolicyTemplate", "template", name])
}
