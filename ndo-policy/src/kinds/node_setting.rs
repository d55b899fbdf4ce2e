use json_patch::jsonptr::PointerBuf;
use ndo_core::{
    desired::DesiredFieldSet,
    document::{Document, FieldPath},
    schema::{Constraint, FieldRule, Literal, PolicySchema, SectionRule},
};
use serde::Deserialize;

use super::{fabric_policy_collection, AdminState, SectionState};
use crate::{
    constants::{PTP_PRIORITY_1, SYNC_E_QUALITY_LEVEL},
    framework::{ObjectKey, PolicyKind},
    template::TemplateType,
    Result,
};

static SCHEMA: PolicySchema = PolicySchema {
    kind: "node_setting",
    description: "Fabric Policy Node Settings",
    fields: &[
        FieldRule::scalar(&["name"], "name"),
        FieldRule::scalar(&["description"], "description"),
        FieldRule::scalar(&["synce", "adminState"], "synce.admin_state"),
        FieldRule::scalar(&["synce", "qlOption"], "synce.quality_level")
            .translated(&SYNC_E_QUALITY_LEVEL),
        FieldRule::scalar(&["ptp", "domain"], "ptp.node_domain")
            .constrained(Constraint::Range { min: 24, max: 43 }),
        FieldRule::scalar(&["ptp", "prio2"], "ptp.priority_2")
            .constrained(Constraint::Range { min: 0, max: 255 }),
        FieldRule::scalar(&["ptp", "prio1"], "ptp.priority_1"),
    ],
    sections: &[
        SectionRule {
            name: "synce",
            param: "synce",
            injected: &[],
            companions: &["adminState", "qlOption"],
        },
        SectionRule {
            name: "ptp",
            param: "ptp",
            injected: &[("prio1", Literal::Int(PTP_PRIORITY_1))],
            companions: &["domain", "prio2"],
        },
    ],
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynceParams {
    pub state: Option<SectionState>,
    pub admin_state: Option<AdminState>,
    pub quality_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PtpParams {
    pub state: Option<SectionState>,
    pub node_domain: Option<i64>,
    pub priority_2: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSettingParams {
    #[serde(alias = "node_setting")]
    pub name: Option<String>,
    #[serde(alias = "node_setting_uuid")]
    pub uuid: Option<String>,
    pub description: Option<String>,
    pub synce: Option<SynceParams>,
    pub ptp: Option<PtpParams>,
}

/// Node policy groups of a fabric policy template: SyncE and PTP settings
/// applied to nodes.
pub struct NodeSetting;

impl PolicyKind for NodeSetting {
    type Params = NodeSettingParams;

    fn schema(&self) -> &'static PolicySchema {
        &SCHEMA
    }

    fn template_type(&self) -> TemplateType {
        TemplateType::FabricPolicy
    }

    fn collection(&self) -> PointerBuf {
        fabric_policy_collection("nodePolicyGroups")
    }

    fn key<'p>(&self, params: &'p NodeSettingParams) -> ObjectKey<'p> {
        ObjectKey {
            uuid: params.uuid.as_deref(),
            name: params.name.as_deref(),
        }
    }

    fn desired(
        &self,
        params: &NodeSettingParams,
        _existing: Option<&Document>,
    ) -> Result<DesiredFieldSet> {
        let mut desired = DesiredFieldSet::new();
        desired
            .set_opt(FieldPath::leaf("name"), params.name.clone())
            .set_opt(FieldPath::leaf("description"), params.description.clone());

        if let Some(synce) = &params.synce {
            match synce.state {
                Some(SectionState::Disabled) => {
                    desired.remove(FieldPath::leaf("synce"));
                }
                state => {
                    if state == Some(SectionState::Enabled) {
                        desired.enable("synce");
                    }
                    desired
                        .set_opt(
                            FieldPath::nested("synce", "adminState"),
                            synce.admin_state.map(|s| s.as_str()),
                        )
                        .set_opt(
                            FieldPath::nested("synce", "qlOption"),
                            synce.quality_level.clone(),
                        );
                }
            }
        }

        if let Some(ptp) = &params.ptp {
            match ptp.state {
                Some(SectionState::Disabled) => {
                    desired.remove(FieldPath::leaf("ptp"));
                }
                state => {
                    if state == Some(SectionState::Enabled) {
                        desired.enable("ptp");
                    }
                    desired
                        .set_opt(FieldPath::nested("ptp", "domain"), ptp.node_domain)
                        .set_opt(FieldPath::nested("ptp", "prio2"), ptp.priority_2);
                }
            }
        }
        Ok(desired)
    }
}
