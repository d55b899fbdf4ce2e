use chrono::NaiveDateTime;
use json_patch::jsonptr::PointerBuf;
use ndo_core::{
    desired::DesiredFieldSet,
    document::{Document, FieldPath},
    schema::{Constraint, FieldRule, PolicySchema, SectionRule},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{fabric_policy_collection, AdminState};
use crate::{
    constants::{CIPHER_SUITE, CONFIDENTIALITY_OFFSET, SECURITY_POLICY},
    framework::{ObjectKey, PolicyKind},
    template::{Template, TemplateType},
    Error, Result,
};

static SCHEMA: PolicySchema = PolicySchema {
    kind: "mac_sec_policy",
    description: "MACSec Policy",
    fields: &[
        FieldRule::scalar(&["name"], "name"),
        FieldRule::scalar(&["description"], "description"),
        FieldRule::scalar(&["adminState"], "admin_state"),
        FieldRule::scalar(&["type"], "type"),
        FieldRule::scalar(&["macsecParams", "cipherSuite"], "cipher_suite")
            .translated(&CIPHER_SUITE),
        FieldRule::scalar(&["macsecParams", "windowSize"], "window_size").constrained(
            Constraint::Range {
                min: 0,
                max: 4294967295,
            },
        ),
        FieldRule::scalar(&["macsecParams", "securityPol"], "security_policy")
            .translated(&SECURITY_POLICY),
        FieldRule::scalar(&["macsecParams", "sakExpiryTime"], "sak_expiry_time").constrained(
            Constraint::ZeroOrRange {
                min: 60,
                max: 2592000,
            },
        ),
        FieldRule::scalar(&["macsecParams", "confOffSet"], "confidentiality_offset")
            .translated(&CONFIDENTIALITY_OFFSET),
        FieldRule::scalar(&["macsecParams", "keyServerPrio"], "key_server_priority")
            .constrained(Constraint::Range { min: 0, max: 255 }),
        FieldRule::list(&["macsecKeys"], "mac_sec_key"),
    ],
    sections: &[SectionRule {
        name: "macsecParams",
        param: "macsec_params",
        injected: &[],
        companions: &[],
    }],
};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PSK_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Fabric,
    Access,
}

impl InterfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceType::Fabric => "fabric",
            InterfaceType::Access => "access",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacSecKeyParams {
    pub key_name: String,
    pub psk: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacSecPolicyParams {
    #[serde(alias = "mac_sec_policy")]
    pub name: Option<String>,
    #[serde(alias = "mac_sec_policy_uuid")]
    pub uuid: Option<String>,
    pub description: Option<String>,
    pub admin_state: Option<AdminState>,
    #[serde(rename = "type")]
    pub interface_type: Option<InterfaceType>,
    pub cipher_suite: Option<String>,
    pub window_size: Option<i64>,
    pub security_policy: Option<String>,
    pub sak_expiry_time: Option<i64>,
    pub confidentiality_offset: Option<i64>,
    pub key_server_priority: Option<i64>,
    pub mac_sec_key: Option<Vec<MacSecKeyParams>>,
}

/// MACSec policies of a fabric policy template.
pub struct MacSecPolicy;

impl PolicyKind for MacSecPolicy {
    type Params = MacSecPolicyParams;

    fn schema(&self) -> &'static PolicySchema {
        &SCHEMA
    }

    fn template_type(&self) -> TemplateType {
        TemplateType::FabricPolicy
    }

    fn collection(&self) -> PointerBuf {
        fabric_policy_collection("macsecPolicies")
    }

    fn key<'p>(&self, params: &'p MacSecPolicyParams) -> ObjectKey<'p> {
        ObjectKey {
            uuid: params.uuid.as_deref(),
            name: params.name.as_deref(),
        }
    }

    fn desired(
        &self,
        params: &MacSecPolicyParams,
        existing: Option<&Document>,
    ) -> Result<DesiredFieldSet> {
        let creating = existing.is_none();
        let interface_type = match params.interface_type {
            Some(t) => t.as_str(),
            None => existing
                .and_then(|doc| doc.get_str("type"))
                .unwrap_or(InterfaceType::Fabric.as_str()),
        };

        let mut desired = DesiredFieldSet::new();
        desired
            .set_opt(FieldPath::leaf("name"), params.name.clone())
            .set_opt(FieldPath::leaf("description"), params.description.clone())
            .set_opt(
                FieldPath::leaf("adminState"),
                params.admin_state.map(|s| s.as_str()),
            );
        if params.interface_type.is_some() || creating {
            desired.set(FieldPath::leaf("type"), interface_type);
        }

        desired
            .set_opt(
                FieldPath::nested("macsecParams", "cipherSuite"),
                params.cipher_suite.clone(),
            )
            .set_opt(
                FieldPath::nested("macsecParams", "windowSize"),
                params.window_size,
            )
            .set_opt(
                FieldPath::nested("macsecParams", "securityPol"),
                params.security_policy.clone(),
            )
            .set_opt(
                FieldPath::nested("macsecParams", "sakExpiryTime"),
                params.sak_expiry_time,
            );

        if interface_type == InterfaceType::Access.as_str() {
            let offset = match params.confidentiality_offset {
                None if creating => Some(0),
                offset => offset,
            };
            desired
                .set_opt(FieldPath::nested("macsecParams", "confOffSet"), offset)
                .set_opt(
                    FieldPath::nested("macsecParams", "keyServerPrio"),
                    params.key_server_priority,
                );
        } else if params.confidentiality_offset.is_some() || params.key_server_priority.is_some() {
            warn!(
                "confidentiality_offset and key_server_priority only apply to access policies; ignoring them"
            );
        }

        if let Some(keys) = &params.mac_sec_key {
            let keys = keys.iter().map(mac_sec_key).collect::<Result<Vec<_>>>()?;
            desired.set(FieldPath::leaf("macsecKeys"), Value::Array(keys));
        }
        Ok(desired)
    }

    fn seed(&self, _params: &MacSecPolicyParams, template: &Template) -> Document {
        let mut seed = Document::new();
        for field in ["templateId", "schemaId"] {
            if let Some(value) = template.get_str(field) {
                seed.set(&FieldPath::leaf(field), Value::from(value));
            }
        }
        seed
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse a key time; `keyword` is the accepted non-datetime value.
fn key_time(param: &str, value: &str, keyword: &str) -> Result<Option<NaiveDateTime>> {
    if value == keyword {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map(Some)
        .map_err(|_| {
            Error::validation(format!(
                "value of {} must be '{}' or a date time formatted as YYYY-MM-DD HH:MM:SS, got: {}",
                param, keyword, value
            ))
        })
}

/// Check one key and render it in wire form.
fn mac_sec_key(key: &MacSecKeyParams) -> Result<Value> {
    if !is_hex(&key.key_name) {
        return Err(Error::validation(format!(
            "key_name must only contain hex characters [0-9a-fA-F], got: {}",
            key.key_name
        )));
    }
    if key.psk.len() != PSK_LENGTH || !is_hex(&key.psk) {
        return Err(Error::validation(format!(
            "psk of key {} must be {} hex characters",
            key.key_name, PSK_LENGTH
        )));
    }
    let start = key.start_time.as_deref().unwrap_or("now");
    let end = key.end_time.as_deref().unwrap_or("infinite");
    if let (Some(start_at), Some(end_at)) = (
        key_time("start_time", start, "now")?,
        key_time("end_time", end, "infinite")?,
    ) {
        if end_at <= start_at {
            return Err(Error::validation(format!(
                "end_time of key {} must be after its start_time",
                key.key_name
            )));
        }
    }
    Ok(json!({
        "keyname": key.key_name,
        "psk": key.psk,
        "start": start,
        "end": end,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        framework::{parse_params, reconcile, Request, State},
        testing::MemoryController,
    };
    use ndo_core::{patch::PatchBuilder, Error as CoreError};
    use pretty_assertions::assert_eq;

    const PSK: &str = "AA111111111111111111111111111111111111111111111111111111111111aa";

    fn params(value: Value) -> MacSecPolicyParams {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> PointerBuf {
        PointerBuf::from_tokens(vec!["fabricPolicyTemplate", "template", "macsecPolicies", "0"])
    }

    fn controller(policies: Value) -> MemoryController {
        MemoryController::new().with_template(
            "t-1",
            json!({
                "templateId": "t-1",
                "schemaId": "s-1",
                "templateName": "fabric",
                "templateType": "fabricPolicy",
                "fabricPolicyTemplate": {"template": {"macsecPolicies": policies}}
            }),
        )
    }

    fn request(params: Value) -> Request<MacSecPolicyParams> {
        Request {
            template: "fabric".to_string(),
            state: State::Present,
            check_mode: false,
            params: parse_params("MACSec Policy", params.as_object().unwrap().clone()).unwrap(),
        }
    }

    #[test]
    fn test_aliases() {
        let p = params(json!({"mac_sec_policy": "p1", "mac_sec_policy_uuid": "u-1", "type": "access"}));
        assert_eq!(p.name.as_deref(), Some("p1"));
        assert_eq!(p.uuid.as_deref(), Some("u-1"));
        assert_eq!(p.interface_type, Some(InterfaceType::Access));
    }

    #[tokio::test]
    async fn test_create_seeds_template_ids() {
        let controller = controller(json!([]));
        let outcome = reconcile(
            &MacSecPolicy,
            &controller,
            &request(json!({
                "name": "p1",
                "admin_state": "enabled",
                "cipher_suite": "256_gcm_aes_xpn",
                "security_policy": "must_secure",
                "mac_sec_key": [{"key_name": "abc1", "psk": PSK}]
            })),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome.current,
            json!({
                "templateId": "t-1",
                "schemaId": "s-1",
                "name": "p1",
                "adminState": "enabled",
                "type": "fabric",
                "macsecParams": {"cipherSuite": "256GcmAesXpn", "securityPol": "mustSecure"},
                "macsecKeys": [{"keyname": "abc1", "psk": PSK, "start": "now", "end": "infinite"}]
            })
        );
    }

    #[tokio::test]
    async fn test_create_access_defaults_offset() {
        let controller = controller(json!([]));
        let outcome = reconcile(
            &MacSecPolicy,
            &controller,
            &request(json!({"name": "p1", "type": "access", "key_server_priority": 16})),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome.current["macsecParams"],
            json!({"confOffSet": "offset0", "keyServerPrio": 16})
        );
    }

    #[tokio::test]
    async fn test_translated_value_already_in_place() {
        let controller = controller(json!([{
            "name": "p1",
            "uuid": "u-1",
            "type": "fabric",
            "macsecParams": {"cipherSuite": "256GcmAesXpn", "windowSize": 64}
        }]));
        let outcome = reconcile(
            &MacSecPolicy,
            &controller,
            &request(json!({"name": "p1", "cipher_suite": "256_gcm_aes_xpn", "window_size": 64})),
        )
        .await
        .unwrap();
        assert!(!outcome.changed);
        assert_eq!(controller.patch_count(), 0);
    }

    #[test]
    fn test_access_fields_follow_existing_type() {
        let existing = Document::from_value(json!({
            "name": "p1",
            "type": "access",
            "macsecParams": {"confOffSet": "offset0", "keyServerPrio": 1}
        }))
        .unwrap();
        let desired = MacSecPolicy
            .desired(
                &params(json!({"name": "p1", "confidentiality_offset": 30, "key_server_priority": 2})),
                Some(&existing),
            )
            .unwrap();
        let plan = PatchBuilder::new(&SCHEMA)
            .update(&existing, &desired, &base())
            .unwrap();
        assert_eq!(
            serde_json::to_value(&plan.ops).unwrap(),
            json!([
                {
                    "op": "replace",
                    "path": "/fabricPolicyTemplate/template/macsecPolicies/0/macsecParams/confOffSet",
                    "value": "offset30"
                },
                {
                    "op": "replace",
                    "path": "/fabricPolicyTemplate/template/macsecPolicies/0/macsecParams/keyServerPrio",
                    "value": 2
                }
            ])
        );
    }

    #[test]
    fn test_access_fields_ignored_for_fabric() {
        let desired = MacSecPolicy
            .desired(&params(json!({"name": "p1", "key_server_priority": 2})), None)
            .unwrap();
        assert_eq!(
            desired.get(&FieldPath::nested("macsecParams", "keyServerPrio")),
            &ndo_core::desired::Desired::Unset
        );
    }

    #[test]
    fn test_sak_expiry_time_bounds() {
        let existing = Document::from_value(json!({"name": "p1"})).unwrap();
        let desired = MacSecPolicy
            .desired(&params(json!({"name": "p1", "sak_expiry_time": 59})), Some(&existing))
            .unwrap();
        let err = PatchBuilder::new(&SCHEMA)
            .update(&existing, &desired, &base())
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(
                "value of sak_expiry_time must be 0 or between 60 and 2592000, got: 59".to_string()
            )
        );
    }

    #[test]
    fn test_key_validation() {
        let key = |name: &str, psk: &str, start: Option<&str>, end: Option<&str>| MacSecKeyParams {
            key_name: name.to_string(),
            psk: psk.to_string(),
            start_time: start.map(str::to_string),
            end_time: end.map(str::to_string),
        };
        assert!(mac_sec_key(&key("xyz", PSK, None, None)).is_err());
        assert!(mac_sec_key(&key("ab", "abcd", None, None)).is_err());
        assert!(mac_sec_key(&key("ab", PSK, Some("tomorrow"), None)).is_err());
        assert!(mac_sec_key(&key(
            "ab",
            PSK,
            Some("2026-01-02 00:00:00"),
            Some("2026-01-01 00:00:00")
        ))
        .is_err());
        assert_eq!(
            mac_sec_key(&key("ab", PSK, Some("2026-01-01 00:00:00"), None)).unwrap(),
            json!({"keyname": "ab", "psk": PSK, "start": "2026-01-01 00:00:00", "end": "infinite"})
        );
    }
}
