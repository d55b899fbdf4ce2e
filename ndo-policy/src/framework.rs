use std::fmt;

use json_patch::{jsonptr::PointerBuf, Patch};
use ndo_core::{
    desired::DesiredFieldSet,
    document::Document,
    locate::{locate, Lookup, LookupKey, Match},
    patch::{object_pointer, PatchBuilder, PatchPlan},
    schema::PolicySchema,
    Error as CoreError,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, info_span, Instrument as _};

use crate::{
    template::{Template, TemplateClient, TemplateType},
    transport::{Method, Transport},
    Error, Result,
};

/// The identifying parameters of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectKey<'p> {
    pub uuid: Option<&'p str>,
    pub name: Option<&'p str>,
}

impl<'p> ObjectKey<'p> {
    pub fn lookup(&self) -> LookupKey<'p> {
        LookupKey::from_parts(self.uuid, self.name)
    }

    pub fn is_empty(&self) -> bool {
        self.uuid.is_none() && self.name.is_none()
    }
}

/// A kind of policy object living in a template collection.
pub trait PolicyKind {
    type Params: DeserializeOwned + Send + Sync;

    fn schema(&self) -> &'static PolicySchema;
    fn template_type(&self) -> TemplateType;
    /// Pointer to the collection holding the objects inside the template.
    fn collection(&self) -> PointerBuf;
    fn key<'p>(&self, params: &'p Self::Params) -> ObjectKey<'p>;

    /// The desired state described by `params`. `existing` is the object
    /// being updated, or `None` on creation.
    fn desired(&self, params: &Self::Params, existing: Option<&Document>)
        -> Result<DesiredFieldSet>;

    /// Fields only set when the object is created.
    fn seed(&self, _params: &Self::Params, _template: &Template) -> Document {
        Document::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Create or update.
    Present,
    /// Delete.
    Absent,
    /// Read only.
    Query,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Present => write!(f, "present"),
            State::Absent => write!(f, "absent"),
            State::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request<P> {
    pub template: String,
    pub state: State,
    /// Compute and report the would-be state without writing.
    pub check_mode: bool,
    pub params: P,
}

/// What happened, in the shape reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub changed: bool,
    pub previous: Value,
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed: Option<Value>,
    /// The operations that were (or in check mode, would have been) sent.
    pub sent: Patch,
}

/// Deserialize the gathered input parameters of a policy kind.
pub fn parse_params<P: DeserializeOwned>(description: &str, inputs: Map<String, Value>) -> Result<P> {
    serde_json::from_value(Value::Object(inputs)).map_err(|source| Error::Json {
        context: format!("input parameters for {}", description),
        source,
    })
}

/// Converge one object of kind `K` according to `request`.
pub async fn reconcile<K, T>(kind: &K, transport: &T, request: &Request<K::Params>) -> Result<Outcome>
where
    K: PolicyKind,
    T: Transport + ?Sized,
{
    let schema = kind.schema();
    let span = info_span!(
        "reconcile",
        kind = schema.kind,
        template = %request.template,
        state = %request.state,
        check_mode = request.check_mode
    );
    reconcile_in_span(kind, transport, request).instrument(span).await
}

async fn reconcile_in_span<K, T>(
    kind: &K,
    transport: &T,
    request: &Request<K::Params>,
) -> Result<Outcome>
where
    K: PolicyKind,
    T: Transport + ?Sized,
{
    let schema = kind.schema();
    let key = kind.key(&request.params);
    if request.state != State::Query && key.is_empty() {
        return Err(Error::validation(format!(
            "state is {} but all of the following are missing: name, uuid",
            request.state
        )));
    }

    let mut template = TemplateClient::new(transport)
        .fetch(kind.template_type(), &request.template)
        .await?;
    let collection = kind.collection();
    let lookup = locate(
        schema.description,
        template.collection(&collection),
        key.lookup(),
    )?;
    let previous = match &lookup {
        Lookup::Found(m) => m.details.clone().into_value(),
        Lookup::All(items) => Value::Array(items.clone()),
        Lookup::Absent => json!({}),
    };

    let plan = match request.state {
        State::Query => {
            return Ok(Outcome {
                changed: false,
                current: previous.clone(),
                previous,
                proposed: None,
                sent: Patch(Vec::new()),
            })
        }
        State::Present => plan_present(kind, request, &template, &collection, lookup.found())?,
        State::Absent => match lookup.found() {
            Some(m) => PatchBuilder::new(schema).remove(&object_pointer(&collection, m.index)),
            None => PatchPlan::empty(Document::new()),
        },
    };

    let proposed = match request.state {
        State::Present => plan.document.clone().into_value(),
        _ => json!({}),
    };

    if plan.is_empty() {
        info!("{} already in the desired state", schema.description);
        return Ok(Outcome {
            changed: false,
            current: proposed.clone(),
            previous,
            proposed: Some(proposed),
            sent: plan.ops,
        });
    }

    let current = if request.check_mode {
        info!(operations = plan.len(), "check mode: not sending the patch");
        proposed.clone()
    } else {
        info!(operations = plan.len(), path = %template.path(), "sending patch");
        let data = serde_json::to_value(&plan.ops).map_err(|source| Error::Json {
            context: "patch operations".to_string(),
            source,
        })?;
        template.document = transport
            .request(&template.path(), Method::Patch, Some(&data))
            .await?;
        match request.state {
            State::Present => match locate(
                schema.description,
                template.collection(&collection),
                refetch_key(&key, &plan.document),
            )? {
                Lookup::Found(m) => m.details.into_value(),
                _ => json!({}),
            },
            _ => json!({}),
        }
    };

    Ok(Outcome {
        changed: true,
        previous,
        current,
        proposed: Some(proposed),
        sent: plan.ops,
    })
}

fn plan_present<K: PolicyKind>(
    kind: &K,
    request: &Request<K::Params>,
    template: &Template,
    collection: &PointerBuf,
    found: Option<&Match>,
) -> Result<PatchPlan> {
    let schema = kind.schema();
    let builder = PatchBuilder::new(schema);
    let key = kind.key(&request.params);
    match found {
        Some(m) => {
            let desired = kind.desired(&request.params, Some(&m.details))?;
            Ok(builder.update(&m.details, &desired, &object_pointer(collection, m.index))?)
        }
        None => {
            if let Some(uuid) = key.uuid {
                return Err(CoreError::NotFound {
                    description: schema.description.to_string(),
                    key: LookupKey::Uuid(uuid).to_string(),
                }
                .into());
            }
            let desired = kind.desired(&request.params, None)?;
            let seed = kind.seed(&request.params, template);
            Ok(builder.create(seed, &desired, collection)?)
        }
    }
}

/// Key for finding the object again in the patched template. A rename by
/// uuid is still found by uuid; otherwise the planned name is used.
fn refetch_key<'a>(key: &ObjectKey<'a>, planned: &'a Document) -> LookupKey<'a> {
    match (key.uuid, planned.name()) {
        (Some(uuid), _) => LookupKey::Uuid(uuid),
        (None, Some(name)) => LookupKey::Name(name),
        (None, None) => key.lookup(),
    }
}
