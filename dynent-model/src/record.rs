use crate::schema::{FieldDescriptor, FieldKind};
use crate::value::Value;
use dynent_types::{EntityId, InstanceId};
use serde::{Deserialize, Serialize};

/// One field of a generic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
    #[serde(default)]
    pub value: Value,
    /// Set on fields the caller must not change. Updates skip them.
    #[serde(default)]
    pub non_editable: bool,
}

impl FieldRecord {
    pub fn new(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            display_name: name.into(),
            kind: None,
            value: value.into(),
            non_editable: false,
        }
    }

    /// A record field shaped after its descriptor.
    pub fn from_descriptor(field: &FieldDescriptor, value: Value) -> Self {
        Self {
            name: field.name.clone(),
            display_name: field.display_name.clone(),
            kind: Some(field.kind.clone()),
            value,
            non_editable: !field.editable,
        }
    }

    pub fn non_editable(mut self) -> Self {
        self.non_editable = true;
        self
    }
}

/// The generic, type-erased form of an entity instance: a flat list of
/// field name/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InstanceId>,
    pub entity_id: EntityId,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
}

impl EntityRecord {
    pub fn new(entity_id: EntityId, fields: Vec<FieldRecord>) -> Self {
        Self {
            id: None,
            entity_id,
            fields,
        }
    }

    pub fn with_id(mut self, id: InstanceId) -> Self {
        self.id = Some(id);
        self
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Value of the named field, if present.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }

    /// Field values in record order.
    pub fn values(&self) -> Vec<&Value> {
        self.fields.iter().map(|f| &f.value).collect()
    }
}
