use crate::value::Value;
use dynent_types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Describes a runtime-defined entity type: its fields, lookups and
/// access rules. Read-only to the instance engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub id: EntityId,
    pub name: String,
    /// Fully-qualified type name the storage services are keyed by.
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub lookups: Vec<LookupDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_mode: Option<SecurityMode>,
    #[serde(default)]
    pub security_members: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_security_mode: Option<SecurityMode>,
    #[serde(default)]
    pub read_only_security_members: BTreeSet<String>,
    #[serde(default = "default_true")]
    pub editable: bool,
    #[serde(default)]
    pub provenance: Provenance,
}

impl TypeDescriptor {
    /// A dynamic, editable, unrestricted entity with no fields.
    pub fn new(id: EntityId, name: &str, type_name: &str) -> Self {
        Self {
            id,
            name: name.into(),
            type_name: type_name.into(),
            fields: Vec::new(),
            lookups: Vec::new(),
            security_mode: None,
            security_members: BTreeSet::new(),
            read_only_security_mode: None,
            read_only_security_members: BTreeSet::new(),
            editable: true,
            provenance: Provenance::Dynamic,
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_lookup(mut self, lookup: LookupDefinition) -> Self {
        self.lookups.push(lookup);
        self
    }

    pub fn with_security(mut self, mode: SecurityMode, members: &[&str]) -> Self {
        self.security_mode = Some(mode);
        self.security_members = members.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_read_only_security(mut self, mode: SecurityMode, members: &[&str]) -> Self {
        self.read_only_security_mode = Some(mode);
        self.read_only_security_members = members.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn non_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn declared_in(mut self, bundle: &str) -> Self {
        self.provenance = Provenance::Declared {
            bundle: bundle.into(),
        };
        self
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.matches(name))
    }

    /// Case-insensitive lookup by display name or method name.
    pub fn lookup(&self, name: &str) -> Option<&LookupDefinition> {
        self.lookups
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name) || l.method_name.eq_ignore_ascii_case(name))
    }

    /// Short entity name derived from the type name (`org.x.Book` → `Book`).
    pub fn simple_name(&self) -> &str {
        self.type_name.rsplit('.').next().unwrap_or(&self.type_name)
    }
}

fn default_true() -> bool {
    true
}

/// Where an entity type's instance layout comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Created through the design-time editor; lives in the dynamic bundle.
    #[default]
    Dynamic,
    /// Defined by deployed code in the named bundle.
    Declared { bundle: String },
}

impl Provenance {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

/// One field of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub display_name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default = "default_true")]
    pub editable: bool,
}

impl FieldDescriptor {
    fn simple(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            display_name: name.into(),
            kind,
            default: None,
            editable: true,
        }
    }

    /// Shorthand for a scalar field of the given kind.
    pub fn scalar(name: &str, kind: ScalarKind) -> Self {
        Self::simple(name, FieldKind::Scalar(kind))
    }

    pub fn string(name: &str) -> Self {
        Self::scalar(name, ScalarKind::String)
    }

    pub fn integer(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Integer)
    }

    pub fn long(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Long)
    }

    pub fn double(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Double)
    }

    pub fn boolean(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Boolean)
    }

    pub fn datetime(name: &str) -> Self {
        Self::scalar(name, ScalarKind::DateTime)
    }

    pub fn date(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Date)
    }

    pub fn time(name: &str) -> Self {
        Self::scalar(name, ScalarKind::Time)
    }

    /// Shorthand for a one-to-one relationship to `target`.
    pub fn one_to_one(name: &str, target: &str) -> Self {
        Self::simple(
            name,
            FieldKind::OneToOne {
                target: target.into(),
            },
        )
    }

    /// Shorthand for a one-to-many relationship to `target`.
    pub fn one_to_many(name: &str, target: &str) -> Self {
        Self::simple(
            name,
            FieldKind::OneToMany {
                target: target.into(),
            },
        )
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn non_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Field names compare case-insensitively.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_relationship(&self) -> bool {
        self.kind.is_relationship()
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar(ScalarKind),
    OneToOne { target: String },
    OneToMany { target: String },
}

impl FieldKind {
    pub fn scalar(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Target type name of a relationship field.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::OneToOne { target } | Self::OneToMany { target } => Some(target),
            Self::Scalar(_) => None,
        }
    }

    pub fn is_relationship(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

/// The scalar types a field value is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    DateTime,
    Date,
    Time,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
        };
        f.write_str(name)
    }
}

/// A named query exposed by an entity's storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupDefinition {
    /// Display name, e.g. "Single Object".
    pub name: String,
    /// Storage method name, e.g. `singleObject`.
    pub method_name: String,
    /// Parameter field names, in call order.
    #[serde(default)]
    pub field_names: Vec<String>,
    #[serde(default)]
    pub single_result: bool,
    #[serde(default)]
    pub null_expected: bool,
    #[serde(default = "default_true")]
    pub exposed: bool,
}

impl LookupDefinition {
    pub fn new(name: &str, method_name: &str, field_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            method_name: method_name.into(),
            field_names: field_names.iter().map(|f| f.to_string()).collect(),
            single_result: false,
            null_expected: false,
            exposed: true,
        }
    }

    pub fn single(mut self) -> Self {
        self.single_result = true;
        self
    }

    pub fn null_expected(mut self) -> Self {
        self.null_expected = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.exposed = false;
        self
    }

    /// `count` followed by the capitalized method name.
    pub fn count_method_name(&self) -> String {
        let mut chars = self.method_name.chars();
        match chars.next() {
            Some(first) => format!("count{}{}", first.to_uppercase(), chars.as_str()),
            None => "count".to_string(),
        }
    }
}

/// Access rule attached to an entity for reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    Everyone,
    Owner,
    Creator,
    Users,
    Permissions,
    NoAccess,
}
