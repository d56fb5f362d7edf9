//! Typed instances and the accessor tables that describe them.
//!
//! An [`InstanceLayout`] is built once per type and maps normalized
//! (lowercase) member names to slot indexes. A [`TypedInstance`] is one
//! object of that type: an optional id plus one [`Slot`] per member.

use crate::schema::{FieldKind, ScalarKind, TypeDescriptor};
use crate::value::Value;
use dynent_types::InstanceId;
use std::collections::HashMap;
use std::sync::Arc;

/// Shape of one member slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Scalar(ScalarKind),
    One { target: String },
    Many { target: String },
}

impl From<&FieldKind> for MemberKind {
    fn from(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Scalar(scalar) => Self::Scalar(*scalar),
            FieldKind::OneToOne { target } => Self::One {
                target: target.clone(),
            },
            FieldKind::OneToMany { target } => Self::Many {
                target: target.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    /// Scalar value a fresh instance starts with.
    pub initial: Value,
}

/// Marks a layout as a historical snapshot of `history_of`. The `member`
/// slot holds the id of the current version in the base type's service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLink {
    pub history_of: String,
    pub member: String,
}

/// Schema-driven accessor table for one instance type.
#[derive(Debug)]
pub struct InstanceLayout {
    type_name: String,
    members: Vec<Member>,
    index: HashMap<String, usize>,
    version: Option<VersionLink>,
}

impl InstanceLayout {
    pub fn builder(type_name: &str) -> LayoutBuilder {
        LayoutBuilder {
            type_name: type_name.into(),
            members: Vec::new(),
            version: None,
        }
    }

    /// A layout with one member per field, initialised from field defaults.
    pub fn from_descriptor(descriptor: &TypeDescriptor) -> Arc<Self> {
        let mut builder = Self::builder(&descriptor.type_name);
        for field in &descriptor.fields {
            builder = builder.member(
                &field.name,
                MemberKind::from(&field.kind),
                field.default.clone().unwrap_or_default(),
            );
        }
        builder.build()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn version(&self) -> Option<&VersionLink> {
        self.version.as_ref()
    }

    /// Slot index of the named member, matched case-insensitively.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.index_of(name).map(|i| &self.members[i])
    }

    /// A fresh, unsaved instance with every slot at its initial value.
    pub fn instantiate(self: &Arc<Self>) -> TypedInstance {
        let slots = self
            .members
            .iter()
            .map(|m| match m.kind {
                MemberKind::Scalar(_) => Slot::Scalar(m.initial.clone()),
                MemberKind::One { .. } => Slot::One(None),
                MemberKind::Many { .. } => Slot::Many(Vec::new()),
            })
            .collect();
        TypedInstance {
            layout: Arc::clone(self),
            id: None,
            slots,
        }
    }
}

pub struct LayoutBuilder {
    type_name: String,
    members: Vec<Member>,
    version: Option<VersionLink>,
}

impl LayoutBuilder {
    pub fn member(mut self, name: &str, kind: MemberKind, initial: Value) -> Self {
        self.members.push(Member {
            name: name.into(),
            kind,
            initial,
        });
        self
    }

    pub fn scalar(self, name: &str, kind: ScalarKind) -> Self {
        self.member(name, MemberKind::Scalar(kind), Value::Null)
    }

    pub fn scalar_with(self, name: &str, kind: ScalarKind, initial: impl Into<Value>) -> Self {
        self.member(name, MemberKind::Scalar(kind), initial.into())
    }

    pub fn one(self, name: &str, target: &str) -> Self {
        self.member(
            name,
            MemberKind::One {
                target: target.into(),
            },
            Value::Null,
        )
    }

    pub fn many(self, name: &str, target: &str) -> Self {
        self.member(
            name,
            MemberKind::Many {
                target: target.into(),
            },
            Value::Null,
        )
    }

    /// Declares this type a history of `base`, adding a long member that
    /// carries the current version's id.
    pub fn history_of(mut self, base: &str, member: &str) -> Self {
        self.version = Some(VersionLink {
            history_of: base.into(),
            member: member.into(),
        });
        self.scalar(member, ScalarKind::Long)
    }

    pub fn build(self) -> Arc<InstanceLayout> {
        // Later members win on a case-insensitive clash.
        let index = self
            .members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.to_ascii_lowercase(), i))
            .collect();
        Arc::new(InstanceLayout {
            type_name: self.type_name,
            members: self.members,
            index,
            version: self.version,
        })
    }
}

/// Contents of one member slot.
#[derive(Debug, Clone)]
pub enum Slot {
    Scalar(Value),
    One(Option<Arc<TypedInstance>>),
    Many(Vec<Arc<TypedInstance>>),
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::One(a), Self::One(b)) => match (a, b) {
                (Some(a), Some(b)) => a.same_object(b),
                (None, None) => true,
                _ => false,
            },
            (Self::Many(a), Self::Many(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_object(y))
            }
            _ => false,
        }
    }
}

/// A live object of a runtime-defined type.
#[derive(Debug, Clone)]
pub struct TypedInstance {
    layout: Arc<InstanceLayout>,
    id: Option<InstanceId>,
    slots: Vec<Slot>,
}

impl PartialEq for TypedInstance {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.id == other.id && self.slots == other.slots
    }
}

impl TypedInstance {
    pub fn layout(&self) -> &Arc<InstanceLayout> {
        &self.layout
    }

    pub fn type_name(&self) -> &str {
        self.layout.type_name()
    }

    pub fn id(&self) -> Option<InstanceId> {
        self.id
    }

    pub fn set_id(&mut self, id: Option<InstanceId>) {
        self.id = id;
    }

    pub fn with_id(mut self, id: InstanceId) -> Self {
        self.id = Some(id);
        self
    }

    /// Same type and same persisted id. Unsaved instances never match.
    pub fn same_object(&self, other: &TypedInstance) -> bool {
        self.id.is_some() && self.id == other.id && self.type_name() == other.type_name()
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.layout.index_of(name).map(|i| &self.slots[i])
    }

    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
        let index = self.layout.index_of(name)?;
        self.slots.get_mut(index)
    }

    /// Scalar value of the named member, `None` when absent or not scalar.
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        match self.slot(name)? {
            Slot::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn one(&self, name: &str) -> Option<&Arc<TypedInstance>> {
        match self.slot(name)? {
            Slot::One(related) => related.as_ref(),
            _ => None,
        }
    }

    pub fn many(&self, name: &str) -> Option<&[Arc<TypedInstance>]> {
        match self.slot(name)? {
            Slot::Many(related) => Some(related),
            _ => None,
        }
    }

    /// Replaces the named slot. Returns `false` when the member does not
    /// exist or has a different shape.
    pub fn set(&mut self, name: &str, slot: Slot) -> bool {
        let Some(current) = self.slot_mut(name) else {
            return false;
        };
        if std::mem::discriminant(current) != std::mem::discriminant(&slot) {
            return false;
        }
        *current = slot;
        true
    }

    pub fn set_scalar(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.set(name, Slot::Scalar(value.into()))
    }

    /// Base type this instance is a historical snapshot of.
    pub fn history_of(&self) -> Option<&str> {
        self.layout.version().map(|v| v.history_of.as_str())
    }

    /// Id of the current version, for historical snapshots.
    pub fn current_version_id(&self) -> Option<InstanceId> {
        let link = self.layout.version()?;
        self.scalar(&link.member)?.as_instance_id()
    }
}
