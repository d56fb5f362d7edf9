//! Generic, type-erased field values.
//!
//! Every value that crosses the instance-service boundary is a [`Value`].
//! Scalars are coerced to a field's declared [`ScalarKind`] on the way in;
//! relationships travel as id-bearing maps, lists of them, or (when a
//! snapshot is restored from the trash) as already-resolved instances.

use crate::error::CoercionError;
use crate::instance::TypedInstance;
use crate::schema::ScalarKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dynent_types::InstanceId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key under which relationship maps carry the related instance id.
pub const ID_KEY: &str = "id";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A generic field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Map(BTreeMap<String, Value>),
    List(Vec<Value>),
    /// An already-resolved related object. Only produced in-process.
    #[serde(skip)]
    Instance(Arc<TypedInstance>),
}

impl Value {
    /// A relationship reference: `{ "id": <id> }`.
    pub fn reference(id: InstanceId) -> Self {
        let mut map = BTreeMap::new();
        map.insert(ID_KEY.to_string(), Self::id(id));
        Self::Map(map)
    }

    /// An instance id as a scalar. Ids beyond `i64::MAX` travel as their
    /// decimal string, which [`Value::as_instance_id`] reads back.
    pub fn id(id: InstanceId) -> Self {
        i64::try_from(id.get())
            .map(Self::Integer)
            .unwrap_or_else(|_| Self::String(id.to_string()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::DateTime(_) => "datetime",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::Instance(_) => "instance",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Interprets this value as an instance id: a non-negative integer, an
    /// integral double, a numeric string, or a map carrying an `id` key.
    pub fn as_instance_id(&self) -> Option<InstanceId> {
        match self {
            Self::Integer(n) => u64::try_from(*n).ok().map(InstanceId::new),
            Self::Double(f) if f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64 => {
                Some(InstanceId::new(*f as u64))
            }
            Self::String(s) => s.trim().parse().ok(),
            Self::Map(map) => map
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(ID_KEY))
                .and_then(|(_, v)| v.as_instance_id()),
            Self::Instance(instance) => instance.id(),
            _ => None,
        }
    }

    /// Converts this value to the representation of `kind`.
    ///
    /// `Null` stays `Null` for every kind. An empty string is treated as
    /// `Null` for every kind except `String`.
    pub fn coerce(&self, kind: ScalarKind) -> Result<Value, CoercionError> {
        if self.is_null() {
            return Ok(Self::Null);
        }
        if kind != ScalarKind::String && matches!(self, Self::String(s) if s.trim().is_empty()) {
            return Ok(Self::Null);
        }

        let fail = || CoercionError::new(kind, self.kind_name(), self.raw());

        match kind {
            ScalarKind::String => match self {
                Self::String(s) => Ok(Self::String(s.clone())),
                Self::Boolean(_)
                | Self::Integer(_)
                | Self::Double(_)
                | Self::DateTime(_)
                | Self::Date(_)
                | Self::Time(_) => Ok(Self::String(self.raw())),
                _ => Err(fail()),
            },
            ScalarKind::Integer => {
                let n = self.integral().ok_or_else(fail)?;
                i32::try_from(n).map_err(|_| fail())?;
                Ok(Self::Integer(n))
            }
            ScalarKind::Long => self.integral().map(Self::Integer).ok_or_else(fail),
            ScalarKind::Double => match self {
                Self::Integer(n) => Ok(Self::Double(*n as f64)),
                Self::Double(f) => Ok(Self::Double(*f)),
                Self::String(s) => s.trim().parse().map(Self::Double).map_err(|_| fail()),
                _ => Err(fail()),
            },
            ScalarKind::Boolean => match self {
                Self::Boolean(b) => Ok(Self::Boolean(*b)),
                Self::Integer(0) => Ok(Self::Boolean(false)),
                Self::Integer(1) => Ok(Self::Boolean(true)),
                Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(Self::Boolean(true)),
                    "false" => Ok(Self::Boolean(false)),
                    _ => Err(fail()),
                },
                _ => Err(fail()),
            },
            ScalarKind::DateTime => match self {
                Self::DateTime(dt) => Ok(Self::DateTime(*dt)),
                Self::Date(d) => d
                    .and_hms_opt(0, 0, 0)
                    .map(|n| Self::DateTime(n.and_utc()))
                    .ok_or_else(fail),
                Self::Integer(millis) => DateTime::from_timestamp_millis(*millis)
                    .map(Self::DateTime)
                    .ok_or_else(fail),
                Self::String(s) => parse_datetime(s.trim()).map(Self::DateTime).ok_or_else(fail),
                _ => Err(fail()),
            },
            ScalarKind::Date => match self {
                Self::Date(d) => Ok(Self::Date(*d)),
                Self::DateTime(dt) => Ok(Self::Date(dt.date_naive())),
                Self::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                    .map(Self::Date)
                    .or_else(|_| parse_datetime(s.trim()).map(|dt| Self::Date(dt.date_naive())).ok_or(()))
                    .map_err(|_| fail()),
                _ => Err(fail()),
            },
            ScalarKind::Time => match self {
                Self::Time(t) => Ok(Self::Time(*t)),
                Self::DateTime(dt) => Ok(Self::Time(dt.time())),
                Self::String(s) => TIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveTime::parse_from_str(s.trim(), fmt).ok())
                    .map(Self::Time)
                    .ok_or_else(fail),
                _ => Err(fail()),
            },
        }
    }

    fn integral(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            // `i64::MAX as f64` rounds up to 2^63, which is out of range.
            Self::Double(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Some(*f as i64)
            }
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Human-readable rendering used for string coercion and diagnostics.
    fn raw(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Double(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::DateTime(dt) => dt.to_rfc3339(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::Time(t) => t.format("%H:%M").to_string(),
            Self::Map(map) => format!("{{{} keys}}", map.len()),
            Self::List(items) => format!("[{} items]", items.len()),
            Self::Instance(instance) => format!("{}#{:?}", instance.type_name(), instance.id()),
        }
    }

    /// Total order used when sorting result sets in memory.
    ///
    /// `Null` sorts first; integers and doubles compare numerically; values
    /// of unrelated kinds order by kind.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Integer(a), Self::Double(b)) => (*a as f64).total_cmp(b),
            (Self::Double(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Instance(a), Self::Instance(b)) => a.id().cmp(&b.id()),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Double(_) => 2,
            Self::String(_) => 3,
            Self::DateTime(_) => 4,
            Self::Date(_) => 5,
            Self::Time(_) => 6,
            Self::Map(_) => 7,
            Self::List(_) => 8,
            Self::Instance(_) => 9,
        }
    }

    /// Builds a generic value from JSON. Strings stay strings; dates are
    /// recognised later, during coercion to a declared kind.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Double).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }

    /// Renders this value as JSON. Resolved instances are rendered as
    /// `{ "id": … }` references so object graphs never nest.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Integer(n) => serde_json::Value::from(*n),
            Self::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(_) | Self::DateTime(_) | Self::Date(_) | Self::Time(_) => {
                serde_json::Value::String(self.raw())
            }
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Instance(instance) => match instance.id() {
                Some(id) => Self::reference(id).to_json(),
                None => serde_json::Value::Null,
            },
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Double(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Self::Time(t)
    }
}

impl From<Arc<TypedInstance>> for Value {
    fn from(instance: Arc<TypedInstance>) -> Self {
        Self::Instance(instance)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Self::Null)
    }
}
