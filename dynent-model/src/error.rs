//! Error types for the model layer.

use crate::schema::ScalarKind;
use thiserror::Error;

/// A generic value could not be converted to a field's declared kind.
///
/// Carries no field name: the mapper attaches entity and field context
/// when it surfaces the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} value {raw} to {expected}")]
pub struct CoercionError {
    pub expected: ScalarKind,
    pub found: &'static str,
    pub raw: String,
}

impl CoercionError {
    pub fn new(expected: ScalarKind, found: &'static str, raw: impl Into<String>) -> Self {
        Self {
            expected,
            found,
            raw: raw.into(),
        }
    }
}
