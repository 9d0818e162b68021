//! Per-client audit trail of mutating and custom calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Payloads of every create/update/delete/custom call a client attempted,
/// including calls suppressed by dry-run mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub create: Vec<Value>,
    pub update: Vec<Value>,
    /// Ids of deleted resources.
    pub delete: Vec<String>,
    pub custom: Vec<Option<Value>>,
}

impl ExecutionLog {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty() && self.custom.is_empty()
    }

    /// Total number of recorded calls.
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len() + self.custom.len()
    }

    /// Start a fresh log and return the previous one serialized as JSON.
    pub fn reset(&mut self) -> Result<String> {
        let previous = std::mem::take(self);
        Ok(serde_json::to_string(&previous)?)
    }
}
