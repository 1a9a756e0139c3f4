//! The message passed between review stages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utilities::errors::PipelineError;

/// Keys owned by the pipeline; never accepted as extras.
pub const RESERVED_KEYS: [&str; 5] = ["role", "content", "critic", "factcheck", "validation"];

/// One optional string field as it appeared on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Absent,
    Null,
    Text(String),
}

impl Slot {
    fn take(map: &mut Map<String, Value>, key: &str) -> Result<Self, String> {
        match map.remove(key) {
            None => Ok(Slot::Absent),
            Some(Value::Null) => Ok(Slot::Null),
            Some(Value::String(text)) => Ok(Slot::Text(text)),
            Some(other) => Err(format!("'{}' must be a string or null, got {}", key, other)),
        }
    }

    fn as_deref(&self) -> Option<&str> {
        match self {
            Slot::Text(text) => Some(text),
            Slot::Absent | Slot::Null => None,
        }
    }

    fn put(self, map: &mut Map<String, Value>, key: &str) {
        match self {
            Slot::Absent => {}
            Slot::Null => {
                map.insert(key.to_string(), Value::Null);
            }
            Slot::Text(text) => {
                map.insert(key.to_string(), Value::String(text));
            }
        }
    }
}

/// A draft travelling through the review pipeline.
///
/// Stages only ever add verdicts; the setters take a value, so a verdict
/// cannot be cleared once present. Keys the pipeline does not know about are
/// kept as extras and written back unchanged, as is an explicit `null`
/// on any of the optional fields. Extras can never shadow a reserved key,
/// so every key appears at most once on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PipelineMessage {
    role: Slot,
    pub content: String,
    critic: Slot,
    factcheck: Slot,
    validation: Slot,
    extra: BTreeMap<String, Value>,
}

impl PipelineMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Slot::Text(role.into()),
            content: content.into(),
            critic: Slot::Absent,
            factcheck: Slot::Absent,
            validation: Slot::Absent,
            extra: BTreeMap::new(),
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// `None` when absent or explicitly `null`.
    pub fn critic(&self) -> Option<&str> {
        self.critic.as_deref()
    }

    pub fn factcheck(&self) -> Option<&str> {
        self.factcheck.as_deref()
    }

    pub fn validation(&self) -> Option<&str> {
        self.validation.as_deref()
    }

    pub fn set_critic(&mut self, verdict: impl Into<String>) {
        self.critic = Slot::Text(verdict.into());
    }

    pub fn set_factcheck(&mut self, verdict: impl Into<String>) {
        self.factcheck = Slot::Text(verdict.into());
    }

    pub fn set_validation(&mut self, verdict: impl Into<String>) {
        self.validation = Slot::Text(verdict.into());
    }

    /// Keys outside the pipeline's own fields.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn get_extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Attach an extra key, returning the previous value.
    ///
    /// Fails with [`PipelineError::ReservedKey`] for any of [`RESERVED_KEYS`].
    pub fn insert_extra(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, PipelineError> {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(PipelineError::ReservedKey { key });
        }
        Ok(self.extra.insert(key, value))
    }

    /// Decode the JSON wire form on behalf of `stage`.
    pub fn from_wire(stage: &str, message_json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(message_json).map_err(|source| PipelineError::Decode {
            stage: stage.to_string(),
            source,
        })
    }

    /// Encode to the JSON wire form on behalf of `stage`.
    pub fn to_wire(&self, stage: &str) -> Result<String, PipelineError> {
        serde_json::to_string(self).map_err(|source| PipelineError::Encode {
            stage: stage.to_string(),
            source,
        })
    }
}

impl TryFrom<Map<String, Value>> for PipelineMessage {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let content = match map.remove("content") {
            Some(Value::String(content)) => content,
            Some(other) => return Err(format!("'content' must be a string, got {}", other)),
            None => return Err("missing field `content`".to_string()),
        };
        Ok(Self {
            role: Slot::take(&mut map, "role")?,
            content,
            critic: Slot::take(&mut map, "critic")?,
            factcheck: Slot::take(&mut map, "factcheck")?,
            validation: Slot::take(&mut map, "validation")?,
            extra: map.into_iter().collect(),
        })
    }
}

impl From<PipelineMessage> for Map<String, Value> {
    fn from(message: PipelineMessage) -> Self {
        let mut map: Map<String, Value> = message.extra.into_iter().collect();
        message.role.put(&mut map, "role");
        map.insert("content".to_string(), Value::String(message.content));
        message.critic.put(&mut map, "critic");
        message.factcheck.put(&mut map, "factcheck");
        message.validation.put(&mut map, "validation");
        map
    }
}
