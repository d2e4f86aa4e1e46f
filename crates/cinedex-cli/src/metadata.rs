use std::fmt::{Display, Formatter};

use cinedex_core::EngineKind;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Request identifier (UUID v4) attached to every response and log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Response metadata. Field order is fixed so output is stable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub request_id: RequestId,
    pub engine: EngineKind,
    pub latency_ms: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

impl Metadata {
    pub fn new(request_id: RequestId, engine: EngineKind, latency_ms: u64) -> Self {
        Self {
            request_id,
            engine,
            latency_ms,
            generated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// What a command prints: metadata plus the command's data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub meta: Metadata,
    pub data: Value,
}
