use std::net::IpAddr;
use chrono::{DateTime, Utc};
use serde_json::Value;
use crate::clock::format_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

/// Who sent the write and when it arrived.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_addr: Option<IpAddr>,
    pub now: DateTime<Utc>,
}

/// Stamps write payloads with audit metadata before validation.
#[derive(Debug, Clone)]
pub struct Enricher {
    loopback_placeholder: String,
}

impl Enricher {
    pub fn new(loopback_placeholder: impl Into<String>) -> Self {
        Self { loopback_placeholder: loopback_placeholder.into() }
    }

    /// Create sets `created_at`, update sets `updated_at`; the other stamp is
    /// stripped so clients cannot forge it. Non-object payloads pass through.
    pub fn enrich(&self, mut payload: Value, kind: WriteKind, ctx: &RequestContext) -> Value {
        let Some(obj) = payload.as_object_mut() else {
            return payload;
        };

        let stamp = Value::String(format_timestamp(ctx.now));
        match kind {
            WriteKind::Create => {
                obj.remove("updated_at");
                obj.insert("created_at".into(), stamp);
            }
            WriteKind::Update => {
                obj.remove("created_at");
                obj.insert("updated_at".into(), stamp);
            }
        }

        if let Some(addr) = ctx.client_addr {
            obj.insert("ip".into(), Value::String(self.client_ip(addr)));
        }
        payload
    }

    fn client_ip(&self, addr: IpAddr) -> String {
        let addr = match addr {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(addr),
            v4 => v4,
        };
        if addr.is_loopback() {
            self.loopback_placeholder.clone()
        } else {
            addr.to_string()
        }
    }
}
