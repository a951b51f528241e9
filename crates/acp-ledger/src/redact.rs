// redact.rs — Payload redaction and identity pseudonymization.
//
// Nothing reaches the ledger unredacted. The default redactor is
// conservative: a denylist of secret-bearing keys plus patterns for
// bearer headers, email addresses, and long token-shaped strings.
//
// Identities (owners, requesters, approvers) are never stored raw — they
// are pseudonymized to a short hash prefix with `hash_identity`.

use regex::Regex;
use serde_json::Value;

use crate::error::LedgerError;
use crate::hasher;

/// Keys whose values are always masked, matched case-insensitively on the
/// key name or its suffix.
const SECRET_KEYS: &[&str] = &[
    "authorization",
    "cookie",
    "api_key",
    "api-key",
    "token",
    "access_token",
    "refresh_token",
    "secret",
    "password",
];

const MASK: &str = "[REDACTED]";

/// Strips credentials, secrets, and PII-shaped strings from a payload
/// before the ledger persists it.
pub trait Redact: Send + Sync {
    fn redact(&self, payload: Value) -> Value;
}

/// The default [`Redact`] implementation.
pub struct AuditRedactor {
    bearer: Regex,
    email: Regex,
    /// Token-shaped runs. Hyphens are deliberately excluded from the class
    /// so hyphenated UUIDs used as record ids survive redaction.
    long_token: Regex,
}

impl AuditRedactor {
    pub fn new() -> Result<Self, LedgerError> {
        Ok(Self {
            bearer: Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._\-]+")?,
            email: Regex::new(r"(?i)\b[A-Z0-9._%+\-]+@[A-Z0-9.\-]+\.[A-Z]{2,}\b")?,
            long_token: Regex::new(r"\b[A-Za-z0-9_]{32,}\b")?,
        })
    }

    fn scrub_str(&self, s: &str) -> String {
        let s = self.bearer.replace_all(s, "Bearer [REDACTED]");
        let s = self.email.replace_all(&s, "[REDACTED_EMAIL]");
        self.long_token.replace_all(&s, "[REDACTED_TOKEN]").into_owned()
    }

    fn scrub_value(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.scrub_str(&s)),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.scrub_value(v)).collect())
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, v) in map {
                    let lk = key.to_lowercase();
                    let is_secret_key =
                        SECRET_KEYS.iter().any(|sk| lk == *sk || lk.ends_with(sk));
                    let scrubbed = if is_secret_key {
                        Value::String(MASK.to_string())
                    } else {
                        self.scrub_value(v)
                    };
                    out.insert(key, scrubbed);
                }
                Value::Object(out)
            }
            other => other,
        }
    }
}

impl Redact for AuditRedactor {
    fn redact(&self, payload: Value) -> Value {
        self.scrub_value(payload)
    }
}

/// Pseudonymize an identity (email, username) to a 12-character hash
/// prefix, suitable for correlation without storing personal data.
pub fn hash_identity(value: &str) -> String {
    let mut hash = hasher::hash_str(&value.to_lowercase());
    hash.truncate(12);
    hash
}
