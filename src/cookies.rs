//! Cookie store translation.
//!
//! The engine keeps cookies in an opaque jar; scripts see them as a list of
//! structured entries. Translation is lossless and fail-closed: exporting
//! omits absent fields instead of emitting sentinels, and importing validates
//! every entry before touching the jar, so a malformed batch leaves the store
//! exactly as it was.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

/// Timestamp format used for the `expiration` field, e.g.
/// `Mon, 01-Jan-2029 00:00:00 GMT`.
const EXPIRATION_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// One HTTP cookie as the engine stores it.
///
/// `expires == None` means a session cookie; that is also what a malformed
/// expiration timestamp degrades to on import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires: Option<NaiveDateTime>,
    pub http_only: bool,
    pub secure: bool,
}

/// The engine-side cookie store.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn set_all(&mut self, cookies: Vec<Cookie>) {
        self.cookies = cookies;
    }

    /// Produce the structured list form, in the store's enumeration order.
    ///
    /// Session cookies carry no `expiration` key at all, and the boolean
    /// flags appear only when true; absence means false.
    pub fn to_external(&self) -> Vec<Value> {
        self.cookies
            .iter()
            .map(|cookie| {
                let mut entry = Map::new();
                entry.insert("domain".into(), Value::String(cookie.domain.clone()));
                entry.insert("name".into(), Value::String(cookie.name.clone()));
                entry.insert("value".into(), Value::String(cookie.value.clone()));
                entry.insert("path".into(), Value::String(cookie.path.clone()));
                if let Some(expires) = cookie.expires {
                    entry.insert(
                        "expiration".into(),
                        Value::String(expires.format(EXPIRATION_FORMAT).to_string()),
                    );
                }
                if cookie.http_only {
                    entry.insert("httponly".into(), Value::Bool(true));
                }
                if cookie.secure {
                    entry.insert("secure".into(), Value::Bool(true));
                }
                Value::Object(entry)
            })
            .collect()
    }

    /// Replace the whole store with the given structured entries.
    ///
    /// Every entry is validated first: anything that is not a map, or lacks
    /// `domain`, `name`, `value`, or `path`, rejects the entire batch and
    /// the store is left unmodified. A present-but-malformed `expiration`
    /// does not reject the entry; the cookie is accepted as a session
    /// cookie. That asymmetry is deliberate and load-bearing for callers.
    pub fn set_from_external(&mut self, entries: &[Value]) -> bool {
        let mut parsed = Vec::with_capacity(entries.len());
        for entry in entries {
            let map = match entry.as_object() {
                Some(map) => map,
                None => return false,
            };

            let domain = match map.get("domain") {
                Some(v) => field_text(v),
                None => return false,
            };
            let name = match map.get("name") {
                Some(v) => field_text(v),
                None => return false,
            };
            let value = match map.get("value") {
                Some(v) => field_text(v),
                None => return false,
            };
            let path = match map.get("path") {
                Some(v) => field_text(v),
                None => return false,
            };

            let expires = map
                .get("expiration")
                .and_then(|v| NaiveDateTime::parse_from_str(&field_text(v), EXPIRATION_FORMAT).ok());

            parsed.push(Cookie {
                domain,
                name,
                value,
                path,
                expires,
                http_only: map.get("httponly").and_then(Value::as_bool).unwrap_or(false),
                secure: map.get("secure").and_then(Value::as_bool).unwrap_or(false),
            });
        }

        self.cookies = parsed;
        true
    }
}

/// Mandatory fields accept any scalar; non-strings are stringified rather
/// than rejected, matching the presence-only validation rule.
fn field_text(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
