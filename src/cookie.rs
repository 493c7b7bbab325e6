//! Cookie instructions produced by the manager and executed by the HTTP layer.

use chrono::{DateTime, Utc};

/// A `Set-Cookie` the transport should emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub http_only: bool,
    /// Seconds; zero leaves the attribute off, negative means delete now
    pub max_age: i64,
    pub expires: Option<DateTime<Utc>>,
}

impl SetCookie {
    /// Cookie carrying an (already escaped) identifier
    pub fn issue(name: &str, value: String, max_age_secs: u64) -> Self {
        SetCookie {
            name: name.to_string(),
            value,
            path: "/".to_string(),
            http_only: true,
            max_age: i64::try_from(max_age_secs).unwrap_or(i64::MAX),
            expires: None,
        }
    }

    /// Cookie instructing the client to drop `name` immediately
    pub fn removal(name: &str) -> Self {
        SetCookie {
            name: name.to_string(),
            value: String::new(),
            path: "/".to_string(),
            http_only: true,
            max_age: -1,
            expires: Some(Utc::now()),
        }
    }

    pub fn is_removal(&self) -> bool {
        self.max_age < 0
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        parts.push(format!("Path={}", self.path));

        if let Some(expires) = self.expires {
            parts.push(format!(
                "Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }

        // Browsers read Max-Age=0 as "expire now", so only removals send it
        match self.max_age {
            0 => {}
            age if age < 0 => parts.push("Max-Age=0".to_string()),
            age => parts.push(format!("Max-Age={}", age)),
        }

        if self.http_only {
            parts.push("HttpOnly".to_string());
        }

        parts.join("; ")
    }
}

/// Find the value of cookie `name` in a `Cookie` request header.
pub fn find<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}
