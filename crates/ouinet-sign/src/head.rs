use crate::error::SignError;

/// An HTTP response head: status line plus an ordered list of header
/// fields. Hand-rolled rather than wrapping a generic HTTP crate, since
/// the exact on-wire shape (verbatim head bytes, field order, trailer
/// merge-on-close) is itself part of the store format this codec feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        ResponseHead {
            status,
            reason: reason.into(),
            headers: Vec::new(),
        }
    }

    /// Returns the value of the first header matching `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns all header values matching `name` (case-insensitive), in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes every header matching `name` and appends a fresh single value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.headers.push((name.to_string(), value.into()));
    }

    /// Appends a header without removing any existing value of the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Removes every header matching `name` (case-insensitive).
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Renders the verbatim CRLF-terminated head, as persisted in the
    /// store's `head` file (no chunked-transfer framing headers here;
    /// those are added only on the wire by [`crate::sign::sign_response`]).
    pub fn to_wire(&self) -> String {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        for (k, v) in &self.headers {
            out.push_str(k);
            out.push_str(": ");
            out.push_str(v);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }

    /// Parses a verbatim CRLF-terminated head as written by [`Self::to_wire`].
    pub fn from_wire(s: &str) -> Result<Self, SignError> {
        let mut lines = s.split("\r\n");
        let status_line = lines.next().ok_or(SignError::BadMessage)?;
        let mut parts = status_line.splitn(3, ' ');
        let _version = parts.next().ok_or(SignError::BadMessage)?;
        let status: u16 = parts
            .next()
            .ok_or(SignError::BadMessage)?
            .parse()
            .map_err(|_| SignError::BadMessage)?;
        let reason = parts.next().unwrap_or("").to_string();

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (k, v) = line.split_once(':').ok_or(SignError::BadMessage)?;
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
        Ok(ResponseHead {
            status,
            reason,
            headers,
        })
    }
}
