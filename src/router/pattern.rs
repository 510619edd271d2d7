use std::fmt;

use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;

use super::core::CaptureVec;

static UUID_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").ok()
});

/// Whether `text` is a canonical lowercase UUID (`8-4-4-4-12` hex groups).
#[must_use]
pub fn is_uuid(text: &str) -> bool {
    UUID_RE.as_ref().is_some_and(|re| re.is_match(text))
}

/// Why a request line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestLineError {
    /// The buffer held no request line at all
    Empty,
    /// The verb is not a valid HTTP method token
    InvalidMethod(String),
    /// No path followed the verb
    MissingPath,
    /// The path was not followed by a protocol token
    MissingVersion,
    /// The protocol token is not `HTTP/1.x`
    UnsupportedVersion(String),
}

impl fmt::Display for RequestLineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestLineError::Empty => write!(f, "empty request line"),
            RequestLineError::InvalidMethod(m) => write!(f, "invalid method '{m}'"),
            RequestLineError::MissingPath => write!(f, "missing request path"),
            RequestLineError::MissingVersion => write!(f, "missing protocol version"),
            RequestLineError::UnsupportedVersion(v) => {
                write!(f, "unsupported protocol '{v}'")
            }
        }
    }
}

impl std::error::Error for RequestLineError {}

/// Verb and path of a request, parsed once from the head of the raw buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
}

impl RequestLine {
    /// Parse `<VERB> <path><whitespace>HTTP/1...` from the start of `head`.
    ///
    /// The path ends at the first whitespace character (space, CR or LF), and the
    /// protocol token may follow after any run of whitespace. Everything after the
    /// protocol token is ignored.
    pub fn parse(head: &str) -> Result<Self, RequestLineError> {
        let head = head.trim_start_matches(['\r', '\n']);
        if head.is_empty() {
            return Err(RequestLineError::Empty);
        }

        let (verb, rest) = head
            .split_once(' ')
            .ok_or(RequestLineError::MissingPath)?;
        let method = Method::from_bytes(verb.as_bytes())
            .map_err(|_| RequestLineError::InvalidMethod(verb.to_string()))?;

        let path_end = rest
            .find(char::is_whitespace)
            .ok_or(RequestLineError::MissingVersion)?;
        let (path, rest) = rest.split_at(path_end);
        if path.is_empty() {
            return Err(RequestLineError::MissingPath);
        }

        let version = rest.trim_start();
        if version.is_empty() {
            return Err(RequestLineError::MissingVersion);
        }
        if !version.starts_with("HTTP/1") {
            let token = version
                .split(char::is_whitespace)
                .next()
                .unwrap_or_default()
                .to_string();
            return Err(RequestLineError::UnsupportedVersion(token));
        }

        Ok(Self {
            method,
            path: path.to_string(),
        })
    }
}

/// One `/`-separated piece of a [`PathTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly
    Literal(&'static str),
    /// Accepts canonical UUID text and captures it
    Uuid,
}

/// A path pattern such as `/actor/{uuid}/port/{uuid}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: &'static str,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Compile a template. `{uuid}` marks a capture slot; anything else is literal.
    #[must_use]
    pub fn new(source: &'static str) -> Self {
        let segments = source
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "{uuid}" => Segment::Uuid,
                literal => Segment::Literal(literal),
            })
            .collect();
        Self { source, segments }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.source
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of capture slots in the template.
    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Uuid))
            .count()
    }

    /// Match a request path, returning the captured identifiers in order.
    ///
    /// The path must start with `/` and have exactly as many segments as the
    /// template; an empty trailing segment (`/actors/`) counts as a segment.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<CaptureVec> {
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut captures = CaptureVec::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) if *lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Uuid if is_uuid(part) => captures.push(part.to_string()),
                Segment::Uuid => return None,
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(captures)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source)
    }
}
