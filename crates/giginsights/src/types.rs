use serde::{Deserialize, Serialize};

/// A single complaint filed by a gig worker.
///
/// `complaint_title` is a compound `"<category>:<title>"` string; see
/// [`ComplaintRecord::title`] for the part that goes into prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRecord {
    pub complaint_title: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub desc: String,
}

impl ComplaintRecord {
    pub fn new(complaint_title: impl Into<String>) -> Self {
        Self {
            complaint_title: complaint_title.into(),
            name: String::new(),
            date: String::new(),
            location: String::new(),
            desc: String::new(),
        }
    }

    /// Lenient conversion from one stored entry.
    ///
    /// Only `complaintTitle` must be a string. Other fields may be missing or
    /// hold any JSON value, which is kept in its JSON text form.
    pub fn from_value(entry: &serde_json::Value) -> Option<Self> {
        let complaint_title = entry.get("complaintTitle")?.as_str()?.to_string();
        let field = |name: &str| match entry.get(name) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Some(Self {
            complaint_title,
            name: field("name"),
            date: field("date"),
            location: field("location"),
            desc: field("desc"),
        })
    }

    /// Semantic title with the category prefix stripped.
    pub fn title(&self) -> &str {
        complaint_title(&self.complaint_title)
    }
}

/// Strip the `"<category>:"` prefix from a compound complaint title.
///
/// Splits on the first `:` only, so titles that themselves contain colons
/// survive. A title without any delimiter is used whole.
pub fn complaint_title(raw: &str) -> &str {
    match raw.split_once(':') {
        Some((_, title)) => title.trim(),
        None => raw.trim(),
    }
}

/// Policy document. Its shape is not constrained; it is serialized into
/// prompts and served back exactly as loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyRecord(pub serde_json::Value);

/// One grouped concern produced by the analytics task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcernSummary {
    pub concern: String,
    pub count: u64,
}

impl ConcernSummary {
    pub fn new(concern: impl Into<String>, count: u64) -> Self {
        Self {
            concern: concern.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySuggestionResult {
    pub suggestions: Vec<String>,
}
