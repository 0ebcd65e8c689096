use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The recognized top-level types from RFC 2046 plus the IANA registry's
/// common extras. Anything else still parses, just into `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopLevelType {
    Application,
    Text,
    Image,
    Audio,
    Video,
    Model,
    Font,
    Multipart,
    Message,
    Other(String),
}

impl TopLevelType {
    fn parse(s: &str) -> Self {
        match s {
            "application" => TopLevelType::Application,
            "text" => TopLevelType::Text,
            "image" => TopLevelType::Image,
            "audio" => TopLevelType::Audio,
            "video" => TopLevelType::Video,
            "model" => TopLevelType::Model,
            "font" => TopLevelType::Font,
            "multipart" => TopLevelType::Multipart,
            "message" => TopLevelType::Message,
            other => TopLevelType::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            TopLevelType::Application => "application",
            TopLevelType::Text => "text",
            TopLevelType::Image => "image",
            TopLevelType::Audio => "audio",
            TopLevelType::Video => "video",
            TopLevelType::Model => "model",
            TopLevelType::Font => "font",
            TopLevelType::Multipart => "multipart",
            TopLevelType::Message => "message",
            TopLevelType::Other(s) => s,
        }
    }
}

/// The registration tree a subtype is drawn from, per RFC 6838 ("vnd.",
/// "prs.", "x." prefixes). Absent one, the subtype is a standards-tree type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tree {
    Standard,
    Vendor,
    Personal,
    Unregistered,
}

/// A parsed `type/tree.subtype+suffix;param=value` media type, e.g.
/// `application/vnd.api+json; charset=utf-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub top: TopLevelType,
    pub tree: Tree,
    pub sub_type: String,
    pub suffix: Option<String>,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("media type is missing a '/' separator: {0}")]
    MissingSlash(String),
    #[error("media type has an empty type or subtype: {0}")]
    EmptyComponent(String),
    #[error("media type parameter is malformed: {0}")]
    MalformedParam(String),
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ';');
        let essence = parts.next().unwrap().trim();
        let (type_part, rest) = essence
            .split_once('/')
            .ok_or_else(|| MediaTypeError::MissingSlash(s.to_string()))?;
        let type_part = type_part.trim().to_ascii_lowercase();
        let rest = rest.trim().to_ascii_lowercase();
        if type_part.is_empty() || rest.is_empty() {
            return Err(MediaTypeError::EmptyComponent(s.to_string()));
        }

        let (tree, sub_rest) = if let Some(stripped) = rest.strip_prefix("vnd.") {
            (Tree::Vendor, stripped)
        } else if let Some(stripped) = rest.strip_prefix("prs.") {
            (Tree::Personal, stripped)
        } else if let Some(stripped) = rest.strip_prefix("x.") {
            (Tree::Unregistered, stripped)
        } else if let Some(stripped) = rest.strip_prefix("x-") {
            (Tree::Unregistered, stripped)
        } else {
            (Tree::Standard, rest.as_str())
        };

        let (sub_type, suffix) = match sub_rest.rsplit_once('+') {
            Some((sub, suffix)) if !sub.is_empty() => (sub.to_string(), Some(suffix.to_string())),
            _ => (sub_rest.to_string(), None),
        };

        let mut params = BTreeMap::new();
        for param in parts.next().unwrap_or("").split(';') {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| MediaTypeError::MalformedParam(param.to_string()))?;
            let value = value.trim().trim_matches('"');
            params.insert(key.trim().to_ascii_lowercase(), value.to_string());
        }

        Ok(MediaType {
            top: TopLevelType::parse(&type_part),
            tree,
            sub_type,
            suffix,
            params,
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.top.as_str())?;
        match self.tree {
            Tree::Standard => {}
            Tree::Vendor => write!(f, "vnd.")?,
            Tree::Personal => write!(f, "prs.")?,
            Tree::Unregistered => write!(f, "x.")?,
        }
        write!(f, "{}", self.sub_type)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "+{suffix}")?;
        }
        for (key, value) in &self.params {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

impl MediaType {
    pub fn json() -> Self {
        MediaType {
            top: TopLevelType::Application,
            tree: Tree::Standard,
            sub_type: "json".to_string(),
            suffix: None,
            params: BTreeMap::new(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.sub_type == "json" || self.suffix.as_deref() == Some("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_type() {
        let mt: MediaType = "application/json".parse().unwrap();
        assert_eq!(mt.top, TopLevelType::Application);
        assert_eq!(mt.tree, Tree::Standard);
        assert_eq!(mt.sub_type, "json");
        assert!(mt.suffix.is_none());
    }

    #[test]
    fn parses_vendor_tree_with_suffix_and_params() {
        let mt: MediaType = "application/vnd.api+json; charset=UTF-8".parse().unwrap();
        assert_eq!(mt.tree, Tree::Vendor);
        assert_eq!(mt.sub_type, "api");
        assert_eq!(mt.suffix.as_deref(), Some("json"));
        assert_eq!(mt.params.get("charset").map(String::as_str), Some("utf-8"));
        assert!(mt.is_json());
    }

    #[test]
    fn rejects_missing_slash() {
        assert!(matches!("not-a-media-type".parse::<MediaType>(), Err(MediaTypeError::MissingSlash(_))));
    }

    #[test]
    fn round_trips_through_display() {
        let mt: MediaType = "text/plain; charset=utf-8".parse().unwrap();
        assert_eq!(mt.to_string(), "text/plain; charset=utf-8");
    }
}
