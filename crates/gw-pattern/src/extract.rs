//! Value extractors for `json.`, `url.`, `xml.` and `format.` tokens

use crate::value::render_leaf;
use chrono::Local;
use serde_json::Value;
use thiserror::Error;

/// Reasons an extraction produced nothing
///
/// These never leave the evaluator; they are logged and the token resolves
/// to an empty string.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("payload is not valid form data: {0}")]
    Url(#[from] serde_urlencoded::de::Error),

    #[error("payload is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("path '{path}' not found in payload")]
    PathNotFound { path: String },

    #[error("unknown format key '{key}'")]
    UnknownFormat { key: String },
}

type ExtractResult = Result<String, ExtractError>;

/// Descend into a JSON payload by dot-separated path
pub(crate) fn json_value(payload: &[u8], path: &str) -> ExtractResult {
    let document: Value = serde_json::from_slice(payload)?;
    let mut current = &document;

    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };

        current = next.ok_or_else(|| ExtractError::PathNotFound {
            path: path.to_string(),
        })?;
    }

    Ok(render_leaf(current))
}

/// Look up a field of a form-encoded payload
pub(crate) fn url_value(payload: &[u8], key: &str) -> ExtractResult {
    let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(payload)?;

    fields
        .into_iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
        .ok_or_else(|| ExtractError::PathNotFound {
            path: key.to_string(),
        })
}

/// Descend into an XML payload by element names
///
/// The first segment names the root element.
pub(crate) fn xml_value(payload: &[u8], path: &str) -> ExtractResult {
    let text = std::str::from_utf8(payload)?;
    let document = roxmltree::Document::parse(text)?;
    let not_found = || ExtractError::PathNotFound {
        path: path.to_string(),
    };

    let mut segments = path.split('.');
    let mut node = document.root_element();

    if segments.next() != Some(node.tag_name().name()) {
        return Err(not_found());
    }

    for segment in segments {
        node = node
            .children()
            .find(|child| child.is_element() && child.tag_name().name() == segment)
            .ok_or_else(not_found)?;
    }

    Ok(node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect())
}

/// Static formatting table, independent of the payload
pub(crate) fn format_value(key: &str) -> ExtractResult {
    let now = Local::now();

    match key {
        "timestamp" => Ok(now.timestamp().to_string()),
        "time" => Ok(now.format("%H:%M:%S").to_string()),
        "date" => Ok(now.format("%Y-%m-%d").to_string()),
        "datetime" => Ok(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        _ => Err(ExtractError::UnknownFormat {
            key: key.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_nested_and_indexed() {
        let payload = br#"{"state": {"power": "on", "levels": [10, 20]}, "ok": true}"#;
        assert_eq!(json_value(payload, "state.power").unwrap(), "on");
        assert_eq!(json_value(payload, "state.levels.1").unwrap(), "20");
        assert_eq!(json_value(payload, "state.levels").unwrap(), "10,20");
        assert_eq!(json_value(payload, "ok").unwrap(), "true");
    }

    #[test]
    fn test_json_errors() {
        assert!(matches!(
            json_value(b"not json", "a"),
            Err(ExtractError::Json(_))
        ));
        assert!(matches!(
            json_value(br#"{"a": 1}"#, "a.b"),
            Err(ExtractError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_url_field() {
        assert_eq!(url_value(b"temp=21.5&hum=40", "hum").unwrap(), "40");
        assert_eq!(url_value(b"name=front+door", "name").unwrap(), "front door");
        assert!(url_value(b"temp=21.5", "hum").is_err());
    }

    #[test]
    fn test_xml_path() {
        let payload = b"<status><relay><state>on</state></relay><temp>21</temp></status>";
        assert_eq!(xml_value(payload, "status.relay.state").unwrap(), "on");
        assert_eq!(xml_value(payload, "status.temp").unwrap(), "21");
        assert!(xml_value(payload, "root.temp").is_err());
        assert!(xml_value(b"<broken", "status").is_err());
    }

    #[test]
    fn test_format_table() {
        let timestamp: i64 = format_value("timestamp").unwrap().parse().unwrap();
        assert!(timestamp > 0);
        assert_eq!(format_value("date").unwrap().len(), 10);
        assert!(format_value("nope").is_err());
    }
}
