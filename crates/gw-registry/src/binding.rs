//! Per-property transform pairs

use serde::{Deserialize, Serialize};

/// Persisted shape of a binding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retain: bool,
}

/// How one property of a real device maps to foreign topics
///
/// The inbound half turns a payload on `in_topic` into a property value with
/// `in_pattern`; the outbound half renders a property value into a payload
/// for `out_topic` with `out_pattern`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub in_topic: String,
    pub in_pattern: String,
    pub out_topic: String,
    pub out_pattern: String,
    pub retain: bool,
}

impl Binding {
    /// Build a binding, discarding one with neither topic set
    pub fn from_record(record: BindingRecord) -> Option<Self> {
        let binding = Self {
            in_topic: record.in_topic.unwrap_or_default().trim().to_string(),
            in_pattern: record.in_pattern.unwrap_or_default(),
            out_topic: record.out_topic.unwrap_or_default().trim().to_string(),
            out_pattern: record.out_pattern.unwrap_or_default(),
            retain: record.retain,
        };

        (binding.has_inbound() || binding.has_outbound()).then_some(binding)
    }

    pub fn to_record(&self) -> BindingRecord {
        fn non_empty(value: &str) -> Option<String> {
            (!value.is_empty()).then(|| value.to_string())
        }

        BindingRecord {
            in_topic: non_empty(&self.in_topic),
            in_pattern: non_empty(&self.in_pattern),
            out_topic: non_empty(&self.out_topic),
            out_pattern: non_empty(&self.out_pattern),
            retain: self.retain,
        }
    }

    pub fn has_inbound(&self) -> bool {
        !self.in_topic.is_empty()
    }

    pub fn has_outbound(&self) -> bool {
        !self.out_topic.is_empty()
    }
}
