//! Capability descriptors and their option defaults
//!
//! An expose name is `<item>` or `<item>_<suffix>`; the item selects the
//! kind and the option defaults, the suffix only makes the name unique.

use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Behaviour class of an expose
///
/// Special kinds are chosen by item name, everything else by the `type`
/// option, falling back to [`ExposeKind::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExposeKind {
    Light,
    Switch,
    Cover,
    Lock,
    Thermostat,
    Binary,
    Sensor,
    Toggle,
    Number,
    Select,
    Button,
    Generic,
}

impl ExposeKind {
    /// Kinds selected by item name
    const SPECIAL: [(&'static str, ExposeKind); 5] = [
        ("light", ExposeKind::Light),
        ("switch", ExposeKind::Switch),
        ("cover", ExposeKind::Cover),
        ("lock", ExposeKind::Lock),
        ("thermostat", ExposeKind::Thermostat),
    ];

    /// Kinds selected by the `type` option
    const TYPED: [(&'static str, ExposeKind); 6] = [
        ("binary", ExposeKind::Binary),
        ("sensor", ExposeKind::Sensor),
        ("toggle", ExposeKind::Toggle),
        ("number", ExposeKind::Number),
        ("select", ExposeKind::Select),
        ("button", ExposeKind::Button),
    ];

    pub fn special(item: &str) -> Option<Self> {
        Self::SPECIAL
            .iter()
            .find(|(name, _)| *name == item)
            .map(|(_, kind)| *kind)
    }

    pub fn from_type(type_name: &str) -> Option<Self> {
        Self::TYPED
            .iter()
            .find(|(name, _)| *name == type_name)
            .map(|(_, kind)| *kind)
    }

    /// Resolve the kind of an item given its merged options
    pub fn resolve(item: &str, options: &Map<String, Value>) -> Self {
        Self::special(item)
            .or_else(|| {
                options
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(Self::from_type)
            })
            .unwrap_or(ExposeKind::Generic)
    }

    pub fn as_str(&self) -> &'static str {
        Self::SPECIAL
            .iter()
            .chain(Self::TYPED.iter())
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("generic")
    }
}

impl std::fmt::Display for ExposeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item part of an expose name
pub fn item_name(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// One capability of a device endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expose {
    pub name: String,
    pub kind: ExposeKind,
}

impl Expose {
    pub fn new(name: impl Into<String>, kind: ExposeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn item(&self) -> &str {
        item_name(&self.name)
    }
}

/// Option defaults per expose item
#[derive(Debug, Clone)]
pub struct ExposeOptions {
    defaults: Map<String, Value>,
}

impl Default for ExposeOptions {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExposeOptions {
    pub fn new(defaults: Map<String, Value>) -> Self {
        Self { defaults }
    }

    /// Defaults used when no options file is available
    pub fn builtin() -> Self {
        let defaults = json!({
            "battery": {"type": "sensor", "class": "battery", "state": "measurement", "unit": "%"},
            "temperature": {"type": "sensor", "class": "temperature", "state": "measurement", "unit": "°C", "round": 1},
            "humidity": {"type": "sensor", "class": "humidity", "state": "measurement", "unit": "%", "round": 1},
            "pressure": {"type": "sensor", "class": "pressure", "state": "measurement", "unit": "kPa", "round": 1},
            "illuminance": {"type": "sensor", "class": "illuminance", "state": "measurement", "unit": "lx"},
            "contact": {"type": "binary", "class": "door"},
            "occupancy": {"type": "binary", "class": "motion"},
            "waterLeak": {"type": "binary", "class": "moisture"},
            "power": {"type": "sensor", "class": "power", "state": "measurement", "unit": "W", "round": 2},
            "energy": {"type": "sensor", "class": "energy", "state": "total_increasing", "unit": "kWh", "round": 2},
            "voltage": {"type": "sensor", "class": "voltage", "state": "measurement", "unit": "V", "round": 1},
            "current": {"type": "sensor", "class": "current", "state": "measurement", "unit": "A", "round": 2}
        });

        match defaults {
            Value::Object(map) => Self::new(map),
            _ => Self::new(Map::new()),
        }
    }

    /// Load defaults from a JSON file, keeping the built-in table on failure
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Expose options {:?} not readable ({}), using built-in table", path, e);
                return Self::builtin();
            }
        };

        match serde_json::from_slice::<Map<String, Value>>(&content) {
            Ok(defaults) => {
                debug!("Loaded {} expose option entries from {:?}", defaults.len(), path);
                Self::new(defaults)
            }
            Err(e) => {
                warn!("Expose options {:?} are malformed ({}), using built-in table", path, e);
                Self::builtin()
            }
        }
    }

    /// Defaults for an item, empty when none are known
    pub fn for_item(&self, item: &str) -> Map<String, Value> {
        self.defaults
            .get(item)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Merge device-supplied options over the item defaults
    pub fn merge(&self, item: &str, overrides: Option<&Value>) -> Map<String, Value> {
        let mut options = self.for_item(item);

        if let Some(Value::Object(overrides)) = overrides {
            for (key, value) in overrides {
                options.insert(key.clone(), value.clone());
            }
        }

        options
    }

    /// Drop entries equal to the item defaults
    pub fn strip(&self, item: &str, options: &Map<String, Value>) -> Map<String, Value> {
        let defaults = self.defaults.get(item).and_then(Value::as_object);

        options
            .iter()
            .filter(|(key, value)| defaults.and_then(|d| d.get(*key)) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_item_name() {
        assert_eq!(item_name("temperature"), "temperature");
        assert_eq!(item_name("switch_left"), "switch");
        assert_eq!(item_name("status_2"), "status");
    }

    #[test]
    fn test_kind_resolution() {
        let empty = Map::new();
        assert_eq!(ExposeKind::resolve("light", &empty), ExposeKind::Light);
        assert_eq!(ExposeKind::resolve("thermostat", &empty), ExposeKind::Thermostat);
        assert_eq!(ExposeKind::resolve("status", &empty), ExposeKind::Generic);

        let options = ExposeOptions::builtin();
        let contact = options.for_item("contact");
        assert_eq!(ExposeKind::resolve("contact", &contact), ExposeKind::Binary);

        let mut typed = Map::new();
        typed.insert("type".to_string(), json!("select"));
        assert_eq!(ExposeKind::resolve("mode", &typed), ExposeKind::Select);

        // item name wins over type
        assert_eq!(ExposeKind::resolve("switch", &typed), ExposeKind::Switch);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ExposeKind::Cover.as_str(), "cover");
        assert_eq!(ExposeKind::Button.to_string(), "button");
        assert_eq!(ExposeKind::Generic.as_str(), "generic");
    }

    #[test]
    fn test_merge_and_strip() {
        let options = ExposeOptions::builtin();

        let merged = options.merge("temperature", Some(&json!({"round": 2, "min": -20})));
        assert_eq!(merged["unit"], "°C");
        assert_eq!(merged["round"], 2);
        assert_eq!(merged["min"], -20);

        let stripped = options.strip("temperature", &merged);
        assert_eq!(stripped.len(), 2);
        assert_eq!(stripped["round"], 2);
        assert_eq!(stripped["min"], -20);

        let stripped = options.strip("temperature", &options.for_item("temperature"));
        assert!(stripped.is_empty());
    }

    #[test]
    fn test_load_file_and_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("expose.json");
        std::fs::write(&path, r#"{"gauge": {"type": "sensor", "unit": "bar"}}"#).unwrap();

        let options = ExposeOptions::load(&path);
        assert_eq!(options.for_item("gauge")["unit"], "bar");
        assert!(options.for_item("temperature").is_empty());

        let fallback = ExposeOptions::load(&temp_dir.path().join("missing.json"));
        assert_eq!(fallback.for_item("temperature")["unit"], "°C");
    }
}
