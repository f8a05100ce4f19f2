//! Topic layout of the gateway
//!
//! Every gateway topic is `<prefix>/<family>/<namespace>[/<device>]`.

/// What an inbound topic addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Command,
    FromDevice(&'a str),
    ToDevice(&'a str),
    /// Anything outside the gateway's own families
    Foreign,
}

/// Builds and classifies gateway topics
#[derive(Debug, Clone)]
pub struct Topics {
    prefix: String,
    namespace: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            namespace: namespace.into(),
        }
    }

    fn family(&self, family: &str) -> String {
        format!("{}/{}/{}", self.prefix, family, self.namespace)
    }

    fn per_device(&self, family: &str, device: &str) -> String {
        format!("{}/{}", self.family(family), device)
    }

    pub fn command(&self) -> String {
        self.family("command")
    }

    pub fn event(&self) -> String {
        self.family("event")
    }

    pub fn status(&self) -> String {
        self.family("status")
    }

    pub fn from_device(&self, device: &str) -> String {
        self.per_device("fd", device)
    }

    pub fn to_device(&self, device: &str) -> String {
        self.per_device("td", device)
    }

    /// Retained presence topic
    pub fn device(&self, device: &str) -> String {
        self.per_device("device", device)
    }

    /// Retained capability advertisement topic
    pub fn expose(&self, device: &str) -> String {
        self.per_device("expose", device)
    }

    /// Standing subscriptions taken on every connect
    pub fn standing(&self) -> [String; 3] {
        [
            self.command(),
            self.per_device("fd", "#"),
            self.per_device("td", "#"),
        ]
    }

    pub fn route<'a>(&self, topic: &'a str) -> Route<'a> {
        let Some(rest) = topic
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Route::Foreign;
        };

        let mut levels = rest.splitn(4, '/');

        match (levels.next(), levels.next(), levels.next()) {
            (Some(family), Some(namespace), device) if namespace == self.namespace => {
                match (family, device) {
                    ("command", None) => Route::Command,
                    ("fd", Some(device)) if !device.is_empty() => Route::FromDevice(device),
                    ("td", Some(device)) if !device.is_empty() => Route::ToDevice(device),
                    _ => Route::Foreign,
                }
            }
            _ => Route::Foreign,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Topics {
        Topics::new("homed", "custom")
    }

    #[test]
    fn test_topic_names() {
        let topics = topics();
        assert_eq!(topics.command(), "homed/command/custom");
        assert_eq!(topics.status(), "homed/status/custom");
        assert_eq!(topics.from_device("lamp"), "homed/fd/custom/lamp");
        assert_eq!(topics.device("lamp"), "homed/device/custom/lamp");
        assert_eq!(topics.expose("lamp"), "homed/expose/custom/lamp");
        assert_eq!(
            topics.standing(),
            ["homed/command/custom", "homed/fd/custom/#", "homed/td/custom/#"]
        );
    }

    #[test]
    fn test_route() {
        let topics = topics();
        assert_eq!(topics.route("homed/command/custom"), Route::Command);
        assert_eq!(topics.route("homed/fd/custom/lamp"), Route::FromDevice("lamp"));
        assert_eq!(topics.route("homed/td/custom/Desk Lamp"), Route::ToDevice("Desk Lamp"));
        assert_eq!(topics.route("homed/td/custom/lamp/1"), Route::ToDevice("lamp"));
    }

    #[test]
    fn test_route_foreign() {
        let topics = topics();
        assert_eq!(topics.route("homed/td/zigbee/lamp"), Route::Foreign);
        assert_eq!(topics.route("homed/td/custom"), Route::Foreign);
        assert_eq!(topics.route("homed/td/custom/"), Route::Foreign);
        assert_eq!(topics.route("homed/status/custom"), Route::Foreign);
        assert_eq!(topics.route("homedx/command/custom"), Route::Foreign);
        assert_eq!(topics.route("shellies/plug/relay/0"), Route::Foreign);
    }
}
