use indexmap::IndexMap;

use super::property::{PropertySource, PropertyValue};
use super::value::Scalar;

/// Environment variables exposed as a property source.
///
/// `MYAPP__SERVER__PORT=8080` with prefix `MYAPP` and separator `__` becomes
/// the property `server.port`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    pub fn name(&self) -> String {
        format!("env:{}", self.prefix)
    }

    /// Reads the current process environment.
    pub fn load(&self) -> PropertySource {
        self.load_from(std::env::vars())
    }

    /// Builds the source from the given variables, sorted by property path.
    pub fn load_from(&self, vars: impl IntoIterator<Item = (String, String)>) -> PropertySource {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut entries = Vec::new();

        for (key, value) in vars {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            if path_str.is_empty() {
                continue;
            }

            let path = path_str
                .split(&self.separator)
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(".");
            entries.push((path, PropertyValue::Scalar(coerce_value(&value))));
        }

        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        PropertySource::new(self.name(), entries.into_iter().collect::<IndexMap<_, _>>())
    }
}

fn coerce_value(s: &str) -> Scalar {
    // Try boolean first (case-insensitive)
    if s.eq_ignore_ascii_case("true") {
        return Scalar::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Scalar::Boolean(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Scalar::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Scalar::Float(f);
        }
    }

    Scalar::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
