use serde_json::{Map, Value};

/// Selected environment variables, read once when the logger is built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvSnapshot(Map<String, Value>);

impl EnvSnapshot {
    /// Read the named variables from the process environment.
    ///
    /// Unset or non-UTF-8 variables are left out.
    pub fn capture<S: AsRef<str>>(names: &[S]) -> Self {
        Self::from_pairs(
            names
                .iter()
                .filter_map(|name| {
                    let name = name.as_ref();
                    std::env::var(name).ok().map(|value| (name.to_string(), value))
                }),
        )
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entries named in `props`, or `None` when nothing matches.
    pub fn pick<S: AsRef<str>>(&self, props: &[S]) -> Option<Value> {
        let picked: Map<String, Value> = props
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                self.0.get(name).map(|v| (name.to_string(), v.clone()))
            })
            .collect();
        (!picked.is_empty()).then_some(Value::Object(picked))
    }
}
