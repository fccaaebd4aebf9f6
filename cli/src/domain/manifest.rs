//! Pre-copy transformations for dynamic services: the minimized package
//! manifest and the environment token in the entrypoint.

use serde_json::{Map, Value};

/// Literal in the entrypoint source replaced by the environment label.
pub const ENV_TOKEN: &str = "__DEPLOY_ENV__";

/// Keys copied verbatim from the project's root `package.json`, besides `name`.
const KEPT_KEYS: &[&str] = &["description", "dependencies"];

/// Build the runtime `package.json` from the project manifest.
///
/// Keeps `name`, `description` and `dependencies`; `version` is the deploy
/// version and `main` the entrypoint. Everything else (scripts, dev
/// dependencies, tooling config) is dropped.
#[must_use]
pub fn minimize(root: &Value, version: &str, entrypoint: &str) -> Value {
    let mut out = Map::new();
    if let Some(name) = root.get("name") {
        out.insert("name".into(), name.clone());
    }
    out.insert("version".into(), Value::String(version.to_string()));
    for key in KEPT_KEYS {
        if let Some(value) = root.get(*key) {
            out.insert((*key).into(), value.clone());
        }
    }
    out.insert("main".into(), Value::String(entrypoint.to_string()));
    if !out.contains_key("dependencies") {
        out.insert("dependencies".into(), Value::Object(Map::new()));
    }
    Value::Object(out)
}

/// Replace every `ENV_TOKEN` in `source` with `label`.
///
/// Returns `None` when the token does not occur, so callers can leave the
/// file untouched.
#[must_use]
pub fn substitute_env_token(source: &str, label: &str) -> Option<String> {
    source
        .contains(ENV_TOKEN)
        .then(|| source.replace(ENV_TOKEN, label))
}
