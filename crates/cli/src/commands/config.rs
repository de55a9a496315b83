use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use repairdesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields: [(&str, &[&str], String); 10] = [
        ("database.url", &["REPAIRDESK_DATABASE_URL"], config.database.url.clone()),
        (
            "database.max_connections",
            &["REPAIRDESK_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            &["REPAIRDESK_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        (
            "server.bind_address",
            &["REPAIRDESK_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        ("server.port", &["REPAIRDESK_SERVER_PORT"], config.server.port.to_string()),
        ("rules.path", &["REPAIRDESK_RULES_PATH"], config.rules.path.display().to_string()),
        (
            "rules.enforce_overrides",
            &["REPAIRDESK_RULES_ENFORCE_OVERRIDES"],
            config.rules.enforce_overrides.to_string(),
        ),
        ("batch.max_cases", &["REPAIRDESK_BATCH_MAX_CASES"], config.batch.max_cases.to_string()),
        (
            "logging.level",
            &["REPAIRDESK_LOGGING_LEVEL", "REPAIRDESK_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        (
            "logging.format",
            &["REPAIRDESK_LOGGING_FORMAT", "REPAIRDESK_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_keys, value) in fields {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["repairdesk.toml", "config/repairdesk.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, render_line};

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc: toml::Value = "[rules]\npath = \"rules.json\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "rules.path"));
        assert!(!contains_path(&doc, "rules.enforce_overrides"));
        assert!(!contains_path(&doc, "batch.max_cases"));
    }

    #[test]
    fn lines_render_value_and_source() {
        assert_eq!(
            render_line("server.port", "8000", "default".to_string()),
            "- server.port = 8000 (source: default)"
        );
    }
}
