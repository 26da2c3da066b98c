use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use marquee_domain::{Environment, Error, ModelId, RetryConfig, StoreConfig};

/// Resolves [`Environment`] from process variables and `.env` files.
pub struct EnvironmentService {
    cwd: PathBuf,
}

/// Variables collected from `.env` files, plus the closest file found.
#[derive(Default)]
struct DotEnv {
    vars: HashMap<String, String>,
    closest: Option<PathBuf>,
}

impl EnvironmentService {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Process variables win over `.env` values; closer `.env` files win over
    /// files in parent directories.
    pub fn get(&self) -> anyhow::Result<Environment> {
        let dotenv = Self::load_all(&self.cwd);
        let lookup = |key: &str| std::env::var(key).ok().or_else(|| dotenv.vars.get(key).cloned());
        Ok(resolve(lookup, dotenv.closest.clone())?)
    }

    fn load_all(cwd: &Path) -> DotEnv {
        let mut paths = cwd.ancestors().collect::<Vec<_>>();
        // Root first so that closer files overwrite.
        paths.reverse();

        let mut dotenv = DotEnv::default();
        for dir in paths {
            let env_file = dir.join(".env");
            if !env_file.is_file() {
                continue;
            }
            let Ok(iter) = dotenvy::from_path_iter(&env_file) else {
                tracing::warn!(path = %env_file.display(), "Could not read .env file");
                continue;
            };
            for (key, value) in iter.flatten() {
                dotenv.vars.insert(key, value);
            }
            dotenv.closest = Some(env_file);
        }
        dotenv
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, Error> {
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value '{value}'"))),
    }
}

fn resolve(
    lookup: impl Fn(&str) -> Option<String>,
    env_file: Option<PathBuf>,
) -> Result<Environment, Error> {
    let defaults = Environment::default();
    let retry_defaults = RetryConfig::default();

    let retry_status_codes = match lookup("MARQUEE_RETRY_STATUS_CODES") {
        Some(codes) => codes
            .split(',')
            .map(|code| code.trim().parse::<u16>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::Config(format!("MARQUEE_RETRY_STATUS_CODES has an invalid value '{codes}'")))?,
        None => retry_defaults.retry_status_codes.clone(),
    };

    let retry_config = RetryConfig {
        min_delay_ms: parse(&lookup, "MARQUEE_RETRY_MIN_DELAY_MS", retry_defaults.min_delay_ms)?,
        backoff_factor: parse(&lookup, "MARQUEE_RETRY_BACKOFF_FACTOR", retry_defaults.backoff_factor)?,
        max_retry_attempts: parse(&lookup, "MARQUEE_RETRY_MAX_ATTEMPTS", retry_defaults.max_retry_attempts)?,
        retry_status_codes,
    };

    let store = match lookup("MONGODB_CONNECTION_STRING") {
        Some(connection_string) => StoreConfig::Mongo {
            connection_string,
            database: lookup("MONGODB_DATABASE_NAME").unwrap_or_else(|| "sample_mflix".to_string()),
        },
        None => lookup("MARQUEE_DATASET")
            .map(|path| StoreConfig::Dataset(PathBuf::from(path)))
            .unwrap_or(StoreConfig::Empty),
    };

    let result_limit = parse(&lookup, "MARQUEE_RESULT_LIMIT", defaults.result_limit)?;
    if result_limit == 0 {
        return Err(Error::Config("MARQUEE_RESULT_LIMIT must be positive".to_string()));
    }

    Ok(Environment {
        provider_url: lookup("OPENAI_URL").unwrap_or(defaults.provider_url),
        api_key: lookup("OPENAI_API_KEY"),
        model: lookup("MARQUEE_MODEL").map(ModelId::from).unwrap_or(defaults.model),
        router_model: lookup("MARQUEE_ROUTER_MODEL")
            .map(ModelId::from)
            .unwrap_or(defaults.router_model),
        store,
        result_limit,
        max_steps: parse(&lookup, "MARQUEE_MAX_STEPS", defaults.max_steps)?,
        max_agent_iterations: parse(&lookup, "MARQUEE_MAX_AGENT_ITERATIONS", defaults.max_agent_iterations)?,
        retry_config,
        sandbox_max_operations: parse(&lookup, "MARQUEE_SANDBOX_MAX_OPERATIONS", defaults.sandbox_max_operations)?,
        sandbox_timeout_ms: parse(&lookup, "MARQUEE_SANDBOX_TIMEOUT_MS", defaults.sandbox_timeout_ms)?,
        env_file,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let actual = resolve(lookup_from(&[]), None).unwrap();
        let expected = Environment::default();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_overrides() {
        let fixture = lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_URL", "http://localhost:1234/v1/"),
            ("MARQUEE_MODEL", "gpt-4.1"),
            ("MARQUEE_DATASET", "movies.json"),
            ("MARQUEE_RESULT_LIMIT", "5"),
            ("MARQUEE_MAX_STEPS", "7"),
            ("MARQUEE_RETRY_MAX_ATTEMPTS", "0"),
            ("MARQUEE_RETRY_STATUS_CODES", "429, 503"),
        ]);

        let actual = resolve(fixture, None).unwrap();

        assert_eq!(actual.api_key.as_deref(), Some("sk-test"));
        assert_eq!(actual.provider_url, "http://localhost:1234/v1/");
        assert_eq!(actual.model, ModelId::new("gpt-4.1"));
        assert_eq!(actual.router_model, ModelId::new("gpt-4o-mini"));
        assert_eq!(actual.store, StoreConfig::Dataset(PathBuf::from("movies.json")));
        assert_eq!(actual.result_limit, 5);
        assert_eq!(actual.max_steps, 7);
        assert_eq!(actual.retry_config.max_retry_attempts, 0);
        assert_eq!(actual.retry_config.retry_status_codes, vec![429, 503]);
    }

    #[test]
    fn test_mongo_takes_precedence_over_dataset() {
        let fixture = lookup_from(&[
            ("MONGODB_CONNECTION_STRING", "mongodb://localhost"),
            ("MARQUEE_DATASET", "movies.json"),
        ]);

        let actual = resolve(fixture, None).unwrap().store;
        let expected = StoreConfig::Mongo {
            connection_string: "mongodb://localhost".to_string(),
            database: "sample_mflix".to_string(),
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_invalid_number_is_a_config_error() {
        let actual = resolve(lookup_from(&[("MARQUEE_MAX_STEPS", "lots")]), None);
        assert!(matches!(actual, Err(Error::Config(ref m)) if m.contains("MARQUEE_MAX_STEPS")));

        let actual = resolve(lookup_from(&[("MARQUEE_RESULT_LIMIT", "0")]), None);
        assert!(matches!(actual, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_all_nested_envs_override() {
        let root = tempdir().unwrap();
        let subdir = root.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        fs::write(root.path().join(".env"), "MARQUEE_TEST_A=ROOT\nMARQUEE_TEST_B=ROOT_ONLY").unwrap();
        fs::write(subdir.join(".env"), "MARQUEE_TEST_A=SUB").unwrap();

        let actual = EnvironmentService::load_all(&subdir);

        assert_eq!(actual.vars.get("MARQUEE_TEST_A").map(String::as_str), Some("SUB"));
        assert_eq!(actual.vars.get("MARQUEE_TEST_B").map(String::as_str), Some("ROOT_ONLY"));
        assert_eq!(actual.closest, Some(subdir.join(".env")));
    }
}
