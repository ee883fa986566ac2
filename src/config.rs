use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, fs, path};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "redis_addr_default")]
    pub redis_addr: String,
    #[serde(default = "listen_addr_default")]
    pub listen_addr: String,
    /// Origin allowed to report visits. Empty means no web origin is
    /// admitted; `*` admits everything for local debugging.
    #[serde(default)]
    pub allowed_origin: String,
    /// Shared secret for the admin dashboard. Unset disables admin access.
    #[serde(default)]
    pub dashboard_token: Option<String>,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "health_check_port_default")]
    pub health_check_port: u16,
}

impl Config {
    fn get_config_dir() -> anyhow::Result<path::PathBuf> {
        let config_dir = if let Ok(xdg_path) = env::var("XDG_CONFIG_HOME") {
            path::PathBuf::from(&xdg_path)
        } else {
            path::Path::new(&env::var("HOME")?).join(".config")
        };

        let dir = config_dir.join("pv_keeper");

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        Ok(dir)
    }

    /// Read the config file, then let environment variables override it.
    /// A missing file is fine: every field has a default, and an env-only
    /// deployment never writes a file at all.
    pub fn load() -> anyhow::Result<Self> {
        let file_path = if let Ok(cfg_path) = env::var("PV_KEEPER_CFG_PATH") {
            path::PathBuf::from(cfg_path)
        } else {
            Self::get_config_dir()
                .with_context(|| "fail to open config directory")?
                .join("config.toml")
        };

        let content = if file_path.exists() {
            fs::read_to_string(file_path).with_context(|| "fail to read config file")?
        } else {
            String::new()
        };

        let mut config: Config =
            toml::from_str(&content).with_context(|| "fail to parse config from toml")?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = env::var("REDIS_ADDR") {
            self.redis_addr = addr;
        }
        if let Ok(addr) = env::var("LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Ok(origin) = env::var("ALLOWED_ORIGIN") {
            self.allowed_origin = origin;
        }
        if let Ok(token) = env::var("DASHBOARD_TOKEN") {
            self.dashboard_token = Some(token);
        }
    }
}

fn redis_addr_default() -> String {
    "redis://localhost:6379".to_string()
}

fn listen_addr_default() -> String {
    "0.0.0.0:8080".to_string()
}

fn log_level_default() -> String {
    "INFO".to_string()
}

fn health_check_port_default() -> u16 {
    11451
}

#[test]
fn validate_file_correctness() {
    let dir = env::temp_dir().join("pv-keeper-test-dir").join("pv_keeper");
    fs::create_dir_all(&dir).unwrap();
    let config = r#"
        redis_addr = "redis://localhost"
        listen_addr = "127.0.0.1:9000"
        allowed_origin = "https://blog.example.com"
        dashboard_token = "s3cret"
        log_level = "DEBUG"
        health_check_port = 11451
    "#;
    let path = dir.join("config.toml");
    fs::write(&path, config).unwrap();
    env::set_var("PV_KEEPER_CFG_PATH", &path);

    let config = Config::load().unwrap();
    assert_eq!(config.listen_addr, "127.0.0.1:9000");
    assert_eq!(config.allowed_origin, "https://blog.example.com");
    assert_eq!(config.dashboard_token.as_deref(), Some("s3cret"));

    // Environment wins over the file.
    env::set_var("ALLOWED_ORIGIN", "*");
    env::set_var("DASHBOARD_TOKEN", "override");
    let config = Config::load().unwrap();
    assert_eq!(config.allowed_origin, "*");
    assert_eq!(config.dashboard_token.as_deref(), Some("override"));

    env::remove_var("ALLOWED_ORIGIN");
    env::remove_var("DASHBOARD_TOKEN");
    env::remove_var("PV_KEEPER_CFG_PATH");
    fs::remove_dir_all(env::temp_dir().join("pv-keeper-test-dir")).unwrap();
}
