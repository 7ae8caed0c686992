use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Files larger than this are always rejected, whatever the server limits allow.
pub const UPLOAD_POLICY_BYTES: u64 = 30 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "vibecheck", about = "Partner/influencer marketplace API server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UploadConfig {
    /// Fallback upload directory (defaults to `<data_dir>/uploads`).
    pub path: Option<PathBuf>,
    /// Public web root; when set and present, files go to `<public_root>/uploads`.
    pub public_root: Option<PathBuf>,
    /// Base URL the stored files are reachable under. Derived from the
    /// request's own scheme and host when unset.
    pub public_base_url: Option<String>,
    pub max_file_bytes: u64,
    /// Per-file limit enforced by the HTTP layer, 0 = unset.
    pub server_upload_max: u64,
    /// Whole-body limit enforced by the HTTP layer, 0 = unset.
    pub server_body_max: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    /// Emit `SameSite=None; Secure` cookies for cross-origin dashboards.
    pub secure_cookie: bool,
    /// Accept caller-supplied user ids without a matching session.
    /// Local development only.
    pub trust_client_ids: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: None,
            public_root: None,
            public_base_url: None,
            max_file_bytes: UPLOAD_POLICY_BYTES,
            server_upload_max: 64 * 1024 * 1024,
            server_body_max: 64 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "vibecheck_session".to_string(),
            session_hours: 720,
            secure_cookie: false,
            trust_client_ids: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "https://scout-and-clout.lovable.app".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    /// The smaller of the two server limits when both are set, otherwise
    /// whichever one is. Zero means no server limit is configured.
    pub fn effective_server_limit(&self) -> u64 {
        match (self.server_upload_max, self.server_body_max) {
            (0, body) => body,
            (file, 0) => file,
            (file, body) => file.min(body),
        }
    }

    /// Largest request body the HTTP layer has to accept for an upload.
    pub fn body_limit(&self) -> usize {
        let limit = match self.effective_server_limit() {
            0 => self.max_file_bytes,
            n => n.max(self.max_file_bytes),
        };
        // multipart framing overhead on top of the file itself
        limit as usize + 64 * 1024
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        config.database.path = Some(match config.database.path.take() {
            Some(p) if p.is_relative() => data_dir.join(p),
            Some(p) => p,
            None => data_dir.join("vibecheck.db"),
        });
        config.uploads.path = Some(match config.uploads.path.take() {
            Some(p) if p.is_relative() => data_dir.join(p),
            Some(p) => p,
            None => data_dir.join("uploads"),
        });

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".vibecheck")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("vibecheck.db"))
    }

    /// Where uploaded files are written. A configured public web root wins
    /// when its parent directory exists.
    pub fn uploads_path(&self) -> PathBuf {
        if let Some(root) = &self.uploads.public_root {
            let parent_exists = root.parent().map(|p| p.is_dir()).unwrap_or(false);
            if parent_exists {
                return root.join("uploads");
            }
        }
        self.uploads
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.cookie_name, "vibecheck_session");
        assert_eq!(config.auth.session_hours, 720);
        assert!(!config.auth.trust_client_ids);
        assert_eq!(config.uploads.max_file_bytes, UPLOAD_POLICY_BYTES);
        assert_eq!(config.cors.allowed_origins.len(), 2);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_defaults_to_home_dot_vibecheck() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
        };
        assert!(Config::data_dir(&cli).ends_with(".vibecheck"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.db_path(), tmp.path().join("vibecheck.db"));
        assert_eq!(config.uploads_path(), tmp.path().join("uploads"));
    }

    #[test]
    fn load_reads_toml_and_cli_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[database]
path = "db/app.db"

[auth]
cookie_name = "vc"
secure_cookie = true

[cors]
allowed_origins = ["https://example.com"]
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.db_path(), tmp.path().join("db/app.db"));
        assert_eq!(config.auth.cookie_name, "vc");
        assert!(config.auth.secure_cookie);
        assert_eq!(config.cors.allowed_origins, vec!["https://example.com"]);
    }

    #[test]
    fn public_root_used_when_parent_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::load(&cli_with(tmp.path().to_path_buf())).unwrap();

        config.uploads.public_root = Some(tmp.path().join("www"));
        assert_eq!(config.uploads_path(), tmp.path().join("www").join("uploads"));

        config.uploads.public_root = Some(PathBuf::from("/definitely/missing/www"));
        assert_eq!(config.uploads_path(), tmp.path().join("uploads"));
    }

    #[test]
    fn effective_server_limit_takes_min_or_whichever_is_set() {
        let mut uploads = UploadConfig::default();
        uploads.server_upload_max = 8 * 1024 * 1024;
        uploads.server_body_max = 40 * 1024 * 1024;
        assert_eq!(uploads.effective_server_limit(), 8 * 1024 * 1024);

        uploads.server_upload_max = 0;
        assert_eq!(uploads.effective_server_limit(), 40 * 1024 * 1024);

        uploads.server_body_max = 0;
        assert_eq!(uploads.effective_server_limit(), 0);
    }
}
