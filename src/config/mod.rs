use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "/opt/logrange/config.yaml";

/// Cluster host identifier; 0 means the id is assigned automatically.
pub type HostId = u16;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host_id: HostId,
    pub host_lease_ttl_sec: u32,
    /// 0 means wait forever
    pub host_register_timeout_sec: u32,
    pub journals_dir: PathBuf,
    pub public_api_rpc: TransportConfig,
    pub private_api_rpc: TransportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_id: 0,
            host_lease_ttl_sec: 5,
            host_register_timeout_sec: 0,
            journals_dir: PathBuf::from("/opt/logrange/db"),
            public_api_rpc: TransportConfig::listening_on("127.0.0.1:9966"),
            private_api_rpc: TransportConfig::listening_on("127.0.0.1:9967"),
        }
    }
}

/// RPC endpoint settings; used for both the public and the private API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub listen_addr: String,
    pub tls_enabled: bool,
    pub tls_2way: bool,
    pub tls_ca_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,
    pub tls_cert_file: Option<PathBuf>,
}

impl TransportConfig {
    fn listening_on(addr: &str) -> Self {
        Self {
            listen_addr: addr.to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.listen_addr.is_empty() {
            bail!("Config: {name}: listen address is empty");
        }
        if self.tls_2way && !self.tls_enabled {
            bail!("Config: {name}: 2-way TLS requires TLS to be enabled");
        }
        if !self.tls_enabled {
            return Ok(());
        }
        if self.tls_cert_file.is_none() || self.tls_key_file.is_none() {
            bail!("Config: {name}: TLS requires both a cert and a key file");
        }
        if self.tls_2way && self.tls_ca_file.is_none() {
            bail!("Config: {name}: 2-way TLS requires a CA file");
        }
        Ok(())
    }
}

/// Overrides coming from the command line; `None` keeps the loaded value.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub host_id: Option<HostId>,
    pub host_lease_ttl_sec: Option<u32>,
    pub host_register_timeout_sec: Option<u32>,
    pub journals_dir: Option<PathBuf>,
    pub public_api_rpc: TransportOverrides,
    pub private_api_rpc: TransportOverrides,
}

#[derive(Debug, Clone, Default)]
pub struct TransportOverrides {
    pub listen_addr: Option<String>,
    pub tls_enabled: Option<bool>,
    pub tls_2way: Option<bool>,
    pub tls_ca_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,
    pub tls_cert_file: Option<PathBuf>,
}

impl TransportOverrides {
    fn apply(&self, cfg: &mut TransportConfig) {
        if let Some(addr) = &self.listen_addr {
            cfg.listen_addr = addr.clone();
        }
        if let Some(enabled) = self.tls_enabled {
            cfg.tls_enabled = enabled;
        }
        if let Some(two_way) = self.tls_2way {
            cfg.tls_2way = two_way;
        }
        if let Some(ca) = &self.tls_ca_file {
            cfg.tls_ca_file = Some(ca.clone());
        }
        if let Some(key) = &self.tls_key_file {
            cfg.tls_key_file = Some(key.clone());
        }
        if let Some(cert) = &self.tls_cert_file {
            cfg.tls_cert_file = Some(cert.clone());
        }
    }
}

impl ServerConfig {
    /// Layer the config file (if it exists) over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let defaults = ::config::Config::try_from(&ServerConfig::default())
            .context("Config: Failed to build defaults")?;

        let mut builder = ::config::Config::builder().add_source(defaults);
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            builder = builder.add_source(::config::File::from(path));
        } else {
            tracing::warn!("No file {:?}, will use default configuration", path);
        }

        let settings = builder
            .build()
            .with_context(|| format!("Config: Failed to read {:?}", path))?;
        settings
            .try_deserialize()
            .with_context(|| format!("Config: Invalid configuration in {:?}", path))
    }

    pub fn apply(&mut self, overrides: &ServerOverrides) {
        if let Some(host_id) = overrides.host_id {
            self.host_id = host_id;
        }
        if let Some(ttl) = overrides.host_lease_ttl_sec {
            self.host_lease_ttl_sec = ttl;
        }
        if let Some(timeout) = overrides.host_register_timeout_sec {
            self.host_register_timeout_sec = timeout;
        }
        if let Some(dir) = &overrides.journals_dir {
            self.journals_dir = dir.clone();
        }
        overrides.public_api_rpc.apply(&mut self.public_api_rpc);
        overrides.private_api_rpc.apply(&mut self.private_api_rpc);
    }

    pub fn validate(&self) -> Result<()> {
        if self.host_lease_ttl_sec == 0 {
            bail!("Config: host lease TTL must be positive");
        }
        if self.journals_dir.as_os_str().is_empty() {
            bail!("Config: journals dir is empty");
        }
        self.public_api_rpc.validate("public RPC API")?;
        self.private_api_rpc.validate("private RPC API")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let cfg = ServerConfig::load(Path::new("/nonexistent/logrange.yaml")).unwrap();
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn file_overrides_only_given_fields() {
        let file = write_config(
            ".yaml",
            "host_lease_ttl_sec: 30\npublic_api_rpc:\n  listen_addr: 0.0.0.0:9966\n",
        );
        let cfg = ServerConfig::load(file.path()).unwrap();

        assert_eq!(cfg.host_lease_ttl_sec, 30);
        assert_eq!(cfg.public_api_rpc.listen_addr, "0.0.0.0:9966");
        assert!(!cfg.public_api_rpc.tls_enabled);
        assert_eq!(cfg.private_api_rpc, ServerConfig::default().private_api_rpc);
        assert_eq!(cfg.journals_dir, PathBuf::from("/opt/logrange/db"));
    }

    #[test]
    fn json_config_is_accepted() {
        let file = write_config(".json", r#"{"host_id": 7, "journals_dir": "/tmp/jrnl"}"#);
        let cfg = ServerConfig::load(file.path()).unwrap();
        assert_eq!(cfg.host_id, 7);
        assert_eq!(cfg.journals_dir, PathBuf::from("/tmp/jrnl"));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut cfg = ServerConfig::default();
        cfg.apply(&ServerOverrides {
            host_id: Some(3),
            private_api_rpc: TransportOverrides {
                tls_enabled: Some(true),
                tls_cert_file: Some("/etc/cert.pem".into()),
                ..Default::default()
            },
            ..Default::default()
        });

        assert_eq!(cfg.host_id, 3);
        assert_eq!(cfg.host_lease_ttl_sec, 5);
        assert!(cfg.private_api_rpc.tls_enabled);
        assert_eq!(
            cfg.private_api_rpc.tls_cert_file,
            Some(PathBuf::from("/etc/cert.pem"))
        );
        assert!(!cfg.public_api_rpc.tls_enabled);
    }

    #[test]
    fn tls_validation() {
        assert!(ServerConfig::default().validate().is_ok());

        let mut transport = TransportConfig::listening_on("127.0.0.1:1");
        transport.tls_enabled = true;
        transport.tls_cert_file = Some("cert.pem".into());
        assert!(transport.validate("test").is_err());

        transport.tls_key_file = Some("key.pem".into());
        assert!(transport.validate("test").is_ok());

        transport.tls_2way = true;
        let err = transport.validate("test").unwrap_err();
        assert!(err.to_string().contains("CA file"));

        transport.tls_ca_file = Some("ca.pem".into());
        assert!(transport.validate("test").is_ok());

        transport.tls_enabled = false;
        assert!(transport.validate("test").is_err());
    }
}
