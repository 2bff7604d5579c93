use crate::core::{DbError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default port of the column-family RPC endpoint.
pub const DEFAULT_PORT: u16 = 9160;

const URL_SCHEME: &str = "colmapper://";

/// Store connection configuration
///
/// Passed verbatim to the store's `connect`; the mapping core itself only
/// reads `keyspace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Cluster contact points
    pub contact_nodes: Vec<String>,

    pub port: u16,

    /// Keyspace used by entity types that do not pin one
    pub keyspace: String,

    pub connect_timeout: Duration,

    /// Per-request timeout, enforced by the store
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(keyspace: &str) -> Self {
        Self {
            contact_nodes: vec!["localhost".to_string()],
            port: DEFAULT_PORT,
            keyspace: keyspace.to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
        }
    }

    pub fn contact_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contact_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn keyspace(mut self, keyspace: &str) -> Self {
        self.keyspace = keyspace.to_string();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Parse from connection string
    ///
    /// Format: "colmapper://host1,host2:port/keyspace"; the port is optional
    /// and applies to every node.
    ///
    /// ```ignore
    /// let config = ClientConfig::from_url("colmapper://10.0.0.1,10.0.0.2:9160/shop")?;
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| DbError::Config(format!("URL must start with '{}'", URL_SCHEME)))?;

        let (nodes_part, keyspace) = rest
            .split_once('/')
            .ok_or_else(|| DbError::Config("Missing keyspace in URL".to_string()))?;

        let (nodes_part, port) = match nodes_part.rsplit_once(':') {
            Some((nodes, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| DbError::Config(format!("Invalid port '{}'", port)))?;
                (nodes, port)
            }
            None => (nodes_part, DEFAULT_PORT),
        };

        let nodes: Vec<&str> = nodes_part
            .split(',')
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .collect();

        let config = Self::new(keyspace).contact_nodes(nodes).port(port);
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration the application keeps as JSON. Missing fields
    /// take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to connection string
    pub fn to_url(&self) -> String {
        format!(
            "{}{}:{}/{}",
            URL_SCHEME,
            self.contact_nodes.join(","),
            self.port,
            self.keyspace
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.contact_nodes.is_empty() {
            return Err(DbError::Config("At least one contact node is required".to_string()));
        }

        if self.contact_nodes.iter().any(|node| node.trim().is_empty()) {
            return Err(DbError::Config("Contact node cannot be blank".to_string()));
        }

        if self.port == 0 {
            return Err(DbError::Config("port must be > 0".to_string()));
        }

        if self.keyspace.is_empty() {
            return Err(DbError::Config("Keyspace cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("colmapper")
    }
}
