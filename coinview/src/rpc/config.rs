use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Host of the node that receives commands
    pub connect: String,
    pub port: u16,
    pub ssl: bool,
    pub auth: RpcAuth,
    /// Node-side server options, accepted from bitcoin.conf but unused by the client
    pub allow_ips: Vec<String>,
    pub cert_chain: PathBuf,
    pub private_key: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct RpcAuth {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl RpcConfig {
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.connect, self.port)
    }
}

impl RpcAuth {
    /// Basic-auth credentials, present whenever a user name is configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.user
            .as_deref()
            .map(|user| (user, self.password.as_deref().unwrap_or("")))
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connect: "127.0.0.1".to_string(),
            port: 8332,
            ssl: false,
            auth: RpcAuth::default(),
            allow_ips: vec!["127.0.0.1".to_string()],
            cert_chain: PathBuf::from("server.cert"),
            private_key: PathBuf::from("server.pem"),
        }
    }
}
