use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub bus: BusConfig,
    /// §6: "anonymous user-id permitted for dev, rejected in production."
    pub require_user_id: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    pub url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL").expect("NATS_URL must be set");

        let host = std::env::var("GATEWAY_HOST").unwrap_or_else(|_| default_host());
        let port = std::env::var("GATEWAY_PORT")
            .unwrap_or_else(|_| default_port().to_string())
            .parse()
            .expect("GATEWAY_PORT must be a valid number");

        let require_user_id = std::env::var("GATEWAY_REQUIRE_USER_ID")
            .ok()
            .map(|v| v == "true")
            .unwrap_or(false);

        Ok(Config {
            server: ServerConfig { host, port },
            bus: BusConfig { url: nats_url },
            require_user_id,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
