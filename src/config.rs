use clap::Parser;

const HOST: &str = "127.0.0.1";
const PORT: u16 = 6380;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// The address to bind to
    #[arg(long, env = "MOCK_REDIS_HOST", default_value = HOST)]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "MOCK_REDIS_PORT", default_value_t = PORT)]
    pub port: u16,

    /// Log level used when `RUST_LOG` is not set
    #[arg(long, env = "MOCK_REDIS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            log_level: "info".to_string(),
        }
    }
}
