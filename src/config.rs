use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "llm-router-openai",
    about = "OpenAI-compatible streaming front for prompt-only chat engines"
)]
pub struct Config {
    /// Interface to listen on
    #[arg(long, default_value = "0.0.0.0", env = "ROUTER_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 9123, env = "ROUTER_PORT")]
    pub port: u16,

    /// Base URL of the upstream chat engine
    #[arg(long, default_value = "http://127.0.0.1:11434", env = "UPSTREAM_BASE")]
    pub upstream_base: String,

    /// Session id handed to the upstream engine at startup
    #[arg(long, default_value = "", env = "UPSTREAM_SESSION_ID", hide_env_values = true)]
    pub session_id: String,

    /// Upper bound for one upstream completion, in seconds
    #[arg(long, default_value_t = 600, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
