use clap::Parser;

#[derive(Parser)]
#[command(name = "gproxy")]
pub(crate) struct Cli {
    /// Path to the JSON config file (spec §6: providers, port, admin password).
    #[arg(long, env = "GPROXY_CONFIG", default_value = "config.json")]
    pub(crate) config: String,

    #[arg(long, env = "GPROXY_HOST")]
    pub(crate) host: Option<String>,

    #[arg(long, env = "GPROXY_PORT")]
    pub(crate) port: Option<u16>,

    #[arg(long, env = "GPROXY_ADMIN_PASSWORD")]
    pub(crate) admin_password: Option<String>,
}
