use pkl_props::{AppContext, Config, ConfigError, Environment};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
#[allow(dead_code)]
struct Server {
    host: String,
    port: u16,
    base_url: String,
    endpoints: Vec<String>,
    timeout_secs: Option<u64>,
}

impl Server {
    fn bind(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            host: env.get_required_property("server.host")?,
            port: env.get_required_property_as("server.port")?,
            base_url: env.get_required_property("server.baseUrl")?,
            endpoints: env.get_property_as("server.endpoints")?.unwrap_or_default(),
            timeout_secs: env.get_property_as::<Option<u64>>("server.timeout")?.flatten(),
        })
    }
}

fn main() -> Result<(), pkl_props::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // defaults -> pkl module -> SERVER_APP__* variables
    let environment = Config::builder()
        .with_file("demos/defaults.toml", true)
        .with_file("demos/application.pkl", false)
        .with_env("SERVER_APP", "__")
        .build()?;

    let ctx = AppContext::builder()
        .with_environment(environment)
        .bind_config(Server::bind)?
        .build()?;

    println!("{:#?}", ctx.config());
    for source in ctx.environment().sources() {
        println!(
            "{}",
            serde_json::to_string_pretty(source).unwrap_or_else(|e| e.to_string())
        );
    }

    Ok(())
}
