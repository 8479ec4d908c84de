use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use lokiship::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
    }
}

fn masked(config: &Config) -> Config {
    Config {
        loki: config.loki.masked(),
        ..config.clone()
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    let config = masked(config);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&config)?);
        }
        OutputFormat::Text => {
            let unset = || "(unset)".dimmed().to_string();
            let loki = &config.loki;

            println!("{}", "lokiship Configuration".bold());
            println!();
            println!("log_level: {}", config.log_level.as_filter());
            println!();

            println!("{}:", "loki".cyan());
            println!("  endpoint: {}", loki.endpoint.clone().unwrap_or_else(unset));
            println!("  tenant: {}", loki.tenant.clone().unwrap_or_else(unset));
            println!("  username: {}", loki.username.clone().unwrap_or_else(unset));
            println!("  password: {}", loki.password.clone().unwrap_or_else(unset));
            println!("  proxy_url: {}", loki.proxy_url.clone().unwrap_or_else(unset));
            println!("  proxy_user: {}", loki.proxy_user.clone().unwrap_or_else(unset));
            println!("  order_writes: {}", loki.order_writes);
            println!("  timeout_secs: {}", loki.timeout_secs);
            println!("  compression: {:?}", loki.compression);
            println!("  event_properties_as_labels: {}", loki.event_properties_as_labels);
            println!("  layout: {}", loki.layout);
            println!("  labels:");
            if loki.labels.is_empty() {
                println!("    {}", "(none)".dimmed());
            }
            for label in &loki.labels {
                println!("    {} = {}", label.name.green(), label.layout);
            }
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    let loki = &config.loki;
    let opt = |v: &Option<String>| Some(v.clone().unwrap_or_default());
    match key {
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        "loki.endpoint" => opt(&loki.endpoint),
        "loki.tenant" => opt(&loki.tenant),
        "loki.username" => opt(&loki.username),
        "loki.proxy_url" => opt(&loki.proxy_url),
        "loki.proxy_user" => opt(&loki.proxy_user),
        "loki.order_writes" => Some(loki.order_writes.to_string()),
        "loki.timeout_secs" => Some(loki.timeout_secs.to_string()),
        "loki.compression" => Some(serde_json::to_value(loki.compression).ok()?.as_str()?.to_string()),
        "loki.event_properties_as_labels" => Some(loki.event_properties_as_labels.to_string()),
        "loki.layout" => Some(loki.layout.clone()),
        _ => None,
    }
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => eyre::bail!("Unknown config key: {}", key),
    }

    Ok(())
}
