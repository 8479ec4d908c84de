//! Report how the configured endpoint resolves

use colored::*;
use eyre::{Context, Result};
use serde::Serialize;

use crate::cli::OutputFormat;
use lokiship::config::Config;
use lokiship::endpoint::{client_settings, parse_endpoint};
use lokiship::transport::PUSH_PATH;
use lokiship::LokiTarget;

#[derive(Debug, Serialize)]
struct CheckReport {
    transport: &'static str,
    endpoint: Option<String>,
    push_url: Option<String>,
    problem: Option<String>,
    basic_auth: bool,
    tenant: Option<String>,
    proxy: Option<String>,
    proxy_credentials: bool,
}

fn report(config: &Config) -> Result<CheckReport> {
    let target = LokiTarget::new(config.loki.clone()).context("Invalid layout in Loki configuration")?;
    let rendered = target.rendered_config();

    let (push_url, problem, settings) = match parse_endpoint(rendered.endpoint.as_deref()) {
        Ok(base) => {
            let push_url = base.join(PUSH_PATH).ok().map(|u| u.to_string());
            (push_url, None, Some(client_settings(&rendered, base)))
        }
        Err(e) => (None, Some(e.to_string()), None),
    };

    let proxy = settings.as_ref().and_then(|s| s.proxy.as_ref());

    Ok(CheckReport {
        transport: target.transport().kind(),
        endpoint: rendered.endpoint.clone(),
        push_url,
        problem,
        basic_auth: settings.as_ref().is_some_and(|s| s.basic_auth_header().is_some()),
        tenant: settings.as_ref().and_then(|s| s.tenant_header().map(str::to_string)),
        proxy: proxy.map(|p| p.url.to_string()),
        proxy_credentials: proxy.is_some_and(|p| p.credentials.is_some()),
    })
}

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    let report = report(config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &CheckReport) {
    println!("{}", "lokiship Check".bold());
    println!("{}", "═".repeat(50));
    println!();

    match (&report.push_url, &report.problem) {
        (Some(url), _) => {
            println!("{} Transport: {}", "✓".green(), report.transport.cyan());
            println!("{} Push URL: {}", "✓".green(), url);
        }
        (None, problem) => {
            println!("{} Transport: {} (nothing will be sent)", "✗".red(), report.transport.yellow());
            if let Some(problem) = problem {
                println!("  {}", problem.dimmed());
            }
            return;
        }
    }

    let mark = |on: bool| if on { "✓".green() } else { "-".dimmed() };
    println!("{} Basic auth", mark(report.basic_auth));
    match &report.tenant {
        Some(tenant) => println!("{} Tenant: {}", mark(true), tenant),
        None => println!("{} Tenant", mark(false)),
    }
    match &report.proxy {
        Some(proxy) => println!(
            "{} Proxy: {}{}",
            mark(true),
            proxy,
            if report.proxy_credentials { " (with credentials)" } else { "" }
        ),
        None => println!("{} Proxy", mark(false)),
    }
}
