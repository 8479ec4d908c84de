//! Push lines from a file or stdin
//!
//! Every non-empty line becomes one record. Records are sent in batches through a
//! single `LokiTarget`, so the transport is built once for the whole run.

use colored::*;
use eyre::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::PushArgs;
use lokiship::config::Config;
use lokiship::{LogRecord, LokiError, LokiTarget};

pub fn run(args: PushArgs, config: &Config) -> Result<()> {
    let level: log::Level = args
        .level
        .parse()
        .map_err(|_| eyre::eyre!("Invalid level '{}' (use error, warn, info, debug or trace)", args.level))?;
    let properties = parse_properties(&args.properties)?;

    let target = LokiTarget::new(config.loki.clone()).context("Invalid layout in Loki configuration")?;
    if target.transport().is_null() {
        eprintln!(
            "{} No usable Loki endpoint configured; lines will be read but not sent",
            "⚠".yellow()
        );
    }

    let reader: Box<dyn BufRead> = match &args.file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).context(format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let cancel = CancellationToken::new();
    let batch_size = args.batch_size as usize;

    let mut batch = Vec::with_capacity(batch_size);
    let mut sent = 0usize;

    for line in reader.lines() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let mut record = LogRecord::new(level, args.logger.as_str(), line);
        for (key, value) in &properties {
            record = record.with_property(key.as_str(), value.as_str());
        }
        batch.push(record);

        if batch.len() >= batch_size {
            sent += flush(&rt, &target, &mut batch, &cancel)?;
        }
    }
    sent += flush(&rt, &target, &mut batch, &cancel)?;

    log::info!("Pushed {} lines via {} transport", sent, target.transport().kind());
    println!("{} Pushed {} lines", "✓".green(), sent);

    Ok(())
}

fn flush(
    rt: &tokio::runtime::Runtime,
    target: &LokiTarget,
    batch: &mut Vec<LogRecord>,
    cancel: &CancellationToken,
) -> Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }

    let count = batch.len();
    rt.block_on(target.write_batch(batch.as_slice(), cancel))
        .map_err(|e| describe(e, count))?;
    batch.clear();
    Ok(count)
}

fn describe(err: LokiError, count: usize) -> eyre::Report {
    let context = match &err {
        LokiError::Delivery(delivery) => format!(
            "Loki rejected a batch of {} lines (HTTP {} {})",
            count,
            delivery.status,
            delivery.reason.as_deref().unwrap_or_default()
        ),
        _ => format!("Failed to push a batch of {} lines", count),
    };
    eyre::Report::new(err).wrap_err(context)
}

fn parse_properties(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|item| {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| eyre::eyre!("Invalid property '{}', expected KEY=VALUE", item))?;
            let key = key.trim();
            if key.is_empty() {
                eyre::bail!("Invalid property '{}', key is empty", item);
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lokiship::DeliveryError;

    #[test]
    fn test_parse_properties() {
        let parsed = parse_properties(&["host=web-1".to_string(), "expr=a=b".to_string()]).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("host".to_string(), "web-1".to_string()),
                ("expr".to_string(), "a=b".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_properties_rejects_malformed() {
        assert!(parse_properties(&["novalue".to_string()]).is_err());
        assert!(parse_properties(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_describe_delivery_error() {
        let err = LokiError::Delivery(DeliveryError {
            status: 429,
            reason: Some("Too Many Requests".to_string()),
            body: None,
        });
        let report = describe(err, 3);
        let text = format!("{:#}", report);
        assert!(text.contains("HTTP 429 Too Many Requests"));
        assert!(text.contains("Failed pushing logs to Loki."));
    }
}
