use std::fs;

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use frag_core::{frag, Options, RunResult};
use frag_store::{Backend, FsBackend, RemoteConfig, S3Backend};
use serde::Serialize;

use crate::cli::{Cli, Driver};

/// What the run report file contains.
#[derive(Serialize)]
struct RunReport {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    results: RunResult,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let backend: Box<dyn Backend> = match cli.driver {
        Driver::Fs => Box::new(FsBackend::new()),
        Driver::S3 => {
            let config = RemoteConfig::from_env()?;
            Box::new(S3Backend::connect(&config)?)
        }
    };

    let max_chunk_size = parse_size(&cli.chunk)
        .with_context(|| format!("invalid chunk size '{}'", cli.chunk))?;

    let options = Options {
        delete_src: cli.delete_src,
        src_prefix: cli.src_prefix.clone(),
        dst_prefix: cli.dst_prefix.clone(),
        crlf: cli.crlf,
        keep_prefixes: cli.keep_prefixes,
        strict_size: !cli.no_strict_size,
        threshold: cli.threshold,
    };

    let begin = Utc::now();
    let results = frag(backend.as_ref(), &cli.src, &cli.dst, max_chunk_size, options)?;
    let end = Utc::now();

    println!(
        "{} {} chunk(s) written, {} incomplete",
        "✓".green().bold(),
        results.done.len(),
        results.incomplete.len()
    );

    let report = RunReport {
        begin,
        end,
        results,
    };
    match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("unable to create '{}'", parent.display()))?;
                }
            }
            let json = serde_json::to_vec_pretty(&report)?;
            fs::write(path, json)
                .with_context(|| format!("unable to write results to '{}'", path.display()))?;
            println!("Result written to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Parse a human size string: a decimal number with an optional
/// (case-insensitive) `b`, `kb`, `mb`, `gb` or `tb` suffix, 1024-based.
fn parse_size(input: &str) -> anyhow::Result<u64> {
    let s = input.trim().to_ascii_lowercase();
    let digits_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(digits_end);

    let value: f64 = number
        .parse()
        .map_err(|_| anyhow::anyhow!("'{input}' is not a size"))?;
    let factor: u64 = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        "tb" => 1 << 40,
        other => anyhow::bail!("unknown size unit '{other}'"),
    };
    Ok((value * factor as f64) as u64)
}
