// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Twinmapper CLI entrypoint.
//!
//! Runs the terminal UI by default. `--print` normalizes the inputs, prints every row and exits.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use twinmapper::config::{AppConfig, Cli};
use twinmapper::model::{DraftTwin, Node};
use twinmapper::normalize::{normalize_models, normalize_opcua, normalize_twins};
use twinmapper::store::{load_json, PageSource, TwinPager};
use twinmapper::tui::{self, row_text, App, Inputs};

const LOG_ENV: &str = "TWINMAPPER_LOG";

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("twinmapper: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::resolve(&cli)?;
    init_tracing(cli.print, cli.log_file.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async move {
        let opcua = match &cli.opcua {
            Some(path) => Some(load_json(path).await?),
            None => None,
        };
        let models = match &cli.models {
            Some(path) => Some(load_json(path).await?),
            None => None,
        };
        let twins = match &cli.twins {
            Some(path) => load_json(path).await?,
            None => Value::Array(Vec::new()),
        };

        if cli.print {
            return print_rows(opcua.as_ref(), models.as_ref(), &twins, &cli.drafts);
        }

        let pager = Arc::new(TwinPager::from_document(twins, config.page_size));
        let first_page = pager.fetch_page(0).await?;
        tracing::info!(twins = pager.len(), pages = pager.pages(), "starting terminal ui");

        let inputs = Inputs { opcua, models, first_page: Some(first_page), drafts: cli.drafts };
        let app = App::new(&config, inputs);
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || {
            tui::run(app, pager, handle).map_err(|err| err.to_string())
        })
        .await??;
        Ok::<(), Box<dyn Error>>(())
    })
}

/// Logs go to stderr with `--print` and to `--log-file` (if any) under the terminal UI.
fn init_tracing(print: bool, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if print {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    } else if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        registry.with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))).init();
    }
    Ok(())
}

fn print_rows(
    opcua: Option<&Value>,
    models: Option<&Value>,
    twins: &Value,
    drafts: &[DraftTwin],
) -> Result<(), Box<dyn Error>> {
    let mut out = io::stdout().lock();
    if let Some(opcua) = opcua {
        let normalized = normalize_opcua(opcua)?;
        writeln!(out, "# opcua ({} tags)", normalized.tags)?;
        write_rows(&mut out, &normalized.rows)?;
    }
    if let Some(models) = models {
        let normalized = normalize_models(models)?;
        writeln!(out, "# models ({} top-level)", normalized.index.len())?;
        write_rows(&mut out, &normalized.rows)?;
    }

    let normalized = normalize_twins(twins, drafts)?;
    writeln!(out, "# twins ({} across {} models)", normalized.groups.total(), normalized.groups.len())?;
    write_rows(&mut out, &normalized.rows)?;
    Ok(())
}

fn write_rows(out: &mut impl Write, rows: &[Node]) -> io::Result<()> {
    for node in rows {
        writeln!(out, "{:<12} {}", node.kind.as_str(), row_text(node))?;
    }
    Ok(())
}
