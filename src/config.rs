// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Command line and JSON configuration. Flags given on the command line win over the file.

use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::model::{DraftTwin, NodeKind, ParentRelationship};
use crate::tree::TreeOptions;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAPPINGS_OUT: &str = "mappings.json";

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "twinmapper", version, about = "Map OPC-UA nodes onto digital twin properties")]
pub struct Cli {
    /// DTDL interface definitions (array, `{ value: [...] }` page, or a single interface).
    #[arg(long, value_name = "FILE")]
    pub models: Option<PathBuf>,

    /// Twin query results.
    #[arg(long, value_name = "FILE")]
    pub twins: Option<PathBuf>,

    /// OPC-UA node tree whose tags are mapped onto twin properties.
    #[arg(long, value_name = "FILE")]
    pub opcua: Option<PathBuf>,

    /// Stage a twin that does not exist yet, optionally with parents
    /// (`MODEL=TWIN@REL:SOURCE,REL:SOURCE`). Repeatable.
    #[arg(long = "draft", value_name = "MODEL=TWIN[@REL:SOURCE,..]", value_parser = parse_draft)]
    pub drafts: Vec<DraftTwin>,

    /// JSON configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Twins per lazily fetched page.
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Print the normalized rows and exit instead of starting the terminal UI.
    #[arg(long)]
    pub print: bool,

    /// Where `w` saves the mapping table.
    #[arg(long, value_name = "FILE")]
    pub mappings_out: Option<PathBuf>,

    /// Log file for the terminal UI (log level via `TWINMAPPER_LOG`).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

pub(crate) fn parse_draft(raw: &str) -> Result<DraftTwin, String> {
    let malformed = || format!("expected MODEL=TWIN[@REL:SOURCE,..], got '{raw}'");
    let (model_id, rest) = raw.split_once('=').ok_or_else(malformed)?;
    let (twin_id, parents) = match rest.split_once('@') {
        Some((twin_id, parents)) => (twin_id, Some(parents)),
        None => (rest, None),
    };
    let (model_id, twin_id) = (model_id.trim(), twin_id.trim());
    if model_id.is_empty() || twin_id.is_empty() {
        return Err(malformed());
    }

    let mut draft = DraftTwin::new(model_id, twin_id);
    if let Some(parents) = parents {
        draft.parent_rels = parse_parents(parents).ok_or_else(malformed)?;
    }
    Ok(draft)
}

/// `REL:SOURCE` pairs separated by commas. Display names are filled in once models are known.
pub(crate) fn parse_parents(raw: &str) -> Option<Vec<ParentRelationship>> {
    raw.split(',')
        .map(|pair| {
            let (name, source) = pair.split_once(':')?;
            let (name, source) = (name.trim(), source.trim());
            (!name.is_empty() && !source.is_empty()).then(|| ParentRelationship {
                name: name.to_owned(),
                display_name: None,
                source: source.to_owned(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub opcua_tree: TreeOptions,
    pub models_tree: TreeOptions,
    pub twins_tree: TreeOptions,
    pub page_size: usize,
    pub mappings_out: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            opcua_tree: TreeOptions { selectable_kinds: vec![NodeKind::Tag], ..TreeOptions::default() },
            models_tree: TreeOptions {
                selectable_kinds: vec![NodeKind::Property],
                ..TreeOptions::default()
            },
            twins_tree: TreeOptions {
                select_descendants_with_parent: true,
                selectable_kinds: vec![NodeKind::Model, NodeKind::TwinInstance],
                ..TreeOptions::default()
            },
            page_size: DEFAULT_PAGE_SIZE,
            mappings_out: PathBuf::from(DEFAULT_MAPPINGS_OUT),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

impl AppConfig {
    pub fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(path, &text)
    }

    /// Config file (if any) with command line overrides applied.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(page_size) = cli.page_size {
            config.page_size = page_size;
        }
        if let Some(path) = &cli.mappings_out {
            config.mappings_out = path.clone();
        }
        if config.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(config)
    }
}
