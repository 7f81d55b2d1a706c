// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Terminal UI.
//!
//! Four panes: the OPC-UA node tree, the models tree, the twins tree and the mapping table.
//! [`App`] owns the tree controllers but never touches the terminal or the runtime. Page fetches
//! and saves leave it as [`Command`]s that [`run`] executes on the tokio handle, and their
//! results come back as [`Message`]s polled on every tick.

mod rows;

pub use rows::row_text;

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::config::{parse_draft, parse_parents, AppConfig};
use crate::mapping::{MappingEntry, MappingTable};
use crate::model::{DraftTwin, MappingKey, Node, NodeKind, ParentRelationship, RowKey};
use crate::normalize::{
    incoming_relationships, normalize_models, normalize_opcua, normalize_twins, NormalizeError,
    RelationshipDecl,
};
use crate::search::{restrict_to_model, rows_to_render};
use crate::store::{save_mappings, Page, PageSource, StoreError};
use crate::tree::{Action, Effect, PageRequest, TreeRow, TreeState};

const FOCUS_COLOR: Color = Color::LightGreen;
const IDLE_BORDER_COLOR: Color = Color::DarkGray;
const CURSOR_BG: Color = Color::DarkGray;
const ERROR_COLOR: Color = Color::LightRed;
const FOOTER_KEY_COLOR: Color = Color::Cyan;
const FOOTER_LABEL_COLOR: Color = Color::Gray;
const TOAST_TTL: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Parent candidates listed in the parents prompt before it is cut short.
const PROMPT_CANDIDATES: usize = 4;

const FOOTER_HINTS: [(&str, &str); 10] = [
    ("Tab", "pane"),
    ("j/k", "move"),
    ("Enter", "fold"),
    ("Space", "select"),
    ("/", "search"),
    ("f", "model filter"),
    ("n", "new twin"),
    ("m", "map"),
    ("e", "edit"),
    ("w", "save"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Opcua,
    Models,
    Twins,
    Mappings,
}

impl Focus {
    const ALL: [Focus; 4] = [Focus::Opcua, Focus::Models, Focus::Twins, Focus::Mappings];

    fn next(self) -> Self {
        match self {
            Self::Opcua => Self::Models,
            Self::Models => Self::Twins,
            Self::Twins => Self::Mappings,
            Self::Mappings => Self::Opcua,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Opcua => Self::Mappings,
            Self::Models => Self::Opcua,
            Self::Twins => Self::Models,
            Self::Mappings => Self::Twins,
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Opcua => 0,
            Self::Models => 1,
            Self::Twins => 2,
            Self::Mappings => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Search,
    Draft,
    /// Parent relationships of the draft held in `App::pending_draft`.
    Parents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Prompt {
    kind: PromptKind,
    label: String,
    input: String,
}

impl Prompt {
    fn new(kind: PromptKind, label: impl Into<String>, input: String) -> Self {
        Self { kind, label: label.into(), input }
    }
}

/// Work the run loop performs on behalf of the app.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchPage(PageRequest),
    SaveMappings { path: PathBuf, entries: Vec<MappingEntry> },
}

/// Results of [`Command`]s, fed back through [`App::apply_message`].
#[derive(Debug)]
pub enum Message {
    PageLoaded { generation: u64, result: Result<Page, StoreError> },
    Saved { path: PathBuf, result: Result<usize, StoreError> },
}

/// Documents the app starts from.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub opcua: Option<Value>,
    pub models: Option<Value>,
    pub first_page: Option<Page>,
    pub drafts: Vec<DraftTwin>,
}

struct Toast {
    message: String,
    expires_at: Instant,
}

pub struct App {
    opcua: TreeState,
    opcua_tags: usize,
    models: TreeState,
    twins: TreeState,
    relationships: Vec<RelationshipDecl>,
    /// Every raw twin loaded so far; the twins tree is rebuilt from these plus the drafts.
    raw_twins: Vec<Value>,
    drafts: Vec<DraftTwin>,
    /// Draft waiting for the parents prompt to be answered.
    pending_draft: Option<DraftTwin>,
    mappings: MappingTable,
    mappings_out: PathBuf,
    focus: Focus,
    cursors: [usize; 4],
    offsets: [usize; 4],
    viewports: [usize; 4],
    needles: [String; 4],
    twin_model_filter: Option<String>,
    prompt: Option<Prompt>,
    opcua_error: Option<String>,
    models_error: Option<String>,
    twins_error: Option<String>,
    toast: Option<Toast>,
    commands: Vec<Command>,
    should_quit: bool,
}

/// Runs the interactive terminal UI until the operator quits.
///
/// Must be called off the async runtime (e.g. from `spawn_blocking`); fetches and saves are
/// spawned on `handle`.
pub fn run<S>(mut app: App, source: Arc<S>, handle: Handle) -> Result<(), Box<dyn Error>>
where
    S: PageSource + Send + Sync + 'static,
{
    let mut terminal = TerminalSession::new()?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    while !app.should_quit {
        for command in app.take_commands() {
            spawn_command(&handle, &source, &tx, command);
        }
        while let Ok(message) = rx.try_recv() {
            app.apply_message(message);
        }
        terminal.draw(|frame| draw(frame, &mut app))?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                _ => {}
            }
        }
    }

    Ok(())
}

fn spawn_command<S>(
    handle: &Handle,
    source: &Arc<S>,
    tx: &mpsc::UnboundedSender<Message>,
    command: Command,
) where
    S: PageSource + Send + Sync + 'static,
{
    let tx = tx.clone();
    match command {
        Command::FetchPage(request) => {
            let source = Arc::clone(source);
            handle.spawn(async move {
                let result = source.fetch_page(request.page).await;
                let _ = tx.send(Message::PageLoaded { generation: request.generation, result });
            });
        }
        Command::SaveMappings { path, entries } => {
            handle.spawn(async move {
                let refs: Vec<&MappingEntry> = entries.iter().collect();
                let result = save_mappings(&path, &refs).await.map(|()| entries.len());
                let _ = tx.send(Message::Saved { path, result });
            });
        }
    }
}

impl App {
    pub fn new(config: &AppConfig, inputs: Inputs) -> Self {
        let mut app = Self {
            opcua: TreeState::new(config.opcua_tree.clone()),
            opcua_tags: 0,
            models: TreeState::new(config.models_tree.clone()),
            twins: TreeState::new(config.twins_tree.clone()),
            relationships: Vec::new(),
            raw_twins: Vec::new(),
            drafts: Vec::new(),
            pending_draft: None,
            mappings: MappingTable::new(),
            mappings_out: config.mappings_out.clone(),
            focus: Focus::Opcua,
            cursors: [0; 4],
            offsets: [0; 4],
            viewports: [0; 4],
            needles: Default::default(),
            twin_model_filter: None,
            prompt: None,
            opcua_error: None,
            models_error: None,
            twins_error: None,
            toast: None,
            commands: Vec::new(),
            should_quit: false,
        };

        if let Some(opcua) = inputs.opcua {
            app.load_opcua(&opcua);
        }
        if let Some(models) = inputs.models {
            app.load_models(&models);
        }
        let mut drafts = inputs.drafts;
        for draft in &mut drafts {
            app.name_parent_relationships(draft);
        }
        app.drafts = drafts;
        let next_page = match inputs.first_page {
            Some(page) => {
                app.raw_twins = page.twins;
                page.next_page
            }
            None => None,
        };
        app.reload_twins(next_page);

        let first_twin = app
            .twins
            .rows()
            .iter()
            .find(|row| row.node.kind == NodeKind::TwinInstance)
            .map(|row| row.key().clone());
        if let Some(key) = first_twin {
            app.dispatch(Focus::Twins, Action::SetDefaultSelection(key));
        }
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    fn load_opcua(&mut self, document: &Value) {
        match normalize_opcua(document) {
            Ok(normalized) => {
                self.opcua_tags = normalized.tags;
                self.dispatch(Focus::Opcua, Action::Initialize { rows: normalized.rows, next_page: None });
                self.opcua_error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "opcua normalization failed");
                self.opcua_error = Some(err.to_string());
            }
        }
    }

    fn load_models(&mut self, document: &Value) {
        match normalize_models(document) {
            Ok(normalized) => {
                for diagnostic in &normalized.diagnostics {
                    tracing::warn!(%diagnostic, "model diagnostic");
                }
                if !normalized.diagnostics.is_empty() {
                    self.set_toast(format!(
                        "{} model reference(s) could not be expanded",
                        normalized.diagnostics.len()
                    ));
                }
                self.relationships = normalized.relationships;
                self.dispatch(Focus::Models, Action::Initialize { rows: normalized.rows, next_page: None });
                self.models_error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "model normalization failed");
                self.models_error = Some(err.to_string());
            }
        }
    }

    fn twin_rows(&self) -> Result<Vec<Node>, NormalizeError> {
        normalize_twins(&Value::Array(self.raw_twins.clone()), &self.drafts).map(|twins| twins.rows)
    }

    fn reload_twins(&mut self, next_page: Option<usize>) {
        match self.twin_rows() {
            Ok(rows) => {
                self.twins_error = None;
                self.dispatch(Focus::Twins, Action::Initialize { rows, next_page });
            }
            Err(err) => {
                tracing::warn!(error = %err, "twin normalization failed");
                self.twins_error = Some(err.to_string());
            }
        }
    }

    fn dispatch(&mut self, pane: Focus, action: Action) {
        let effects = match pane {
            Focus::Opcua => self.opcua.dispatch(action),
            Focus::Models => self.models.dispatch(action),
            Focus::Twins => self.twins.dispatch(action),
            Focus::Mappings => return,
        };
        for effect in effects {
            match effect {
                Effect::FetchPage(request) => self.commands.push(Command::FetchPage(request)),
            }
        }
    }

    pub fn apply_message(&mut self, message: Message) {
        match message {
            Message::PageLoaded { generation, result } => self.page_loaded(generation, result),
            Message::Saved { path, result } => match result {
                Ok(count) => self.set_toast(format!("Saved {count} mapping(s) to {}", path.display())),
                Err(err) => {
                    tracing::warn!(error = %err, "saving mappings failed");
                    self.set_toast(format!("Save failed: {err}"));
                }
            },
        }
        self.clamp_cursors();
    }

    fn page_loaded(&mut self, generation: u64, result: Result<Page, StoreError>) {
        if !self.twins.paging().is_current(generation) {
            tracing::debug!(generation, "ignoring page for a superseded request");
            return;
        }

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(error = %err, "fetching twins failed");
                self.set_toast(format!("Loading twins failed: {err}"));
                self.stop_paging(generation);
                return;
            }
        };

        let loaded = self.raw_twins.len();
        self.raw_twins.extend(page.twins);
        match self.twin_rows() {
            Ok(rows) => {
                self.dispatch(Focus::Twins, Action::PageLoaded { generation, rows, next_page: page.next_page });
            }
            Err(err) => {
                tracing::warn!(error = %err, page = page.page, "twin page rejected");
                self.raw_twins.truncate(loaded);
                self.set_toast(format!("Page {} rejected: {err}", page.page));
                self.stop_paging(generation);
            }
        }
    }

    /// Answers the outstanding request with the current rows and no further page.
    fn stop_paging(&mut self, generation: u64) {
        let rows = self.twins.rows().iter().map(|row| Node::clone(&row.node)).collect();
        self.dispatch(Focus::Twins, Action::PageLoaded { generation, rows, next_page: None });
    }

    fn tree(&self, pane: Focus) -> Option<&TreeState> {
        match pane {
            Focus::Opcua => Some(&self.opcua),
            Focus::Models => Some(&self.models),
            Focus::Twins => Some(&self.twins),
            Focus::Mappings => None,
        }
    }

    fn needle(&self, pane: Focus) -> &str {
        &self.needles[pane.slot()]
    }

    fn rendered(&self, pane: Focus) -> Vec<&TreeRow> {
        match pane {
            Focus::Opcua => rows_to_render(self.opcua.rows(), self.needle(pane)),
            Focus::Models => rows_to_render(self.models.rows(), self.needle(pane)),
            Focus::Twins => restrict_to_model(
                rows_to_render(self.twins.rows(), self.needle(pane)),
                self.twin_model_filter.as_deref(),
            ),
            Focus::Mappings => Vec::new(),
        }
    }

    /// Mapping table rows shown under the current mappings search.
    fn rendered_mappings(&self) -> Vec<(&MappingKey, &MappingEntry)> {
        self.mappings.filtered(self.needle(Focus::Mappings))
    }

    fn pane_len(&self, pane: Focus) -> usize {
        match pane {
            Focus::Mappings => self.rendered_mappings().len(),
            _ => self.rendered(pane).len(),
        }
    }

    fn cursor_row(&self, pane: Focus) -> Option<&TreeRow> {
        self.rendered(pane).get(self.cursors[pane.slot()]).copied()
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.pane_len(self.focus);
        let cursor = &mut self.cursors[self.focus.slot()];
        *cursor = match len {
            0 => 0,
            len => cursor.saturating_add_signed(delta).min(len - 1),
        };
    }

    fn clamp_cursors(&mut self) {
        for pane in Focus::ALL {
            let len = self.pane_len(pane);
            let cursor = &mut self.cursors[pane.slot()];
            *cursor = (*cursor).min(len.saturating_sub(1));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
        } else {
            self.handle_normal_key(key);
        }
        self.clamp_cursors();
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let page = self.viewports[self.focus.slot()].max(1) as isize;
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::PageDown => self.move_cursor(page),
            KeyCode::PageUp => self.move_cursor(-page),
            KeyCode::Home | KeyCode::Char('g') => self.cursors[self.focus.slot()] = 0,
            KeyCode::End | KeyCode::Char('G') => self.move_cursor(isize::MAX),
            KeyCode::Enter => self.toggle_collapse(),
            KeyCode::Char(' ') | KeyCode::Char('v') if self.focus == Focus::Opcua => {
                self.select_tag_at_cursor();
            }
            KeyCode::Char(' ') => self.select_at_cursor(false),
            KeyCode::Char('v') => self.select_at_cursor(true),
            KeyCode::Char('x') => self.dispatch(self.focus, Action::ClearSelection),
            KeyCode::Char('C') => self.dispatch(self.focus, Action::CollapseAll),
            KeyCode::Char('E') => self.dispatch(self.focus, Action::ExpandAll),
            KeyCode::Char('/') => {
                let input = self.needle(self.focus).to_owned();
                self.prompt = Some(Prompt::new(PromptKind::Search, "/", input));
            }
            KeyCode::Esc => self.clear_search(),
            KeyCode::Char('f') => self.toggle_model_filter(),
            KeyCode::Char('n') => {
                let label = "New twin MODEL=TWIN[@REL:SOURCE]: ";
                self.prompt = Some(Prompt::new(PromptKind::Draft, label, String::new()));
            }
            KeyCode::Char('m') => match self.add_mappings() {
                Ok(count) => self.set_toast(format!("Added {count} mapping(s)")),
                Err(err) => self.set_toast(err),
            },
            KeyCode::Char('e') if self.focus == Focus::Mappings => match self.update_mapping_at_cursor() {
                Ok(key) => self.set_toast(format!("Updated mapping {key}")),
                Err(err) => self.set_toast(err),
            },
            KeyCode::Char('d') | KeyCode::Delete if self.focus == Focus::Mappings => {
                self.delete_mapping_at_cursor();
            }
            KeyCode::Char('w') => self.save(),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        let kind = prompt.kind;
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                match kind {
                    PromptKind::Search => self.clear_search(),
                    PromptKind::Parents => {
                        if let Some(draft) = self.pending_draft.take() {
                            self.set_toast(format!("Discarded draft {}", draft.twin_id));
                        }
                    }
                    PromptKind::Draft => {}
                }
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut prompt.input);
                self.prompt = None;
                self.submit_prompt(kind, input.trim());
            }
            KeyCode::Backspace => {
                prompt.input.pop();
                if kind == PromptKind::Search {
                    let input = prompt.input.clone();
                    self.set_needle(input);
                }
            }
            KeyCode::Char(ch) => {
                prompt.input.push(ch);
                if kind == PromptKind::Search {
                    let input = prompt.input.clone();
                    self.set_needle(input);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, kind: PromptKind, input: &str) {
        match kind {
            PromptKind::Search => {}
            PromptKind::Draft => match parse_draft(input) {
                Ok(draft) => self.begin_draft(draft),
                Err(err) => self.set_toast(err),
            },
            PromptKind::Parents => {
                let Some(draft) = self.pending_draft.take() else {
                    return;
                };
                if input.is_empty() {
                    self.stage_draft(draft);
                    return;
                }
                match parse_parents(input) {
                    Some(parents) => self.stage_draft_with_parents(draft, &parents),
                    None => self.set_toast(format!("expected REL:SOURCE[,REL:SOURCE], got '{input}'")),
                }
            }
        }
    }

    fn set_needle(&mut self, needle: String) {
        let slot = self.focus.slot();
        self.needles[slot] = needle;
        self.cursors[slot] = 0;
        self.offsets[slot] = 0;
    }

    fn clear_search(&mut self) {
        self.set_needle(String::new());
    }

    fn toggle_collapse(&mut self) {
        let Some(key) = self.cursor_row(self.focus).map(|row| row.key().clone()) else {
            return;
        };
        self.dispatch(self.focus, Action::ToggleCollapse(key));
    }

    fn select_at_cursor(&mut self, range: bool) {
        let Some(index) = self.cursor_row(self.focus).map(|row| row.index) else {
            return;
        };
        let action = if range { Action::SelectRange { to: index } } else { Action::Select(index) };
        self.dispatch(self.focus, action);
    }

    /// The OPC-UA pane holds at most one selected tag; selecting another replaces it.
    fn select_tag_at_cursor(&mut self) {
        let Some((index, selected)) = self
            .cursor_row(Focus::Opcua)
            .filter(|row| self.opcua.options().is_selectable(row.node.kind))
            .map(|row| (row.index, row.selected))
        else {
            return;
        };
        self.dispatch(Focus::Opcua, Action::ClearSelection);
        if !selected {
            self.dispatch(Focus::Opcua, Action::Select(index));
        }
    }

    /// Limits the twins pane to the model owning the models-pane cursor row, or lifts the limit.
    fn toggle_model_filter(&mut self) {
        if self.twin_model_filter.take().is_some() {
            self.set_toast("Showing twins of every model");
            return;
        }
        let model = self.cursor_row(Focus::Models).and_then(|row| match row.node.kind {
            NodeKind::Interface | NodeKind::Relationship => row.node.source_id.clone(),
            _ => self.models.owning_interface(row.key()).map(str::to_owned),
        });
        match model {
            Some(model) => {
                self.set_toast(format!("Twins limited to {model}"));
                self.twin_model_filter = Some(model);
                self.cursors[Focus::Twins.slot()] = 0;
                self.offsets[Focus::Twins.slot()] = 0;
            }
            None => self.set_toast("No model under the cursor"),
        }
    }

    /// Loaded twins that can parent a twin of `model_id`, one entry per relationship and twin.
    fn parent_candidates(&self, model_id: &str) -> Vec<ParentRelationship> {
        incoming_relationships(&self.relationships, model_id)
            .flat_map(|decl| {
                self.twins
                    .rows()
                    .iter()
                    .filter(|row| row.node.kind == NodeKind::TwinInstance)
                    .filter(|row| row.node.model_id.as_deref() == Some(decl.source_model.as_str()))
                    .filter_map(|row| row.node.source_id.clone())
                    .map(|source| ParentRelationship {
                        name: decl.name.clone(),
                        display_name: decl.display_name.clone(),
                        source,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Stages `draft` right away when it already names its parents or cannot have any;
    /// otherwise asks for them first.
    fn begin_draft(&mut self, mut draft: DraftTwin) {
        if !draft.parent_rels.is_empty() {
            let parents = std::mem::take(&mut draft.parent_rels);
            self.stage_draft_with_parents(draft, &parents);
            return;
        }
        let candidates = self.parent_candidates(&draft.model_id);
        if candidates.is_empty() {
            self.stage_draft(draft);
            return;
        }

        let mut listed: Vec<String> = candidates
            .iter()
            .take(PROMPT_CANDIDATES)
            .map(|candidate| format!("{}:{}", candidate.name, candidate.source))
            .collect();
        if candidates.len() > PROMPT_CANDIDATES {
            listed.push("…".to_owned());
        }
        let label = format!("Parents of {} ({}; empty for none): ", draft.twin_id, listed.join(", "));
        self.pending_draft = Some(draft);
        self.prompt = Some(Prompt::new(PromptKind::Parents, label, String::new()));
    }

    fn stage_draft_with_parents(&mut self, mut draft: DraftTwin, parents: &[ParentRelationship]) {
        match self.resolve_parents(&draft.model_id, parents) {
            Ok(parents) => {
                draft.parent_rels = parents;
                self.stage_draft(draft);
            }
            Err(err) => self.set_toast(err),
        }
    }

    /// Checks each requested parent against the relationships into `model_id` and fills in
    /// their display names. A parent twin that is not loaded yet is taken on trust.
    fn resolve_parents(
        &self,
        model_id: &str,
        requested: &[ParentRelationship],
    ) -> Result<Vec<ParentRelationship>, String> {
        requested
            .iter()
            .map(|parent| {
                let decl = incoming_relationships(&self.relationships, model_id)
                    .find(|decl| decl.name == parent.name)
                    .ok_or_else(|| format!("'{}' is not a relationship into {model_id}", parent.name))?;
                let models = self.loaded_twin_models(&parent.source);
                if !models.is_empty() && !models.contains(&decl.source_model.as_str()) {
                    return Err(format!(
                        "{} is not a {}, which '{}' expects",
                        parent.source, decl.source_model, decl.name
                    ));
                }
                Ok(ParentRelationship {
                    name: decl.name.clone(),
                    display_name: decl.display_name.clone(),
                    source: parent.source.clone(),
                })
            })
            .collect()
    }

    fn loaded_twin_models(&self, twin_id: &str) -> Vec<&str> {
        self.twins
            .rows()
            .iter()
            .filter(|row| row.node.kind == NodeKind::TwinInstance)
            .filter(|row| row.node.source_id.as_deref() == Some(twin_id))
            .filter_map(|row| row.node.model_id.as_deref())
            .collect()
    }

    /// Display names for parents given on the command line, where nothing is loaded to check.
    fn name_parent_relationships(&self, draft: &mut DraftTwin) {
        for parent in &mut draft.parent_rels {
            if let Some(decl) = incoming_relationships(&self.relationships, &draft.model_id)
                .find(|decl| decl.name == parent.name)
            {
                parent.display_name = decl.display_name.clone();
            }
        }
    }

    fn stage_draft(&mut self, draft: DraftTwin) {
        let staged = self
            .drafts
            .iter()
            .any(|staged| staged.model_id == draft.model_id && staged.twin_id == draft.twin_id);
        if staged {
            self.set_toast(format!("{} is already staged", draft.twin_id));
            return;
        }
        let message = format!("Staged {} for {}", draft.twin_id, draft.model_id);
        self.drafts.push(draft);
        self.reload_twins(self.twins.paging().next_page());
        if self.twins_error.is_some() {
            self.drafts.pop();
            self.reload_twins(self.twins.paging().next_page());
            return;
        }
        self.set_toast(message);
    }

    /// The tag to map: the selected tag, else the OPC-UA cursor row when it is a tag.
    fn opcua_tag(&self) -> Option<String> {
        if let [only] = self.opcua.selected_nodes().as_slice() {
            if only.kind == NodeKind::Tag {
                return only.source_id.clone();
            }
        }
        self.cursor_row(Focus::Opcua)
            .filter(|row| row.node.kind == NodeKind::Tag)
            .and_then(|row| row.node.source_id.clone())
    }

    /// The property to map: the single selected property, else the models-pane cursor row.
    fn mapping_property(&self) -> Option<RowKey> {
        if let [only] = self.models.selected_nodes().as_slice() {
            return Some(only.key.clone());
        }
        self.cursor_row(Focus::Models)
            .filter(|row| row.node.kind == NodeKind::Property)
            .map(|row| row.key().clone())
    }

    fn selected_twins(&self) -> Vec<&Arc<Node>> {
        self.twins
            .selected_nodes()
            .into_iter()
            .filter(|node| node.kind == NodeKind::TwinInstance)
            .collect()
    }

    /// Maps the chosen tag onto the chosen property of every selected twin. All or nothing.
    fn add_mappings(&mut self) -> Result<usize, String> {
        let node_id = self.opcua_tag().ok_or_else(|| "Select a tag in the OPC-UA pane first".to_owned())?;
        let property = self
            .mapping_property()
            .ok_or_else(|| "Select a property in the models pane first".to_owned())?;
        let entries = self
            .selected_twins()
            .into_iter()
            .map(|twin| MappingEntry::from_selection(&node_id, &self.models, &property, twin))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())?;
        if entries.is_empty() {
            return Err("Select at least one twin in the twins pane first".to_owned());
        }

        let count = entries.len();
        for entry in entries {
            let key = self.mappings.add(entry);
            tracing::debug!(key = %key, "mapping added");
        }
        Ok(count)
    }

    fn mapping_at_cursor(&self) -> Option<MappingKey> {
        let cursor = self.cursors[Focus::Mappings.slot()];
        self.rendered_mappings().get(cursor).map(|(key, _)| (*key).clone())
    }

    /// Rewrites the mapping under the cursor from the current tag, property and twin selection.
    fn update_mapping_at_cursor(&mut self) -> Result<MappingKey, String> {
        let key = self.mapping_at_cursor().ok_or_else(|| "No mapping under the cursor".to_owned())?;
        let node_id = self.opcua_tag().ok_or_else(|| "Select a tag in the OPC-UA pane first".to_owned())?;
        let property = self
            .mapping_property()
            .ok_or_else(|| "Select a property in the models pane first".to_owned())?;
        let entry = match self.selected_twins().as_slice() {
            [twin] => MappingEntry::from_selection(&node_id, &self.models, &property, twin)
                .map_err(|err| err.to_string())?,
            _ => return Err("Select exactly one twin to update a mapping".to_owned()),
        };

        self.mappings.update(&key, entry).map_err(|err| err.to_string())?;
        tracing::debug!(key = %key, "mapping updated");
        Ok(key)
    }

    fn delete_mapping_at_cursor(&mut self) {
        let Some(key) = self.mapping_at_cursor() else {
            return;
        };
        if self.mappings.remove(&key).is_some() {
            self.set_toast(format!("Removed mapping {key}"));
        }
    }

    fn save(&mut self) {
        let entries = self.mappings.entries().into_iter().cloned().collect();
        self.commands.push(Command::SaveMappings { path: self.mappings_out.clone(), entries });
    }

    fn set_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast { message: message.into(), expires_at: Instant::now() + TOAST_TTL });
    }

    fn current_toast(&self) -> Option<&str> {
        self.toast
            .as_ref()
            .filter(|toast| Instant::now() < toast.expires_at)
            .map(|toast| toast.message.as_str())
    }

    fn set_viewport(&mut self, pane: Focus, height: usize) {
        let slot = pane.slot();
        self.viewports[slot] = height;
        let cursor = self.cursors[slot];
        let offset = &mut self.offsets[slot];
        if cursor < *offset {
            *offset = cursor;
        } else if height > 0 && cursor >= *offset + height {
            *offset = cursor + 1 - height;
        }
    }

    /// Requests the next twin page once the first placeholder row scrolls into view.
    fn request_more_twins_if_visible(&mut self) {
        if self.twins.shimmer_rows() == 0 || self.twins.paging().is_loading() {
            return;
        }
        let slot = Focus::Twins.slot();
        let first_placeholder = self.pane_len(Focus::Twins);
        if first_placeholder <= self.offsets[slot] + self.viewports[slot] {
            self.dispatch(Focus::Twins, Action::RequestNextPage);
        }
    }

    /// The visible window of a tree pane followed by placeholder rows.
    fn pane_lines(&self, pane: Focus) -> Vec<Line<'static>> {
        let Some(tree) = self.tree(pane) else {
            return Vec::new();
        };
        let slot = pane.slot();
        let height = self.viewports[slot];
        let visible = self.rendered(pane);

        let mut lines: Vec<Line<'static>> = visible
            .iter()
            .skip(self.offsets[slot])
            .take(height)
            .map(|row| rows::row_line(row, tree.options().is_selectable(row.node.kind)))
            .collect();

        let room = height.saturating_sub(lines.len());
        let loading = tree.paging().is_loading();
        lines.extend((0..tree.shimmer_rows().min(room)).map(|_| rows::shimmer_line(loading)));
        lines
    }

    fn mapping_lines(&self) -> Vec<Line<'static>> {
        let slot = Focus::Mappings.slot();
        self.rendered_mappings()
            .into_iter()
            .skip(self.offsets[slot])
            .take(self.viewports[slot])
            .map(|(_, entry)| {
                Line::from(vec![
                    Span::styled(entry.opcua_node_id.clone(), Style::default().fg(FOOTER_KEY_COLOR)),
                    Span::raw(" -> "),
                    Span::raw(format!("{}.{}", entry.dt_twin_id, entry.dt_property_path)),
                ])
            })
            .collect()
    }

    /// Cursor position inside the drawn window of the focused pane.
    fn cursor_in_window(&self, pane: Focus) -> Option<usize> {
        if pane != self.focus {
            return None;
        }
        let slot = pane.slot();
        self.cursors[slot].checked_sub(self.offsets[slot])
    }

    fn pane_title(&self, pane: Focus) -> String {
        let title = match pane {
            Focus::Opcua => format!("OPC-UA ({} tags)", self.opcua_tags),
            Focus::Models => "Models".to_owned(),
            Focus::Twins => {
                let mut title = format!("Twins ({} loaded)", self.raw_twins.len());
                if let Some(model) = &self.twin_model_filter {
                    title.push_str(&format!(" [{model}]"));
                }
                if self.twins.paging().is_loading() {
                    title.push_str(" loading");
                }
                title
            }
            Focus::Mappings => format!("Mappings ({})", self.mappings.len()),
        };
        with_needle(title, self.needle(pane))
    }

    fn pane_error(&self, pane: Focus) -> Option<&str> {
        match pane {
            Focus::Opcua => self.opcua_error.as_deref(),
            Focus::Models => self.models_error.as_deref(),
            Focus::Twins => self.twins_error.as_deref(),
            Focus::Mappings => None,
        }
    }
}

fn with_needle(mut title: String, needle: &str) -> String {
    if !needle.is_empty() {
        title.push_str(&format!(" /{needle}"));
    }
    title
}

fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.size();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
        ])
        .split(layout[0]);

    for (pane, pane_area) in Focus::ALL.into_iter().zip(panes.iter().copied()) {
        app.set_viewport(pane, usize::from(pane_area.height.saturating_sub(2)));
        let border = if pane == app.focus { FOCUS_COLOR } else { IDLE_BORDER_COLOR };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(app.pane_title(pane));

        if let Some(error) = app.pane_error(pane) {
            let message = Line::from(Span::styled(error.to_owned(), Style::default().fg(ERROR_COLOR)));
            frame.render_widget(
                Paragraph::new(message).wrap(Wrap { trim: true }).block(block),
                pane_area,
            );
            continue;
        }

        let lines = match pane {
            Focus::Mappings => app.mapping_lines(),
            _ => app.pane_lines(pane),
        };
        let cursor = app.cursor_in_window(pane);
        let items = lines.into_iter().enumerate().map(|(idx, line)| {
            let item = ListItem::new(line);
            if Some(idx) == cursor {
                item.style(Style::default().bg(CURSOR_BG))
            } else {
                item
            }
        });
        frame.render_widget(List::new(items).block(block), pane_area);
    }

    frame.render_widget(Paragraph::new(footer_line(app)), layout[1]);
    app.request_more_twins_if_visible();
}

fn footer_line(app: &App) -> Line<'static> {
    if let Some(prompt) = &app.prompt {
        return Line::from(vec![
            Span::styled(prompt.label.clone(), Style::default().fg(FOOTER_KEY_COLOR)),
            Span::raw(format!("{}█", prompt.input)),
        ]);
    }
    if let Some(toast) = app.current_toast() {
        return Line::from(toast.to_owned());
    }

    let mut spans = Vec::with_capacity(FOOTER_HINTS.len() * 2 + 2);
    for (key, label) in FOOTER_HINTS {
        spans.push(Span::styled(key, Style::default().fg(FOOTER_KEY_COLOR)));
        spans.push(Span::styled(format!(" {label}  "), Style::default().fg(FOOTER_LABEL_COLOR)));
    }
    spans.push(Span::styled("q", Style::default().fg(FOOTER_KEY_COLOR)));
    spans.push(Span::styled(" quit", Style::default().fg(FOOTER_LABEL_COLOR)));
    Line::from(spans)
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);
}
