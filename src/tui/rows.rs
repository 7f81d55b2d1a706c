// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use ratatui::prelude::*;

use crate::model::{Node, NodeKind};
use crate::tree::TreeRow;

const REFERENCE_COLOR: Color = Color::Cyan;
const SCHEMA_COLOR: Color = Color::Gray;
const SEPARATOR_COLOR: Color = Color::DarkGray;
const NEW_COLOR: Color = Color::LightGreen;
const SELECTED_COLOR: Color = Color::Yellow;

/// Plain one-line rendering of a row, indented by depth.
pub fn row_text(node: &Node) -> String {
    let mut out = "  ".repeat(node.depth);
    out.push_str(node.label());
    if let Some(detail) = row_detail(node) {
        out.push_str(&detail);
    }
    if is_new(node) {
        out.push_str(" (new)");
    }
    out
}

fn row_detail(node: &Node) -> Option<String> {
    match node.kind {
        NodeKind::Property => node.schema.as_ref().map(|schema| format!(": {schema}")),
        NodeKind::Component | NodeKind::Relationship => {
            node.target.as_ref().map(|target| format!(" -> {target}"))
        }
        NodeKind::TwinInstance if node.display_name.is_some() => Some(format!(" ({})", node.name)),
        NodeKind::Tag => {
            let node_id = node.source_id.as_deref().unwrap_or_default();
            Some(match &node.schema {
                Some(schema) => format!(": {schema} [{node_id}]"),
                None => format!(" [{node_id}]"),
            })
        }
        _ => None,
    }
}

fn is_new(node: &Node) -> bool {
    node.is_synthetic && node.kind == NodeKind::TwinInstance
}

fn label_style(kind: NodeKind) -> Style {
    match kind {
        NodeKind::Interface | NodeKind::Model | NodeKind::Folder => {
            Style::default().add_modifier(Modifier::BOLD)
        }
        NodeKind::Component | NodeKind::Relationship => Style::default().fg(REFERENCE_COLOR),
        NodeKind::Separator => {
            Style::default().fg(SEPARATOR_COLOR).add_modifier(Modifier::ITALIC)
        }
        NodeKind::Property | NodeKind::TwinInstance | NodeKind::Tag => Style::default(),
    }
}

pub(super) fn row_line(row: &TreeRow, selectable: bool) -> Line<'static> {
    let node = &row.node;
    let mut spans = vec![Span::raw("  ".repeat(node.depth))];

    let fold = match (node.has_children(), row.collapsed) {
        (false, _) => "  ",
        (true, true) => "▸ ",
        (true, false) => "▾ ",
    };
    spans.push(Span::raw(fold));

    if selectable {
        if row.selected {
            spans.push(Span::styled("[x] ", Style::default().fg(SELECTED_COLOR)));
        } else {
            spans.push(Span::raw("[ ] "));
        }
    }

    let mut label = label_style(node.kind);
    if row.selected {
        label = label.fg(SELECTED_COLOR);
    }
    spans.push(Span::styled(node.label().to_owned(), label));

    if let Some(detail) = row_detail(node) {
        spans.push(Span::styled(detail, Style::default().fg(SCHEMA_COLOR)));
    }
    if is_new(node) {
        spans.push(Span::styled(" (new)", Style::default().fg(NEW_COLOR)));
    }
    Line::from(spans)
}

pub(super) fn shimmer_line(loading: bool) -> Line<'static> {
    let text = if loading { "  loading…" } else { "  ···" };
    Line::from(Span::styled(text, Style::default().fg(SEPARATOR_COLOR).add_modifier(Modifier::DIM)))
}

#[cfg(test)]
mod tests {
    use super::row_text;
    use crate::model::fixtures::{building_models, opcua_nodes};
    use crate::normalize::{normalize_models, normalize_opcua};

    #[test]
    fn row_text_shows_schema_and_reference_targets() {
        let rows = normalize_models(&building_models()).expect("normalize").rows;
        let text = |name: &str| {
            row_text(rows.iter().find(|row| row.name == name).expect("row"))
        };

        assert_eq!(text("address"), "  address: string");
        assert_eq!(text("floors"), "  Floor -> dtmi:example:Floor;1");
        assert!(text("mode").trim_start().starts_with("mode: enum [off: 0"));
    }

    #[test]
    fn tag_rows_show_data_type_and_node_id() {
        let normalized = normalize_opcua(&opcua_nodes()).expect("normalize");
        let set_point = normalized.tag("ns=2;s=Room1.SetPoint").expect("tag");

        assert_eq!(row_text(set_point), "      SetPoint: Double [ns=2;s=Room1.SetPoint]");
        assert_eq!(row_text(&normalized.rows[1]), "  Building");
    }
}
