// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;

use crate::model::{Node, RowKey};

/// Render state of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_hidden(self) -> bool {
        self == Self::Hidden
    }
}

impl From<bool> for Visibility {
    fn from(hidden: bool) -> Self {
        if hidden {
            Self::Hidden
        } else {
            Self::Visible
        }
    }
}

/// A row is hidden iff any ancestor is collapsed. Roots are never hidden.
///
/// `parent_of` maps a row index to its parent's index; the walk is bounded by `len` so a
/// malformed parent chain cannot loop.
pub fn compute(
    len: usize,
    parent_of: impl Fn(usize) -> Option<usize>,
    is_collapsed: impl Fn(usize) -> bool,
) -> Vec<Visibility> {
    (0..len)
        .map(|idx| {
            let mut current = parent_of(idx);
            let mut steps = 0;
            while let Some(ancestor) = current {
                if is_collapsed(ancestor) {
                    return Visibility::Hidden;
                }
                steps += 1;
                if steps > len {
                    break;
                }
                current = parent_of(ancestor);
            }
            Visibility::Visible
        })
        .collect()
}

/// Recomputes `hidden` on freshly normalized rows from their own `collapsed` flags.
pub fn mark_hidden(rows: &mut [Node]) {
    let positions: HashMap<&RowKey, usize> =
        rows.iter().enumerate().map(|(idx, row)| (&row.key, idx)).collect();
    let visibility = compute(
        rows.len(),
        |idx| rows[idx].parent_key.as_ref().and_then(|key| positions.get(key).copied()),
        |idx| rows[idx].collapsed,
    );
    drop(positions);

    for (row, visibility) in rows.iter_mut().zip(visibility) {
        row.hidden = visibility.is_hidden();
    }
}

#[cfg(test)]
mod tests {
    use super::{compute, mark_hidden, Visibility};
    use crate::model::{Node, NodeKind, RowKey};

    fn chain() -> Vec<Node> {
        let root = Node::new(RowKey::interface("dtmi:x:A;1"), NodeKind::Interface, "A");
        let mid = Node::new(root.key.child("c"), NodeKind::Component, "c").under(&root);
        let leaf = Node::new(mid.key.child("p"), NodeKind::Property, "p").under(&mid);
        vec![root, mid, leaf]
    }

    #[test]
    fn collapsed_ancestor_hides_every_descendant() {
        let mut rows = chain();
        rows[0].collapsed = true;
        mark_hidden(&mut rows);
        assert_eq!(rows.iter().map(|r| r.hidden).collect::<Vec<_>>(), vec![false, true, true]);

        rows[0].collapsed = false;
        rows[1].collapsed = true;
        mark_hidden(&mut rows);
        assert_eq!(rows.iter().map(|r| r.hidden).collect::<Vec<_>>(), vec![false, false, true]);
    }

    #[test]
    fn self_parented_row_does_not_loop() {
        let visibility = compute(1, |_| Some(0), |_| false);
        assert_eq!(visibility, vec![Visibility::Visible]);
    }
}
