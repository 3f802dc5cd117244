//! Sort columns and ordering of sibling nodes.

use std::cmp::Ordering;

use strum::{Display, EnumIter, EnumString};

use crate::projection::ViewNode;

/// Column a projection can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortColumn {
    /// Directory name, case-insensitive.
    Name,
    /// Aggregate size in bytes.
    #[default]
    Size,
    /// Share of the parent's size.
    Percent,
    /// Number of files contained.
    Files,
    /// Full path, case-insensitive.
    Path,
}

impl SortColumn {
    /// Compare two siblings in ascending order of this column.
    pub fn compare(self, a: &ViewNode, b: &ViewNode) -> Ordering {
        match self {
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::Size => a.size.cmp(&b.size),
            Self::Percent => a
                .percent_of_parent
                .unwrap_or(0.0)
                .total_cmp(&b.percent_of_parent.unwrap_or(0.0)),
            Self::Files => a.file_count.cmp(&b.file_count),
            Self::Path => {
                let a = a.path.to_string_lossy().to_lowercase();
                let b = b.path.to_string_lossy().to_lowercase();
                a.cmp(&b)
            }
        }
    }
}

/// Sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub column: SortColumn,
    pub descending: bool,
}

impl SortSpec {
    /// Sort by `column` in ascending order.
    pub fn ascending(column: SortColumn) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    /// Sort by `column` in descending order.
    pub fn descending(column: SortColumn) -> Self {
        Self {
            column,
            descending: true,
        }
    }

    /// Select a column the way a header click does: the current column
    /// flips direction, any other column starts ascending.
    pub fn toggle(self, column: SortColumn) -> Self {
        if self.column == column {
            Self {
                column,
                descending: !self.descending,
            }
        } else {
            Self::ascending(column)
        }
    }

    /// Reverse the direction, keeping the column.
    pub fn reverse(self) -> Self {
        Self {
            descending: !self.descending,
            ..self
        }
    }

    /// Short label for status lines, e.g. `size ↓`.
    pub fn label(&self) -> String {
        let arrow = if self.descending { '↓' } else { '↑' };
        format!("{} {arrow}", self.column)
    }

    /// Order siblings in place.
    ///
    /// The ascending sort is stable, so ties keep scan order. Descending is
    /// the exact reverse of the ascending result.
    pub fn apply(&self, nodes: &mut [ViewNode]) {
        nodes.sort_by(|a, b| self.column.compare(a, b));
        if self.descending {
            nodes.reverse();
        }
    }
}

impl Default for SortSpec {
    /// Largest first.
    fn default() -> Self {
        Self::descending(SortColumn::Size)
    }
}
