//! Presentation models for the results grid and the schema tree.
//!
//! Both are plain data derived from engine output; the terminal front-end
//! only lays them out. A new query result or catalog listing replaces the
//! previous model entirely (the tree keeps only which nodes were expanded).

use quackview_engine::{CatalogTable, QueryResult, TableKind};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

// ─── Result grid ─────────────────────────────────────────────────────────────

/// How cells are turned into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Text shown for NULL values
    pub null_display: String,
    /// Longer cells are cut and end with `…`
    pub max_cell_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            null_display: "NULL".to_string(),
            max_cell_width: 40,
        }
    }
}

/// A query result ready to draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Display width of each column (header included)
    pub widths: Vec<usize>,
    /// e.g. `Showing 1-1000 of 2500 rows (Page 1 of 3)`
    pub page_label: String,
    pub execution_time_ms: u64,
}

impl ResultGrid {
    pub fn from_result(result: &QueryResult, options: &RenderOptions) -> Self {
        let headers = result.columns.clone();
        let rows: Vec<Vec<String>> = result
            .rows
            .iter()
            .map(|row| {
                row.values
                    .iter()
                    .map(|v| format_cell(v, options))
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                let w = cell.chars().count();
                match widths.get_mut(i) {
                    Some(existing) => *existing = (*existing).max(w),
                    None => widths.push(w),
                }
            }
        }

        Self {
            headers,
            rows,
            widths,
            page_label: page_label(result),
            execution_time_ms: result.execution_time_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Text for one cell value.
pub fn format_cell(value: &JsonValue, options: &RenderOptions) -> String {
    let text = match value {
        JsonValue::Null => return options.null_display.clone(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    truncate(&text.replace(['\n', '\r', '\t'], " "), options.max_cell_width)
}

/// Cut `text` to `max` characters, ending with `…` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if max == 0 || text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Status text for a result.
pub fn page_label(result: &QueryResult) -> String {
    if result.row_count == 0 {
        return "No results".to_string();
    }
    match (result.page, result.total_rows) {
        (Some(page), Some(total)) => {
            let start = page.offset() + 1;
            let end = page.offset() + result.row_count;
            format!(
                "Showing {}-{} of {} rows (Page {} of {})",
                start,
                end,
                total,
                page.page_number + 1,
                page.total_pages(total)
            )
        }
        _ => format!(
            "Showing {} row{}",
            result.row_count,
            if result.row_count == 1 { "" } else { "s" }
        ),
    }
}

// ─── Schema tree ─────────────────────────────────────────────────────────────

/// What a tree node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Database,
    Schema,
    /// The "Tables" or "Views" folder
    Group(TableKind),
    Table(Box<CatalogTable>),
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    /// Slash-separated path, stable across rebuilds. A `/` or `\` inside a
    /// name is escaped with `\`.
    pub path: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
}

/// One line of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleNode<'a> {
    pub depth: usize,
    pub node: &'a TreeNode,
    pub expanded: bool,
}

/// Catalog hierarchy: database → schema → Tables/Views → table → `column (TYPE)`.
#[derive(Debug, Clone, Default)]
pub struct SchemaTree {
    roots: Vec<TreeNode>,
    expanded: HashMap<String, bool>,
}

impl SchemaTree {
    pub fn build(tables: &[CatalogTable]) -> Self {
        let mut tree = Self::default();
        tree.rebuild(tables);
        tree
    }

    /// Replace the nodes, keeping the expansion state of paths that survive.
    pub fn rebuild(&mut self, tables: &[CatalogTable]) {
        let mut roots: Vec<TreeNode> = Vec::new();
        for table in tables {
            let db_path = path_segment(&table.database);
            let db = child_or_insert(&mut roots, &db_path, &table.database, NodeKind::Database);

            let schema_path = format!("{}/{}", db_path, path_segment(&table.schema));
            let schema =
                child_or_insert(&mut db.children, &schema_path, &table.schema, NodeKind::Schema);

            let (group_label, group_key) = match table.kind {
                TableKind::Table => ("Tables", "tables"),
                TableKind::View => ("Views", "views"),
            };
            let group_path = format!("{}/{}", schema_path, group_key);
            let group = child_or_insert(
                &mut schema.children,
                &group_path,
                group_label,
                NodeKind::Group(table.kind),
            );

            let table_path = format!("{}/{}", group_path, path_segment(&table.name));
            group.children.push(TreeNode {
                label: table.name.clone(),
                kind: NodeKind::Table(Box::new(table.clone())),
                children: table
                    .columns
                    .iter()
                    .map(|c| TreeNode {
                        label: format!("{} ({})", c.name, c.data_type),
                        path: format!("{}/{}", table_path, path_segment(&c.name)),
                        kind: NodeKind::Column,
                        children: Vec::new(),
                    })
                    .collect(),
                path: table_path,
            });
        }
        // Groups list Tables before Views regardless of catalog order.
        for db in &mut roots {
            for schema in &mut db.children {
                schema.children.sort_by_key(|g| g.label != "Tables");
            }
        }
        self.roots = roots;
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether `node` is expanded. Everything above table level starts
    /// expanded, tables start collapsed.
    pub fn is_expanded(&self, node: &TreeNode) -> bool {
        self.expanded
            .get(&node.path)
            .copied()
            .unwrap_or(!matches!(node.kind, NodeKind::Table(_) | NodeKind::Column))
    }

    /// Flip the expansion of the node at `path`. Unknown paths are ignored.
    pub fn toggle(&mut self, path: &str) {
        let Some(current) = self.find(path).map(|node| self.is_expanded(node)) else {
            return;
        };
        self.expanded.insert(path.to_string(), !current);
    }

    /// The node at `path`, if it is in the tree.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut nodes = &self.roots;
        loop {
            let node = nodes
                .iter()
                .find(|n| n.path == path || path.starts_with(&format!("{}/", n.path)))?;
            if node.path == path {
                return Some(node);
            }
            nodes = &node.children;
        }
    }

    /// Nodes in display order, descending only into expanded nodes.
    pub fn visible(&self) -> Vec<VisibleNode<'_>> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.collect_visible(root, 0, &mut out);
        }
        out
    }

    fn collect_visible<'a>(&'a self, node: &'a TreeNode, depth: usize, out: &mut Vec<VisibleNode<'a>>) {
        let expanded = !node.children.is_empty() && self.is_expanded(node);
        out.push(VisibleNode {
            depth,
            node,
            expanded,
        });
        if expanded {
            for child in &node.children {
                self.collect_visible(child, depth + 1, out);
            }
        }
    }
}

fn path_segment(name: &str) -> String {
    name.replace('\\', "\\\\").replace('/', "\\/")
}

fn child_or_insert<'a>(
    nodes: &'a mut Vec<TreeNode>,
    path: &str,
    label: &str,
    kind: NodeKind,
) -> &'a mut TreeNode {
    let idx = match nodes.iter().position(|n| n.path == path) {
        Some(idx) => idx,
        None => {
            nodes.push(TreeNode {
                label: label.to_string(),
                path: path.to_string(),
                kind,
                children: Vec::new(),
            });
            nodes.len() - 1
        }
    };
    &mut nodes[idx]
}
