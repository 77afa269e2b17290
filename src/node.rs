use std::collections::HashMap;
use std::io::{self, Write};

/// A node of the fixed-depth prefix tree.
///
/// Edge keys are plain strings: at depth 1 they are decimal token counts,
/// at deeper levels they are either a literal token or the wildcard marker.
/// There is no distinguished "wildcard child" field — the wildcard is just
/// another entry in `children`, matching the edge-key model the tree is
/// specified against.
#[derive(Debug, Default)]
pub struct Node {
    pub children: HashMap<String, Node>,
    pub cluster_ids: Vec<usize>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn write_tree<W: Write>(&self, edge: &str, depth: usize, w: &mut W) -> io::Result<()> {
        let indent = "  ".repeat(depth);
        if depth == 0 {
            writeln!(w, "<root>")?;
        } else {
            writeln!(w, "{indent}{edge}")?;
        }
        if !self.cluster_ids.is_empty() {
            writeln!(w, "{indent}  clusters={:?}", self.cluster_ids)?;
        }
        let mut children: Vec<_> = self.children.iter().collect();
        children.sort_by(|a, b| a.0.cmp(b.0));
        for (edge, child) in children {
            child.write_tree(edge, depth + 1, w)?;
        }
        Ok(())
    }
}
