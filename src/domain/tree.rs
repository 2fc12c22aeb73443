//! Group-hierarchy model for the tree viewer.

use std::collections::BTreeMap;

/// Nested group tree built from flat breadcrumbs. `BTreeMap` keeps sibling
/// order deterministic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GroupTree {
    pub children: BTreeMap<String, GroupTree>,
}

impl GroupTree {
    /// Build a tree from flat slash-separated paths; empty paths are ignored.
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut root = GroupTree::default();
        for path in paths {
            if path.is_empty() {
                continue;
            }
            let mut node = &mut root;
            for part in path.split('/') {
                node = node.children.entry(part.to_string()).or_default();
            }
        }
        root
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Render the hierarchy with box-drawing connectors.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, "");
        out
    }

    fn render_into(&self, out: &mut String, prefix: &str) {
        let count = self.children.len();
        for (index, (name, subtree)) in self.children.iter().enumerate() {
            let last = index + 1 == count;
            let connector = if last { "└── " } else { "├── " };
            out.push_str(prefix);
            out.push_str(connector);
            out.push_str(name);
            out.push('\n');

            let child_prefix =
                if last { format!("{prefix}    ") } else { format!("{prefix}│   ") };
            subtree.render_into(out, &child_prefix);
        }
    }
}

/// Split a `Job Title [Name]` display string back into `(job_title, name)`.
/// Strings without the bracket form come back as `("", whole_string)`.
pub fn parse_display_name(display_name: &str) -> (String, String) {
    if let (Some(open), Some(close)) = (display_name.find('['), display_name.find(']'))
        && open > 0
        && close > open
    {
        let job_title = display_name[..open].trim().to_string();
        let name = display_name[open + 1..close].trim().to_string();
        return (job_title, name);
    }
    (String::new(), display_name.to_string())
}
