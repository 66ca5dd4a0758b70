//! Plain-text rendering of a project's hierarchy.

use crate::models::{HierarchyTreeNode, WorkState};

fn state_symbol(state: WorkState) -> char {
    match state {
        WorkState::Proposed => '◇',
        WorkState::Active => '○',
        WorkState::Done => '●',
        WorkState::Cancelled => '✗',
    }
}

/// Render hierarchy trees with a state symbol and the type of every record.
///
/// ```text
/// ○ Epic#1 Platform
/// ├── ○ Feature#1 Auth
/// │   └── ◇ UserStory#1 Login
/// │       └── ● Activity#2 Build form
/// └── ◇ Feature#2 Billing
/// ```
pub fn render_tree(nodes: &[HierarchyTreeNode]) -> String {
    let mut output = String::new();
    for node in nodes {
        push_line(&mut output, node);
        render_children(&mut output, &node.children, "");
    }
    output
}

fn render_children(output: &mut String, children: &[HierarchyTreeNode], prefix: &str) {
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();
        output.push_str(prefix);
        output.push_str(if is_last { "└── " } else { "├── " });
        push_line(output, child);

        let continuation = if is_last { "    " } else { "│   " };
        render_children(output, &child.children, &format!("{prefix}{continuation}"));
    }
}

fn push_line(output: &mut String, node: &HierarchyTreeNode) {
    let record = &node.record;
    output.push(state_symbol(record.state));
    output.push(' ');
    output.push_str(&record.record_ref().to_string());
    output.push(' ');
    output.push_str(&record.title);
    output.push('\n');
}
