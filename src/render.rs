//! Renderer: turn a scanned [`Node`] tree into the three output strings.
//!
//! Rendering is purely a function of the (already sorted) tree and the query,
//! so the output is deterministic for a given scan result.

use crate::resolve::IngestQuery;
use crate::scan::{Node, NodeKind, NON_TEXT_SENTINEL};

/// Fixed 32-character separator line between content blocks.
const SEPARATOR: &str = "================================";

/// Short human summary of what was ingested.
pub fn render_summary(query: &IngestQuery, file_count: u64) -> String {
    let mut out = String::new();
    match (&query.user_name, &query.repo_name) {
        (Some(user), Some(repo)) => out.push_str(&format!("Repository: {user}/{repo}\n")),
        _ => out.push_str(&format!("Repository: {}\n", query.slug)),
    }
    out.push_str(&format!("Files analyzed: {file_count}\n"));
    if query.subpath != "/" {
        out.push_str(&format!("Subpath: {}\n", query.subpath));
    }
    if let Some(commit) = &query.commit {
        out.push_str(&format!("Commit: {commit}\n"));
    } else if let Some(branch) = &query.branch {
        if branch != "main" && branch != "master" {
            out.push_str(&format!("Branch: {branch}\n"));
        }
    }
    out
}

/// Box-drawing tree listing, directories suffixed with `/`.
pub fn render_tree(root: &Node) -> String {
    let mut out = String::from("Directory structure:\n");
    render_node(root, "", true, &mut out);
    out
}

fn render_node(node: &Node, prefix: &str, is_last: bool, out: &mut String) {
    out.push_str(prefix);
    out.push_str(if is_last { "└── " } else { "├── " });
    out.push_str(&node.name);
    if node.kind == NodeKind::Directory {
        out.push('/');
    }
    out.push('\n');
    if node.kind == NodeKind::Directory {
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let last = node.children.len().saturating_sub(1);
        for (index, child) in node.children.iter().enumerate() {
            render_node(child, &child_prefix, index == last, out);
        }
    }
}

/// Concatenated contents of every text file in traversal order.
pub fn render_content(root: &Node, query: &IngestQuery) -> String {
    let mut files = Vec::new();
    collect_files(root, &mut files);
    let mut out = String::new();
    for node in files {
        let Some(content) = node.content.as_deref() else {
            continue;
        };
        if content == NON_TEXT_SENTINEL {
            continue;
        }
        // Oversized files stay out of the content section even if they were
        // given placeholder text along the way.
        if node.size > query.max_file_size {
            continue;
        }
        out.push_str(SEPARATOR);
        out.push('\n');
        out.push_str(&format!("File: {}\n", display_path(node, &query.slug)));
        out.push_str(SEPARATOR);
        out.push('\n');
        out.push_str(content);
        out.push('\n');
        out.push('\n');
    }
    out
}

fn collect_files<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    match node.kind {
        NodeKind::File => out.push(node),
        NodeKind::Directory => {
            for child in &node.children {
                collect_files(child, out);
            }
        }
    }
}

/// Path shown in content headers: everything from the slug onward, or just
/// the base name when the slug cannot be located in the absolute path.
fn display_path(node: &Node, slug: &str) -> String {
    let path = node.path.to_string_lossy().replace('\\', "/");
    match path.find(slug) {
        Some(index) => format!("/{}", &path[index..]),
        None => format!("/{}", node.name),
    }
}
