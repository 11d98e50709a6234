use std::collections::HashMap;

use agora_db::models::CommentRow;
use agora_types::api::{Author, CommentNode};

use crate::{parse_created_at, parse_uuid};

/// Read-side nesting cap. Replies deeper than this stay in the store but
/// are not expanded into the returned tree.
pub const MAX_DEPTH: usize = 10;

/// Build the nested comment tree from one flat fetch of a post's comments.
///
/// Adjacency is grouped by parent id in a single pass, then materialized:
/// top-level comments oldest first (chronological reading order), replies
/// newest first, truncated at `MAX_DEPTH` levels.
pub fn build_tree(rows: &[CommentRow]) -> Vec<CommentNode> {
    let mut children: HashMap<Option<&str>, Vec<&CommentRow>> = HashMap::new();
    for row in rows {
        children
            .entry(row.parent_id.as_deref())
            .or_default()
            .push(row);
    }

    let mut roots = children.remove(&None).unwrap_or_default();
    roots.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    roots
        .into_iter()
        .map(|row| materialize(row, &children, 1))
        .collect()
}

fn materialize(
    row: &CommentRow,
    children: &HashMap<Option<&str>, Vec<&CommentRow>>,
    depth: usize,
) -> CommentNode {
    let mut node = node_from_row(row);

    if depth < MAX_DEPTH {
        if let Some(kids) = children.get(&Some(row.id.as_str())) {
            let mut kids = kids.clone();
            kids.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            node.replies = kids
                .into_iter()
                .map(|kid| materialize(kid, children, depth + 1))
                .collect();
        }
    }

    node
}

pub(crate) fn node_from_row(row: &CommentRow) -> CommentNode {
    let author_id = parse_uuid(&row.author_id, "author id");
    CommentNode {
        id: parse_uuid(&row.id, "comment id"),
        post_id: parse_uuid(&row.post_id, "post id"),
        author_id,
        content: row.content.clone(),
        parent_id: row.parent_id.as_deref().map(|p| parse_uuid(p, "parent id")),
        created_at: parse_created_at(&row.created_at, &row.id),
        author: Author {
            id: author_id,
            name: row.author_name.clone(),
            email: row.author_email.clone(),
        },
        replies: Vec::new(),
    }
}
