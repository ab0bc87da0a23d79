//! Plain breadth-first graph traversal, used for candidate discovery
//! (as opposed to [`crate::recall`]'s intent-weighted beam search).

use std::collections::{HashMap, HashSet, VecDeque};

use rusqlite::Connection;

use crate::model::{EdgeType, Insight};
use crate::store::queries;

#[derive(Debug, Clone, Copy, Default)]
pub struct BfsOptions {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub edge_filter: Option<EdgeType>,
}

/// A node reached during traversal.
pub struct BfsHit {
    pub insight: Insight,
    pub hop: usize,
    pub via_edge: EdgeType,
}

/// Traverse outward from `start_id` over the full active graph,
/// respecting `opts.max_depth`/`max_nodes`/`edge_filter`.
pub fn bfs(conn: &Connection, start_id: &str, opts: BfsOptions) -> Vec<BfsHit> {
    let all_insights = queries::get_all_active_insights(conn).unwrap_or_default();
    if all_insights.is_empty() {
        return Vec::new();
    }
    let insight_map: HashMap<String, Insight> = all_insights.into_iter().map(|i| (i.id.clone(), i)).collect();

    let all_edges = queries::get_all_edges(conn).unwrap_or_default();
    let mut adj: HashMap<String, Vec<&crate::model::Edge>> = HashMap::new();
    for e in &all_edges {
        adj.entry(e.source_id.clone()).or_default().push(e);
        if e.source_id != e.target_id {
            adj.entry(e.target_id.clone()).or_default().push(e);
        }
    }

    let mut visited: HashSet<String> = HashSet::from([start_id.to_string()]);
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(start_id.to_string(), 0)]);
    let mut result = Vec::new();

    'outer: while let Some((cur_id, hop)) = queue.pop_front() {
        if opts.max_nodes > 0 && result.len() >= opts.max_nodes {
            break;
        }
        if hop >= opts.max_depth {
            continue;
        }

        for edge in adj.get(&cur_id).cloned().unwrap_or_default() {
            if let Some(filter) = opts.edge_filter {
                if edge.edge_type != filter {
                    continue;
                }
            }

            let neighbor_id = if edge.target_id == cur_id { edge.source_id.clone() } else { edge.target_id.clone() };
            if !visited.insert(neighbor_id.clone()) {
                continue;
            }

            let Some(ins) = insight_map.get(&neighbor_id) else { continue };
            result.push(BfsHit { insight: ins.clone(), hop: hop + 1, via_edge: edge.edge_type });

            if opts.max_nodes > 0 && result.len() >= opts.max_nodes {
                break 'outer;
            }
            queue.push_back((neighbor_id, hop + 1));
        }
    }

    result
}
