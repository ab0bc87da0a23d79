//! Temporal edges: a backbone chain per `source`, plus proximity links
//! to anything created in the same rolling window.

use rusqlite::Connection;

use crate::model::{Edge, EdgeMetadata, EdgeType, Insight, format_float};
use crate::store::queries;

pub const TEMPORAL_WINDOW_HOURS: f64 = 24.0;
pub const MAX_PROXIMITY_EDGES: i64 = 10;

/// Link `insight` into its source's backbone chain and to any insights
/// created in the trailing window. Individual `insert_edge` failures
/// are swallowed — a partial link set is better than none.
pub fn create_temporal_edges(conn: &Connection, insight: &Insight) -> i64 {
    let mut count = 0;

    let prev = queries::get_latest_insight_by_source(conn, &insight.source, &insight.id).ok().flatten();
    if let Some(prev) = &prev {
        let backbone_meta =
            |direction: &str| EdgeMetadata { sub_type: Some("backbone".into()), direction: Some(direction.into()), ..Default::default() };

        if let Ok(edge) = Edge::new(prev.id.clone(), insight.id.clone(), EdgeType::Temporal, 1.0, backbone_meta("precedes")) {
            if queries::insert_edge(conn, &edge).is_ok() {
                count += 1;
            }
        }
        if let Ok(edge) = Edge::new(insight.id.clone(), prev.id.clone(), EdgeType::Temporal, 1.0, backbone_meta("succeeds")) {
            if queries::insert_edge(conn, &edge).is_ok() {
                count += 1;
            }
        }
    }

    let recent = queries::get_recent_insights_in_window(conn, &insight.id, TEMPORAL_WINDOW_HOURS, MAX_PROXIMITY_EDGES)
        .unwrap_or_default();
    if recent.is_empty() {
        return count;
    }

    let backbone_id = prev.as_ref().map(|p| p.id.as_str()).unwrap_or("");

    for near in &recent {
        if near.id == backbone_id {
            continue;
        }

        let hours_diff = ((insight.created_at - near.created_at).num_seconds().abs() as f64) / 3600.0;
        let weight = 1.0 / (1.0 + hours_diff);
        let meta = EdgeMetadata {
            sub_type: Some("proximity".into()),
            hours_diff: Some(format_float(hours_diff)),
            ..Default::default()
        };

        if let Ok(edge) = Edge::new(insight.id.clone(), near.id.clone(), EdgeType::Temporal, weight, meta.clone()) {
            if queries::insert_edge(conn, &edge).is_ok() {
                count += 1;
            }
        }
        if let Ok(edge) = Edge::new(near.id.clone(), insight.id.clone(), EdgeType::Temporal, weight, meta) {
            if queries::insert_edge(conn, &edge).is_ok() {
                count += 1;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::store::Store;
    use chrono::Duration;

    #[test]
    fn backbone_chain_links_precedes_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let mut t1 = Insight::new("deployed v1 of the pipeline".into(), Category::Fact, 3, vec![], vec![], "projA".into()).unwrap();
        t1.created_at -= Duration::hours(1);
        store.in_transaction(|conn| Ok(queries::insert_insight(conn, &t1)?)).unwrap();

        let t2 = Insight::new("deployed v2 of the pipeline".into(), Category::Fact, 3, vec![], vec![], "projA".into()).unwrap();
        store.in_transaction(|conn| Ok(queries::insert_insight(conn, &t2)?)).unwrap();

        let count = store.with_conn(|conn| Ok(create_temporal_edges(conn, &t2))).unwrap();
        assert_eq!(count, 2);

        let edges = store.get_edges_by_node(&t2.id).unwrap();
        let backbone: Vec<_> = edges.iter().filter(|e| e.metadata.sub_type.as_deref() == Some("backbone")).collect();
        assert_eq!(backbone.len(), 2);
        assert!(backbone.iter().all(|e| e.weight == 1.0));
        let directions: std::collections::HashSet<_> = backbone.iter().filter_map(|e| e.metadata.direction.clone()).collect();
        assert_eq!(directions, std::collections::HashSet::from(["precedes".to_string(), "succeeds".to_string()]));
    }
}
