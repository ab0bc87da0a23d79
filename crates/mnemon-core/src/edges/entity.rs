//! Entity co-occurrence edges, IDF-weighted once the corpus is large
//! enough for document frequency to be meaningful.

use rusqlite::Connection;

use crate::entity::{MAX_ENTITY_LINKS, MAX_TOTAL_ENTITY_EDGES, entity_idf_weight};
use crate::model::{Edge, EdgeMetadata, EdgeType, Insight};
use crate::store::queries;

/// Below this many active insights, document frequency is too noisy to
/// trust — every co-occurrence gets uniform weight 1.0 instead.
const IDF_MIN_CORPUS: i64 = 5;

/// Link `insight` to others sharing each of its entities, up to
/// [`MAX_TOTAL_ENTITY_EDGES`] edges total. Per-edge insert failures are
/// swallowed.
pub fn create_entity_edges(conn: &Connection, insight: &Insight) -> i64 {
    let mut count = 0usize;
    let total_docs = queries::count_active_insights(conn).unwrap_or(0);
    let use_idf = total_docs > IDF_MIN_CORPUS;

    for entity in &insight.entities {
        if count >= MAX_TOTAL_ENTITY_EDGES {
            break;
        }

        let ids = queries::find_insights_with_entity(conn, entity, &insight.id, MAX_ENTITY_LINKS as i64).unwrap_or_default();
        if ids.is_empty() {
            continue;
        }

        let weight = if use_idf {
            let doc_freq = queries::count_insights_with_entity(conn, entity, &insight.id).unwrap_or(0) + 1;
            let w = entity_idf_weight(doc_freq, total_docs);
            if w == 0.0 {
                continue;
            }
            w
        } else {
            1.0
        };

        for target_id in &ids {
            let meta = EdgeMetadata { entity: Some(entity.clone()), ..Default::default() };
            if let Ok(edge) = Edge::new(insight.id.clone(), target_id.clone(), EdgeType::Entity, weight, meta.clone()) {
                if queries::insert_edge(conn, &edge).is_ok() {
                    count += 1;
                }
            }
            if let Ok(edge) = Edge::new(target_id.clone(), insight.id.clone(), EdgeType::Entity, weight, meta) {
                if queries::insert_edge(conn, &edge).is_ok() {
                    count += 1;
                }
            }
        }
    }

    count as i64
}
