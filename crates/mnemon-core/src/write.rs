//! The `remember` write pipeline: validate, diff against the existing
//! corpus, quality-check, then persist and link inside one transaction.

use crate::diff::{self, DiffMatch, Suggestion};
use crate::edges;
use crate::model::{Category, Insight, ValidationError};
use crate::quality::check_content_quality;
use crate::retention::MAX_INSIGHTS;
use crate::store::{Store, StoreError, queries};
use crate::vector::{deserialize_vector, serialize_vector};

/// Inputs to [`remember`]. `embedding` is computed by the caller ahead
/// of time (embedding generation is async; this pipeline is not).
pub struct RememberRequest {
    pub content: String,
    pub category: Category,
    pub importance: u8,
    pub tags: Vec<String>,
    pub entities: Vec<String>,
    pub source: String,
    pub embedding: Option<Vec<f64>>,
    pub skip_diff: bool,
}

/// Result of a completed (or diff-skipped) `remember` call.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RememberOutcome {
    pub insight: Insight,
    pub action: Suggestion,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_id: Option<String>,
    pub diff_matches: Vec<DiffMatch>,
    pub edges_created: i64,
    pub semantic_candidates: Vec<SemanticCandidateView>,
    pub causal_candidates: Vec<CausalCandidateView>,
    pub quality_warnings: Vec<&'static str>,
    pub embedded: bool,
    pub effective_importance: f64,
    pub auto_pruned: i64,
}

/// Serializable projection of [`SemanticCandidate`] (the full insight is
/// too heavy for the remember response; only a summary is surfaced).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticCandidateView {
    pub id: String,
    pub content: String,
    pub similarity: f64,
    pub auto_linked: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalCandidateView {
    pub id: String,
    pub content: String,
    pub hop: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causal_signal: Option<String>,
    pub suggested_sub_type: String,
}

impl serde::Serialize for DiffMatch {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = s.serialize_struct("DiffMatch", 5)?;
        st.serialize_field("id", &self.id)?;
        st.serialize_field("content", &self.content)?;
        st.serialize_field("tokenSimilarity", &self.token_similarity)?;
        st.serialize_field("cosineSimilarity", &self.cosine_similarity)?;
        st.serialize_field("suggestion", &self.suggestion)?;
        st.end()
    }
}

/// Errors specific to the write pipeline, beyond plain validation.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Run the full remember pipeline against `store`.
///
/// Diff/quality checks run outside the transaction (read-only against
/// the current corpus); a duplicate match short-circuits before any
/// insert, logging a `diff-skip` oplog entry. Otherwise a single
/// transaction inserts the new insight, runs edge generation, refreshes
/// effective importance, and auto-prunes over capacity. Candidate
/// discovery (semantic/causal) runs after commit, purely informational.
pub fn remember(store: &Store, req: RememberRequest) -> Result<RememberOutcome, WriteError> {
    let mut insight = Insight::new(req.content, req.category, req.importance, req.tags, req.entities, req.source)?;
    insight.embedding = req.embedding.clone();

    let quality_warnings = check_content_quality(&insight.content);

    let existing = store.get_all_active_insights()?;
    let existing_embed: Vec<(String, Vec<f64>)> = if req.embedding.is_some() {
        store
            .get_all_embeddings()?
            .into_iter()
            .filter_map(|(id, blob)| deserialize_vector(&blob).map(|v| (id, v)))
            .collect()
    } else {
        Vec::new()
    };

    let diff_result = if req.skip_diff {
        diff::DiffResult { suggestion: Suggestion::Add, matches: Vec::new() }
    } else {
        diff::diff(
            &existing,
            &insight.content,
            5,
            req.embedding.as_deref(),
            if existing_embed.is_empty() { None } else { Some(existing_embed.as_slice()) },
        )
    };

    if diff_result.suggestion == Suggestion::Duplicate {
        let replaced_id = diff_result.matches.first().map(|m| m.id.clone());
        if let Some(id) = &replaced_id {
            store.with_conn(|conn| {
                queries::log_op(conn, "diff-skip", id, "duplicate of new content");
                Ok(())
            })?;
        }
        return Ok(RememberOutcome {
            insight,
            action: Suggestion::Duplicate,
            skipped: true,
            replaced_id,
            diff_matches: diff_result.matches,
            edges_created: 0,
            semantic_candidates: Vec::new(),
            causal_candidates: Vec::new(),
            quality_warnings,
            embedded: false,
            effective_importance: 0.0,
            auto_pruned: 0,
        });
    }

    let replaced_id = match diff_result.suggestion {
        Suggestion::Update | Suggestion::Conflict => diff_result.matches.first().map(|m| m.id.clone()),
        _ => None,
    };

    let embedding_blob = req.embedding.as_deref().map(serialize_vector);
    let new_id = insight.id.clone();

    let (edges_created, effective_importance, auto_pruned) = store.in_transaction(|conn| {
        if let Some(rid) = &replaced_id {
            if let Err(e) = queries::soft_delete_insight(conn, rid) {
                tracing::warn!(error = %e, replaced_id = %rid, "failed to soft-delete replaced insight");
            }
        }

        queries::insert_insight(conn, &insight)?;
        if let Some(blob) = &embedding_blob {
            queries::update_embedding(conn, &insight.id, blob)?;
        }

        let link_counts = edges::link_insight(conn, &mut insight);

        let ei = queries::refresh_effective_importance(conn, &insight.id).unwrap_or_else(|e| {
            tracing::warn!(error = %e, insight_id = %insight.id, "effective importance refresh failed");
            0.0
        });

        let pruned = queries::auto_prune(conn, MAX_INSIGHTS, std::slice::from_ref(&insight.id)).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "auto-prune failed");
            0
        });

        queries::log_op(conn, "remember", &insight.id, &format!("category={} importance={}", insight.category, insight.importance));

        Ok((link_counts.total(), ei, pruned))
    })?;

    let (semantic_candidates, causal_candidates) = store.with_conn(|conn| {
        let lookup = queries::get_insight(conn, &new_id)?.unwrap_or_else(|| insight.clone());
        let sem = edges::find_semantic_candidates(conn, &lookup)
            .into_iter()
            .map(|c| SemanticCandidateView {
                id: c.insight.id,
                content: c.insight.content,
                similarity: c.similarity,
                auto_linked: c.auto_linked,
            })
            .collect();
        let causal = edges::find_causal_candidates(conn, &lookup)
            .into_iter()
            .map(|c| CausalCandidateView {
                id: c.insight.id,
                content: c.insight.content,
                hop: c.hop,
                causal_signal: c.causal_signal,
                suggested_sub_type: c.suggested_sub_type,
            })
            .collect();
        Ok((sem, causal))
    })?;

    Ok(RememberOutcome {
        insight,
        action: diff_result.suggestion,
        skipped: false,
        replaced_id,
        diff_matches: diff_result.matches,
        edges_created,
        semantic_candidates,
        causal_candidates,
        quality_warnings,
        embedded: req.embedding.is_some(),
        effective_importance,
        auto_pruned,
    })
}
