//! Regex + fixed-dictionary named-entity extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

pub const MAX_ENTITY_LINKS: usize = 5;
pub const MAX_TOTAL_ENTITY_EDGES: usize = 50;

static ENTITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\b([A-Z][a-z]+(?:[A-Z][a-z]+)+)\b").unwrap(),
        Regex::new(r"\b([A-Z]{2,6})\b").unwrap(),
        Regex::new(r#"(?:^|[\s"'(])([.\w/-]+\.\w{1,10})(?:[\s"'),.]|$)"#).unwrap(),
        Regex::new(r#"https?://[^\s"'<>)]+"#).unwrap(),
        Regex::new(r"@([a-zA-Z_]\w+)").unwrap(),
    ]
});

static WORD_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z0-9]+").unwrap());

const TECH_DICTIONARY: &[&str] = &[
    "Go", "Rust", "Python", "Java", "Kotlin", "Swift", "Ruby", "Elixir", "Zig", "Lua", "Dart",
    "Scala", "Perl", "Haskell", "OCaml", "Julia", "Clojure", "JavaScript", "TypeScript", "React",
    "Vue", "Angular", "Svelte", "Next", "Nuxt", "Node", "Deno", "Bun", "Vite", "Webpack", "SQLite",
    "PostgreSQL", "Postgres", "MySQL", "Redis", "MongoDB", "DynamoDB", "Cassandra", "Qdrant",
    "Milvus", "Chroma", "Pinecone", "Neo4j", "Weaviate", "Elasticsearch", "Docker", "Kubernetes",
    "Terraform", "Ansible", "Nginx", "Caddy", "Kafka", "RabbitMQ", "AWS", "GCP", "Azure", "Vercel",
    "Netlify", "Cloudflare", "Supabase", "Firebase", "Ollama", "OpenAI", "Claude", "Anthropic",
    "PyTorch", "TensorFlow", "LangChain", "LlamaIndex", "FAISS", "Hugging", "Git", "GitHub",
    "GitLab", "Cobra", "FastAPI", "Flask", "Django", "Rails", "Spring", "Express", "Gin", "Echo",
    "Fiber", "Pytest", "Jest", "Vitest", "gRPC", "GraphQL", "WebSocket", "OAuth", "JWT", "YAML",
    "TOML", "Protobuf", "MAGMA", "MCP", "RLM",
];

const ACRONYM_STOPWORDS: &[&str] = &[
    "IN", "ON", "AT", "TO", "BY", "OR", "AN", "IF", "IS", "IT", "OF", "AS", "DO", "NO", "SO", "UP",
    "WE", "HE", "MY", "BE", "GO", "THE", "AND", "FOR", "ARE", "BUT", "NOT", "YOU", "ALL", "CAN",
    "HER", "WAS", "ONE", "OUR", "OUT", "HAS", "HAD", "HOW", "MAN", "NEW", "NOW", "OLD", "SEE",
    "WAY", "MAY", "SAY", "SHE", "TWO", "USE", "BOY", "DID", "GET", "HIM", "HIS", "LET", "PUT",
    "TOP", "TOO", "ANY",
];

/// Split text into ASCII-alphanumeric words, preserving original casing.
fn split_words(text: &str) -> Vec<&str> {
    WORD_SPLIT_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Extract named entities: CamelCase compounds, uppercase acronyms,
/// file paths, URLs, `@mentions`, plus fixed-dictionary tech terms.
/// First-seen order is preserved.
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entities: Vec<String> = Vec::new();

    for pat in ENTITY_PATTERNS.iter() {
        for caps in pat.captures_iter(text) {
            let m = caps.get(1).or_else(|| caps.get(0));
            let Some(m) = m else { continue };
            let entity = m.as_str();
            if entity.is_empty() || seen.contains(entity) {
                continue;
            }
            if ACRONYM_STOPWORDS.contains(&entity) {
                continue;
            }
            seen.insert(entity.to_string());
            entities.push(entity.to_string());
        }
    }

    for word in split_words(text) {
        if TECH_DICTIONARY.contains(&word) && !seen.contains(word) {
            seen.insert(word.to_string());
            entities.push(word.to_string());
        }
    }

    entities
}

/// Concatenate `provided` then `extracted`, deduplicating while
/// preserving the order of `provided` first.
pub fn merge_entities(provided: &[String], extracted: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for e in provided.iter().chain(extracted.iter()) {
        if !e.is_empty() && seen.insert(e.clone()) {
            merged.push(e.clone());
        }
    }
    merged
}

/// IDF weight for an entity edge. 0 when the entity is universal
/// (`doc_freq >= total_docs`) or the corpus is trivially small; 1.0 for
/// a brand-new entity; otherwise `max(ln(total/doc_freq)/ln(total),
/// 0.1)`.
pub fn entity_idf_weight(doc_freq: i64, total_docs: i64) -> f64 {
    if total_docs <= 1 || doc_freq >= total_docs {
        return 0.0;
    }
    if doc_freq <= 0 {
        return 1.0;
    }
    let raw = (total_docs as f64 / doc_freq as f64).ln() / (total_docs as f64).ln();
    raw.max(0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_camel_case_acronym_path_url_mention_and_dictionary() {
        let text = "Check AuthService in config.yaml, see https://example.com/docs, ping @alice, uses Go and SQLite, AWS too.";
        let entities = extract_entities(text);
        assert!(entities.contains(&"AuthService".to_string()));
        assert!(entities.contains(&"config.yaml".to_string()));
        assert!(entities.iter().any(|e| e.starts_with("https://")));
        assert!(entities.contains(&"alice".to_string()));
        assert!(entities.contains(&"Go".to_string()));
        assert!(entities.contains(&"SQLite".to_string()));
        assert!(entities.contains(&"AWS".to_string()));
    }

    #[test]
    fn acronym_stopwords_are_excluded() {
        let entities = extract_entities("IT IS ALL FINE");
        assert!(!entities.contains(&"IT".to_string()));
        assert!(!entities.contains(&"IS".to_string()));
        assert!(!entities.contains(&"ALL".to_string()));
    }

    #[test]
    fn merge_preserves_provided_order_first() {
        let provided = vec!["Go".to_string(), "Rust".to_string()];
        let extracted = vec!["Rust".to_string(), "SQLite".to_string()];
        let merged = merge_entities(&provided, &extracted);
        assert_eq!(merged, vec!["Go".to_string(), "Rust".to_string(), "SQLite".to_string()]);
    }

    #[test]
    fn idf_weight_matches_spec_bounds() {
        assert_eq!(entity_idf_weight(10, 10), 0.0);
        assert!(entity_idf_weight(0, 100) > 0.9);
        let w1 = entity_idf_weight(5, 100);
        let w2 = entity_idf_weight(50, 100);
        assert!(w1 >= w2);
    }
}
