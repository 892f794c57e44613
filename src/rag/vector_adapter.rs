//! Vector collection lifecycle and search for a single pipeline.
//!
//! Backed by the embedded `ares-vector` HNSW store: one collection per
//! pipeline, named after the pipeline id, persisted under
//! `<data_root>/<pipeline_id>/`. `ares-vector` has no native pre-filtering, so
//! metadata filters are applied client-side after an over-fetch, the same
//! pattern used by `db::ares_vector`'s collection-search path.

use std::path::{Path, PathBuf};

use ares_vector::{Config, DistanceMetric, HnswConfig, MetadataValue, SearchResult, VectorMetadata};

use crate::types::{AppError, MetadataFilter, MetadataFilterOperator, Result};

/// A single chunk ready to be written into the vector collection.
pub struct EmbeddedChunk {
    pub id: String,
    pub embedding: Vec<f32>,
    pub content: String,
    pub metadata: serde_json::Value,
}

const COLLECTION_NAME: &str = "chunks";

/// Owns the embedded vector database for one pipeline's collection.
///
/// Each pipeline gets its own `VectorDb` rooted at its own directory so a
/// pipeline can be deleted by simply removing a directory tree.
pub struct VectorAdapter {
    db: ares_vector::VectorDb,
}

impl VectorAdapter {
    /// Open (creating if absent) the on-disk collection for `pipeline_id`.
    pub async fn open(data_root: &Path, pipeline_id: &str, dimensions: usize) -> Result<Self> {
        let path = pipeline_dir(data_root, pipeline_id);
        let config = Config::persistent(path).with_hnsw_config(HnswConfig::default());
        let db = ares_vector::VectorDb::open(config)
            .await
            .map_err(|e| AppError::VectorStoreFailure(format!("failed to open vector db: {e}")))?;

        if !db.collection_exists(COLLECTION_NAME) {
            db.create_collection(COLLECTION_NAME, dimensions, DistanceMetric::Cosine)
                .await
                .map_err(|e| {
                    AppError::VectorStoreFailure(format!("failed to create collection: {e}"))
                })?;
        }

        Ok(Self { db })
    }

    /// Permanently remove a pipeline's on-disk vector data.
    pub async fn drop_pipeline(data_root: &Path, pipeline_id: &str) -> Result<()> {
        let path = pipeline_dir(data_root, pipeline_id);
        if path.exists() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| AppError::Internal(format!("failed to remove pipeline directory: {e}")))?;
        }
        Ok(())
    }

    /// Insert a batch of embedded chunks.
    pub async fn insert_batch(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        let items = chunks.iter().map(|chunk| {
            let mut metadata = VectorMetadata::new();
            metadata.insert("content", MetadataValue::String(chunk.content.clone()));
            if let serde_json::Value::Object(map) = &chunk.metadata {
                for (key, value) in map {
                    metadata.insert(key.clone(), json_to_metadata_value(value.clone()));
                }
            }
            (chunk.id.as_str(), chunk.embedding.as_slice(), Some(metadata))
        });

        self.db
            .insert_batch(COLLECTION_NAME, items)
            .await
            .map(|_| ())
            .map_err(|e| AppError::VectorStoreFailure(format!("insert_batch failed: {e}")))
    }

    /// Delete every vector belonging to a single document, identified by the
    /// `document_id` stashed in each chunk's metadata.
    pub async fn delete_by_document(&self, document_id: &str) -> Result<u64> {
        let collection = self
            .db
            .get_collection(COLLECTION_NAME)
            .map_err(|e| AppError::VectorStoreFailure(e.to_string()))?;

        let ids: Vec<String> = collection
            .export_all()
            .into_iter()
            .filter(|(_, _, metadata)| {
                metadata
                    .as_ref()
                    .and_then(|m| m.get_string("document_id"))
                    .map(|id| id == document_id)
                    .unwrap_or(false)
            })
            .map(|(id, _, _)| id)
            .collect();

        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let count = if refs.is_empty() {
            0
        } else {
            self.db
                .delete_batch(COLLECTION_NAME, &refs)
                .await
                .map_err(|e| AppError::VectorStoreFailure(format!("delete_batch failed: {e}")))?
        };
        Ok(count as u64)
    }

    /// Nearest-neighbour search, optionally narrowed by `filters` applied
    /// client-side against each hit's metadata. Over-fetches by a factor of
    /// 4 (capped) to leave enough candidates after filtering.
    pub async fn search(
        &self,
        query: &[f32],
        limit: usize,
        filters: &[MetadataFilter],
    ) -> Result<Vec<SearchResult>> {
        let over_fetch = if filters.is_empty() {
            limit
        } else {
            (limit * 4).min(500)
        };

        let mut results = self
            .db
            .search(COLLECTION_NAME, query, over_fetch)
            .await
            .map_err(|e| AppError::VectorStoreFailure(format!("search failed: {e}")))?;

        if !filters.is_empty() {
            results.retain(|result| matches_all_filters(result, filters));
        }
        results.truncate(limit);
        Ok(results)
    }

    /// Number of vectors currently stored for this pipeline.
    pub fn count(&self) -> Result<u64> {
        self.db
            .count(COLLECTION_NAME)
            .map(|n| n as u64)
            .map_err(|e| AppError::VectorStoreFailure(e.to_string()))
    }

    pub async fn persist(&self) -> Result<()> {
        self.db
            .persist()
            .await
            .map_err(|e| AppError::VectorStoreFailure(format!("persist failed: {e}")))
    }

    /// The embedding model id recorded for this pipeline's collection, if any
    /// document has ever been ingested into it.
    pub async fn recorded_model(data_root: &Path, pipeline_id: &str) -> Result<Option<String>> {
        let path = model_marker_path(data_root, pipeline_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Internal(format!("failed to read model marker: {e}"))),
        }
    }

    /// Record `model_id` as the embedding model backing this pipeline's
    /// collection. Called once, after the first successful ingest.
    pub async fn record_model(data_root: &Path, pipeline_id: &str, model_id: &str) -> Result<()> {
        let path = model_marker_path(data_root, pipeline_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("failed to create pipeline directory: {e}")))?;
        }
        tokio::fs::write(&path, model_id)
            .await
            .map_err(|e| AppError::Internal(format!("failed to write model marker: {e}")))
    }
}

/// Convert an `ares-vector` search result's metadata into a JSON object,
/// excluding the `content` key that's stashed there for retrieval. Returns
/// an empty object if the result carried no metadata.
pub fn search_result_metadata_json(result: &SearchResult) -> serde_json::Value {
    let Some(metadata) = result.metadata.as_ref() else {
        return serde_json::Value::Object(serde_json::Map::new());
    };
    let mut map = serde_json::Map::new();
    for (key, value) in metadata.data.iter() {
        if key == "content" {
            continue;
        }
        map.insert(key.clone(), metadata_value_to_json(value));
    }
    serde_json::Value::Object(map)
}

/// The raw chunk text stashed in a search result's `content` metadata field.
pub fn search_result_content(result: &SearchResult) -> String {
    result
        .metadata
        .as_ref()
        .and_then(|m| m.get_string("content"))
        .unwrap_or_default()
        .to_string()
}

fn pipeline_dir(data_root: &Path, pipeline_id: &str) -> PathBuf {
    data_root.join(pipeline_id)
}

fn model_marker_path(data_root: &Path, pipeline_id: &str) -> PathBuf {
    pipeline_dir(data_root, pipeline_id).join("model.id")
}

fn json_to_metadata_value(value: serde_json::Value) -> MetadataValue {
    match value {
        serde_json::Value::String(s) => MetadataValue::String(s),
        serde_json::Value::Bool(b) => MetadataValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Int(i)
            } else {
                MetadataValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::Array(items) => {
            MetadataValue::List(items.into_iter().map(json_to_metadata_value).collect())
        }
        other => MetadataValue::String(other.to_string()),
    }
}

fn matches_all_filters(result: &SearchResult, filters: &[MetadataFilter]) -> bool {
    filters.iter().all(|filter| matches_filter(result, filter))
}

fn matches_filter(result: &SearchResult, filter: &MetadataFilter) -> bool {
    let Some(metadata) = result.metadata.as_ref() else {
        return false;
    };
    let Some(actual) = metadata.get(&filter.field) else {
        return false;
    };

    let actual_json = metadata_value_to_json(actual);
    match filter.op {
        MetadataFilterOperator::Eq => actual_json == filter.value,
        MetadataFilterOperator::Ne => actual_json != filter.value,
        MetadataFilterOperator::Gt => compare_numeric(&actual_json, &filter.value, |a, b| a > b),
        MetadataFilterOperator::Gte => compare_numeric(&actual_json, &filter.value, |a, b| a >= b),
        MetadataFilterOperator::Lt => compare_numeric(&actual_json, &filter.value, |a, b| a < b),
        MetadataFilterOperator::Lte => compare_numeric(&actual_json, &filter.value, |a, b| a <= b),
        MetadataFilterOperator::In => filter
            .value
            .as_array()
            .map(|values| values.contains(&actual_json))
            .unwrap_or(false),
        MetadataFilterOperator::Nin => filter
            .value
            .as_array()
            .map(|values| !values.contains(&actual_json))
            .unwrap_or(true),
    }
}

fn compare_numeric(
    actual: &serde_json::Value,
    expected: &serde_json::Value,
    op: impl Fn(f64, f64) -> bool,
) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn metadata_value_to_json(value: &MetadataValue) -> serde_json::Value {
    match value {
        MetadataValue::String(s) => serde_json::Value::String(s.clone()),
        MetadataValue::Int(i) => serde_json::Value::Number((*i).into()),
        MetadataValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        MetadataValue::Bool(b) => serde_json::Value::Bool(*b),
        MetadataValue::List(items) => {
            serde_json::Value::Array(items.iter().map(metadata_value_to_json).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_filter_matches_string_metadata() {
        let mut metadata = VectorMetadata::new();
        metadata.insert("file_type", MetadataValue::String("pdf".to_string()));
        let result = SearchResult {
            id: "a".to_string(),
            score: 0.9,
            metadata: Some(metadata),
        };
        let filter = MetadataFilter {
            field: "file_type".to_string(),
            op: MetadataFilterOperator::Eq,
            value: serde_json::json!("pdf"),
        };
        assert!(matches_filter(&result, &filter));
    }

    #[test]
    fn gte_filter_compares_numerically() {
        let mut metadata = VectorMetadata::new();
        metadata.insert("chunk_index", MetadataValue::Int(5));
        let result = SearchResult {
            id: "a".to_string(),
            score: 0.5,
            metadata: Some(metadata),
        };
        let filter = MetadataFilter {
            field: "chunk_index".to_string(),
            op: MetadataFilterOperator::Gte,
            value: serde_json::json!(3),
        };
        assert!(matches_filter(&result, &filter));

        let filter_fail = MetadataFilter {
            field: "chunk_index".to_string(),
            op: MetadataFilterOperator::Gte,
            value: serde_json::json!(10),
        };
        assert!(!matches_filter(&result, &filter_fail));
    }

    #[test]
    fn missing_field_never_matches() {
        let result = SearchResult {
            id: "a".to_string(),
            score: 0.5,
            metadata: Some(VectorMetadata::new()),
        };
        let filter = MetadataFilter {
            field: "absent".to_string(),
            op: MetadataFilterOperator::Eq,
            value: serde_json::json!("x"),
        };
        assert!(!matches_filter(&result, &filter));
    }
}
