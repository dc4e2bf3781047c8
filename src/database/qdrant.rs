//! Qdrant vector store over gRPC
//!
//! Each session gets its own collection (cosine distance). Records carry a
//! `{status, content}` payload; searches filter on `status = active`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors_output::VectorsOptions, Condition, CountPointsBuilder,
    CreateCollectionBuilder, Distance, Filter, PointId, PointStruct, PointsIdsList, ScoredPoint,
    SearchPointsBuilder, SetPayloadPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
    VectorsOutput,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::QdrantConfig;
use crate::core::{
    storage::validate_insert, MemoryPayload, MemoryStatus, ScoredMemory, SearchQuery, StoredMemory, VectorStore,
};
use crate::error::{Error, Result};

/// Qdrant client wrapper
pub struct QdrantStore {
    client: Qdrant,
    dimensions: usize,
}

impl QdrantStore {
    /// Build a client for the configured endpoint
    pub fn new(config: &QdrantConfig, dimensions: usize) -> Result<Self> {
        Url::parse(&config.url).map_err(|e| Error::Config(format!("Invalid Qdrant URL: {}", e)))?;

        let api_key = config.api_key.as_ref().map(|k| k.expose_secret().to_string());
        let client = Qdrant::from_url(&config.url)
            .api_key(api_key)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build Qdrant client: {}", e)))?;

        Ok(QdrantStore { client, dimensions })
    }

    /// Build a client and verify the server answers
    pub async fn connect(config: &QdrantConfig, dimensions: usize) -> Result<Self> {
        let store = Self::new(config, dimensions)?;
        if !store.health_check().await? {
            return Err(Error::ServiceUnavailable(format!(
                "Qdrant at {} is not healthy",
                config.url
            )));
        }
        info!("Qdrant client initialized successfully");
        Ok(store)
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(|e| store_error("check collection", collection, e))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn id(&self) -> &str {
        "qdrant"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        if self.collection_exists(collection).await? {
            debug!("Collection {} already exists", collection);
            return Ok(());
        }

        let created = self
            .client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(self.dimensions as u64, Distance::Cosine)),
            )
            .await;

        if let Err(e) = created {
            // Lost a creation race
            if self.collection_exists(collection).await? {
                return Ok(());
            }
            return Err(store_error("create collection", collection, e));
        }

        info!("Created collection {}", collection);
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<MemoryPayload>,
    ) -> Result<Vec<Uuid>> {
        validate_insert(self.dimensions, &vectors, &payloads)?;
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = vectors.iter().map(|_| Uuid::new_v4()).collect();
        let points: Vec<PointStruct> = ids
            .iter()
            .zip(vectors)
            .zip(&payloads)
            .map(|((id, vector), payload)| PointStruct::new(id.to_string(), vector, payload_map(payload)))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| store_error("upsert points into", collection, e))?;

        debug!("Inserted {} points into {}", ids.len(), collection);
        Ok(ids)
    }

    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<ScoredMemory>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query.vector.clone(), query.limit)
                    .filter(status_filter(MemoryStatus::Active))
                    .with_payload(true)
                    .with_vectors(query.with_vectors)
                    .score_threshold(query.score_threshold),
            )
            .await
            .map_err(|e| store_error("search", collection, e))?;

        scored_hits(response.result, query.score_threshold)
    }

    async fn soft_delete(&self, collection: &str, id: Uuid) -> Result<()> {
        let status = HashMap::from([(
            "status".to_string(),
            Value::from(MemoryStatus::Deleted.as_str().to_string()),
        )]);

        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(collection, Payload::from(status))
                    .points_selector(PointsIdsList {
                        ids: vec![PointId::from(id.to_string())],
                    })
                    .wait(true),
            )
            .await
            .map_err(|e| store_error("set payload in", collection, e))?;

        debug!("Soft-deleted point {} in {}", id, collection);
        Ok(())
    }

    async fn count(&self, collection: &str, status: Option<MemoryStatus>) -> Result<u64> {
        let mut request = CountPointsBuilder::new(collection).exact(true);
        if let Some(status) = status {
            request = request.filter(status_filter(status));
        }

        let response = self
            .client
            .count(request)
            .await
            .map_err(|e| store_error("count points in", collection, e))?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.health_check().await {
            Ok(reply) => {
                debug!("Qdrant {} is healthy", reply.version);
                Ok(true)
            }
            Err(e) => {
                warn!("Qdrant health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

fn store_error(action: &str, collection: &str, e: QdrantError) -> Error {
    Error::VectorStore(format!("Failed to {} {}: {}", action, collection, e))
}

fn status_filter(status: MemoryStatus) -> Filter {
    Filter::must([Condition::matches("status", status.as_str().to_string())])
}

fn payload_map(payload: &MemoryPayload) -> HashMap<String, Value> {
    HashMap::from([
        ("status".to_string(), Value::from(payload.status.as_str().to_string())),
        ("content".to_string(), Value::from(payload.content.clone())),
    ])
}

fn decode_payload(payload: &HashMap<String, Value>) -> Option<MemoryPayload> {
    let status = payload.get("status")?.as_str()?.parse().ok()?;
    let content = payload.get("content")?.as_str()?.clone();
    Some(MemoryPayload { status, content })
}

fn point_uuid(id: Option<PointId>) -> Option<Uuid> {
    match id?.point_id_options? {
        PointIdOptions::Uuid(s) => Uuid::parse_str(&s).ok(),
        PointIdOptions::Num(_) => None,
    }
}

#[allow(deprecated)]
fn dense_vector(vectors: Option<VectorsOutput>) -> Option<Vec<f32>> {
    match vectors?.vectors_options? {
        VectorsOptions::Vector(v) => Some(v.data),
        _ => None,
    }
}

/// Convert server hits, keeping scores at or above the threshold.
/// Hits arrive best-first, so filtering keeps the top-N intact.
fn scored_hits(points: Vec<ScoredPoint>, threshold: f32) -> Result<Vec<ScoredMemory>> {
    points
        .into_iter()
        .filter(|point| point.score >= threshold)
        .map(|point| {
            let id = point_uuid(point.id.clone())
                .ok_or_else(|| Error::VectorStore(format!("Unexpected point id {:?}", point.id)))?;
            let payload = decode_payload(&point.payload)
                .ok_or_else(|| Error::VectorStore(format!("Point {} has no usable payload", id)))?;
            Ok(ScoredMemory {
                memory: StoredMemory {
                    id,
                    payload,
                    vector: dense_vector(point.vectors),
                },
                score: point.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use qdrant_client::qdrant::condition::ConditionOneOf;
    use qdrant_client::qdrant::r#match::MatchValue;

    fn hit(id: Uuid, score: f32, content: &str) -> ScoredPoint {
        ScoredPoint {
            id: Some(PointId::from(id.to_string())),
            payload: payload_map(&MemoryPayload::active(content)),
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_bad_url() {
        let config = QdrantConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(QdrantStore::new(&config, 3), Err(Error::Config(_))));
    }

    #[test]
    fn test_status_filter_matches_keyword() {
        let filter = status_filter(MemoryStatus::Deleted);
        assert_eq!(filter.must.len(), 1);
        match &filter.must[0].condition_one_of {
            Some(ConditionOneOf::Field(field)) => {
                assert_eq!(field.key, "status");
                let value = field.r#match.as_ref().and_then(|m| m.match_value.clone());
                assert_eq!(value, Some(MatchValue::Keyword("deleted".to_string())));
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_payload_survives_conversion() {
        let payload = MemoryPayload::active("uses Shram for work");
        let decoded = decode_payload(&payload_map(&payload)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_hits_filtered_by_threshold() {
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();

        let hits = scored_hits(
            vec![hit(near, 0.5, "uses Brave for browsing"), hit(far, 0.2, "likes tea")],
            0.35,
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory.id, near);
        assert_eq!(hits[0].content(), "uses Brave for browsing");
        assert!(hits[0].memory.vector.is_none());
    }

    #[test]
    fn test_hit_at_default_threshold_is_kept() {
        let threshold = AgentConfig::default().similarity_threshold;
        let edge = Uuid::new_v4();

        let hits = scored_hits(
            vec![hit(edge, 0.35, "uses Magnet for work"), hit(Uuid::new_v4(), 0.34, "likes tea")],
            threshold,
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory.id, edge);
        assert_eq!(hits[0].score, 0.35);
    }

    #[test]
    fn test_numeric_point_id_is_rejected() {
        let point = ScoredPoint {
            id: Some(PointId::from(7u64)),
            payload: payload_map(&MemoryPayload::active("likes tea")),
            score: 0.9,
            ..Default::default()
        };
        assert!(matches!(scored_hits(vec![point], 0.35), Err(Error::VectorStore(_))));
    }

    #[test]
    fn test_hit_without_payload_is_rejected() {
        let point = ScoredPoint {
            id: Some(PointId::from(Uuid::new_v4().to_string())),
            score: 0.9,
            ..Default::default()
        };
        assert!(matches!(scored_hits(vec![point], 0.35), Err(Error::VectorStore(_))));
    }

    fn live_store() -> QdrantStore {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string());
        let config = QdrantConfig {
            url,
            ..Default::default()
        };
        QdrantStore::new(&config, 3).unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn test_session_round_trip() {
        let store = live_store();
        assert!(store.health_check().await.unwrap());

        let collection = Uuid::new_v4().to_string();
        store.ensure_collection(&collection).await.unwrap();
        store.ensure_collection(&collection).await.unwrap();

        let ids = store
            .insert(
                &collection,
                vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
                vec![
                    MemoryPayload::active("uses Shram for work"),
                    MemoryPayload::active("uses Magnet for work"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let query = SearchQuery::new(vec![1.0, 0.0, 0.0]).include_vectors(true);
        let hits = store.search(&collection, &query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory.id, ids[0]);
        assert_eq!(hits[0].memory.vector.as_deref(), Some(&[1.0, 0.0, 0.0][..]));

        store.soft_delete(&collection, ids[0]).await.unwrap();
        assert!(store.search(&collection, &query).await.unwrap().is_empty());
        assert_eq!(store.count(&collection, Some(MemoryStatus::Deleted)).await.unwrap(), 1);
        assert_eq!(store.count(&collection, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_mismatched_arrays() {
        let result = live_store()
            .insert("unused", vec![vec![1.0, 0.0, 0.0]], Vec::new())
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
