// In-memory Chroma stand-in for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use crate::chroma::{
    ChromaApi, ChromaConnector, ChromaError, CollectionInfo, GetRequest, GetResult, QueryRequest,
    QueryResult,
};
use crate::models::ConnectionConfig;

#[derive(Debug, Clone, Default)]
pub struct FakeChroma {
    reachable: bool,
    collections: Vec<CollectionInfo>,
    // by collection name; absent means the count call fails
    counts: HashMap<String, u64>,
    documents: HashMap<String, GetResult>,
    // by collection name; absent means the semantic query fails
    query_results: HashMap<String, QueryResult>,
}

impl FakeChroma {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, id: &str, name: &str, count: Option<u64>) -> Self {
        self.collections.push(CollectionInfo {
            id: id.to_string(),
            name: name.to_string(),
            metadata: None,
        });
        if let Some(count) = count {
            self.counts.insert(name.to_string(), count);
        }
        self
    }

    pub fn with_documents(mut self, name: &str, docs: &[(&str, &str)]) -> Self {
        self.documents.insert(
            name.to_string(),
            GetResult {
                ids: docs.iter().map(|(id, _)| id.to_string()).collect(),
                documents: Some(docs.iter().map(|(_, text)| Some(text.to_string())).collect()),
                metadatas: None,
                embeddings: None,
            },
        );
        self
    }

    pub fn with_query_result(mut self, name: &str, result: QueryResult) -> Self {
        self.query_results.insert(name.to_string(), result);
        self
    }

    fn check_reachable(&self) -> Result<(), ChromaError> {
        if self.reachable {
            Ok(())
        } else {
            Err(ChromaError::Request("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl ChromaApi for FakeChroma {
    async fn heartbeat(&self) -> Result<(), ChromaError> {
        self.check_reachable()
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ChromaError> {
        self.check_reachable()?;
        Ok(self.collections.clone())
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo, ChromaError> {
        self.check_reachable()?;
        self.collections
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| ChromaError::Status {
                status: 404,
                message: format!("Collection [{}] does not exist", name),
            })
    }

    async fn count(&self, collection: &CollectionInfo) -> Result<u64, ChromaError> {
        self.check_reachable()?;
        self.counts
            .get(&collection.name)
            .copied()
            .ok_or_else(|| ChromaError::Status {
                status: 500,
                message: "count failed".to_string(),
            })
    }

    async fn get(
        &self,
        collection: &CollectionInfo,
        request: GetRequest,
    ) -> Result<GetResult, ChromaError> {
        self.check_reachable()?;
        let mut result = self.documents.get(&collection.name).cloned().unwrap_or_default();
        if let Some(limit) = request.limit {
            result.ids.truncate(limit);
        }
        Ok(result)
    }

    async fn query(
        &self,
        collection: &CollectionInfo,
        _request: QueryRequest,
    ) -> Result<QueryResult, ChromaError> {
        self.check_reachable()?;
        self.query_results
            .get(&collection.name)
            .cloned()
            .ok_or(ChromaError::EmbeddingUnavailable)
    }
}

/// Hands out the same [`FakeChroma`] and remembers the last connection settings.
#[derive(Default)]
pub struct FakeConnector {
    pub chroma: FakeChroma,
    pub last_connection: Mutex<Option<ConnectionConfig>>,
}

impl FakeConnector {
    pub fn new(chroma: FakeChroma) -> Self {
        Self {
            chroma,
            last_connection: Mutex::new(None),
        }
    }
}

impl ChromaConnector for FakeConnector {
    fn connect(&self, connection: &ConnectionConfig) -> Result<Arc<dyn ChromaApi>, ChromaError> {
        if let Ok(mut last) = self.last_connection.lock() {
            *last = Some(connection.clone());
        }
        Ok(Arc::new(self.chroma.clone()))
    }
}
