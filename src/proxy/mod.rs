//! Request Proxy
//!
//! Turns `/api/chroma` selectors into Chroma calls and normalizes the
//! column-oriented responses into flat [`Document`] and [`Collection`] lists.
//!
//! Two paths degrade instead of failing:
//! - a collection whose count cannot be fetched is listed with count 0
//! - a semantic search that fails is answered by a case-insensitive
//!   substring match over the whole collection, with distance 0

use futures::future::join_all;
use tracing::{debug, info, warn};
use crate::chroma::{ChromaApi, CollectionInfo, GetRequest, GetResult, Include, QueryRequest, QueryResult};
use crate::models::{Collection, Document, SearchRequest};
use crate::types::{AppResult, Outcome};

/// Parsed `endpoint` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Heartbeat,
    Collections,
    Documents(String),
    Search(String),
}

impl Endpoint {
    pub fn parse(selector: &str) -> Option<Self> {
        match selector {
            "heartbeat" => return Some(Endpoint::Heartbeat),
            "collections" => return Some(Endpoint::Collections),
            _ => {}
        }

        let rest = selector.strip_prefix("collections/")?;
        if let Some(name) = rest.strip_suffix("/documents") {
            return non_empty_name(name).map(Endpoint::Documents);
        }
        if let Some(name) = rest.strip_suffix("/search") {
            return non_empty_name(name).map(Endpoint::Search);
        }
        None
    }

    /// Whether the selector is served on GET (as opposed to POST).
    pub fn is_read(&self) -> bool {
        !matches!(self, Endpoint::Search(_))
    }
}

fn non_empty_name(name: &str) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

pub async fn heartbeat(api: &dyn ChromaApi) -> AppResult<()> {
    api.heartbeat().await?;
    Ok(())
}

/// List every collection with its document count. A failed count only
/// degrades its own entry.
pub async fn list_collections(api: &dyn ChromaApi) -> AppResult<Vec<Outcome<Collection>>> {
    let infos = api.list_collections().await?;
    debug!(count = infos.len(), "Listed collections");

    let collections = join_all(infos.into_iter().map(|info| collection_with_count(api, info))).await;
    Ok(collections)
}

async fn collection_with_count(api: &dyn ChromaApi, info: CollectionInfo) -> Outcome<Collection> {
    let count = fetch_count(api, &info.name).await;
    let mut collection = Collection {
        id: info.id,
        name: info.name,
        metadata: info.metadata.unwrap_or_default(),
        count: 0,
    };

    match count {
        Outcome::Ok(count) => {
            collection.count = count;
            Outcome::Ok(collection)
        }
        Outcome::Degraded(_, reason) | Outcome::Failed(reason) => {
            warn!(collection = %collection.name, reason = %reason, "Count unavailable, reporting 0");
            Outcome::Degraded(collection, reason)
        }
    }
}

async fn fetch_count(api: &dyn ChromaApi, name: &str) -> Outcome<u64> {
    let collection = match api.get_collection(name).await {
        Ok(collection) => collection,
        Err(e) => return Outcome::Failed(e.to_string()),
    };
    match api.count(&collection).await {
        Ok(count) => Outcome::Ok(count),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

pub async fn list_documents(api: &dyn ChromaApi, name: &str, limit: usize) -> AppResult<Vec<Document>> {
    let collection = api.get_collection(name).await?;
    let result = api
        .get(
            &collection,
            GetRequest {
                limit: Some(limit),
                include: vec![Include::Documents, Include::Metadatas, Include::Embeddings],
            },
        )
        .await?;
    Ok(zip_documents(result))
}

/// Semantic search with a silent text-match fallback.
pub async fn search(
    api: &dyn ChromaApi,
    name: &str,
    request: &SearchRequest,
) -> AppResult<Outcome<Vec<Document>>> {
    let collection = api.get_collection(name).await?;

    let query = QueryRequest {
        query_text: request.query.clone(),
        n_results: request.limit,
        include: vec![Include::Documents, Include::Metadatas, Include::Distances],
    };

    match api.query(&collection, query).await {
        Ok(result) => {
            let documents = zip_query(result);
            info!(collection = %name, results = documents.len(), "Semantic search completed");
            Ok(Outcome::Ok(documents))
        }
        Err(e) => {
            warn!(collection = %name, error = %e, "Semantic search failed, falling back to text search");
            let all = api
                .get(
                    &collection,
                    GetRequest {
                        limit: None,
                        include: vec![Include::Documents, Include::Metadatas],
                    },
                )
                .await?;
            let documents = text_filter(all, &request.query, request.limit);
            Ok(Outcome::Degraded(documents, e.to_string()))
        }
    }
}

/// Pad or cut a column to `len` so it lines up with `ids`.
fn align<T>(column: Option<Vec<Option<T>>>, len: usize) -> Vec<Option<T>> {
    let mut values = column.unwrap_or_default();
    values.resize_with(len, || None);
    values
}

pub fn zip_documents(result: GetResult) -> Vec<Document> {
    let GetResult { ids, documents, metadatas, embeddings } = result;
    let len = ids.len();

    ids.into_iter()
        .zip(align(documents, len))
        .zip(align(metadatas, len))
        .zip(align(embeddings, len))
        .map(|(((id, document), metadata), embeddings)| Document {
            id,
            document: document.unwrap_or_default(),
            metadata: metadata.unwrap_or_default(),
            embeddings,
            distance: None,
        })
        .collect()
}

pub fn zip_query(result: QueryResult) -> Vec<Document> {
    let QueryResult { ids, documents, metadatas, distances } = result;
    let ids = ids.into_iter().next().unwrap_or_default();
    let len = ids.len();

    let documents = align(documents.and_then(|rows| rows.into_iter().next().flatten()), len);
    let metadatas = align(metadatas.and_then(|rows| rows.into_iter().next().flatten()), len);
    let distances = align(distances.and_then(|rows| rows.into_iter().next().flatten()), len);

    ids.into_iter()
        .zip(documents)
        .zip(metadatas)
        .zip(distances)
        .map(|(((id, document), metadata), distance)| Document {
            id,
            document: document.unwrap_or_default(),
            metadata: metadata.unwrap_or_default(),
            embeddings: None,
            distance,
        })
        .collect()
}

/// Case-insensitive substring match, first `limit` hits, distance 0.
pub fn text_filter(result: GetResult, query: &str, limit: usize) -> Vec<Document> {
    let needle = query.to_lowercase();

    zip_documents(result)
        .into_iter()
        .filter(|doc| doc.document.to_lowercase().contains(&needle))
        .take(limit)
        .map(|doc| Document {
            embeddings: None,
            distance: Some(0.0),
            ..doc
        })
        .collect()
}
