//! Query execution and match resolution.
//!
//! A search runs in three steps: execute the caller's query against
//! the index for the requested entity kind, parse the hit envelope
//! into ranked matches, then resolve every match's external key to a
//! live graph entity inside one read transaction. Matches that no
//! longer resolve are dropped with a diagnostic; the rest come back in
//! backend order with their original scores.

use std::sync::Arc;
use tracing::{info, warn};

use graphsync_mapping::MappingStrategy;
use graphsync_types::{
    ClientResult, EntityKind, NodeRepresentation, RelationshipRepresentation, SearchIndexClient,
    SyncConfig,
};

use crate::error::SearchError;
use crate::graph::{GraphReader, KeyResolver, ReadTransaction};
use crate::matches::{parse_hits, SearchMatch};

pub struct Searcher {
    client: Arc<dyn SearchIndexClient>,
    strategy: Arc<dyn MappingStrategy>,
    resolver: Arc<dyn KeyResolver>,
    graph: Arc<dyn GraphReader>,
    key_property: String,
}

impl Searcher {
    pub fn new(
        config: &SyncConfig,
        client: Arc<dyn SearchIndexClient>,
        strategy: Arc<dyn MappingStrategy>,
        resolver: Arc<dyn KeyResolver>,
        graph: Arc<dyn GraphReader>,
    ) -> Self {
        Self {
            client,
            strategy,
            resolver,
            graph,
            key_property: config.key_property.clone(),
        }
    }

    /// Search for nodes and resolve each hit to a live node.
    pub fn search_nodes(
        &self,
        query: &str,
    ) -> Result<Vec<SearchMatch<NodeRepresentation>>, SearchError> {
        let result = self.do_query(query, EntityKind::Node)?;
        let matches = parse_hits(&result.body);
        let resolved = self.resolve(matches, |tx, resolver, key| {
            resolver.node_id(key).ok().and_then(|id| tx.node_by_id(id))
        })?;

        info!(
            kind = %EntityKind::Node,
            matches = resolved.len(),
            "Search complete"
        );
        Ok(resolved)
    }

    /// Search for relationships and resolve each hit to a live
    /// relationship.
    pub fn search_relationships(
        &self,
        query: &str,
    ) -> Result<Vec<SearchMatch<RelationshipRepresentation>>, SearchError> {
        let result = self.do_query(query, EntityKind::Relationship)?;
        let matches = parse_hits(&result.body);
        let resolved = self.resolve(matches, |tx, resolver, key| {
            resolver
                .relationship_id(key)
                .ok()
                .and_then(|id| tx.relationship_by_id(id))
        })?;

        info!(
            kind = %EntityKind::Relationship,
            matches = resolved.len(),
            "Search complete"
        );
        Ok(resolved)
    }

    /// Raw backend response body, unparsed and unresolved. For callers
    /// that want aggregations or other envelope fields the match path
    /// discards.
    pub fn raw_search(&self, query: &str, kind: EntityKind) -> Result<String, SearchError> {
        Ok(self.do_query(query, kind)?.body)
    }

    fn do_query(&self, query: &str, kind: EntityKind) -> Result<ClientResult, SearchError> {
        let index = self.strategy.index_for(kind);
        let result = self.client.search(&index, query)?;
        if !result.succeeded {
            return Err(SearchError::Backend(result.error_message().to_string()));
        }
        Ok(result)
    }

    /// Resolve matches against the live graph.
    ///
    /// One read transaction covers the whole batch so every resolved
    /// entity reflects the same snapshot. The backend query has
    /// already completed by the time the transaction opens; it is
    /// never held across a network call.
    fn resolve<T>(
        &self,
        matches: Vec<SearchMatch<T>>,
        lookup: impl Fn(&dyn ReadTransaction, &dyn KeyResolver, &str) -> Option<T>,
    ) -> Result<Vec<SearchMatch<T>>, SearchError> {
        if matches.is_empty() {
            return Ok(matches);
        }

        let tx = self
            .graph
            .read_transaction()
            .map_err(|e| SearchError::Graph(e.to_string()))?;

        let mut resolved = Vec::with_capacity(matches.len());
        for m in matches {
            match lookup(tx.as_ref(), self.resolver.as_ref(), &m.key) {
                Some(entity) => resolved.push(m.resolved(entity)),
                None => {
                    warn!(
                        key = %m.key,
                        key_property = %self.key_property,
                        "Could not resolve match to a live entity, dropping"
                    );
                }
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphAccessError, KeyNotFound};
    use graphsync_mapping::build_strategy;
    use graphsync_types::{IndexAction, PropertyMap, TransportError};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClient {
        body: String,
        fail_transport: bool,
        reject: bool,
    }

    impl FakeClient {
        fn with_body(body: &str) -> Self {
            Self {
                body: body.to_string(),
                fail_transport: false,
                reject: false,
            }
        }
    }

    impl SearchIndexClient for FakeClient {
        fn execute(&self, _action: &IndexAction) -> Result<ClientResult, TransportError> {
            Ok(ClientResult::ok("{}"))
        }

        fn bulk(&self, _actions: &[IndexAction]) -> Result<ClientResult, TransportError> {
            Ok(ClientResult::ok("{}"))
        }

        fn search(&self, _index: &str, _query: &str) -> Result<ClientResult, TransportError> {
            if self.fail_transport {
                return Err(TransportError("connection refused".to_string()));
            }
            if self.reject {
                return Ok(ClientResult::failed("bad query"));
            }
            Ok(ClientResult::ok(self.body.clone()))
        }

        fn index_exists(&self, _index: &str) -> Result<bool, TransportError> {
            Ok(true)
        }

        fn create_index(&self, _index: &str) -> Result<ClientResult, TransportError> {
            Ok(ClientResult::ok("{}"))
        }

        fn put_mapping(&self, _index: &str, _schema: &Value) -> Result<ClientResult, TransportError> {
            Ok(ClientResult::ok("{}"))
        }
    }

    struct FakeResolver {
        node_keys: HashMap<String, i64>,
    }

    impl KeyResolver for FakeResolver {
        fn node_id(&self, key: &str) -> Result<i64, KeyNotFound> {
            self.node_keys
                .get(key)
                .copied()
                .ok_or_else(|| KeyNotFound::new(key))
        }

        fn relationship_id(&self, key: &str) -> Result<i64, KeyNotFound> {
            Err(KeyNotFound::new(key))
        }
    }

    struct FakeGraph {
        nodes: HashMap<i64, NodeRepresentation>,
        transactions_opened: AtomicUsize,
    }

    struct FakeTransaction<'a> {
        graph: &'a FakeGraph,
    }

    impl GraphReader for FakeGraph {
        fn read_transaction(&self) -> Result<Box<dyn ReadTransaction + '_>, GraphAccessError> {
            self.transactions_opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeTransaction { graph: self }))
        }
    }

    impl ReadTransaction for FakeTransaction<'_> {
        fn node_by_id(&self, id: i64) -> Option<NodeRepresentation> {
            self.graph.nodes.get(&id).cloned()
        }

        fn relationship_by_id(&self, _id: i64) -> Option<RelationshipRepresentation> {
            None
        }
    }

    fn node(id: i64, key: &str) -> NodeRepresentation {
        let mut props = PropertyMap::new();
        props.insert("uuid".to_string(), json!(key));
        NodeRepresentation::new(id, vec!["Person".to_string()], props)
    }

    fn searcher_with(
        client: FakeClient,
        node_keys: &[(&str, i64)],
        nodes: Vec<NodeRepresentation>,
    ) -> (Searcher, Arc<FakeGraph>) {
        let config = SyncConfig::default();
        let graph = Arc::new(FakeGraph {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            transactions_opened: AtomicUsize::new(0),
        });
        let searcher = Searcher::new(
            &config,
            Arc::new(client),
            Arc::from(build_strategy(&config)),
            Arc::new(FakeResolver {
                node_keys: node_keys
                    .iter()
                    .map(|(k, id)| (k.to_string(), *id))
                    .collect(),
            }),
            graph.clone(),
        );
        (searcher, graph)
    }

    #[test]
    fn test_unresolvable_match_dropped_with_scores_preserved() {
        let body = r#"{"hits": {"hits": [
            {"_id": "u1", "_score": 1.2},
            {"_id": "missing", "_score": 0.9}
        ]}}"#;

        let (searcher, _) = searcher_with(
            FakeClient::with_body(body),
            &[("u1", 1)],
            vec![node(1, "u1")],
        );

        let matches = searcher.search_nodes("ann").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "u1");
        assert_eq!(matches[0].score, 1.2);
        assert!(matches[0].entity.is_some());
    }

    #[test]
    fn test_backend_order_preserved() {
        let body = r#"{"hits": {"hits": [
            {"_id": "u3", "_score": 2.0},
            {"_id": "u2", "_score": 1.5},
            {"_id": "u1", "_score": 1.0}
        ]}}"#;

        let (searcher, _) = searcher_with(
            FakeClient::with_body(body),
            &[("u1", 1), ("u3", 3)],
            vec![node(1, "u1"), node(3, "u3")],
        );

        let matches = searcher.search_nodes("ann").unwrap();
        let keys: Vec<&str> = matches.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["u3", "u1"]);
        assert_eq!(matches[0].score, 2.0);
        assert_eq!(matches[1].score, 1.0);
    }

    #[test]
    fn test_resolution_uses_one_transaction_per_call() {
        let body = r#"{"hits": {"hits": [
            {"_id": "u1", "_score": 1.0},
            {"_id": "u3", "_score": 0.5}
        ]}}"#;

        let (searcher, graph) = searcher_with(
            FakeClient::with_body(body),
            &[("u1", 1), ("u3", 3)],
            vec![node(1, "u1"), node(3, "u3")],
        );

        searcher.search_nodes("ann").unwrap();
        assert_eq!(graph.transactions_opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_hits_skips_transaction() {
        let (searcher, graph) = searcher_with(FakeClient::with_body("{}"), &[], vec![]);

        let matches = searcher.search_nodes("ann").unwrap();
        assert!(matches.is_empty());
        assert_eq!(graph.transactions_opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolver_hit_but_entity_gone_is_dropped() {
        // key resolves to an id the graph no longer has
        let body = r#"{"hits": {"hits": [{"_id": "u1", "_score": 1.0}]}}"#;
        let (searcher, _) = searcher_with(FakeClient::with_body(body), &[("u1", 42)], vec![]);

        let matches = searcher.search_nodes("ann").unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_transport_failure_aborts() {
        let client = FakeClient {
            body: String::new(),
            fail_transport: true,
            reject: false,
        };
        let (searcher, _) = searcher_with(client, &[], vec![]);

        let err = searcher.search_nodes("ann").unwrap_err();
        assert!(matches!(err, SearchError::Transport(_)));
    }

    #[test]
    fn test_backend_rejection_aborts() {
        let client = FakeClient {
            body: String::new(),
            fail_transport: false,
            reject: true,
        };
        let (searcher, _) = searcher_with(client, &[], vec![]);

        let err = searcher.search_nodes("ann").unwrap_err();
        assert!(matches!(err, SearchError::Backend(_)));
    }

    #[test]
    fn test_raw_search_returns_unparsed_body() {
        let body = r#"{"hits": {"hits": []}, "aggregations": {"by_label": {}}}"#;
        let (searcher, graph) = searcher_with(FakeClient::with_body(body), &[], vec![]);

        let raw = searcher.raw_search("ann", EntityKind::Node).unwrap();
        assert_eq!(raw, body);
        // no resolution happens on the raw path
        assert_eq!(graph.transactions_opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_relationship_search_routes_to_relationship_index() {
        struct IndexAssertingClient;

        impl SearchIndexClient for IndexAssertingClient {
            fn execute(&self, _action: &IndexAction) -> Result<ClientResult, TransportError> {
                Ok(ClientResult::ok("{}"))
            }

            fn bulk(&self, _actions: &[IndexAction]) -> Result<ClientResult, TransportError> {
                Ok(ClientResult::ok("{}"))
            }

            fn search(&self, index: &str, _query: &str) -> Result<ClientResult, TransportError> {
                assert_eq!(index, "graph-relationship");
                Ok(ClientResult::ok("{}"))
            }

            fn index_exists(&self, _index: &str) -> Result<bool, TransportError> {
                Ok(true)
            }

            fn create_index(&self, _index: &str) -> Result<ClientResult, TransportError> {
                Ok(ClientResult::ok("{}"))
            }

            fn put_mapping(
                &self,
                _index: &str,
                _schema: &Value,
            ) -> Result<ClientResult, TransportError> {
                Ok(ClientResult::ok("{}"))
            }
        }

        let config = SyncConfig::default();
        let graph = Arc::new(FakeGraph {
            nodes: HashMap::new(),
            transactions_opened: AtomicUsize::new(0),
        });
        let searcher = Searcher::new(
            &config,
            Arc::new(IndexAssertingClient),
            Arc::from(build_strategy(&config)),
            Arc::new(FakeResolver {
                node_keys: HashMap::new(),
            }),
            graph,
        );

        let matches = searcher.search_relationships("any").unwrap();
        assert!(matches.is_empty());
    }
}
