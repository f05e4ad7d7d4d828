//! Mapping strategy contract and registry.
//!
//! A strategy turns one write operation into the backend write actions
//! that keep the index in step with the graph, owns provisioning of
//! the indices it writes to, and exposes per-kind index routing for
//! the query path.

use tracing::{debug, info};

use graphsync_types::{
    EntityKind, IndexAction, MappingVariant, SearchIndexClient, SyncConfig, WriteOperation,
};

use crate::error::MappingError;
use crate::rules::RuleRoutedMapping;
use crate::single::SingleIndexMapping;

/// Converts write operations into index actions.
///
/// Implementations hold no per-call mutable state; concurrent calls
/// from multiple writers are safe.
pub trait MappingStrategy: Send + Sync {
    /// Actions that bring the index in line with one operation.
    ///
    /// A projection failure that invalidates every document for the
    /// entity (a missing external key) is returned; failures scoped to
    /// one rule's document are logged and skipped.
    fn actions(&self, operation: &WriteOperation) -> Result<Vec<IndexAction>, MappingError>;

    /// Ensure every statically-known target index exists with its
    /// schema applied. Idempotent; safe to call on every startup.
    fn ensure_indices(&self, client: &dyn SearchIndexClient) -> Result<(), MappingError>;

    /// Index queried for the given entity kind.
    fn index_for(&self, kind: EntityKind) -> String;

    /// Strategy name for logging.
    fn name(&self) -> &str;
}

/// Build the configured strategy.
///
/// The variant set is closed: configuration parsing already rejected
/// unknown names, so this match is total.
pub fn build_strategy(config: &SyncConfig) -> Box<dyn MappingStrategy> {
    let strategy: Box<dyn MappingStrategy> = match config.mapping {
        MappingVariant::SingleIndex => Box::new(SingleIndexMapping::new(config)),
        MappingVariant::RuleRouted => Box::new(RuleRoutedMapping::new(config)),
    };
    info!(strategy = strategy.name(), "Built mapping strategy");
    strategy
}

/// Existence-check then create one index, applying `schema` when the
/// index is freshly created. Shared by both strategy variants.
pub(crate) fn provision_index(
    client: &dyn SearchIndexClient,
    index: &str,
    schema: Option<&serde_json::Value>,
) -> Result<(), MappingError> {
    if client.index_exists(index)? {
        debug!(index = index, "Index already exists");
        return Ok(());
    }

    info!(index = index, "Index does not exist, creating");
    let created = client.create_index(index)?;
    if !created.succeeded {
        return Err(MappingError::Provisioning {
            index: index.to_string(),
            message: created.error_message().to_string(),
        });
    }

    if let Some(schema) = schema {
        let mapped = client.put_mapping(index, schema)?;
        if !mapped.succeeded {
            return Err(MappingError::Provisioning {
                index: index.to_string(),
                message: mapped.error_message().to_string(),
            });
        }
    }

    Ok(())
}
