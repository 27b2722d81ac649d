//! Association storage strategy resolution.
//!
//! Decides once per association type where its rows live, from the
//! effective options and what the backend can do.

use crate::key::{AssociationKeyMetadata, AssociationKind, AssociationType};
use crate::options::{
    AssociationDocumentStorageType, AssociationStorageType, EffectiveOptions, MapStorageType,
    OptionsConfig, OptionsLayer,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Layout of rows embedded in the owning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    /// A sub-document keyed by the single `String` map key.
    ByNaturalKey,
    /// An ordered list of rows.
    AsList,
}

/// Where the rows of an association are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "strategy")]
pub enum AssociationStorageStrategy {
    /// Rows embedded in the owning record.
    InEntity {
        /// How the rows are laid out.
        layout: RowLayout,
    },
    /// One record per association, addressed by the association key.
    DedicatedRecord,
    /// Rows of many associations in one collection, addressed by row key and
    /// filtered by association key.
    SharedCollection,
}

impl AssociationStorageStrategy {
    /// Whether rows live inside the owning record.
    #[must_use]
    pub fn is_in_entity(self) -> bool {
        matches!(self, Self::InEntity { .. })
    }
}

impl fmt::Display for AssociationStorageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InEntity {
                layout: RowLayout::ByNaturalKey,
            } => write!(f, "in-entity (by natural key)"),
            Self::InEntity {
                layout: RowLayout::AsList,
            } => write!(f, "in-entity (as list)"),
            Self::DedicatedRecord => write!(f, "dedicated record"),
            Self::SharedCollection => write!(f, "shared collection"),
        }
    }
}

/// What a backend can do with association rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BackendProfile {
    /// Rows can be embedded in the owning record.
    pub can_embed: bool,
    /// Rows of many associations can share one collection.
    pub can_share: bool,
    /// Backend-specific option defaults.
    pub defaults: OptionsLayer,
}

impl BackendProfile {
    /// A document store: embeds and shares.
    #[must_use]
    pub const fn document() -> Self {
        Self {
            can_embed: true,
            can_share: true,
            defaults: OptionsLayer::new(),
        }
    }

    /// A plain key-value store: every association is a dedicated record.
    #[must_use]
    pub const fn key_value() -> Self {
        Self {
            can_embed: false,
            can_share: false,
            defaults: OptionsLayer::new(),
        }
    }

    /// Sets the backend option defaults.
    #[must_use]
    pub const fn with_defaults(mut self, defaults: OptionsLayer) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Resolves the storage strategy of one association type.
///
/// Embedded collections and one-to-one associations are always in-entity.
/// A map requesting natural-key embedding without a single `String` index
/// column falls back to the shared collection. Finally the backend profile
/// forces a strategy it can actually store.
#[must_use]
pub fn resolve_strategy(
    metadata: &AssociationKeyMetadata,
    options: &EffectiveOptions,
    profile: &BackendProfile,
) -> AssociationStorageStrategy {
    let layout = if metadata.association_type() == AssociationType::Map
        && options.map_storage == MapStorageType::ByKey
        && metadata.has_single_string_index()
    {
        RowLayout::ByNaturalKey
    } else {
        RowLayout::AsList
    };

    let requested = if metadata.is_one_to_one() || metadata.kind() == AssociationKind::EmbeddedCollection {
        AssociationStorageStrategy::InEntity { layout }
    } else {
        match options.association_storage {
            AssociationStorageType::InEntity
                if metadata.association_type() == AssociationType::Map
                    && options.map_storage == MapStorageType::ByKey
                    && layout == RowLayout::AsList =>
            {
                AssociationStorageStrategy::SharedCollection
            }
            AssociationStorageType::InEntity => AssociationStorageStrategy::InEntity { layout },
            AssociationStorageType::AssociationDocument => match options.association_document_storage {
                AssociationDocumentStorageType::CollectionPerAssociation => {
                    AssociationStorageStrategy::DedicatedRecord
                }
                AssociationDocumentStorageType::GlobalCollection => {
                    AssociationStorageStrategy::SharedCollection
                }
            },
        }
    };

    match requested {
        AssociationStorageStrategy::InEntity { .. } if !profile.can_embed => {
            if profile.can_share {
                AssociationStorageStrategy::SharedCollection
            } else {
                AssociationStorageStrategy::DedicatedRecord
            }
        }
        AssociationStorageStrategy::SharedCollection if !profile.can_share => {
            AssociationStorageStrategy::DedicatedRecord
        }
        other => other,
    }
}

/// Resolved options and strategy of one association type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationTypeContext {
    options: EffectiveOptions,
    strategy: AssociationStorageStrategy,
    role: String,
}

impl AssociationTypeContext {
    /// Resolves the context for `metadata` under `options` and `profile`.
    #[must_use]
    pub fn resolve(
        metadata: &AssociationKeyMetadata,
        options: EffectiveOptions,
        profile: &BackendProfile,
    ) -> Self {
        let strategy = resolve_strategy(metadata, &options, profile);
        Self {
            options,
            strategy,
            role: metadata.collection_role().to_string(),
        }
    }

    /// Creates a context with an explicit strategy.
    #[must_use]
    pub fn new(options: EffectiveOptions, strategy: AssociationStorageStrategy, role: impl Into<String>) -> Self {
        Self {
            options,
            strategy,
            role: role.into(),
        }
    }

    /// Returns the effective options.
    #[must_use]
    pub fn options(&self) -> &EffectiveOptions {
        &self.options
    }

    /// Returns the resolved strategy.
    #[must_use]
    pub fn strategy(&self) -> AssociationStorageStrategy {
        self.strategy
    }

    /// Returns the role on the owning side.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }
}

/// Caches one resolved context per `(entity, role)`.
#[derive(Debug, Default)]
pub struct StrategyCache {
    entries: RwLock<HashMap<(String, String), Arc<AssociationTypeContext>>>,
}

impl StrategyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached context of `entity.role`, resolving it on first use.
    pub fn get_or_resolve(
        &self,
        entity: &str,
        metadata: &AssociationKeyMetadata,
        options: &OptionsConfig,
        profile: &BackendProfile,
    ) -> Arc<AssociationTypeContext> {
        let key = (entity.to_string(), metadata.collection_role().to_string());
        if let Some(context) = self.entries.read().get(&key) {
            return Arc::clone(context);
        }

        let mut entries = self.entries.write();
        let context = entries.entry(key).or_insert_with(|| {
            let effective = options.effective(
                Some(entity),
                Some(metadata.collection_role()),
                profile.defaults,
            );
            let context = AssociationTypeContext::resolve(metadata, effective, profile);
            debug!(
                entity,
                role = metadata.collection_role(),
                strategy = %context.strategy(),
                "resolved association storage strategy"
            );
            Arc::new(context)
        });
        Arc::clone(context)
    }

    /// Number of cached association types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_codec::ScalarType;

    fn map_metadata(index: &[(&str, ScalarType)]) -> AssociationKeyMetadata {
        let mut builder = AssociationKeyMetadata::builder("user_addresses", ["user_id"])
            .role("addresses")
            .association_type(AssociationType::Map);
        for (name, ty) in index {
            builder = builder.index_column(*name, *ty);
        }
        builder.build()
    }

    fn bag_metadata() -> AssociationKeyMetadata {
        AssociationKeyMetadata::builder("order_lines", ["order_id"])
            .role("lines")
            .build()
    }

    fn with(layer: OptionsLayer) -> EffectiveOptions {
        layer.resolve()
    }

    #[test]
    fn single_string_map_key_embeds_by_natural_key() {
        let strategy = resolve_strategy(
            &map_metadata(&[("kind", ScalarType::String)]),
            &EffectiveOptions::default(),
            &BackendProfile::document(),
        );
        assert_eq!(
            strategy,
            AssociationStorageStrategy::InEntity {
                layout: RowLayout::ByNaturalKey
            }
        );
    }

    #[test]
    fn composite_map_key_falls_back_to_shared_collection() {
        let options = with(
            OptionsLayer::new()
                .association_storage(AssociationStorageType::InEntity)
                .map_storage(MapStorageType::ByKey),
        );
        let composite = map_metadata(&[("a", ScalarType::String), ("b", ScalarType::String)]);
        let numeric = map_metadata(&[("n", ScalarType::Integer)]);
        for metadata in [composite, numeric] {
            assert_eq!(
                resolve_strategy(&metadata, &options, &BackendProfile::document()),
                AssociationStorageStrategy::SharedCollection
            );
        }
    }

    #[test]
    fn map_stored_as_list_stays_in_entity() {
        let options = with(OptionsLayer::new().map_storage(MapStorageType::AsList));
        let strategy = resolve_strategy(
            &map_metadata(&[("n", ScalarType::Integer)]),
            &options,
            &BackendProfile::document(),
        );
        assert_eq!(
            strategy,
            AssociationStorageStrategy::InEntity {
                layout: RowLayout::AsList
            }
        );
    }

    #[test]
    fn association_document_options_pick_record_kind() {
        let dedicated = with(
            OptionsLayer::new()
                .association_storage(AssociationStorageType::AssociationDocument)
                .association_document_storage(AssociationDocumentStorageType::CollectionPerAssociation),
        );
        let shared = with(OptionsLayer::new().association_storage(AssociationStorageType::AssociationDocument));
        let profile = BackendProfile::document();
        assert_eq!(
            resolve_strategy(&bag_metadata(), &dedicated, &profile),
            AssociationStorageStrategy::DedicatedRecord
        );
        assert_eq!(
            resolve_strategy(&bag_metadata(), &shared, &profile),
            AssociationStorageStrategy::SharedCollection
        );
    }

    #[test]
    fn embedded_collections_ignore_association_document_option() {
        let metadata = AssociationKeyMetadata::builder("order_tags", ["order_id"])
            .role("tags")
            .kind(AssociationKind::EmbeddedCollection)
            .build();
        let options = with(OptionsLayer::new().association_storage(AssociationStorageType::AssociationDocument));
        assert!(resolve_strategy(&metadata, &options, &BackendProfile::document()).is_in_entity());
    }

    #[test]
    fn key_value_backend_forces_dedicated_record() {
        let metadata = map_metadata(&[("kind", ScalarType::String)]);
        assert_eq!(
            resolve_strategy(&metadata, &EffectiveOptions::default(), &BackendProfile::key_value()),
            AssociationStorageStrategy::DedicatedRecord
        );
    }

    #[test]
    fn cache_resolves_once_per_association_type() {
        let cache = StrategyCache::new();
        let options = OptionsConfig::new().with_property(
            "Order",
            "lines",
            OptionsLayer::new().association_storage(AssociationStorageType::AssociationDocument),
        );
        let profile = BackendProfile::document();
        let first = cache.get_or_resolve("Order", &bag_metadata(), &options, &profile);
        let second = cache.get_or_resolve("Order", &bag_metadata(), &options, &profile);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.strategy(), AssociationStorageStrategy::SharedCollection);
        assert_eq!(cache.len(), 1);
    }
}
