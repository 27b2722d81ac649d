//! Layered storage options.
//!
//! Every option can be set at three levels: globally, per entity and per
//! property. The effective value is the first one found walking
//! property > entity > global > backend default > documented default.

use crate::error::{DialectError, DialectResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where association rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationStorageType {
    /// Rows are embedded in the owning record.
    #[default]
    InEntity,
    /// Rows are stored in separate association records.
    AssociationDocument,
}

/// How separate association records are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationDocumentStorageType {
    /// One record per association instance.
    CollectionPerAssociation,
    /// Rows of all associations share one collection.
    #[default]
    GlobalCollection,
}

/// How embedded map-typed associations are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStorageType {
    /// A sub-document keyed by the map key.
    #[default]
    ByKey,
    /// A list of rows carrying the key as a column.
    AsList,
}

/// Granularity of storage namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMappingType {
    /// One namespace per table.
    #[default]
    CachePerTable,
    /// One namespace per kind: entities, associations, identifiers.
    CachePerKind,
}

/// One level of option overrides. Unset options defer to the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsLayer {
    /// Where association rows live.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association_storage: Option<AssociationStorageType>,
    /// How separate association records are grouped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association_document_storage: Option<AssociationDocumentStorageType>,
    /// How embedded map-typed associations are laid out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_storage: Option<MapStorageType>,
    /// Granularity of storage namespaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_mapping: Option<CacheMappingType>,
}

impl OptionsLayer {
    /// Creates a layer with nothing set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            association_storage: None,
            association_document_storage: None,
            map_storage: None,
            cache_mapping: None,
        }
    }

    /// Sets the association storage.
    #[must_use]
    pub const fn association_storage(mut self, value: AssociationStorageType) -> Self {
        self.association_storage = Some(value);
        self
    }

    /// Sets the association document storage.
    #[must_use]
    pub const fn association_document_storage(
        mut self,
        value: AssociationDocumentStorageType,
    ) -> Self {
        self.association_document_storage = Some(value);
        self
    }

    /// Sets the map storage.
    #[must_use]
    pub const fn map_storage(mut self, value: MapStorageType) -> Self {
        self.map_storage = Some(value);
        self
    }

    /// Sets the cache mapping.
    #[must_use]
    pub const fn cache_mapping(mut self, value: CacheMappingType) -> Self {
        self.cache_mapping = Some(value);
        self
    }

    /// Returns a layer where options set here win over `fallback`.
    #[must_use]
    pub fn or(self, fallback: OptionsLayer) -> OptionsLayer {
        OptionsLayer {
            association_storage: self.association_storage.or(fallback.association_storage),
            association_document_storage: self
                .association_document_storage
                .or(fallback.association_document_storage),
            map_storage: self.map_storage.or(fallback.map_storage),
            cache_mapping: self.cache_mapping.or(fallback.cache_mapping),
        }
    }

    /// Fills unset options with the documented defaults.
    #[must_use]
    pub fn resolve(self) -> EffectiveOptions {
        EffectiveOptions {
            association_storage: self.association_storage.unwrap_or_default(),
            association_document_storage: self.association_document_storage.unwrap_or_default(),
            map_storage: self.map_storage.unwrap_or_default(),
            cache_mapping: self.cache_mapping.unwrap_or_default(),
        }
    }
}

/// Entity-level overrides plus per-property overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityOptions {
    /// Options for the entity as a whole.
    pub options: OptionsLayer,
    /// Options for single properties, by property name.
    pub properties: BTreeMap<String, OptionsLayer>,
}

/// The complete option configuration.
///
/// Loadable from JSON:
///
/// ```
/// use gridlink_core::{AssociationStorageType, OptionsConfig, OptionsLayer};
///
/// let config = OptionsConfig::from_json(r#"{
///     "global": { "association_storage": "association_document" },
///     "entities": {
///         "Order": { "properties": { "lines": { "association_storage": "in_entity" } } }
///     }
/// }"#).unwrap();
/// let lines = config.effective(Some("Order"), Some("lines"), OptionsLayer::new());
/// assert_eq!(lines.association_storage, AssociationStorageType::InEntity);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    /// Options applying to everything.
    pub global: OptionsLayer,
    /// Per-entity overrides, by entity name.
    pub entities: BTreeMap<String, EntityOptions>,
}

impl OptionsConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::Config`] on malformed JSON, unknown keys or
    /// unknown option values.
    pub fn from_json(json: &str) -> DialectResult<Self> {
        serde_json::from_str(json).map_err(|e| DialectError::config(e.to_string()))
    }

    /// Renders the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::Config`] if serialization fails.
    pub fn to_json(&self) -> DialectResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DialectError::config(e.to_string()))
    }

    /// Sets the global layer.
    #[must_use]
    pub fn with_global(mut self, layer: OptionsLayer) -> Self {
        self.global = layer;
        self
    }

    /// Sets the layer of one entity.
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>, layer: OptionsLayer) -> Self {
        self.entities.entry(entity.into()).or_default().options = layer;
        self
    }

    /// Sets the layer of one property of an entity.
    #[must_use]
    pub fn with_property(
        mut self,
        entity: impl Into<String>,
        property: impl Into<String>,
        layer: OptionsLayer,
    ) -> Self {
        self.entities
            .entry(entity.into())
            .or_default()
            .properties
            .insert(property.into(), layer);
        self
    }

    /// Computes the effective options for an entity or one of its properties.
    ///
    /// `backend_defaults` sits between the global layer and the documented
    /// defaults.
    #[must_use]
    pub fn effective(
        &self,
        entity: Option<&str>,
        property: Option<&str>,
        backend_defaults: OptionsLayer,
    ) -> EffectiveOptions {
        let entity_options = entity.and_then(|name| self.entities.get(name));
        let property_layer = entity_options
            .zip(property)
            .and_then(|(e, p)| e.properties.get(p).copied())
            .unwrap_or_default();
        let entity_layer = entity_options.map(|e| e.options).unwrap_or_default();

        property_layer
            .or(entity_layer)
            .or(self.global)
            .or(backend_defaults)
            .resolve()
    }
}

/// Fully resolved options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EffectiveOptions {
    /// Where association rows live.
    pub association_storage: AssociationStorageType,
    /// How separate association records are grouped.
    pub association_document_storage: AssociationDocumentStorageType,
    /// How embedded map-typed associations are laid out.
    pub map_storage: MapStorageType,
    /// Granularity of storage namespaces.
    pub cache_mapping: CacheMappingType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults_apply_when_nothing_is_set() {
        let effective = OptionsConfig::new().effective(None, None, OptionsLayer::new());
        assert_eq!(effective, EffectiveOptions::default());
        assert_eq!(effective.association_storage, AssociationStorageType::InEntity);
        assert_eq!(
            effective.association_document_storage,
            AssociationDocumentStorageType::GlobalCollection
        );
        assert_eq!(effective.map_storage, MapStorageType::ByKey);
        assert_eq!(effective.cache_mapping, CacheMappingType::CachePerTable);
    }

    #[test]
    fn property_beats_entity_beats_global_beats_backend() {
        let config = OptionsConfig::new()
            .with_global(OptionsLayer::new().map_storage(MapStorageType::AsList))
            .with_entity(
                "Order",
                OptionsLayer::new().association_storage(AssociationStorageType::AssociationDocument),
            )
            .with_property(
                "Order",
                "lines",
                OptionsLayer::new().association_storage(AssociationStorageType::InEntity),
            );
        let backend = OptionsLayer::new()
            .map_storage(MapStorageType::ByKey)
            .cache_mapping(CacheMappingType::CachePerKind);

        let lines = config.effective(Some("Order"), Some("lines"), backend);
        assert_eq!(lines.association_storage, AssociationStorageType::InEntity);
        assert_eq!(lines.map_storage, MapStorageType::AsList);
        assert_eq!(lines.cache_mapping, CacheMappingType::CachePerKind);

        let other = config.effective(Some("Order"), Some("notes"), backend);
        assert_eq!(other.association_storage, AssociationStorageType::AssociationDocument);

        let unrelated = config.effective(Some("Invoice"), Some("lines"), backend);
        assert_eq!(unrelated.association_storage, AssociationStorageType::InEntity);
    }

    #[test]
    fn json_round_trips() {
        let config = OptionsConfig::new().with_property(
            "Order",
            "tags",
            OptionsLayer::new().map_storage(MapStorageType::AsList),
        );
        let json = config.to_json().unwrap();
        assert_eq!(OptionsConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn unknown_option_value_is_a_config_error() {
        let err = OptionsConfig::from_json(r#"{"global": {"map_storage": "sideways"}}"#).unwrap_err();
        assert!(matches!(err, DialectError::Config { .. }));
        let err = OptionsConfig::from_json(r#"{"global": {"colour": "blue"}}"#).unwrap_err();
        assert!(matches!(err, DialectError::Config { .. }));
    }
}
