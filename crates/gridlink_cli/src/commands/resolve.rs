//! Resolve command implementation.

use super::{Backend, Format};
use clap::ValueEnum;
use gridlink_core::{
    AssociationKeyMetadata, AssociationKind, AssociationStorageStrategy, AssociationType, AssociationTypeContext,
    EffectiveOptions, OptionsConfig, ScalarType,
};
use serde::Serialize;

/// Collection semantics accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Semantics {
    /// Unordered, duplicates allowed
    Bag,
    /// Unordered, unique rows
    Set,
    /// Ordered by an index column
    List,
    /// Keyed by index columns
    Map,
    /// A single associated row
    OneToOne,
}

impl From<Semantics> for AssociationType {
    fn from(semantics: Semantics) -> Self {
        match semantics {
            Semantics::Bag => Self::Bag,
            Semantics::Set => Self::Set,
            Semantics::List => Self::List,
            Semantics::Map => Self::Map,
            Semantics::OneToOne => Self::OneToOne,
        }
    }
}

/// What to resolve.
#[derive(Debug)]
pub struct Request<'a> {
    /// Owning entity.
    pub entity: &'a str,
    /// Association role.
    pub role: &'a str,
    /// Collection semantics.
    pub semantics: Semantics,
    /// Whether rows are embedded values.
    pub embedded: bool,
    /// Whether rows are keyed by one string index.
    pub string_index: bool,
}

/// Resolution result.
#[derive(Debug, Serialize)]
pub struct ResolveResult {
    /// Owning entity.
    pub entity: String,
    /// Association role.
    pub role: String,
    /// Options in force for the role.
    pub options: EffectiveOptions,
    /// Where rows are stored.
    pub strategy: AssociationStorageStrategy,
}

/// Builds the metadata described by `request`.
pub fn metadata(request: &Request<'_>) -> AssociationKeyMetadata {
    let table = format!("{}_{}", request.entity, request.role);
    let mut builder = AssociationKeyMetadata::builder(table, ["owner_id"])
        .row_key_columns(["owner_id", "element"])
        .role(request.role)
        .association_type(request.semantics.into())
        .kind(if request.embedded {
            AssociationKind::EmbeddedCollection
        } else {
            AssociationKind::Association
        });
    if request.string_index {
        builder = builder.index_column("element", ScalarType::String);
    }
    builder.build()
}

/// Resolves the storage of one association.
pub fn resolve(options: &OptionsConfig, request: &Request<'_>, backend: Backend) -> ResolveResult {
    let profile = backend.profile();
    let effective = options.effective(Some(request.entity), Some(request.role), profile.defaults);
    let context = AssociationTypeContext::resolve(&metadata(request), effective, &profile);
    ResolveResult {
        entity: request.entity.to_owned(),
        role: request.role.to_owned(),
        options: *context.options(),
        strategy: context.strategy(),
    }
}

/// Runs the resolve command.
pub fn run(
    options: &OptionsConfig,
    request: &Request<'_>,
    backend: Backend,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = resolve(options, request, backend);
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => {
            println!("{}.{}: {}", result.entity, result.role, result.strategy);
            println!("  association storage:          {:?}", result.options.association_storage);
            println!(
                "  association document storage: {:?}",
                result.options.association_document_storage
            );
            println!("  map storage:                  {:?}", result.options.map_storage);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_core::{AssociationStorageType, OptionsLayer, RowLayout};

    fn request(semantics: Semantics, string_index: bool) -> Request<'static> {
        Request {
            entity: "users",
            role: "tags",
            semantics,
            embedded: false,
            string_index,
        }
    }

    #[test]
    fn document_backend_embeds_by_default() {
        let result = resolve(&OptionsConfig::default(), &request(Semantics::Bag, false), Backend::Document);
        assert_eq!(
            result.strategy,
            AssociationStorageStrategy::InEntity {
                layout: RowLayout::AsList
            }
        );
    }

    #[test]
    fn key_value_backend_uses_dedicated_records() {
        let result = resolve(&OptionsConfig::default(), &request(Semantics::Bag, false), Backend::KeyValue);
        assert_eq!(result.strategy, AssociationStorageStrategy::DedicatedRecord);
    }

    #[test]
    fn property_options_apply_to_the_role() {
        let options = OptionsConfig::new().with_property(
            "users",
            "tags",
            OptionsLayer::new().association_storage(AssociationStorageType::AssociationDocument),
        );
        let result = resolve(&options, &request(Semantics::Bag, false), Backend::Document);
        assert_eq!(result.strategy, AssociationStorageStrategy::SharedCollection);
    }

    #[test]
    fn string_keyed_maps_embed_by_key() {
        let result = resolve(&OptionsConfig::default(), &request(Semantics::Map, true), Backend::Document);
        assert_eq!(
            result.strategy,
            AssociationStorageStrategy::InEntity {
                layout: RowLayout::ByNaturalKey
            }
        );
    }
}
