//! Options command implementation.

use super::{Backend, Format};
use gridlink_core::{EffectiveOptions, OptionsConfig};

/// Resolves the options in force at one level.
pub fn effective(
    options: &OptionsConfig,
    entity: Option<&str>,
    property: Option<&str>,
    backend: Backend,
) -> EffectiveOptions {
    options.effective(entity, property, backend.profile().defaults)
}

/// Runs the options command.
pub fn run(
    options: &OptionsConfig,
    entity: Option<&str>,
    property: Option<&str>,
    backend: Backend,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = effective(options, entity, property, backend);
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&resolved)?),
        Format::Text => {
            let scope = match (entity, property) {
                (Some(entity), Some(property)) => format!("{entity}.{property}"),
                (Some(entity), None) => entity.to_owned(),
                _ => "global".to_owned(),
            };
            println!("Effective options ({scope}):");
            println!("  association_storage:          {:?}", resolved.association_storage);
            println!("  association_document_storage: {:?}", resolved.association_document_storage);
            println!("  map_storage:                  {:?}", resolved.map_storage);
            println!("  cache_mapping:                {:?}", resolved.cache_mapping);
        }
    }
    Ok(())
}
