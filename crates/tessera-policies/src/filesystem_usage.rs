//! # Filesystem Usage Sampling
//!
//! Samples the utilization of a resource's underlying filesystem and
//! records it as a percentage attribute on the resource. Designed to be
//! invoked periodically through the scheduler; each sample overwrites
//! the previous one.

use std::sync::Arc;

use serde::Deserialize;

use tessera_catalog::{AttributeValue, Catalog, EntityRef};
use tessera_core::{Config, EngineError, Invocation};
use tessera_engine::PolicyHandler;

use crate::attributes;

const POLICY: &str = "filesystem_usage";

#[derive(Debug, Deserialize)]
struct Options {
    #[serde(default = "default_attribute")]
    attribute: String,
}

fn default_attribute() -> String {
    attributes::FILESYSTEM_USAGE.to_string()
}

/// The filesystem-usage policy handler.
pub struct FilesystemUsage {
    catalog: Arc<dyn Catalog>,
}

impl FilesystemUsage {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

impl PolicyHandler for FilesystemUsage {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError> {
        let options: Options = config.typed(POLICY)?;
        let resource = invocation
            .context
            .source_resource()
            .ok_or_else(|| EngineError::configuration(POLICY, "source_resource missing from context"))?;

        let percent = self.catalog.filesystem_usage(resource)?;
        self.catalog.set_metadata(
            &EntityRef::Resource(resource.to_string()),
            &options.attribute,
            &AttributeValue::with_units(format!("{percent:.2}"), "percent"),
        )?;
        Ok(format!(
            "recorded {percent:.2}% usage at [{}] on [{resource}]",
            options.attribute
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_catalog::MemoryCatalog;
    use tessera_core::context::keys;
    use tessera_core::Context;

    fn invocation(resource: &str) -> Invocation {
        Invocation::from_context(Context::new().with(keys::SOURCE_RESOURCE, resource))
    }

    #[test]
    fn records_usage_percentage_on_the_resource() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_resource("r1", "/vault/r1", 200);
        catalog.put_object("/zone/f.dat", "u", "r1", &[0u8; 50]);
        let handler = FilesystemUsage::new(Arc::clone(&catalog) as Arc<dyn Catalog>);

        handler.invoke(&invocation("r1"), &Config::new()).unwrap();
        let attrs = catalog
            .metadata(&EntityRef::Resource("r1".to_string()))
            .unwrap();
        let recorded = attrs.get(attributes::FILESYSTEM_USAGE).unwrap();
        assert_eq!(recorded.value, "25.00");
        assert_eq!(recorded.units.as_deref(), Some("percent"));
    }

    #[test]
    fn repeated_samples_overwrite() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_resource("r1", "/vault/r1", 200);
        catalog.put_object("/zone/f.dat", "u", "r1", &[0u8; 50]);
        let handler = FilesystemUsage::new(Arc::clone(&catalog) as Arc<dyn Catalog>);

        handler.invoke(&invocation("r1"), &Config::new()).unwrap();
        catalog.put_object("/zone/g.dat", "u", "r1", &[0u8; 100]);
        handler.invoke(&invocation("r1"), &Config::new()).unwrap();

        let attrs = catalog
            .metadata(&EntityRef::Resource("r1".to_string()))
            .unwrap();
        assert_eq!(attrs.get(attributes::FILESYSTEM_USAGE).unwrap().value, "75.00");
    }

    #[test]
    fn unknown_resource_surfaces_storage_failure() {
        let catalog = Arc::new(MemoryCatalog::new());
        let handler = FilesystemUsage::new(catalog as Arc<dyn Catalog>);
        let err = handler
            .invoke(&invocation("missing"), &Config::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
