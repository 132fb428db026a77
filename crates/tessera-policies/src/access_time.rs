//! # Access-Time Stamping
//!
//! Records the current time, in epoch seconds, as a metadata attribute
//! on the object named by the invocation's logical path. Invoked on a
//! collection, it stamps the collection and everything beneath it.
//! Last write wins, so repeated invocations are idempotent per call.

use std::sync::Arc;

use serde::Deserialize;

use tessera_catalog::{AttributeValue, Catalog, CollectionEntry, EntityRef};
use tessera_core::{Config, EngineError, Invocation, Timestamp};
use tessera_engine::PolicyHandler;

use crate::attributes;

const POLICY: &str = "access_time";

#[derive(Debug, Deserialize)]
struct Options {
    #[serde(default = "default_attribute")]
    attribute: String,
}

fn default_attribute() -> String {
    attributes::ACCESS_TIME.to_string()
}

/// The access-time policy handler.
pub struct AccessTime {
    catalog: Arc<dyn Catalog>,
}

impl AccessTime {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn stamp_collection(
        &self,
        path: &str,
        attribute: &str,
        value: &AttributeValue,
        stamped: &mut usize,
    ) -> Result<(), EngineError> {
        self.catalog
            .set_metadata(&EntityRef::Collection(path.to_string()), attribute, value)?;
        *stamped += 1;
        for entry in self.catalog.list_collection(path)? {
            match entry {
                CollectionEntry::DataObject(object) => {
                    self.catalog.set_metadata(
                        &EntityRef::DataObject(object),
                        attribute,
                        value,
                    )?;
                    *stamped += 1;
                }
                CollectionEntry::Collection(sub) => {
                    self.stamp_collection(&sub, attribute, value, stamped)?;
                }
            }
        }
        Ok(())
    }
}

impl PolicyHandler for AccessTime {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError> {
        let options: Options = config.typed(POLICY)?;
        let path = invocation
            .context
            .logical_path()
            .ok_or_else(|| EngineError::configuration(POLICY, "logical_path missing from context"))?;

        let value = AttributeValue::new(Timestamp::now().epoch_secs().to_string());
        if self.catalog.is_collection(path) {
            let mut stamped = 0;
            self.stamp_collection(path, &options.attribute, &value, &mut stamped)?;
            Ok(format!(
                "access time recorded at [{}] on [{path}] and {} entries beneath it",
                options.attribute,
                stamped - 1
            ))
        } else {
            self.catalog.set_metadata(
                &EntityRef::DataObject(path.to_string()),
                &options.attribute,
                &value,
            )?;
            Ok(format!(
                "access time recorded at [{}] on [{path}]",
                options.attribute
            ))
        }
    }
}
