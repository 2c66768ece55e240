use crate::store::StoreError;
use karel_kernel::{World, WorldRecord};
use serde::{Deserialize, Serialize};

/// Current schema version of a stored world document.
pub const WORLD_SCHEMA_VERSION: u32 = 1;

/// On-disk envelope around a [`WorldRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorldDocument {
    schema_version: u32,
    world: WorldRecord,
}

/// Serialize a world into a versioned JSON document.
pub fn encode_world(world: &World) -> Result<Vec<u8>, StoreError> {
    let doc = WorldDocument {
        schema_version: WORLD_SCHEMA_VERSION,
        world: world.to_record(),
    };
    Ok(serde_json::to_vec(&doc)?)
}

/// Parse a document, check its schema version, and rebuild the world.
pub fn decode_world(bytes: &[u8]) -> Result<World, StoreError> {
    let doc: WorldDocument = serde_json::from_slice(bytes)?;
    if doc.schema_version != WORLD_SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            file_version: doc.schema_version,
            expected_version: WORLD_SCHEMA_VERSION,
        });
    }
    Ok(World::from_record(doc.world)?)
}
