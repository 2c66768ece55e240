use crate::document::{decode_world, encode_world};
use crate::store::{KeyValueStore, StoreError};
use karel_common::PlaygroundId;
use karel_kernel::World;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Display name given to playgrounds created or renamed without one.
pub const UNTITLED: &str = "Untitled";

/// Default catalog name.
pub const DEFAULT_COLLECTION: &str = "Karel Playgrounds";

fn catalog_key(collection: &str) -> String {
    format!("KarelPlaygroundStore.{collection}")
}

fn world_key(id: PlaygroundId) -> String {
    format!("KarelPlayground.{id}")
}

fn display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNTITLED.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// A named collection of worlds.
///
/// The catalog (id to display name) lives under one key, each world under
/// its own key. Every mutating call writes through to the backend before
/// returning, and a failed write leaves the in-memory catalog unchanged.
#[derive(Debug)]
pub struct PlaygroundStore<S> {
    collection: String,
    backend: S,
    names: BTreeMap<PlaygroundId, String>,
}

impl<S: KeyValueStore> PlaygroundStore<S> {
    /// Load the catalog named `collection`, or start an empty one.
    ///
    /// Catalog entries whose key is not a valid id are skipped.
    pub fn open(backend: S, collection: impl Into<String>) -> Result<Self, StoreError> {
        let collection = collection.into();
        let mut names = BTreeMap::new();
        if let Some(bytes) = backend.get(&catalog_key(&collection))? {
            let raw: BTreeMap<String, String> = serde_json::from_slice(&bytes)?;
            for (key, name) in raw {
                match Uuid::parse_str(&key) {
                    Ok(uuid) => {
                        names.insert(PlaygroundId(uuid), name);
                    }
                    Err(e) => warn!(%key, error = %e, "skipping catalog entry with invalid id"),
                }
            }
        }
        info!(%collection, playgrounds = names.len(), "playground store opened");
        Ok(Self {
            collection,
            backend,
            names,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, id: PlaygroundId) -> bool {
        self.names.contains_key(&id)
    }

    pub fn name_for(&self, id: PlaygroundId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// All playgrounds, sorted by display name (ties broken by id).
    pub fn playgrounds(&self) -> Vec<(PlaygroundId, &str)> {
        let mut list: Vec<_> = self
            .names
            .iter()
            .map(|(id, name)| (*id, name.as_str()))
            .collect();
        list.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)));
        list
    }

    /// First playground with exactly this display name, in listing order.
    pub fn find_by_name(&self, name: &str) -> Option<PlaygroundId> {
        self.playgrounds()
            .into_iter()
            .find(|(_, n)| *n == name)
            .map(|(id, _)| id)
    }

    /// Add a playground holding a fresh default world.
    pub fn add_playground(&mut self, name: &str) -> Result<PlaygroundId, StoreError> {
        self.add_playground_with(name, &World::default())
    }

    /// Add a playground holding a copy of `world`.
    ///
    /// If the catalog cannot be written, the world document is deleted again
    /// and the catalog is left as it was.
    pub fn add_playground_with(
        &mut self,
        name: &str,
        world: &World,
    ) -> Result<PlaygroundId, StoreError> {
        let id = PlaygroundId::new();
        let name = display_name(name);
        self.backend.set(&world_key(id), &encode_world(world)?)?;

        let mut names = self.names.clone();
        names.insert(id, name.clone());
        if let Err(e) = self.write_catalog(&names) {
            if let Err(cleanup) = self.backend.remove(&world_key(id)) {
                warn!(%id, error = %cleanup, "could not delete world of unlisted playground");
            }
            return Err(e);
        }
        self.names = names;
        info!(%id, %name, "playground added");
        Ok(id)
    }

    /// Remove a playground and delete its world.
    ///
    /// The catalog is written first. If deleting the world afterwards fails,
    /// the playground stays removed and the error is returned.
    pub fn remove_playground(&mut self, id: PlaygroundId) -> Result<(), StoreError> {
        let mut names = self.names.clone();
        let name = names
            .remove(&id)
            .ok_or(StoreError::UnknownPlayground(id))?;
        self.write_catalog(&names)?;
        self.names = names;
        self.backend.remove(&world_key(id))?;
        info!(%id, %name, "playground removed");
        Ok(())
    }

    /// Rename a playground. A blank name becomes "Untitled".
    pub fn set_name(&mut self, id: PlaygroundId, name: &str) -> Result<(), StoreError> {
        if !self.contains(id) {
            return Err(StoreError::UnknownPlayground(id));
        }
        let name = display_name(name);
        let mut names = self.names.clone();
        names.insert(id, name.clone());
        self.write_catalog(&names)?;
        self.names = names;
        info!(%id, %name, "playground renamed");
        Ok(())
    }

    /// Load a playground's world. A catalogued playground with no stored
    /// world yet loads as a fresh default world.
    pub fn load_world(&self, id: PlaygroundId) -> Result<World, StoreError> {
        if !self.contains(id) {
            return Err(StoreError::UnknownPlayground(id));
        }
        match self.backend.get(&world_key(id))? {
            Some(bytes) => decode_world(&bytes),
            None => {
                warn!(%id, "no stored world, using default");
                Ok(World::default())
            }
        }
    }

    pub fn save_world(&mut self, id: PlaygroundId, world: &World) -> Result<(), StoreError> {
        if !self.contains(id) {
            return Err(StoreError::UnknownPlayground(id));
        }
        self.backend.set(&world_key(id), &encode_world(world)?)?;
        info!(
            %id,
            rows = world.num_rows(),
            cols = world.num_cols(),
            beepers = world.beepers().len(),
            obstacles = world.obstacles().len(),
            "world saved"
        );
        Ok(())
    }

    fn write_catalog(&mut self, names: &BTreeMap<PlaygroundId, String>) -> Result<(), StoreError> {
        let raw: BTreeMap<String, &str> = names
            .iter()
            .map(|(id, name)| (id.to_string(), name.as_str()))
            .collect();
        let bytes = serde_json::to_vec(&raw)?;
        self.backend.set(&catalog_key(&self.collection), &bytes)
    }
}
