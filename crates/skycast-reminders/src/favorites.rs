//! Saved cities.

use skycast_weather::City;
use std::sync::Arc;

use crate::error::{ReminderError, StoreError};
use crate::store::KeyValueStore;

const FAVORITES_KEY: &str = "favorites";

#[derive(Clone)]
pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved cities in insertion order. Unreadable data yields an empty list.
    pub fn list(&self) -> Vec<City> {
        match self.store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding corrupted favorites: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read favorites: {}", e);
                Vec::new()
            }
        }
    }

    /// Save a city. Returns false if a city with the same id is already saved.
    ///
    /// Fails without writing if the saved list cannot be read.
    pub fn add(&self, city: City) -> Result<bool, ReminderError> {
        let mut cities = self.load()?;
        if cities.iter().any(|c| c.id == city.id) {
            return Ok(false);
        }
        tracing::info!("Adding favorite: {}", city.name);
        cities.push(city);
        self.write(&cities)?;
        Ok(true)
    }

    /// Returns false if no city with that id was saved.
    pub fn remove(&self, id: i64) -> Result<bool, ReminderError> {
        let mut cities = self.load()?;
        let before = cities.len();
        cities.retain(|c| c.id != id);
        if cities.len() == before {
            return Ok(false);
        }
        self.write(&cities)?;
        Ok(true)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.list().iter().any(|c| c.id == id)
    }

    fn load(&self) -> Result<Vec<City>, ReminderError> {
        match self.store.get(FAVORITES_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw).map_err(StoreError::from)?),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, cities: &[City]) -> Result<(), ReminderError> {
        let json = serde_json::to_string(cities).map_err(StoreError::from)?;
        self.store.set(FAVORITES_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose reads fail while `failing` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("disk unavailable").into());
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    fn ids(favorites: &FavoritesStore) -> Vec<i64> {
        favorites.list().into_iter().map(|c| c.id).collect()
    }

    fn city(id: i64, name: &str) -> City {
        City {
            id,
            name: name.to_string(),
            latitude: 16.46,
            longitude: 107.59,
            country: Some("Vietnam".to_string()),
        }
    }

    #[test]
    fn test_add_is_idempotent_by_id() {
        let favorites = FavoritesStore::new(Arc::new(MemoryStore::new()));
        assert!(favorites.add(city(1, "Hue")).unwrap());
        assert!(!favorites.add(city(1, "Hue again")).unwrap());
        assert!(favorites.add(city(2, "Da Nang")).unwrap());

        let names: Vec<String> = favorites.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Hue", "Da Nang"]);
    }

    #[test]
    fn test_remove() {
        let favorites = FavoritesStore::new(Arc::new(MemoryStore::new()));
        favorites.add(city(1, "Hue")).unwrap();

        assert!(favorites.contains(1));
        assert!(favorites.remove(1).unwrap());
        assert!(!favorites.remove(1).unwrap());
        assert!(!favorites.contains(1));
    }

    #[test]
    fn test_corrupted_list_reads_as_empty_but_is_not_overwritten() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(FAVORITES_KEY, "[{\"id\":").unwrap();
        let favorites = FavoritesStore::new(kv.clone());

        assert!(favorites.list().is_empty());
        assert!(matches!(
            favorites.add(city(3, "Hoi An")),
            Err(ReminderError::Store(StoreError::Serialization(_)))
        ));
        assert!(favorites.remove(3).is_err());
        assert_eq!(kv.get(FAVORITES_KEY).unwrap().as_deref(), Some("[{\"id\":"));
    }

    #[test]
    fn test_failed_read_keeps_saved_cities() {
        let kv = Arc::new(FlakyStore::default());
        let favorites = FavoritesStore::new(kv.clone());
        favorites.add(city(1, "Hue")).unwrap();
        favorites.add(city(2, "Da Nang")).unwrap();

        kv.failing.store(true, Ordering::SeqCst);
        assert!(favorites.list().is_empty());
        assert!(matches!(
            favorites.add(city(3, "Hoi An")),
            Err(ReminderError::Store(StoreError::Io(_)))
        ));
        assert!(favorites.remove(1).is_err());

        kv.failing.store(false, Ordering::SeqCst);
        assert_eq!(ids(&favorites), vec![1, 2]);
        assert!(favorites.add(city(3, "Hoi An")).unwrap());
        assert_eq!(ids(&favorites), vec![1, 2, 3]);
    }
}
