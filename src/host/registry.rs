//! Live objects on the owning side, keyed by instance id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::interfaces::{InstanceId, PluginObject};
use crate::transport::lock;

#[derive(Default)]
pub struct InstanceRegistry {
    next_id: AtomicU64,
    objects: Mutex<HashMap<InstanceId, Arc<dyn PluginObject>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next instance id. Ids are never reused.
    pub fn next_id(&self) -> InstanceId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, instance_id: InstanceId, object: Arc<dyn PluginObject>) {
        lock(&self.objects).insert(instance_id, object);
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<Arc<dyn PluginObject>> {
        lock(&self.objects).get(&instance_id).cloned()
    }

    pub fn remove(&self, instance_id: InstanceId) -> Option<Arc<dyn PluginObject>> {
        lock(&self.objects).remove(&instance_id)
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every object, returning how many there were.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = lock(&self.objects).drain().collect();
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;
    impl PluginObject for Empty {}

    #[test]
    fn ids_are_unique_and_increasing() {
        let registry = InstanceRegistry::new();
        let a = registry.next_id();
        let b = registry.next_id();
        assert!(b > a);
    }

    #[test]
    fn insert_get_remove() {
        let registry = InstanceRegistry::new();
        let id = registry.next_id();
        registry.insert(id, Arc::new(Empty));
        assert!(registry.get(id).is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }
}
