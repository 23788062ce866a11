//! Instance storage for the object runtime.
//!
//! Instances live in an index-addressed arena with an optional instance limit.
//! Slots are never reclaimed: ids stay valid for the heap's lifetime, and the
//! limit caps total allocations rather than live objects. Each slot carries its own lock so ivar traffic on one object never
//! contends with another.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::runner::ds::class::ClassId;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::instance::{InstanceId, ObjectInstance};
use crate::runner::interop::host::HostRef;

/// Configuration for the heap manager.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapConfig {
    /// Maximum number of allocations over the heap's lifetime. None means unlimited.
    pub max_instances: Option<usize>,
}

impl HeapConfig {
    /// Create a new heap configuration with no instance limit.
    pub fn unlimited() -> Self {
        HeapConfig {
            max_instances: None,
        }
    }

    /// Create a new heap configuration with an instance limit.
    pub fn with_limit(max_instances: usize) -> Self {
        HeapConfig {
            max_instances: Some(max_instances),
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

pub type InstanceCell = Arc<RwLock<ObjectInstance>>;

/// Arena of object instances.
#[derive(Debug)]
pub struct ObjectHeap {
    config: HeapConfig,
    instances: Vec<InstanceCell>,
}

impl ObjectHeap {
    /// Create a new heap with the given configuration.
    pub fn new(config: HeapConfig) -> Self {
        ObjectHeap {
            config,
            instances: Vec::new(),
        }
    }

    /// Allocate a fresh instance of `class`.
    ///
    /// Returns an error if the allocation would exceed the instance limit.
    pub fn allocate(
        &mut self,
        class: ClassId,
        host: Option<HostRef>,
    ) -> Result<InstanceId, RuntimeError> {
        if let Some(limit) = self.config.max_instances {
            if self.instances.len() >= limit {
                return Err(RuntimeError::HeapExhausted { limit });
            }
        }
        let id = InstanceId(self.instances.len() as u32);
        let mut instance = ObjectInstance::new(id, class);
        if let Some(host) = host {
            instance = instance.with_host(host);
        }
        self.instances.push(Arc::new(RwLock::new(instance)));
        Ok(id)
    }

    /// Ids handed out by [`ObjectHeap::allocate`] always resolve.
    pub fn get(&self, id: InstanceId) -> Option<InstanceCell> {
        self.instances.get(id.0 as usize).cloned()
    }

    /// Total allocations so far. Never decreases.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Check if one more allocation would succeed.
    pub fn can_allocate(&self) -> bool {
        match self.config.max_instances {
            Some(limit) => self.instances.len() < limit,
            None => true,
        }
    }

    /// Get the remaining instance slots, if limited.
    pub fn available(&self) -> Option<usize> {
        self.config
            .max_instances
            .map(|max| max.saturating_sub(self.instances.len()))
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}
