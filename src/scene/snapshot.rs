use std::sync::{Arc, Mutex};

use super::{Object, ShapeSource};

/// Frozen list of objects a single frame is traced against.
#[derive(Debug, Default)]
pub struct SceneSnapshot {
    objects: Vec<Object>,
    generation: u64,
}

impl SceneSnapshot {
    pub fn new(objects: Vec<Object>, generation: u64) -> Self {
        SceneSnapshot {
            objects,
            generation,
        }
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Number of rebuilds that produced this snapshot, starting at 1.
    /// The empty initial snapshot has generation 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Holds the most recently published snapshot.
///
/// The mutex is only held while the scene is being walked and the new snapshot swapped in,
/// and while a reader clones the current handle. Tracing happens on the cloned `Arc`
/// without any locking.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: Mutex<Arc<SceneSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Collects all shapes from the source into a new snapshot and publishes it.
    pub fn rebuild(&self, source: &dyn ShapeSource) -> Arc<SceneSnapshot> {
        let mut current = self.current.lock().expect("Poisoned lock!");

        let mut objects = Vec::with_capacity(current.len());
        source.visit_shapes(&mut |shape| {
            objects.push(Object {
                shape: Arc::clone(shape),
            })
        });

        let snapshot = Arc::new(SceneSnapshot::new(objects, current.generation + 1));
        *current = Arc::clone(&snapshot);
        snapshot
    }

    pub fn current(&self) -> Arc<SceneSnapshot> {
        Arc::clone(&self.current.lock().expect("Poisoned lock!"))
    }
}
