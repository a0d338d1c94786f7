use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use mirror_shared::{ObjectId, ObjectSnapshot};

/// Latest published snapshot of every resident object.
///
/// Written only by the session owner task; the lock is held just long enough
/// to swap an `Arc`.
pub(crate) type SnapshotTable = Arc<RwLock<HashMap<ObjectId, Arc<ObjectSnapshot>>>>;

pub(crate) fn read_snapshots(
    table: &SnapshotTable,
) -> RwLockReadGuard<'_, HashMap<ObjectId, Arc<ObjectSnapshot>>> {
    match table.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(crate) fn write_snapshots(
    table: &SnapshotTable,
) -> RwLockWriteGuard<'_, HashMap<ObjectId, Arc<ObjectSnapshot>>> {
    match table.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
