use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use prost::bytes::Buf;
use prost_types::FileDescriptorProto;

use crate::{DescriptorError, DescriptorPool};

static GLOBAL: Lazy<Mutex<DescriptorPool>> =
    Lazy::new(|| Mutex::new(DescriptorPool::with_well_known_types()));

// A panic while the lock is held cannot leave the pool half-updated, because a rejected batch is
// rolled back before the error is returned.
fn lock() -> MutexGuard<'static, DescriptorPool> {
    GLOBAL.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DescriptorPool {
    /// Returns a snapshot of the process-wide pool, which starts out holding the well-known types.
    ///
    /// The [`ReflectMessage`][crate::ReflectMessage] impls in this crate look their descriptors
    /// up here. Files added to the global pool later are not visible in snapshots taken earlier,
    /// and changes made to a snapshot never reach the global pool.
    pub fn global() -> DescriptorPool {
        lock().clone()
    }

    /// Decodes an encoded file descriptor set into the global pool.
    pub fn decode_global_file_descriptor_set<B>(bytes: B) -> Result<(), DescriptorError>
    where
        B: Buf,
    {
        lock().decode_file_descriptor_set(bytes)
    }

    /// Adds one file to the global pool.
    pub fn add_global_file_descriptor_proto(
        file: FileDescriptorProto,
    ) -> Result<(), DescriptorError> {
        lock().add_file_descriptor_proto(file)
    }
}
