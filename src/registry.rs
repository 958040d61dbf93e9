//! Opaque integer handles for hosts that cannot hold Rust values directly.
//!
//! Ids are generational: once a table is destroyed its id never resolves
//! again, even if the registry reuses the storage slot.

use slotmap::{Key, KeyData, SlotMap};

use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::table::{Table, TableConfig};
use crate::trace::trace_op;

slotmap::new_key_type! {
    /// Opaque table id, convertible to and from a `u64`.
    pub struct TableId;
}

impl TableId {
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    pub fn from_raw(raw: u64) -> Self {
        TableId::from(KeyData::from_ffi(raw))
    }
}

#[derive(Debug)]
pub struct Registry<V: HostValue> {
    tables: SlotMap<TableId, Table<V>>,
}

impl<V: HostValue> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HostValue> Registry<V> {
    pub fn new() -> Self {
        Self {
            tables: SlotMap::with_key(),
        }
    }

    pub fn create(&mut self, config: TableConfig<V>) -> Result<TableId, V> {
        let table = config.build()?;
        Ok(self.adopt(table))
    }

    /// Register an existing table handle.
    pub fn adopt(&mut self, table: Table<V>) -> TableId {
        let id = self.tables.insert(table);
        trace_op!(op = "register", id = id.to_raw(), "registry op");
        id
    }

    pub fn get(&self, id: TableId) -> Result<Table<V>, V> {
        self.tables.get(id).cloned().ok_or(Error::InvalidHandle)
    }

    /// Destroy the table behind `id` and forget the id. If the table is
    /// busy (`Reentrant`) the id stays registered.
    pub fn destroy(&mut self, id: TableId) -> Result<(), V> {
        let table = self.get(id)?;
        match table.destroy() {
            Err(Error::Reentrant) => return Err(Error::Reentrant),
            // Already destroyed through another handle: the id is dead too.
            Ok(()) | Err(Error::InvalidHandle) => {}
            Err(e) => return Err(e),
        }
        self.tables.remove(id);
        trace_op!(op = "unregister", id = id.to_raw(), "registry op");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
