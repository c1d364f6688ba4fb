//! The operations a handle needs from an arena.

use crate::error::{ClientError, Result};
use marena_core::MemoryService;
use std::sync::Arc;

/// Transport to a marena arena.
///
/// Ids are the integer wire handles the arena hands out. Implementations
/// map an `ok = false` response to [`ClientError::Rejected`].
///
/// # Example
///
/// ```
/// use marena_client::ArenaClient;
/// use marena_core::{ArenaConfig, MemoryService};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = MemoryService::new(&ArenaConfig::for_testing(64))?;
///
/// let id = service.create_block(4, "int")?;
/// service.set_value(id, "7")?;
/// assert_eq!(service.get_value(id)?, "7");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub trait ArenaClient: Send + Sync {
    /// Create a block and return its id.
    fn create_block(&self, size: u64, type_tag: &str) -> Result<i64>;

    /// Store a textual value.
    fn set_value(&self, id: i64, value: &str) -> Result<()>;

    /// Read a textual value.
    fn get_value(&self, id: i64) -> Result<String>;

    /// Add a reference and return the new count.
    fn increase_ref(&self, id: i64) -> Result<i64>;

    /// Drop a reference and return the new count.
    fn decrease_ref(&self, id: i64) -> Result<i64>;
}

/// In-process transport.
impl ArenaClient for MemoryService {
    fn create_block(&self, size: u64, type_tag: &str) -> Result<i64> {
        let response = self.create(size, type_tag);
        if response.ok {
            Ok(response.id)
        } else {
            Err(ClientError::rejected("Create", response.message))
        }
    }

    fn set_value(&self, id: i64, value: &str) -> Result<()> {
        let response = self.set(id, value);
        if response.ok {
            Ok(())
        } else {
            Err(ClientError::rejected("Set", response.message))
        }
    }

    fn get_value(&self, id: i64) -> Result<String> {
        let response = self.get(id);
        if response.ok {
            Ok(response.value)
        } else {
            Err(ClientError::rejected("Get", response.message))
        }
    }

    fn increase_ref(&self, id: i64) -> Result<i64> {
        let response = self.increase_ref_count(id);
        if response.ok {
            Ok(response.new_count)
        } else {
            Err(ClientError::rejected("IncreaseRefCount", response.message))
        }
    }

    fn decrease_ref(&self, id: i64) -> Result<i64> {
        let response = self.decrease_ref_count(id);
        if response.ok {
            Ok(response.new_count)
        } else {
            Err(ClientError::rejected("DecreaseRefCount", response.message))
        }
    }
}

impl<C: ArenaClient + ?Sized> ArenaClient for Arc<C> {
    fn create_block(&self, size: u64, type_tag: &str) -> Result<i64> {
        (**self).create_block(size, type_tag)
    }

    fn set_value(&self, id: i64, value: &str) -> Result<()> {
        (**self).set_value(id, value)
    }

    fn get_value(&self, id: i64) -> Result<String> {
        (**self).get_value(id)
    }

    fn increase_ref(&self, id: i64) -> Result<i64> {
        (**self).increase_ref(id)
    }

    fn decrease_ref(&self, id: i64) -> Result<i64> {
        (**self).decrease_ref(id)
    }
}
