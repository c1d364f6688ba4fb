//! Typed, reference-counted handles to remote blocks.

use crate::client::ArenaClient;
use crate::error::{ClientError, Result};
use marena_core::ValueKind;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

/// A Rust type that maps onto one arena value kind.
///
/// Values travel as text in the kind's canonical form.
pub trait Primitive: fmt::Display + FromStr + Send + Sync + 'static {
    /// Value kind stored in the arena.
    const KIND: ValueKind;

    /// Render the value as a literal the arena accepts.
    fn to_literal(&self) -> String {
        self.to_string()
    }

    /// Parse the arena's textual form.
    fn from_literal(text: &str) -> Result<Self> {
        text.parse().map_err(|_| ClientError::Decode {
            type_tag: Self::KIND.tag(),
            value: text.to_string(),
        })
    }
}

macro_rules! impl_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: ValueKind = ValueKind::$kind;
            }
        )*
    };
}

impl_primitive! {
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    char => Char,
}

/// A typed handle to a block in a remote arena.
///
/// Each live handle owns exactly one reference to its block:
///
/// - [`RemotePtr::new`] creates the block (count 1)
/// - `clone` adds one reference
/// - [`RemotePtr::assign`] adds one to the new target and drops one from the old
/// - dropping the handle drops one reference
///
/// The client is passed in explicitly; there is no global connection.
///
/// # Example
///
/// ```
/// use marena_client::RemotePtr;
/// use marena_core::{ArenaConfig, MemoryService};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = Arc::new(MemoryService::new(&ArenaConfig::for_testing(64))?);
///
/// let counter = RemotePtr::<i32, _>::with_value(Arc::clone(&service), &41)?;
/// counter.set(&(counter.get()? + 1))?;
///
/// let alias = counter.clone();
/// assert_eq!(alias.get()?, 42);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct RemotePtr<T: Primitive, C: ArenaClient> {
    client: Arc<C>,
    id: i64,
    /// False only for a clone whose increment failed; such a handle holds
    /// no reference and releases nothing on drop.
    holds_ref: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Primitive, C: ArenaClient> RemotePtr<T, C> {
    /// Create a block for a `T` and return a handle to it.
    pub fn new(client: Arc<C>) -> Result<Self> {
        let id = client.create_block(T::KIND.width() as u64, T::KIND.tag())?;
        tracing::trace!(block_id = id, type_tag = T::KIND.tag(), "Created remote block");

        Ok(Self {
            client,
            id,
            holds_ref: true,
            _marker: PhantomData,
        })
    }

    /// Create a block and store `value` in it.
    pub fn with_value(client: Arc<C>, value: &T) -> Result<Self> {
        let ptr = Self::new(client)?;
        ptr.set(value)?;
        Ok(ptr)
    }

    /// Wire id of the block.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Client this handle talks to.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Read the current value.
    pub fn get(&self) -> Result<T> {
        let text = self.client.get_value(self.id)?;
        T::from_literal(&text)
    }

    /// Store a new value.
    pub fn set(&self, value: &T) -> Result<()> {
        self.client.set_value(self.id, &value.to_literal())
    }

    /// Clone the handle, reporting a failed increment instead of logging it.
    pub fn try_clone(&self) -> Result<Self> {
        self.client.increase_ref(self.id)?;
        Ok(Self {
            client: Arc::clone(&self.client),
            id: self.id,
            holds_ref: true,
            _marker: PhantomData,
        })
    }

    /// Point this handle at `other`'s block.
    ///
    /// `other` gains a reference before the old block loses one, so
    /// assigning a handle to itself never frees the block. If the
    /// increment fails this handle is unchanged.
    pub fn assign(&mut self, other: &Self) -> Result<()> {
        other.client.increase_ref(other.id)?;

        let old_id = std::mem::replace(&mut self.id, other.id);
        let old_client = std::mem::replace(&mut self.client, Arc::clone(&other.client));
        let held_old = std::mem::replace(&mut self.holds_ref, true);

        if held_old {
            old_client.decrease_ref(old_id)?;
        }
        Ok(())
    }
}

impl<T: Primitive, C: ArenaClient> Clone for RemotePtr<T, C> {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(ptr) => ptr,
            Err(e) => {
                tracing::error!(block_id = self.id, error = %e, "Failed to add reference for clone");
                Self {
                    client: Arc::clone(&self.client),
                    id: self.id,
                    holds_ref: false,
                    _marker: PhantomData,
                }
            }
        }
    }
}

impl<T: Primitive, C: ArenaClient> Drop for RemotePtr<T, C> {
    fn drop(&mut self) {
        if !self.holds_ref {
            return;
        }

        if let Err(e) = self.client.decrease_ref(self.id) {
            tracing::warn!(block_id = self.id, error = %e, "Failed to release remote block");
        }
    }
}

impl<T: Primitive, C: ArenaClient> fmt::Debug for RemotePtr<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotePtr")
            .field("id", &self.id)
            .field("type_tag", &T::KIND.tag())
            .field("holds_ref", &self.holds_ref)
            .finish()
    }
}
