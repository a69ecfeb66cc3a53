//! Configuration for the ordered-name index

use nameindex_core::{Error, Result};

/// Configuration options for an [`crate::ItemList`].
///
/// Unlike a storage engine's configuration, there is no on-disk config
/// format here: the skip list's own persistence format is explicitly out of
/// scope for this crate, so a config is just the handful of parameters the
/// index itself needs.
///
/// # Example
///
/// ```
/// use nameindex_index::IndexConfig;
///
/// let config = IndexConfig::new(b"names:".to_vec(), 64).unwrap();
/// assert_eq!(config.batch_size, 64);
/// ```
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Byte-string prefix used to namespace node keys in the
    /// `SortedBatchStore` (`K(i) = prefix ++ decimal(i) ++ "m"`).
    pub prefix: Vec<u8>,

    /// Maximum batch cardinality `B`. Must be positive.
    pub batch_size: usize,
}

impl IndexConfig {
    /// Builds a config, rejecting a zero batch size.
    pub fn new(prefix: Vec<u8>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidName(
                "batch_size must be positive".to_string(),
            ));
        }
        Ok(Self { prefix, batch_size })
    }
}
