use crate::{align, block::MIN_BLOCK_SIZE};

/// Tunables for [`crate::FreeListAllocator`].
///
/// ```rust
/// use flalloc::Config;
///
/// let config = Config::default().split_threshold(100).verify(true);
/// assert_eq!(config.split_threshold, 112);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
  /// A free block is only split when the leftover would be at least this
  /// many bytes. Never below [`MIN_BLOCK_SIZE`].
  pub split_threshold: usize,
  /// Run the heap checker after every mutating operation and panic if it
  /// finds corruption.
  pub verify: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      split_threshold: MIN_BLOCK_SIZE,
      verify: false,
    }
  }
}

impl Config {
  pub fn split_threshold(
    mut self,
    bytes: usize,
  ) -> Self {
    self.split_threshold = align!(bytes.clamp(MIN_BLOCK_SIZE, usize::MAX / 2));
    self
  }

  pub fn verify(
    mut self,
    verify: bool,
  ) -> Self {
    self.verify = verify;
    self
  }
}
