//! Commit order of batched operations.
//!
//! Additive operations go first, subtractive ones last. Within additive
//! operations lower-ranked kinds go first (handlers before the loggers that
//! reference them); within subtractive ones higher-ranked kinds go first
//! (deployables are removed before the data sources they use).

use super::operation::Operation;

/// Returns the operations in commit order. Operations with the same key keep
/// their relative order.
#[must_use]
pub fn sort_for_commit(mut operations: Vec<Operation>) -> Vec<Operation> {
    operations.sort_by_key(Operation::sort_key);
    operations
}
