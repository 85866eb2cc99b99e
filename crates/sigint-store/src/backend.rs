//! Storage backend interface used by the persistence worker

use sigint_core::DataPoint;
use std::future::Future;

use crate::error::StoreError;

pub trait NodeStore: Send + 'static {
    /// Look up the node for a hardware address, creating it if needed
    fn find_or_create_node(&mut self, addr: &str) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Append an observation to a node. Returns `false` if an observation
    /// with the same time and signal already exists for the node.
    fn insert_data_point(
        &mut self,
        node_id: i64,
        data_point: &DataPoint,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Release the underlying handle
    fn close(self) -> impl Future<Output = ()> + Send;
}
