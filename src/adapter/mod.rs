mod event;
mod orm;

pub use self::event::*;
pub use self::orm::*;

use crate::Result;

/// Bridges a [`Paginator`](crate::Paginator) to a data source.
pub trait Adapter {
    type Item;

    /// Total number of items.
    fn count(&mut self) -> Result<u64>;

    fn get_items(&mut self, offset: u64, item_count_per_page: u64) -> Result<Vec<Self::Item>>;

    /// Prefix for request parameters, so several paginators can share one request.
    fn alias(&self) -> &str {
        ""
    }
}
