use ::page_adapter::{Adapter, Result};

/// Serves the numbers `1..=total`.
#[derive(Clone, Debug, Default)]
pub struct Numbers {
    pub total: u64,
}

impl Adapter for Numbers {
    type Item = u64;

    fn count(&mut self) -> Result<u64> {
        Ok(self.total)
    }

    fn get_items(&mut self, offset: u64, item_count_per_page: u64) -> Result<Vec<u64>> {
        Ok((offset + 1..=self.total).take(item_count_per_page as usize).collect())
    }
}

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
