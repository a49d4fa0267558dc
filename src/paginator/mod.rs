mod scrolling;

pub use self::scrolling::*;

use crate::{pagination_max_count, Adapter, PageOffset, PaginatorConfig, Result};

/// Page bounds and counters handed to pagination control templates.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pages {
    pub page_count: u64,
    pub item_count_per_page: u64,
    pub first: u64,
    pub current: u64,
    pub last: u64,
    pub previous: Option<u64>,
    pub next: Option<u64>,
    pub pages_in_range: Vec<u64>,
    pub first_page_in_range: Option<u64>,
    pub last_page_in_range: Option<u64>,
    pub current_item_count: u64,
    pub total_item_count: u64,
    pub first_item_number: u64,
    pub last_item_number: u64,
}

/// Splits an adapter's items into pages.
#[derive(Clone, Debug)]
pub struct Paginator<A> {
    adapter: A,
    current_page_number: u64,
    item_count_per_page: u64,
    page_range: u64,
}

impl<A: Adapter> Paginator<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, &PaginatorConfig::default())
    }

    pub fn with_config(adapter: A, config: &PaginatorConfig) -> Self {
        let mut paginator = Self {
            adapter,
            current_page_number: 1,
            item_count_per_page: 0,
            page_range: config.page_range,
        };
        paginator.set_item_count_per_page(config.item_count_per_page);
        paginator
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    pub fn alias(&self) -> &str {
        self.adapter.alias()
    }

    pub fn item_count_per_page(&self) -> u64 {
        self.item_count_per_page
    }

    /// Clamped into `1..=PAGINATION_MAX_COUNT` when the limit is configured.
    pub fn set_item_count_per_page(&mut self, item_count_per_page: u64) -> &mut Self {
        let mut count = item_count_per_page.max(1);
        if let Some(max) = *pagination_max_count() {
            if count > max {
                log::warn!("item count per page {count} exceeds PAGINATION_MAX_COUNT, using {max}");
                count = max;
            }
        }
        self.item_count_per_page = count.max(1);
        self
    }

    pub fn page_range(&self) -> u64 {
        self.page_range
    }

    pub fn set_page_range(&mut self, page_range: u64) -> &mut Self {
        self.page_range = page_range;
        self
    }

    /// The requested page number, as set. See [`Self::current_page_number`].
    pub fn requested_page_number(&self) -> u64 {
        self.current_page_number
    }

    pub fn set_current_page_number(&mut self, page_number: u64) -> &mut Self {
        self.current_page_number = page_number;
        self
    }

    pub fn total_item_count(&mut self) -> Result<u64> {
        self.adapter.count()
    }

    /// Number of pages.
    pub fn count(&mut self) -> Result<u64> {
        Ok(self.total_item_count()?.div_ceil(self.item_count_per_page))
    }

    pub fn normalize_page_number(&mut self, page_number: u64) -> Result<u64> {
        let page_count = self.count()?;
        Ok(page_number.clamp(1, page_count.max(1)))
    }

    pub fn current_page_number(&mut self) -> Result<u64> {
        self.normalize_page_number(self.current_page_number)
    }

    pub fn page_offset(&mut self) -> Result<PageOffset> {
        let page_number = self.current_page_number()?;
        Ok(PageOffset::for_page_number(self.item_count_per_page, page_number))
    }

    pub fn current_items(&mut self) -> Result<Vec<A::Item>> {
        let page = self.page_offset()?;
        self.adapter.get_items(page.offset(), page.count)
    }

    pub fn get_pages(&mut self, style: &dyn ScrollingStyle) -> Result<Pages> {
        let page_count = self.count()?;
        let total_item_count = self.total_item_count()?;
        let current = self.current_page_number()?;
        let page = PageOffset::for_page_number(self.item_count_per_page, current);

        let pages_in_range = style.pages_in_range(current, page_count, self.page_range);
        let current_item_count = total_item_count
            .saturating_sub(page.offset())
            .min(self.item_count_per_page);
        let first_item_number = match current_item_count {
            0 => 0,
            _ => page.offset() + 1,
        };

        Ok(Pages {
            page_count,
            item_count_per_page: self.item_count_per_page,
            first: 1,
            current,
            last: page_count,
            previous: (current > 1).then(|| current - 1),
            next: (current < page_count).then(|| current + 1),
            first_page_in_range: pages_in_range.iter().min().copied(),
            last_page_in_range: pages_in_range.iter().max().copied(),
            pages_in_range,
            current_item_count,
            total_item_count,
            first_item_number,
            last_item_number: (first_item_number + current_item_count).saturating_sub(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// Serves the numbers `1..=total`.
    #[derive(Clone, Debug, Default)]
    struct Numbers {
        total: u64,
        counted: usize,
    }

    impl Adapter for Numbers {
        type Item = u64;

        fn count(&mut self) -> Result<u64> {
            self.counted += 1;
            Ok(self.total)
        }

        fn get_items(&mut self, offset: u64, item_count_per_page: u64) -> Result<Vec<u64>> {
            Ok((offset + 1..=self.total).take(item_count_per_page as usize).collect())
        }

        fn alias(&self) -> &str {
            "n_"
        }
    }

    fn paginator(total: u64) -> Paginator<Numbers> {
        let mut paginator = Paginator::new(Numbers {
            total,
            ..Default::default()
        });
        paginator.set_item_count_per_page(10);
        paginator
    }

    #[test]
    fn pages_over_twenty_five_items() {
        let mut paginator = paginator(25);
        assert_eq!(paginator.count().unwrap(), 3);
        assert_eq!(paginator.current_items().unwrap(), (1..=10).collect::<Vec<_>>());

        paginator.set_current_page_number(3);
        assert_eq!(paginator.current_items().unwrap(), (21..=25).collect::<Vec<_>>());

        let pages = paginator.get_pages(&Sliding).unwrap();
        assert_eq!(
            pages,
            Pages {
                page_count: 3,
                item_count_per_page: 10,
                first: 1,
                current: 3,
                last: 3,
                previous: Some(2),
                next: None,
                pages_in_range: vec![1, 2, 3],
                first_page_in_range: Some(1),
                last_page_in_range: Some(3),
                current_item_count: 5,
                total_item_count: 25,
                first_item_number: 21,
                last_item_number: 25,
            }
        );
    }

    #[test]
    fn normalizes_out_of_range_page_numbers() {
        let mut paginator = paginator(25);
        paginator.set_current_page_number(9);
        assert_eq!(paginator.current_page_number().unwrap(), 3);
        paginator.set_current_page_number(0);
        assert_eq!(paginator.current_page_number().unwrap(), 1);
        assert_eq!(paginator.requested_page_number(), 0);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let mut paginator = paginator(0);
        let pages = paginator.get_pages(&Sliding).unwrap();
        assert_eq!(pages.page_count, 0);
        assert_eq!(pages.current, 1);
        assert_eq!(pages.previous, None);
        assert_eq!(pages.next, None);
        assert!(pages.pages_in_range.is_empty());
        assert_eq!(pages.first_item_number, 0);
        assert_eq!(pages.last_item_number, 0);
    }

    #[test]
    fn exposes_adapter_alias() {
        assert_eq!(paginator(1).alias(), "n_");
    }

    #[test]
    fn propagates_adapter_errors() {
        #[derive(Debug)]
        struct Unconfigured;

        impl Adapter for Unconfigured {
            type Item = ();

            fn count(&mut self) -> Result<u64> {
                Err(Error::InvalidState)
            }

            fn get_items(&mut self, _: u64, _: u64) -> Result<Vec<()>> {
                Err(Error::InvalidState)
            }
        }

        let mut paginator = Paginator::new(Unconfigured);
        assert!(matches!(paginator.get_pages(&Sliding), Err(Error::InvalidState)));
        assert!(matches!(paginator.current_items(), Err(Error::InvalidState)));
    }
}
