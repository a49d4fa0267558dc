use ::std::cmp::Ordering;

/// A page addressed by its zero based `index` and item `count`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct PageOffset {
    pub count: u64,
    pub index: u64,
}

impl PageOffset {
    pub fn with_count(count: u64) -> Self {
        Self { count, index: 0 }
    }

    /// Page for a one based page number.
    pub fn for_page_number(count: u64, page_number: u64) -> Self {
        Self {
            count,
            index: page_number.saturating_sub(1),
        }
    }

    /// Number of items preceding this page.
    pub fn offset(&self) -> u64 {
        self.index.saturating_mul(self.count)
    }

    pub fn page_number(&self) -> u64 {
        self.index + 1
    }
}

impl Ord for PageOffset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index).then(self.count.cmp(&other.count))
    }
}

impl PartialOrd for PageOffset {
    fn partial_cmp(&self, rhs: &Self) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}
