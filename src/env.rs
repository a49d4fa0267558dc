use crate::{Error, Result, ScrollingStyleName};
use ::std::str::FromStr;

pub static DEFAULT_TEMPLATE: &str = "pagination/sliding.html";
pub static DEFAULT_SORTABLE_TEMPLATE: &str = "pagination/sortable_link.html";

/// Upper bound for items per page, read once from `PAGINATION_MAX_COUNT`.
/// Zero and unparsable values are ignored.
pub fn pagination_max_count() -> &'static Option<u64> {
    use std::sync::OnceLock;
    static PAGINATION_MAX_COUNT: OnceLock<Option<u64>> = OnceLock::new();
    PAGINATION_MAX_COUNT.get_or_init(|| match parse_var::<u64>("PAGINATION_MAX_COUNT") {
        Ok(Some(0)) => {
            log::warn!("ignoring PAGINATION_MAX_COUNT: must be at least 1");
            None
        }
        Ok(count) => count,
        Err(err) => {
            log::warn!("ignoring PAGINATION_MAX_COUNT: {err}");
            None
        }
    })
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PaginatorConfig {
    pub item_count_per_page: u64,
    pub page_range: u64,
    pub scrolling_style: ScrollingStyleName,
    pub template: String,
    pub sortable_template: String,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            item_count_per_page: 10,
            page_range: 10,
            scrolling_style: ScrollingStyleName::Sliding,
            template: DEFAULT_TEMPLATE.to_owned(),
            sortable_template: DEFAULT_SORTABLE_TEMPLATE.to_owned(),
        }
    }
}

impl PaginatorConfig {
    /// Defaults overridden by `PAGINATION_ITEM_COUNT_PER_PAGE`, `PAGINATION_PAGE_RANGE`,
    /// `PAGINATION_SCROLLING_STYLE`, `PAGINATION_TEMPLATE` and `PAGINATION_SORTABLE_TEMPLATE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(count) = parse(&lookup, "PAGINATION_ITEM_COUNT_PER_PAGE")? {
            config.item_count_per_page = count;
        }
        if let Some(range) = parse(&lookup, "PAGINATION_PAGE_RANGE")? {
            config.page_range = range;
        }
        if let Some(style) = parse(&lookup, "PAGINATION_SCROLLING_STYLE")? {
            config.scrolling_style = style;
        }
        if let Some(template) = lookup("PAGINATION_TEMPLATE") {
            config.template = template;
        }
        if let Some(template) = lookup("PAGINATION_SORTABLE_TEMPLATE") {
            config.sortable_template = template;
        }
        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>>
where
    T::Err: ToString,
{
    let lookup = |key: &'static str| std::env::var(key).ok();
    parse(&lookup, key)
}

fn parse<T: FromStr>(lookup: &impl Fn(&'static str) -> Option<String>, key: &'static str) -> Result<Option<T>>
where
    T::Err: ToString,
{
    lookup(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|err| Error::Config {
                key,
                message: err.to_string(),
            })
        })
        .transpose()
}
