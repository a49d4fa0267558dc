use crate::Error;
use ::itertools::Itertools;
use ::std::fmt::Debug;
use ::std::str::FromStr;

/// Chooses which page numbers a pagination control displays.
pub trait ScrollingStyle: Debug + Send + Sync {
    fn pages_in_range(&self, current_page_number: u64, page_count: u64, page_range: u64) -> Vec<u64>;
}

/// Every page.
#[derive(Clone, Copy, Debug, Default)]
pub struct All;

/// Like [`Sliding`], but the range grows as the current page moves away from the edges.
#[derive(Clone, Copy, Debug, Default)]
pub struct Elastic;

/// Fixed blocks of `page_range` pages; the range jumps once the current page leaves it.
#[derive(Clone, Copy, Debug, Default)]
pub struct Jumping;

/// Keeps the current page centered while possible.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sliding;

impl ScrollingStyle for All {
    fn pages_in_range(&self, _: u64, page_count: u64, _: u64) -> Vec<u64> {
        (1..=page_count).collect_vec()
    }
}

impl ScrollingStyle for Elastic {
    fn pages_in_range(&self, current_page_number: u64, page_count: u64, page_range: u64) -> Vec<u64> {
        let original = signed(page_range);
        let current = signed(current_page_number);
        let count = signed(page_count);

        let mut range = original.saturating_mul(2).saturating_sub(1);
        let reach = original.saturating_add(current).saturating_sub(1);
        if reach < range {
            range = reach;
        } else if reach > count {
            range = original.saturating_add(count).saturating_sub(current);
        }
        sliding(current, count, range.max(0))
    }
}

impl ScrollingStyle for Jumping {
    fn pages_in_range(&self, current_page_number: u64, page_count: u64, page_range: u64) -> Vec<u64> {
        let range = signed(page_range.max(1));
        let current = signed(current_page_number);

        let delta = match current % range {
            0 => range,
            delta => delta,
        };
        let offset = current - delta;
        pages_between(offset.saturating_add(1), offset.saturating_add(range), signed(page_count))
    }
}

impl ScrollingStyle for Sliding {
    fn pages_in_range(&self, current_page_number: u64, page_count: u64, page_range: u64) -> Vec<u64> {
        sliding(signed(current_page_number), signed(page_count), signed(page_range))
    }
}

fn sliding(current: i64, count: i64, range: i64) -> Vec<u64> {
    let range = range.min(count);
    let mut delta = range.saturating_add(1) / 2;

    let (lower, upper) = if current - delta > count - range {
        (count - range + 1, count)
    } else {
        if current - delta < 0 {
            delta = current;
        }
        let offset = current - delta;
        (offset + 1, offset.saturating_add(range))
    };
    pages_between(lower, upper, count)
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Page numbers in `lower..=upper`, with both bounds clamped into `1..=count`.
fn pages_between(lower: i64, upper: i64, count: i64) -> Vec<u64> {
    if count < 1 || lower > upper {
        return vec![];
    }
    (lower.clamp(1, count)..=upper.clamp(1, count))
        .map(|page| page as u64)
        .collect_vec()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollingStyleName {
    #[display(fmt = "all")]
    All,
    #[display(fmt = "elastic")]
    Elastic,
    #[display(fmt = "jumping")]
    Jumping,
    #[default]
    #[display(fmt = "sliding")]
    Sliding,
}

impl ScrollingStyleName {
    pub fn style(self) -> Box<dyn ScrollingStyle> {
        match self {
            Self::All => Box::new(All),
            Self::Elastic => Box::new(Elastic),
            Self::Jumping => Box::new(Jumping),
            Self::Sliding => Box::new(Sliding),
        }
    }
}

impl FromStr for ScrollingStyleName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "elastic" => Ok(Self::Elastic),
            "jumping" => Ok(Self::Jumping),
            "sliding" => Ok(Self::Sliding),
            other => Err(Error::Config {
                key: "PAGINATION_SCROLLING_STYLE",
                message: format!("unknown scrolling style `{other}`"),
            }),
        }
    }
}
