mod router;

pub use self::router::*;

cfg_if! { if #[cfg(feature = "templating")] {
    mod engine;
    pub use self::engine::*;
} }

use crate::query::SortDirection;
use crate::{Adapter, Error, Paginator, PaginatorConfig, Result, ScrollingStyle};
use ::derivative::Derivative;
use ::serde_json::{json, Map, Value};
use ::std::collections::HashMap;
use ::std::hash::BuildHasher;

pub type Params = Map<String, Value>;

/// Prefix of framework-internal request parameters.
pub static RESERVED_PARAMETER_PREFIX: &str = "_";
/// Request attribute naming the matched route.
pub static ROUTE_ATTRIBUTE: &str = "_route";

pub trait Engine {
    fn render(&self, template: &str, context: &Value) -> Result<String>;
}

pub trait Router {
    fn generate(&self, route: &str, params: &Params, absolute: bool) -> Result<String>;
}

pub trait Translator {
    fn trans(&self, key: &str) -> String;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        (**self).render(template, context)
    }
}

impl<R: Router + ?Sized> Router for &R {
    fn generate(&self, route: &str, params: &Params, absolute: bool) -> Result<String> {
        (**self).generate(route, params, absolute)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn trans(&self, key: &str) -> String {
        key.to_owned()
    }
}

impl<S: BuildHasher> Translator for HashMap<String, String, S> {
    fn trans(&self, key: &str) -> String {
        self.get(key).cloned().unwrap_or_else(|| key.to_owned())
    }
}

/// Route and parameters of the request being rendered.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RequestContext {
    route: Option<String>,
    params: Params,
}

impl RequestContext {
    pub fn new(route: Option<String>, params: Params) -> Self {
        Self {
            route,
            params: without_reserved(params),
        }
    }

    /// Query parameters merged with route attributes, attributes winning.
    /// The route comes from the `_route` attribute.
    pub fn from_request(query: Params, attributes: Params) -> Self {
        let route = attributes
            .get(ROUTE_ATTRIBUTE)
            .and_then(Value::as_str)
            .map(str::to_owned);
        let mut params = query;
        params.extend(attributes);
        Self::new(route, params)
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

fn without_reserved(params: Params) -> Params {
    params
        .into_iter()
        .filter(|(key, _)| !key.starts_with(RESERVED_PARAMETER_PREFIX))
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct PaginateOptions<'a> {
    /// Overrides the configured control template for this call.
    pub template: Option<&'a str>,
    pub custom: Params,
    pub route_params: Params,
    pub route: Option<&'a str>,
}

#[derive(Clone, Debug, Default)]
pub struct SortableOptions<'a> {
    /// Anchor attributes. `absolute` selects an absolute href and
    /// `{alias}direction` the initial direction of an unsorted column.
    pub link: Params,
    pub params: Params,
    pub route: Option<&'a str>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SortTitle {
    Text(String),
    ByDirection { asc: String, desc: String },
}

impl From<String> for SortTitle {
    fn from(title: String) -> Self {
        Self::Text(title)
    }
}

impl From<&str> for SortTitle {
    fn from(title: &str) -> Self {
        Self::Text(title.to_owned())
    }
}

impl SortTitle {
    pub fn for_direction(&self, direction: SortDirection) -> &str {
        match (self, direction) {
            (Self::Text(title), _) => title,
            (Self::ByDirection { asc, .. }, SortDirection::Asc) => asc,
            (Self::ByDirection { desc, .. }, SortDirection::Desc) => desc,
        }
    }
}

/// Renders pagination controls and sortable column links.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct PaginationHelper<E, R, T = IdentityTranslator> {
    #[derivative(Debug = "ignore")]
    engine: E,
    #[derivative(Debug = "ignore")]
    router: R,
    #[derivative(Debug = "ignore")]
    translator: T,
    template: String,
    sortable_template: String,
    scrolling_style: Box<dyn ScrollingStyle>,
}

impl<E: Engine, R: Router, T: Translator> PaginationHelper<E, R, T> {
    pub fn new(engine: E, router: R, translator: T) -> Self {
        Self::with_config(engine, router, translator, &PaginatorConfig::default())
    }

    pub fn with_config(engine: E, router: R, translator: T, config: &PaginatorConfig) -> Self {
        Self {
            engine,
            router,
            translator,
            template: config.template.clone(),
            sortable_template: config.sortable_template.clone(),
            scrolling_style: config.scrolling_style.style(),
        }
    }

    pub fn set_scrolling_style<S: ScrollingStyle + 'static>(&mut self, style: S) -> &mut Self {
        self.scrolling_style = Box::new(style);
        self
    }

    pub fn set_template(&mut self, template: impl Into<String>) -> &mut Self {
        self.template = template.into();
        self
    }

    pub fn set_sortable_template(&mut self, template: impl Into<String>) -> &mut Self {
        self.sortable_template = template.into();
        self
    }

    /// Renders the pagination control of `paginator`.
    ///
    /// Besides the [`Pages`](crate::Pages) fields the template receives `route`,
    /// `alias`, `query`, `custom`, `page_parameter`, `links`, `first_url`,
    /// `previous_url`, `next_url`, `last_url` and translated `labels`.
    pub fn paginate<A: Adapter>(
        &self,
        request: &RequestContext,
        paginator: &mut Paginator<A>,
        options: PaginateOptions<'_>,
    ) -> Result<String> {
        let route = options.route.or(request.route()).ok_or(Error::MissingRoute)?;
        let pages = paginator.get_pages(&*self.scrolling_style)?;
        let alias = paginator.alias().to_owned();

        let mut query = request.params().clone();
        query.extend(options.route_params);

        let page_parameter = format!("{alias}page");
        let url = |page: u64| -> Result<String> {
            let mut params = query.clone();
            params.insert(page_parameter.clone(), page.into());
            self.router.generate(route, &params, false)
        };

        let links = pages
            .pages_in_range
            .iter()
            .map(|&page| {
                Ok(json!({
                    "page": page,
                    "url": url(page)?,
                    "current": page == pages.current,
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        let has_pages = pages.page_count > 0;
        let first_url = has_pages.then(|| url(pages.first)).transpose()?;
        let last_url = has_pages.then(|| url(pages.last)).transpose()?;
        let previous_url = pages.previous.map(&url).transpose()?;
        let next_url = pages.next.map(&url).transpose()?;

        let mut context = match ::serde_json::to_value(&pages)? {
            Value::Object(context) => context,
            _ => Map::new(),
        };
        context.insert("route".into(), route.into());
        context.insert("alias".into(), alias.into());
        context.insert("query".into(), query.into());
        context.insert("custom".into(), options.custom.into());
        context.insert("page_parameter".into(), page_parameter.into());
        context.insert("links".into(), links.into());
        context.insert("first_url".into(), first_url.into());
        context.insert("previous_url".into(), previous_url.into());
        context.insert("next_url".into(), next_url.into());
        context.insert("last_url".into(), last_url.into());
        context.insert(
            "labels".into(),
            json!({
                "first": self.translator.trans("First"),
                "previous": self.translator.trans("Previous"),
                "next": self.translator.trans("Next"),
                "last": self.translator.trans("Last"),
            }),
        );

        let template = options.template.unwrap_or(&self.template);
        log::debug!("rendering pagination control `{template}` for route `{route}`");
        self.engine.render(template, &Value::Object(context))
    }

    /// Renders a link sorting `paginator` by `key`, e.g. `a.title`.
    ///
    /// Following the link of the active sort key flips its direction, a
    /// missing direction counting as descending. Any other key starts
    /// ascending unless `{alias}direction` is given in the link options.
    pub fn sortable<A: Adapter>(
        &self,
        request: &RequestContext,
        paginator: &Paginator<A>,
        title: impl Into<SortTitle>,
        key: &str,
        options: SortableOptions<'_>,
    ) -> Result<String> {
        let alias = paginator.alias();
        let route = options.route.or(request.route()).ok_or(Error::MissingRoute)?;
        let sort_parameter = format!("{alias}sort");
        let direction_parameter = format!("{alias}direction");

        let mut link = Params::new();
        link.insert("absolute".into(), false.into());
        link.extend(options.link);

        let mut params = request.params().clone();
        params.extend(options.params);

        let mut direction = link
            .remove(&direction_parameter)
            .as_ref()
            .and_then(Value::as_str)
            .map(SortDirection::from_param)
            .unwrap_or_default();

        let sorted = params.get(&sort_parameter).and_then(Value::as_str) == Some(key);
        let class = match sorted {
            true => {
                let current = params
                    .get(&direction_parameter)
                    .and_then(Value::as_str)
                    .map(SortDirection::from_param)
                    .unwrap_or(SortDirection::Desc);
                direction = current.reverse();
                current.as_str()
            }
            false => "sortable",
        };
        let class = match link.get("class").and_then(Value::as_str) {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_owned(),
        };
        link.insert("class".into(), class.into());

        let title = self.translator.trans(title.into().for_direction(direction));

        params.insert(sort_parameter, key.into());
        params.insert(direction_parameter, direction.as_str().into());

        let absolute = link
            .remove("absolute")
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or_default();
        let href = self.router.generate(route, &params, absolute)?;
        link.insert("href".into(), href.into());
        if !link.contains_key("title") {
            link.insert("title".into(), title.clone().into());
        }

        self.engine.render(
            &self.sortable_template,
            &json!({
                "options": link,
                "title": title,
            }),
        )
    }
}
