use crate::adapter::{count_query, fetch_items};
use crate::query::{clone_query, Connection, Query};
use crate::{Adapter, Error, Result};
use ::derivative::Derivative;
use ::serde::de::DeserializeOwned;
use ::serde_json::Value;
use ::std::collections::BTreeMap;
use ::std::sync::Arc;

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, IsVariant, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerKind {
    #[display(fmt = "orm")]
    Orm,
    #[display(fmt = "odm")]
    Odm,
    #[display(fmt = "{}", _0)]
    Other(String),
}

impl From<&str> for ListenerKind {
    fn from(kind: &str) -> Self {
        match kind {
            "orm" => Self::Orm,
            "odm" => Self::Odm,
            other => Self::Other(other.to_owned()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ListenerService {
    pub service_id: String,
    pub priority: i32,
}

#[derive(Debug)]
pub struct CountEvent<'a, Q> {
    query: &'a Q,
    distinct: bool,
    alias: &'a str,
    count: Option<u64>,
    propagation_stopped: bool,
}

impl<'a, Q> CountEvent<'a, Q> {
    pub const NAME: &'static str = "paginator.count";

    pub fn new(query: &'a Q, distinct: bool, alias: &'a str) -> Self {
        Self {
            query,
            distinct,
            alias,
            count: None,
            propagation_stopped: false,
        }
    }

    pub fn query(&self) -> &'a Q {
        self.query
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn alias(&self) -> &'a str {
        self.alias
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn set_count(&mut self, count: u64) {
        self.count = Some(count);
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Debug)]
pub struct ItemsEvent<'a, Q, T> {
    query: &'a Q,
    distinct: bool,
    alias: &'a str,
    offset: u64,
    item_count_per_page: u64,
    items: Option<Vec<T>>,
    propagation_stopped: bool,
}

impl<'a, Q, T> ItemsEvent<'a, Q, T> {
    pub const NAME: &'static str = "paginator.items";

    pub fn new(query: &'a Q, distinct: bool, offset: u64, item_count_per_page: u64, alias: &'a str) -> Self {
        Self {
            query,
            distinct,
            alias,
            offset,
            item_count_per_page,
            items: None,
            propagation_stopped: false,
        }
    }

    pub fn query(&self) -> &'a Q {
        self.query
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn alias(&self) -> &'a str {
        self.alias
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn item_count_per_page(&self) -> u64 {
        self.item_count_per_page
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = Some(items);
    }

    pub fn take_items(&mut self) -> Option<Vec<T>> {
        self.items.take()
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Handles pagination events. A listener claims an event by depositing a
/// result and stopping its propagation; leaving it untouched passes it on.
pub trait PaginationListener<Q, T> {
    fn on_count(&self, _event: &mut CountEvent<'_, Q>) -> Result<()> {
        Ok(())
    }

    fn on_items(&self, _event: &mut ItemsEvent<'_, Q, T>) -> Result<()> {
        Ok(())
    }
}

/// Listeners ordered by descending priority, registration order among equals.
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Default(bound = ""))]
pub struct EventDispatcher<Q, T> {
    #[derivative(Debug = "ignore")]
    listeners: Vec<(i32, Arc<dyn PaginationListener<Q, T> + Send + Sync>)>,
}

impl<Q, T> EventDispatcher<Q, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<L>(&mut self, listener: L, priority: i32) -> &mut Self
    where
        L: PaginationListener<Q, T> + Send + Sync + 'static,
    {
        let index = self
            .listeners
            .iter()
            .position(|(existing, _)| *existing < priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(index, (priority, Arc::new(listener)));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn dispatch_count(&self, event: &mut CountEvent<'_, Q>) -> Result<()> {
        for (priority, listener) in &self.listeners {
            log::trace!("dispatching {} to listener with priority {priority}", CountEvent::<Q>::NAME);
            listener.on_count(event)?;
            if event.is_propagation_stopped() {
                break;
            }
        }
        Ok(())
    }

    pub fn dispatch_items(&self, event: &mut ItemsEvent<'_, Q, T>) -> Result<()> {
        for (priority, listener) in &self.listeners {
            log::trace!("dispatching {} to listener with priority {priority}", ItemsEvent::<Q, T>::NAME);
            listener.on_items(event)?;
            if event.is_propagation_stopped() {
                break;
            }
        }
        Ok(())
    }
}

/// Paginates by dispatching events, leaving data access to listeners.
///
/// Cloning keeps the dispatcher, listener services, distinct flag and alias,
/// and drops the query and cached row count.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct EventAdapter<Q, T = Value> {
    dispatcher: Arc<EventDispatcher<Q, T>>,
    listener_services: BTreeMap<ListenerKind, Vec<ListenerService>>,
    #[derivative(Debug = "ignore")]
    query: Option<Q>,
    distinct: bool,
    alias: String,
    row_count: Option<u64>,
}

impl<Q, T> Clone for EventAdapter<Q, T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            listener_services: self.listener_services.clone(),
            query: None,
            distinct: self.distinct,
            alias: self.alias.clone(),
            row_count: None,
        }
    }
}

impl<Q, T> EventAdapter<Q, T> {
    pub fn new(dispatcher: Arc<EventDispatcher<Q, T>>) -> Self {
        Self {
            dispatcher,
            listener_services: Default::default(),
            query: None,
            distinct: true,
            alias: String::new(),
            row_count: None,
        }
    }

    pub fn dispatcher(&self) -> &EventDispatcher<Q, T> {
        &self.dispatcher
    }

    pub fn set_query(&mut self, query: Q, row_count: Option<u64>) -> &mut Self {
        self.query = Some(query);
        self.row_count = row_count;
        self
    }

    pub fn query(&self) -> Option<&Q> {
        self.query.as_ref()
    }

    pub fn set_distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn distinct(&self) -> bool {
        self.distinct
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.alias = alias.into();
        self
    }

    /// Records a listener service for the hosting application's wiring.
    /// Dispatch does not consult it.
    pub fn add_listener_service(
        &mut self,
        service_id: impl Into<String>,
        kind: impl Into<ListenerKind>,
        priority: i32,
    ) -> &mut Self {
        self.listener_services
            .entry(kind.into())
            .or_default()
            .push(ListenerService {
                service_id: service_id.into(),
                priority,
            });
        self
    }

    pub fn listener_services(&self, kind: &ListenerKind) -> &[ListenerService] {
        self.listener_services.get(kind).map(Vec::as_slice).unwrap_or_default()
    }
}

impl<Q, T> Adapter for EventAdapter<Q, T> {
    type Item = T;

    fn count(&mut self) -> Result<u64> {
        if let Some(row_count) = self.row_count {
            return Ok(row_count);
        }
        let query = self.query.as_ref().ok_or(Error::InvalidState)?;

        let mut event = CountEvent::new(query, self.distinct, &self.alias);
        self.dispatcher.dispatch_count(&mut event)?;
        let row_count = match (event.is_propagation_stopped(), event.count()) {
            (true, Some(count)) => count,
            _ => return Err(Error::UnhandledEvent(CountEvent::<Q>::NAME)),
        };

        self.row_count = Some(row_count);
        Ok(row_count)
    }

    fn get_items(&mut self, offset: u64, item_count_per_page: u64) -> Result<Vec<T>> {
        let query = self.query.as_ref().ok_or(Error::InvalidState)?;

        let mut event = ItemsEvent::new(query, self.distinct, offset, item_count_per_page, &self.alias);
        self.dispatcher.dispatch_items(&mut event)?;
        match event.is_propagation_stopped() {
            true => event.take_items().ok_or(Error::UnhandledEvent(ItemsEvent::<Q, T>::NAME)),
            false => Err(Error::UnhandledEvent(ItemsEvent::<Q, T>::NAME)),
        }
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Resolves events carrying a [`Query`] by executing it.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrmListener;

impl OrmListener {
    pub fn kind() -> ListenerKind {
        ListenerKind::Orm
    }
}

impl<C, T> PaginationListener<Query<C>, T> for OrmListener
where
    C: Connection + Clone,
    T: DeserializeOwned,
{
    fn on_count(&self, event: &mut CountEvent<'_, Query<C>>) -> Result<()> {
        event.set_count(count_query(event.query(), event.is_distinct())?);
        event.stop_propagation();
        Ok(())
    }

    fn on_items(&self, event: &mut ItemsEvent<'_, Query<C>, T>) -> Result<()> {
        let mut query = clone_query(event.query());
        let items = fetch_items(&mut query, event.is_distinct(), event.offset(), event.item_count_per_page())?;
        event.set_items(items);
        event.stop_propagation();
        Ok(())
    }
}
