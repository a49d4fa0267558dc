use ::page_adapter::query::{FieldPath, MemoryConnection, Query, SelectStatement, SortDirection};
use ::page_adapter::templating::{
    IdentityTranslator, MiniJinjaEngine, PaginateOptions, PaginationHelper, Params, RequestContext, RouteTable,
    SortableOptions, ROUTE_ATTRIBUTE,
};
use ::page_adapter::{
    Adapter, Error, EventAdapter, EventDispatcher, OrmAdapter, OrmListener, Paginator, Sliding,
};
use ::serde::Deserialize;
use ::serde_json::{json, Value};
use ::std::sync::Arc;

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct Article {
    id: u64,
    title: String,
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn connection() -> MemoryConnection {
    MemoryConnection::new().with_table(
        "Article",
        (1..=25).map(|id| json!({ "id": id, "title": format!("article {id:02}") })),
    )
}

fn articles(connection: &MemoryConnection) -> Query<MemoryConnection> {
    Query::new(
        connection.clone(),
        SelectStatement::new("Article", "a").order_by(FieldPath::new("a", "id"), SortDirection::Asc),
    )
}

fn request(query: Value) -> RequestContext {
    let query = match query {
        Value::Object(query) => query,
        _ => Params::new(),
    };
    let mut attributes = Params::new();
    attributes.insert(ROUTE_ATTRIBUTE.into(), "article_list".into());
    RequestContext::from_request(query, attributes)
}

fn helper() -> PaginationHelper<MiniJinjaEngine, RouteTable> {
    PaginationHelper::new(
        MiniJinjaEngine::new().unwrap(),
        RouteTable::new().with_route("article_list", "/articles"),
        IdentityTranslator,
    )
}

#[test]
fn orm_adapter_pages_through_a_listing() {
    init();
    let connection = connection();
    let mut adapter = OrmAdapter::<_, Article>::new();
    adapter.set_query(articles(&connection), None);

    let mut paginator = Paginator::new(adapter);
    paginator.set_item_count_per_page(10).set_current_page_number(3);

    let items = paginator.current_items().unwrap();
    assert_eq!(items.iter().map(|article| article.id).collect::<Vec<_>>(), vec![21, 22, 23, 24, 25]);

    let pages = paginator.get_pages(&Sliding).unwrap();
    assert_eq!(pages.page_count, 3);
    assert_eq!(pages.previous, Some(2));
    assert_eq!(pages.next, None);
    assert_eq!(pages.first_item_number, 21);
    assert_eq!(pages.last_item_number, 25);
}

#[test]
fn event_adapter_needs_a_listener() {
    init();
    let connection = connection();
    let mut adapter = EventAdapter::<Query<MemoryConnection>, Article>::new(Arc::new(EventDispatcher::new()));
    adapter.set_query(articles(&connection), None);
    assert!(matches!(adapter.count(), Err(Error::UnhandledEvent(_))));

    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_listener(OrmListener, 0);
    let mut adapter = EventAdapter::<Query<MemoryConnection>, Article>::new(Arc::new(dispatcher));
    adapter.set_query(articles(&connection), None);
    assert_eq!(adapter.count().unwrap(), 25);
    assert_eq!(adapter.get_items(10, 2).unwrap().iter().map(|article| article.id).collect::<Vec<_>>(), vec![11, 12]);
}

#[test]
fn renders_control_and_sortable_links() {
    init();
    let connection = connection();
    let mut adapter = OrmAdapter::<_, Article>::new();
    adapter.set_query(articles(&connection), None);
    let mut paginator = Paginator::new(adapter);
    paginator.set_item_count_per_page(10).set_current_page_number(2);

    let helper = helper();
    let request = request(json!({ "page": 2, "sort": "a.title", "direction": "asc" }));

    let control = helper
        .paginate(&request, &mut paginator, PaginateOptions::default())
        .unwrap();
    assert!(control.contains(r#"<span class="current">2</span>"#));
    assert!(control.contains("articles?page=1&amp;sort=a.title&amp;direction=asc"));
    assert!(control.contains("articles?page=3&amp;sort=a.title&amp;direction=asc"));

    let active = helper
        .sortable(&request, &paginator, "Title", "a.title", SortableOptions::default())
        .unwrap();
    assert!(active.contains(r#"class="asc""#));
    assert!(active.contains("direction=desc"));

    let other = helper
        .sortable(&request, &paginator, "Id", "a.id", SortableOptions::default())
        .unwrap();
    assert!(other.contains(r#"class="sortable""#));
    assert!(other.contains("sort=a.id&amp;direction=asc"));
}

#[test]
fn control_needs_a_route() {
    init();
    let mut paginator = Paginator::new(OrmAdapter::<MemoryConnection, Article>::new());
    let request = RequestContext::new(None, Params::new());
    assert!(matches!(
        helper().paginate(&request, &mut paginator, PaginateOptions::default()),
        Err(Error::MissingRoute)
    ));
}
