use crate::query::{
    add_custom_tree_walker, clone_query, hydrate, paginator_id_parameter, Connection, CountWalker, LimitSubqueryWalker,
    Query, Row, WhereInWalker, HINT_PAGINATOR_COUNT_DISTINCT, HINT_PAGINATOR_ID_COUNT,
};
use crate::{Adapter, Error, Result};
use ::derivative::Derivative;
use ::itertools::Itertools;
use ::serde::de::DeserializeOwned;
use ::serde_json::Value;
use ::std::marker::PhantomData;

/// Paginates a [`Query`] by executing it directly.
///
/// Cloning yields a blank template: the distinct flag and alias are kept,
/// the query and the cached row count are not.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct OrmAdapter<C, T = Value> {
    query: Option<Query<C>>,
    distinct: bool,
    alias: String,
    row_count: Option<u64>,
    #[derivative(Debug = "ignore")]
    _item: PhantomData<fn() -> T>,
}

impl<C, T> Default for OrmAdapter<C, T> {
    fn default() -> Self {
        Self {
            query: None,
            distinct: false,
            alias: String::new(),
            row_count: None,
            _item: PhantomData,
        }
    }
}

impl<C, T> Clone for OrmAdapter<C, T> {
    fn clone(&self) -> Self {
        Self {
            distinct: self.distinct,
            alias: self.alias.clone(),
            ..Default::default()
        }
    }
}

impl<C: Connection + Clone, T> OrmAdapter<C, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the query. A known `row_count` spares the count query.
    pub fn set_query(&mut self, query: Query<C>, row_count: Option<u64>) -> &mut Self {
        self.query = Some(query);
        self.row_count = row_count;
        self
    }

    pub fn query(&self) -> Option<&Query<C>> {
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

    /// Restricts the query to the given root identifiers.
    pub fn set_where_in<I, V>(&mut self, ids: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let query = self.query.as_ref().ok_or(Error::InvalidState)?;
        let ids = ids.into_iter().map(Into::into).collect_vec();
        self.query = Some(where_in_query(query, &ids));
        self.row_count = None;
        Ok(self)
    }
}

impl<C, T> Adapter for OrmAdapter<C, T>
where
    C: Connection + Clone,
    T: DeserializeOwned,
{
    type Item = T;

    fn count(&mut self) -> Result<u64> {
        if let Some(row_count) = self.row_count {
            return Ok(row_count);
        }
        let query = self.query.as_ref().ok_or(Error::InvalidState)?;
        let row_count = count_query(query, self.distinct)?;
        log::debug!("paginator `{}` counted {row_count} rows", self.alias);
        self.row_count = Some(row_count);
        Ok(row_count)
    }

    fn get_items(&mut self, offset: u64, item_count_per_page: u64) -> Result<Vec<T>> {
        let query = self.query.as_mut().ok_or(Error::InvalidState)?;
        fetch_items(query, self.distinct, offset, item_count_per_page)
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Counts the rows `query` would return, ignoring its window.
pub fn count_query<C: Connection + Clone>(query: &Query<C>, distinct: bool) -> Result<u64> {
    let mut count_query = clone_query(query);
    count_query.set_parameters(query.parameters().clone());
    add_custom_tree_walker(&mut count_query, CountWalker);
    count_query
        .set_hint(HINT_PAGINATOR_COUNT_DISTINCT, distinct)
        .set_first_result(None)
        .set_max_results(None);

    extract_count(count_query.get_array_result()?)
}

fn extract_count(rows: Vec<Row>) -> Result<u64> {
    // grouped counts yield one row per group
    if rows.len() > 1 {
        return Ok(rows.len() as u64);
    }
    let Some((_, value)) = rows.into_iter().next().and_then(|row| row.into_iter().next()) else {
        return Ok(0);
    };
    let count = match &value {
        Value::Number(number) => number.as_u64(),
        Value::String(string) => string.parse().ok(),
        _ => None,
    };
    count.ok_or(Error::UnexpectedCount(value))
}

/// Fetches one page of `query`.
///
/// In distinct mode the page is resolved in two steps: the distinct root
/// identifiers inside the window, then the entities carrying those
/// identifiers, returned in identifier order with one row per identifier.
pub fn fetch_items<C, T>(query: &mut Query<C>, distinct: bool, offset: u64, limit: u64) -> Result<Vec<T>>
where
    C: Connection + Clone,
    T: DeserializeOwned,
{
    if !distinct {
        query.set_first_result(Some(offset)).set_max_results(Some(limit));
        return query.get_result();
    }

    let mut limit_subquery = clone_query(query);
    limit_subquery.set_parameters(query.parameters().clone());
    add_custom_tree_walker(&mut limit_subquery, LimitSubqueryWalker);
    limit_subquery.set_first_result(Some(offset)).set_max_results(Some(limit));

    let ids = limit_subquery
        .get_scalar_result()?
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .collect_vec();
    log::debug!("distinct page at offset {offset} resolved {} identifiers", ids.len());
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut where_in = where_in_query(query, &ids);
    where_in.set_first_result(None).set_max_results(None);

    let root = &query.statement().from;
    let label = root.identifier_path().label();
    let position = |row: &Row| {
        row.get(&root.alias)
            .and_then(|entity| entity.get(&root.identifier))
            .or_else(|| row.get(&label))
            .and_then(|id| ids.iter().position(|candidate| candidate == id))
    };

    // one row per identifier, even when the select list fans out over joins
    where_in
        .get_array_result()?
        .into_iter()
        .filter_map(|row| Some((position(&row)?, row)))
        .sorted_by_key(|(position, _)| *position)
        .unique_by(|(position, _)| *position)
        .map(|(_, row)| hydrate(row))
        .collect()
}

/// A copy of `query` restricted to `ids`, bound as `pgid_1 ..= pgid_n`.
pub fn where_in_query<C: Connection + Clone>(query: &Query<C>, ids: &[Value]) -> Query<C> {
    let mut where_in = clone_query(query);
    add_custom_tree_walker(&mut where_in, WhereInWalker);
    where_in.set_hint(HINT_PAGINATOR_ID_COUNT, ids.len() as u64);
    for (index, id) in ids.iter().enumerate() {
        where_in.set_parameter(paginator_id_parameter(index + 1), id.clone());
    }
    where_in
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{
        Comparison, Condition, FieldPath, MemoryConnection, Operand, SelectExpr, SelectStatement, SortDirection,
    };
    use ::serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Article {
        id: u64,
        title: String,
    }

    fn articles(count: u64) -> MemoryConnection {
        MemoryConnection::new().with_table(
            "Article",
            (1..=count).map(|id| json!({ "id": id, "title": format!("article {id:02}") })),
        )
    }

    fn query(connection: &MemoryConnection) -> Query<MemoryConnection> {
        Query::new(
            connection.clone(),
            SelectStatement::new("Article", "a").order_by(FieldPath::new("a", "id"), SortDirection::Asc),
        )
    }

    /// Articles tagged several times, so joins produce duplicates.
    fn tagged() -> MemoryConnection {
        MemoryConnection::new().with_table(
            "Article",
            vec![
                json!({ "id": 1, "title": "one", "tags": [{ "name": "x" }, { "name": "y" }] }),
                json!({ "id": 2, "title": "two", "tags": [{ "name": "x" }] }),
                json!({ "id": 3, "title": "three", "tags": [{ "name": "x" }, { "name": "y" }, { "name": "z" }] }),
                json!({ "id": 4, "title": "four", "tags": [] }),
                json!({ "id": 5, "title": "five", "tags": [{ "name": "y" }] }),
            ],
        )
    }

    fn tagged_query(connection: &MemoryConnection) -> Query<MemoryConnection> {
        Query::new(
            connection.clone(),
            SelectStatement::new("Article", "a")
                .inner_join(FieldPath::new("a", "tags"), "t")
                .order_by(FieldPath::new("a", "title"), SortDirection::Desc),
        )
    }

    #[test]
    fn requires_query() {
        let mut adapter = OrmAdapter::<MemoryConnection, Article>::new();
        assert!(matches!(adapter.count(), Err(Error::InvalidState)));
        assert!(matches!(adapter.get_items(0, 10), Err(Error::InvalidState)));
        assert!(matches!(adapter.set_where_in(vec![1]), Err(Error::InvalidState)));
    }

    #[test]
    fn pages_through_twenty_five_rows() {
        let connection = articles(25);
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(query(&connection), None);

        assert_eq!(adapter.count().unwrap(), 25);

        let first = adapter.get_items(0, 10).unwrap();
        assert_eq!(first.iter().map(|article| article.id).collect_vec(), (1..=10).collect_vec());

        let last = adapter.get_items(20, 10).unwrap();
        assert_eq!(last.iter().map(|article| article.id).collect_vec(), (21..=25).collect_vec());
    }

    #[test]
    fn count_is_cached() {
        let connection = articles(3);
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(query(&connection), None);

        assert_eq!(adapter.count().unwrap(), 3);
        assert_eq!(adapter.count().unwrap(), 3);
        assert_eq!(connection.execution_count(), 1);
    }

    #[test]
    fn known_row_count_skips_counting() {
        let connection = articles(3);
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(query(&connection), Some(42));

        assert_eq!(adapter.count().unwrap(), 42);
        assert_eq!(connection.execution_count(), 0);
    }

    #[test]
    fn count_keeps_bound_parameters_and_drops_window() {
        let connection = articles(10);
        let mut query = Query::new(
            connection.clone(),
            SelectStatement::new("Article", "a")
                .filter(Condition::new(FieldPath::new("a", "id"), Comparison::Gt, Operand::parameter("min")))
                .order_by(FieldPath::new("a", "id"), SortDirection::Asc),
        );
        query.set_parameter("min", 4).set_first_result(Some(2)).set_max_results(Some(2));

        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(query, None);
        assert_eq!(adapter.count().unwrap(), 6);
        assert_eq!(
            connection.executed_statements(),
            vec!["SELECT COUNT(a.id) FROM Article a WHERE a.id > :min".to_owned()]
        );
    }

    #[test]
    fn clone_is_blank() {
        let connection = articles(3);
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(query(&connection), None).set_distinct(true).set_alias("a_");
        adapter.count().unwrap();

        let mut clone = adapter.clone();
        assert!(clone.query().is_none());
        assert!(clone.distinct());
        assert_eq!(clone.alias(), "a_");
        assert!(matches!(clone.count(), Err(Error::InvalidState)));
    }

    #[test]
    fn distinct_count_ignores_join_fan_out() {
        let connection = tagged();
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(tagged_query(&connection), None);
        assert_eq!(adapter.count().unwrap(), 7);

        let mut adapter = adapter.clone();
        adapter.set_query(tagged_query(&connection), None).set_distinct(true);
        assert_eq!(adapter.count().unwrap(), 4);
    }

    #[test]
    fn distinct_items_follow_identifier_order() {
        let connection = tagged();
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(tagged_query(&connection), None).set_distinct(true);

        // titles descending: two, three, one, five
        let page = adapter.get_items(0, 3).unwrap();
        assert_eq!(page.iter().map(|article| article.id).collect_vec(), vec![2, 3, 1]);

        let page = adapter.get_items(3, 3).unwrap();
        assert_eq!(page.iter().map(|article| article.id).collect_vec(), vec![5]);

        assert!(adapter.get_items(6, 3).unwrap().is_empty());
    }

    #[test]
    fn distinct_items_collapse_joined_columns() {
        #[derive(Debug, Deserialize)]
        struct TaggedArticle {
            a: Article,
            t_name: String,
        }

        let connection = tagged();
        let statement = SelectStatement::new("Article", "a")
            .select(vec![
                SelectExpr::Entity("a".into()),
                SelectExpr::Field(FieldPath::new("t", "name")),
            ])
            .inner_join(FieldPath::new("a", "tags"), "t")
            .order_by(FieldPath::new("a", "title"), SortDirection::Desc);
        let mut adapter = OrmAdapter::<_, TaggedArticle>::new();
        adapter
            .set_query(Query::new(connection.clone(), statement), None)
            .set_distinct(true);

        // "three" carries three tags, yet appears once
        let page = adapter.get_items(0, 2).unwrap();
        assert_eq!(page.iter().map(|row| row.a.id).collect_vec(), vec![2, 3]);
        assert_eq!(page[1].t_name, "x");
    }

    #[test]
    fn distinct_items_run_limit_subquery_then_where_in() {
        let connection = tagged();
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(tagged_query(&connection), None).set_distinct(true);
        adapter.get_items(1, 2).unwrap();

        assert_eq!(
            connection.executed_statements(),
            vec![
                "SELECT DISTINCT a.id FROM Article a INNER JOIN a.tags t ORDER BY a.title DESC".to_owned(),
                "SELECT DISTINCT a FROM Article a INNER JOIN a.tags t WHERE a.id IN (:pgid_1, :pgid_2) ORDER BY a.title DESC"
                    .to_owned(),
            ]
        );
    }

    #[test]
    fn where_in_replaces_query() {
        let connection = articles(10);
        let mut adapter = OrmAdapter::<_, Article>::new();
        adapter.set_query(query(&connection), Some(10));
        adapter.set_where_in(vec![7, 3, 9]).unwrap();

        let query = adapter.query().unwrap();
        assert_eq!(query.hint(HINT_PAGINATOR_ID_COUNT), Some(&json!(3)));
        assert_eq!(query.parameters().get("pgid_2"), Some(&json!(3)));

        assert_eq!(adapter.count().unwrap(), 3);
        let items = adapter.get_items(0, 10).unwrap();
        assert_eq!(items.iter().map(|article| article.id).collect_vec(), vec![3, 7, 9]);
    }

    #[test]
    fn count_accepts_numeric_strings_and_group_rows() {
        let row = |value: Value| {
            let mut row = Row::new();
            row.insert("count".into(), value);
            row
        };
        assert_eq!(extract_count(vec![row(json!("12"))]).unwrap(), 12);
        assert_eq!(extract_count(vec![row(json!(1)), row(json!(1)), row(json!(1))]).unwrap(), 3);
        assert_eq!(extract_count(vec![]).unwrap(), 0);
        assert!(matches!(
            extract_count(vec![row(json!("many"))]),
            Err(Error::UnexpectedCount(_))
        ));
    }
}
