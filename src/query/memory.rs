use crate::query::{
    Comparison, Condition, Connection, FieldPath, Join, JoinKind, Operand, Parameters, Row, SelectExpr,
    SelectStatement, SortDirection, Window,
};
use crate::{Error, Result};
use ::itertools::Itertools;
use ::serde_json::{Map, Value};
use ::std::cmp::Ordering;
use ::std::collections::HashMap;
use ::std::sync::{Arc, Mutex};

type Tuple = Map<String, Value>;

/// Executes statements against in-memory entity tables.
///
/// Each table is a list of JSON objects. Associations are plain fields holding
/// an object or an array of objects; joining an array fans the row out once
/// per element.
#[derive(Clone, Debug, Default)]
pub struct MemoryConnection {
    tables: Arc<HashMap<String, Vec<Value>>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, entity: impl Into<String>, rows: impl IntoIterator<Item = Value>) -> Self {
        Arc::make_mut(&mut self.tables).insert(entity.into(), rows.into_iter().collect());
        self
    }

    /// Number of statements executed through this connection or any of its clones.
    pub fn execution_count(&self) -> usize {
        self.journal().len()
    }

    pub fn executed_statements(&self) -> Vec<String> {
        self.journal().clone()
    }

    fn journal(&self) -> ::std::sync::MutexGuard<'_, Vec<String>> {
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

enum Resolved {
    Scalar(Value),
    List(Vec<Value>),
}

impl Connection for MemoryConnection {
    fn execute(&self, statement: &SelectStatement, parameters: &Parameters, window: Window) -> Result<Vec<Row>> {
        self.journal().push(statement.to_string());
        validate_aliases(statement)?;

        let entities = self
            .tables
            .get(&statement.from.entity)
            .ok_or_else(|| Error::UnknownEntity(statement.from.entity.clone()))?;

        let mut tuples = entities
            .iter()
            .map(|entity| {
                let mut tuple = Tuple::new();
                tuple.insert(statement.from.alias.clone(), entity.clone());
                tuple
            })
            .collect_vec();

        for join in &statement.joins {
            tuples = fan_out(tuples, join);
        }

        let conditions = statement
            .conditions
            .iter()
            .map(|condition| Ok((condition, resolve(&condition.operand, parameters)?)))
            .collect::<Result<Vec<_>>>()?;
        tuples.retain(|tuple| {
            conditions
                .iter()
                .all(|(condition, operand)| matches_condition(tuple, condition, operand))
        });

        tuples.sort_by(|a, b| {
            statement
                .order_by
                .iter()
                .map(|order_by| {
                    let ordering = sort_order(&field_value(a, &order_by.field), &field_value(b, &order_by.field));
                    match order_by.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let rows = project(statement, tuples)?;
        let rows = match statement.distinct {
            true => rows
                .into_iter()
                .unique_by(|row| Value::Object(row.clone()).to_string())
                .collect_vec(),
            false => rows,
        };

        let skip = window.first_result.unwrap_or_default() as usize;
        Ok(match window.max_results {
            Some(max_results) => rows.into_iter().skip(skip).take(max_results as usize).collect_vec(),
            None => rows.into_iter().skip(skip).collect_vec(),
        })
    }
}

fn validate_aliases(statement: &SelectStatement) -> Result<()> {
    let declared = statement.aliases().collect_vec();
    let check = |alias: &str| match declared.contains(&alias) {
        true => Ok(()),
        false => Err(Error::UnknownAlias(alias.to_owned())),
    };

    for join in &statement.joins {
        check(&join.association.alias)?;
    }
    for expr in &statement.select {
        match expr {
            SelectExpr::Entity(alias) => check(alias)?,
            SelectExpr::Field(field) | SelectExpr::Count { field, .. } => check(&field.alias)?,
        }
    }
    for condition in &statement.conditions {
        check(&condition.field.alias)?;
    }
    for order_by in &statement.order_by {
        check(&order_by.field.alias)?;
    }
    Ok(())
}

fn fan_out(tuples: Vec<Tuple>, join: &Join) -> Vec<Tuple> {
    let mut joined = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        let related = match field_value(&tuple, &join.association) {
            Value::Array(items) => items,
            Value::Null => vec![],
            item => vec![item],
        };
        if related.is_empty() {
            if join.kind == JoinKind::Left {
                let mut tuple = tuple;
                tuple.insert(join.alias.clone(), Value::Null);
                joined.push(tuple);
            }
            continue;
        }
        for item in related {
            let mut tuple = tuple.clone();
            tuple.insert(join.alias.clone(), item);
            joined.push(tuple);
        }
    }
    joined
}

fn resolve(operand: &Operand, parameters: &Parameters) -> Result<Resolved> {
    Ok(match operand {
        Operand::Parameter(name) => match parameters.get(name) {
            Some(Value::Array(values)) => Resolved::List(values.clone()),
            Some(value) => Resolved::Scalar(value.clone()),
            None => return Err(Error::MissingParameter(name.clone())),
        },
        Operand::Literal(value) => Resolved::Scalar(value.clone()),
        Operand::List(operands) => {
            let mut values = Vec::with_capacity(operands.len());
            for operand in operands {
                match resolve(operand, parameters)? {
                    Resolved::Scalar(value) => values.push(value),
                    Resolved::List(list) => values.extend(list),
                }
            }
            Resolved::List(values)
        }
    })
}

fn field_value(tuple: &Tuple, path: &FieldPath) -> Value {
    tuple
        .get(&path.alias)
        .and_then(|entity| entity.get(&path.field))
        .cloned()
        .unwrap_or(Value::Null)
}

fn matches_condition(tuple: &Tuple, condition: &Condition, operand: &Resolved) -> bool {
    let value = field_value(tuple, &condition.field);
    if value.is_null() {
        return false;
    }
    let ordering = |other: &Value| compare(&value, other);
    match (condition.comparison, operand) {
        (Comparison::In, Resolved::List(values)) => values.iter().any(|other| ordering(other).is_some_and(Ordering::is_eq)),
        (Comparison::In, Resolved::Scalar(other)) => ordering(other).is_some_and(Ordering::is_eq),
        (_, Resolved::List(_)) => false,
        (comparison, Resolved::Scalar(other)) => match ordering(other) {
            None => false,
            Some(ordering) => match comparison {
                Comparison::Eq | Comparison::In => ordering.is_eq(),
                Comparison::Neq => ordering.is_ne(),
                Comparison::Lt => ordering.is_lt(),
                Comparison::Lte => ordering.is_le(),
                Comparison::Gt => ordering.is_gt(),
                Comparison::Gte => ordering.is_ge(),
            },
        },
    }
}

/// SQL-like comparison: `None` when either side is null or the types differ.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order used by ORDER BY, nulls first.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    compare(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}

fn project(statement: &SelectStatement, tuples: Vec<Tuple>) -> Result<Vec<Row>> {
    let aggregates = statement
        .select
        .iter()
        .filter(|expr| matches!(expr, SelectExpr::Count { .. }))
        .count();

    if aggregates > 0 {
        let [SelectExpr::Count { field, distinct }] = statement.select.as_slice() else {
            return Err(Error::Unsupported(format!(
                "cannot mix aggregates with other select expressions without grouping: {statement}"
            )));
        };
        let values = tuples
            .iter()
            .map(|tuple| field_value(tuple, field))
            .filter(|value| !value.is_null());
        let count = match distinct {
            true => values.unique_by(|value| value.to_string()).count(),
            false => values.count(),
        };
        let mut row = Row::new();
        row.insert(statement.select[0].label(), Value::from(count as u64));
        return Ok(vec![row]);
    }

    Ok(tuples
        .iter()
        .map(|tuple| {
            statement
                .select
                .iter()
                .map(|expr| {
                    let value = match expr {
                        SelectExpr::Entity(alias) => tuple.get(alias).cloned().unwrap_or(Value::Null),
                        SelectExpr::Field(field) => field_value(tuple, field),
                        SelectExpr::Count { .. } => Value::Null,
                    };
                    (expr.label(), value)
                })
                .collect::<Row>()
        })
        .collect_vec())
}
