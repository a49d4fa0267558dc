mod ast;
mod helper;
mod memory;
mod walker;

pub use self::ast::*;
pub use self::helper::*;
pub use self::memory::*;
pub use self::walker::*;

use crate::{Error, Result};
use ::derivative::Derivative;
use ::itertools::Itertools;
use ::serde::de::DeserializeOwned;
use ::serde_json::{Map, Value};

pub type Parameters = Map<String, Value>;
pub type Hints = Map<String, Value>;
/// One result row, keyed by select expression label in select order.
pub type Row = Map<String, Value>;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Window {
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
}

pub trait Connection {
    fn execute(&self, statement: &SelectStatement, parameters: &Parameters, window: Window) -> Result<Vec<Row>>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute(&self, statement: &SelectStatement, parameters: &Parameters, window: Window) -> Result<Vec<Row>> {
        (**self).execute(statement, parameters, window)
    }
}

impl<C: Connection + ?Sized> Connection for ::std::sync::Arc<C> {
    fn execute(&self, statement: &SelectStatement, parameters: &Parameters, window: Window) -> Result<Vec<Row>> {
        (**self).execute(statement, parameters, window)
    }
}

/// A select query bound to a connection. Cloning yields an independent copy:
/// statement, parameters, hints and tree walkers are not shared.
#[derive(Clone, Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Query<C> {
    statement: SelectStatement,
    parameters: Parameters,
    hints: Hints,
    tree_walkers: Vec<Box<dyn TreeWalker>>,
    window: Window,
    #[derivative(Debug = "ignore")]
    connection: C,
}

impl<C> Query<C> {
    pub fn new(connection: C, statement: SelectStatement) -> Self {
        Self {
            statement,
            parameters: Default::default(),
            hints: Default::default(),
            tree_walkers: vec![],
            window: Default::default(),
            connection,
        }
    }

    pub fn statement(&self) -> &SelectStatement {
        &self.statement
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Parameters) -> &mut Self {
        self.parameters = parameters;
        self
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn hint(&self, name: &str) -> Option<&Value> {
        self.hints.get(name)
    }

    pub fn set_hint(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.hints.insert(name.into(), value.into());
        self
    }

    pub fn tree_walkers(&self) -> &[Box<dyn TreeWalker>] {
        &self.tree_walkers
    }

    pub(crate) fn push_tree_walker(&mut self, walker: Box<dyn TreeWalker>) {
        self.tree_walkers.push(walker);
    }

    pub fn first_result(&self) -> Option<u64> {
        self.window.first_result
    }

    pub fn set_first_result(&mut self, first_result: Option<u64>) -> &mut Self {
        self.window.first_result = first_result;
        self
    }

    pub fn max_results(&self) -> Option<u64> {
        self.window.max_results
    }

    pub fn set_max_results(&mut self, max_results: Option<u64>) -> &mut Self {
        self.window.max_results = max_results;
        self
    }
}

impl<C: Connection> Query<C> {
    /// The statement after every registered tree walker has run, in registration order.
    pub fn walked_statement(&self) -> Result<SelectStatement> {
        let mut statement = self.statement.clone();
        for walker in &self.tree_walkers {
            log::trace!("applying {} tree walker", walker.name());
            walker.walk_select_statement(&mut statement, &self.hints)?;
        }
        Ok(statement)
    }

    pub fn execute(&self) -> Result<Vec<Row>> {
        let statement = self.walked_statement()?;
        log::debug!(
            "executing `{statement}` first_result={:?} max_results={:?}",
            self.window.first_result,
            self.window.max_results
        );
        self.connection.execute(&statement, &self.parameters, self.window)
    }

    /// Array hydration.
    pub fn get_array_result(&self) -> Result<Vec<Row>> {
        self.execute()
    }

    /// Scalar hydration: each row as its values in select order.
    pub fn get_scalar_result(&self) -> Result<Vec<Vec<Value>>> {
        Ok(self
            .execute()?
            .into_iter()
            .map(|row| row.into_iter().map(|(_, value)| value).collect_vec())
            .collect_vec())
    }

    /// Object hydration.
    pub fn get_result<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.execute()?.into_iter().map(hydrate).collect()
    }
}

/// A row holding a single entity hydrates as that entity, any other row as a whole.
pub fn hydrate<T: DeserializeOwned>(row: Row) -> Result<T> {
    let value = match row.len() {
        1 => row.into_iter().next().map(|(_, value)| value).unwrap_or_default(),
        _ => Value::Object(row),
    };
    ::serde_json::from_value(value).map_err(Error::from)
}
