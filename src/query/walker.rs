use crate::query::{Comparison, Condition, Hints, Operand, SelectExpr, SelectStatement};
use crate::{Error, Result};
use ::dyn_clone::DynClone;
use ::itertools::Itertools;
use ::std::fmt::Debug;

/// Hint carrying the distinct flag for [`CountWalker`].
pub static HINT_PAGINATOR_COUNT_DISTINCT: &str = "paginator.count.distinct";
/// Hint carrying the number of bound identifiers for [`WhereInWalker`].
pub static HINT_PAGINATOR_ID_COUNT: &str = "paginator.id.count";
/// Prefix of the positional identifier parameters, `pgid_1 ..= pgid_n`.
pub static PAGINATOR_ID_ALIAS: &str = "pgid";

pub fn paginator_id_parameter(position: usize) -> String {
    format!("{PAGINATOR_ID_ALIAS}_{position}")
}

/// An AST rewriting pass applied to a query's statement right before execution.
pub trait TreeWalker: Debug + DynClone + Send + Sync {
    fn name(&self) -> &'static str;

    fn walk_select_statement(&self, statement: &mut SelectStatement, hints: &Hints) -> Result<()>;
}

::dyn_clone::clone_trait_object!(TreeWalker);

/// Replaces the select clause with a count of root identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountWalker;

impl TreeWalker for CountWalker {
    fn name(&self) -> &'static str {
        "count"
    }

    fn walk_select_statement(&self, statement: &mut SelectStatement, hints: &Hints) -> Result<()> {
        let distinct = hints
            .get(HINT_PAGINATOR_COUNT_DISTINCT)
            .and_then(|value| value.as_bool())
            .unwrap_or_default();

        statement.select = vec![SelectExpr::Count {
            field: statement.from.identifier_path(),
            distinct,
        }];
        statement.distinct = false;
        statement.order_by.clear();
        Ok(())
    }
}

/// Selects only the distinct root identifiers, keeping joins, conditions and ordering.
#[derive(Clone, Copy, Debug, Default)]
pub struct LimitSubqueryWalker;

impl TreeWalker for LimitSubqueryWalker {
    fn name(&self) -> &'static str {
        "limit_subquery"
    }

    fn walk_select_statement(&self, statement: &mut SelectStatement, _: &Hints) -> Result<()> {
        statement.select = vec![SelectExpr::Field(statement.from.identifier_path())];
        statement.distinct = true;
        Ok(())
    }
}

/// Restricts the root entity to the identifiers bound as `pgid_1 ..= pgid_n`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhereInWalker;

impl TreeWalker for WhereInWalker {
    fn name(&self) -> &'static str {
        "where_in"
    }

    fn walk_select_statement(&self, statement: &mut SelectStatement, hints: &Hints) -> Result<()> {
        let count = hints
            .get(HINT_PAGINATOR_ID_COUNT)
            .and_then(|value| value.as_u64())
            .ok_or(Error::MissingHint {
                walker: self.name(),
                hint: HINT_PAGINATOR_ID_COUNT,
            })?;

        let identifiers = (1..=count as usize)
            .map(|position| Operand::Parameter(paginator_id_parameter(position)))
            .collect_vec();

        statement.conditions.push(Condition {
            field: statement.from.identifier_path(),
            comparison: Comparison::In,
            operand: Operand::List(identifiers),
        });
        // joined rows fan out, one row per root entity
        if statement.select.iter().all(|expr| matches!(expr, SelectExpr::Entity(_))) {
            statement.distinct = true;
        }
        Ok(())
    }
}
