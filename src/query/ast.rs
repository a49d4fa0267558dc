use ::itertools::Itertools;
use ::serde_json::Value;
use ::std::fmt;

/// `alias.field`
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct FieldPath {
    pub alias: String,
    pub field: String,
}

impl FieldPath {
    pub fn new(alias: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            field: field.into(),
        }
    }

    /// Column label used for scalar results, e.g. `a_id`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.alias, self.field)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.field)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum SelectExpr {
    Entity(String),
    Field(FieldPath),
    Count { field: FieldPath, distinct: bool },
}

impl SelectExpr {
    pub fn label(&self) -> String {
        match self {
            Self::Entity(alias) => alias.clone(),
            Self::Field(path) => path.label(),
            Self::Count { .. } => "count".into(),
        }
    }
}

impl fmt::Display for SelectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(alias) => write!(f, "{alias}"),
            Self::Field(path) => write!(f, "{path}"),
            Self::Count { field, distinct: true } => write!(f, "COUNT(DISTINCT {field})"),
            Self::Count { field, distinct: false } => write!(f, "COUNT({field})"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RangeVariable {
    pub entity: String,
    pub alias: String,
    pub identifier: String,
}

impl RangeVariable {
    pub fn identifier_path(&self) -> FieldPath {
        FieldPath::new(&self.alias, &self.identifier)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, IsVariant, PartialEq, Serialize)]
pub enum JoinKind {
    #[display(fmt = "INNER JOIN")]
    Inner,
    #[display(fmt = "LEFT JOIN")]
    Left,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Join {
    pub kind: JoinKind,
    pub association: FieldPath,
    pub alias: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Comparison {
    #[display(fmt = "=")]
    Eq,
    #[display(fmt = "<>")]
    Neq,
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = "<=")]
    Lte,
    #[display(fmt = ">")]
    Gt,
    #[display(fmt = ">=")]
    Gte,
    #[display(fmt = "IN")]
    In,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Operand {
    Parameter(String),
    Literal(Value),
    List(Vec<Operand>),
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl Operand {
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter(name.into())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(name) => write!(f, ":{name}"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::List(operands) => write!(f, "({})", operands.iter().join(", ")),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Condition {
    pub field: FieldPath,
    pub comparison: Comparison,
    pub operand: Operand,
}

impl Condition {
    pub fn new(field: FieldPath, comparison: Comparison, operand: impl Into<Operand>) -> Self {
        Self {
            field,
            comparison,
            operand: operand.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.comparison, self.operand)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, IsVariant, PartialEq, Serialize)]
pub enum SortDirection {
    #[default]
    #[display(fmt = "ASC")]
    Asc,
    #[display(fmt = "DESC")]
    Desc,
}

impl SortDirection {
    /// Request parameter form, `asc` or `desc`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Anything but a case-insensitive `asc` reads as descending.
    pub fn from_param(param: &str) -> Self {
        match param.trim().eq_ignore_ascii_case("asc") {
            true => Self::Asc,
            false => Self::Desc,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrderBy {
    pub field: FieldPath,
    pub direction: SortDirection,
}

/// Structural representation of a select query. Tree walkers rewrite it
/// before it reaches a [`Connection`](crate::Connection).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SelectStatement {
    pub distinct: bool,
    pub select: Vec<SelectExpr>,
    pub from: RangeVariable,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub order_by: Vec<OrderBy>,
}

impl SelectStatement {
    /// `SELECT alias FROM entity alias`, identified by `id`.
    pub fn new(entity: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            distinct: false,
            select: vec![SelectExpr::Entity(alias.clone())],
            from: RangeVariable {
                entity: entity.into(),
                alias,
                identifier: "id".into(),
            },
            joins: vec![],
            conditions: vec![],
            order_by: vec![],
        }
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.from.identifier = identifier.into();
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn select(mut self, select: Vec<SelectExpr>) -> Self {
        self.select = select;
        self
    }

    pub fn join(mut self, kind: JoinKind, association: FieldPath, alias: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind,
            association,
            alias: alias.into(),
        });
        self
    }

    pub fn inner_join(self, association: FieldPath, alias: impl Into<String>) -> Self {
        self.join(JoinKind::Inner, association, alias)
    }

    pub fn left_join(self, association: FieldPath, alias: impl Into<String>) -> Self {
        self.join(JoinKind::Left, association, alias)
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, field: FieldPath, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy { field, direction });
        self
    }

    pub fn root_alias(&self) -> &str {
        &self.from.alias
    }

    /// Every identification variable declared by the statement, root first.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        ::std::iter::once(self.from.alias.as_str()).chain(self.joins.iter().map(|join| join.alias.as_str()))
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write!(
            f,
            "{} FROM {} {}",
            self.select.iter().join(", "),
            self.from.entity,
            self.from.alias
        )?;
        for join in &self.joins {
            write!(f, " {} {} {}", join.kind, join.association, join.alias)?;
        }
        if !self.conditions.is_empty() {
            write!(f, " WHERE {}", self.conditions.iter().join(" AND "))?;
        }
        if !self.order_by.is_empty() {
            let order_by = self
                .order_by
                .iter()
                .map(|order_by| format!("{} {}", order_by.field, order_by.direction))
                .join(", ");
            write!(f, " ORDER BY {order_by}")?;
        }
        Ok(())
    }
}
