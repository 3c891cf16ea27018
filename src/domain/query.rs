//! Partition-scoped document queries
//!
//! A [`DocumentQuery`] can only be built for one partition (type key), so
//! every query issued through the store carries the partition predicate.
//! Filters are a small expression tree rather than closures: the Cosmos DB
//! backend renders them to SQL, the in-memory backend evaluates them.

use crate::domain::entity::{ENTITY_TYPE_FIELD, ID_FIELD};
use crate::domain::errors::EntityStoreError;
use crate::domain::ids::TypeKey;
use crate::domain::result::Result;
use serde_json::Value;
use std::fmt::Write as _;

/// Alias of the collection in rendered SQL
const ROOT: &str = "c";

/// Dotted path into a document, e.g. `address.city`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Splits a dotted path into segments
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    fn validate(&self) -> Result<()> {
        if self.0.iter().any(|s| s.trim().is_empty()) {
            return Err(EntityStoreError::Validation(format!(
                "Invalid field path '{}'",
                self.0.join(".")
            )));
        }
        Ok(())
    }

    /// Renders `c["a"]["b"]` with JSON-escaped segment names
    fn to_sql(&self) -> String {
        let mut out = String::from(ROOT);
        for segment in &self.0 {
            let _ = write!(out, "[{}]", json_literal(&Value::String(segment.clone())));
        }
        out
    }

    /// Looks the path up in a JSON document
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(document, |current, segment| current.get(segment.as_str()))
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Comparison operator of a [`Filter::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// Filter predicate over documents of one entity type
///
/// # Examples
///
/// ```
/// use entity_store::domain::query::Filter;
///
/// let filter = Filter::eq("status", "open").and(Filter::ge("total_cents", 1000));
/// assert_eq!(
///     filter.to_sql(),
///     r#"(c["status"] = "open" AND c["total_cents"] >= 1000)"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field <op> value`
    Compare {
        field: FieldPath,
        op: CompareOp,
        value: Value,
    },
    /// String field contains a substring
    Contains { field: FieldPath, value: String },
    /// String field starts with a prefix
    StartsWith { field: FieldPath, value: String },
    /// Field is present in the document
    IsDefined(FieldPath),
    /// All sub-filters hold
    And(Vec<Filter>),
    /// At least one sub-filter holds
    Or(Vec<Filter>),
    /// Negation
    Not(Box<Filter>),
}

impl Filter {
    fn compare(field: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: FieldPath::parse(field),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn ge(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn le(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    pub fn contains(field: &str, value: impl Into<String>) -> Self {
        Filter::Contains {
            field: FieldPath::parse(field),
            value: value.into(),
        }
    }

    pub fn starts_with(field: &str, value: impl Into<String>) -> Self {
        Filter::StartsWith {
            field: FieldPath::parse(field),
            value: value.into(),
        }
    }

    pub fn is_defined(field: &str) -> Self {
        Filter::IsDefined(FieldPath::parse(field))
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Disjunction, flattening nested `Or`s
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut parts) => {
                parts.push(other);
                Filter::Or(parts)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Checks every field path in the tree
    pub fn validate(&self) -> Result<()> {
        match self {
            Filter::Compare { field, .. }
            | Filter::Contains { field, .. }
            | Filter::StartsWith { field, .. }
            | Filter::IsDefined(field) => field.validate(),
            Filter::And(parts) | Filter::Or(parts) => parts.iter().try_for_each(Filter::validate),
            Filter::Not(inner) => inner.validate(),
        }
    }

    /// Renders the predicate as Cosmos DB SQL
    pub fn to_sql(&self) -> String {
        match self {
            Filter::Compare { field, op, value } => {
                format!("{} {} {}", field.to_sql(), op.as_sql(), json_literal(value))
            }
            Filter::Contains { field, value } => format!(
                "CONTAINS({}, {})",
                field.to_sql(),
                json_literal(&Value::String(value.clone()))
            ),
            Filter::StartsWith { field, value } => format!(
                "STARTSWITH({}, {})",
                field.to_sql(),
                json_literal(&Value::String(value.clone()))
            ),
            Filter::IsDefined(field) => format!("IS_DEFINED({})", field.to_sql()),
            Filter::And(parts) if parts.is_empty() => "true".to_string(),
            Filter::Or(parts) if parts.is_empty() => "false".to_string(),
            Filter::And(parts) => join_sql(parts, " AND "),
            Filter::Or(parts) => join_sql(parts, " OR "),
            Filter::Not(inner) => format!("NOT ({})", inner.to_sql()),
        }
    }
}

fn join_sql(parts: &[Filter], separator: &str) -> String {
    let rendered: Vec<String> = parts.iter().map(Filter::to_sql).collect();
    format!("({})", rendered.join(separator))
}

/// Renders a JSON value as a SQL literal; Cosmos DB SQL accepts JSON syntax
fn json_literal(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Ordering key of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: FieldPath,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: FieldPath::parse(field),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            field: FieldPath::parse(field),
            direction: SortDirection::Descending,
        }
    }

    fn to_sql(&self) -> String {
        let direction = match self.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        format!(" ORDER BY {} {}", self.field.to_sql(), direction)
    }
}

/// A query over exactly one partition of the collection
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    partition_key: TypeKey,
    id: Option<String>,
    filter: Option<Filter>,
    order_by: Option<OrderBy>,
}

impl DocumentQuery {
    /// Scan of every document in the partition
    pub fn partition(partition_key: TypeKey) -> Self {
        Self {
            partition_key,
            id: None,
            filter: None,
            order_by: None,
        }
    }

    /// Lookup of one id inside the partition
    pub fn by_id(partition_key: TypeKey, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::partition(partition_key)
        }
    }

    /// Adds a filter, AND-ed with any existing one
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn partition_key(&self) -> &TypeKey {
        &self.partition_key
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn filter_expr(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Validates field paths before the query is sent anywhere
    pub fn validate(&self) -> Result<()> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        if let Some(order) = &self.order_by {
            order.field.validate()?;
        }
        Ok(())
    }

    /// Predicate part shared by the item and count queries
    fn where_clause(&self) -> String {
        let mut clause = format!(
            "{}[{}] = {}",
            ROOT,
            json_literal(&Value::String(ENTITY_TYPE_FIELD.to_string())),
            json_literal(&Value::String(self.partition_key.as_str().to_string()))
        );
        if let Some(id) = &self.id {
            let _ = write!(
                clause,
                " AND {}[{}] = {}",
                ROOT,
                json_literal(&Value::String(ID_FIELD.to_string())),
                json_literal(&Value::String(id.clone()))
            );
        }
        if let Some(filter) = &self.filter {
            let _ = write!(clause, " AND {}", filter.to_sql());
        }
        clause
    }

    /// Materialized item query text
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_store::domain::ids::TypeKey;
    /// use entity_store::domain::query::{DocumentQuery, OrderBy};
    ///
    /// let query = DocumentQuery::partition(TypeKey::new("order").unwrap())
    ///     .order_by(OrderBy::descending("created"));
    /// assert_eq!(
    ///     query.to_sql(),
    ///     r#"SELECT * FROM c WHERE c["entity_type"] = "order" ORDER BY c["created"] DESC"#
    /// );
    /// ```
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {} WHERE {}", ROOT, self.where_clause());
        if let Some(order) = &self.order_by {
            sql.push_str(&order.to_sql());
        }
        sql
    }

    /// Count query rewritten from the item query text
    ///
    /// The projection becomes `VALUE COUNT(1)` and the ordering is dropped,
    /// since aggregates do not accept `ORDER BY`.
    pub fn to_count_sql(&self) -> String {
        let sql = self.to_sql();
        let sql = match &self.order_by {
            Some(order) => sql
                .strip_suffix(order.to_sql().as_str())
                .map(str::to_string)
                .unwrap_or(sql),
            None => sql,
        };
        sql.replacen("SELECT *", "SELECT VALUE COUNT(1)", 1)
    }
}
