//! Predicate expressions.
//!
//! An `Expr` is rendered to a WHERE clause by the statement builder and
//! evaluated directly against decoded rows by the in-memory repository, so
//! both paths agree on filtering semantics.

use crate::dialect::Dialect;
use crate::models::{RowMap, SqlParam};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

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
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        column: String,
        op: CompareOp,
        value: SqlParam,
    },
    /// `%` matches any run of characters, `_` exactly one.
    Like { column: String, pattern: String },
    In {
        column: String,
        values: Vec<SqlParam>,
    },
    IsNull(String),
    IsNotNull(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

macro_rules! compare_ctor {
    ($($name:ident => $op:ident),+ $(,)?) => {
        $(
            pub fn $name(column: impl Into<String>, value: impl Into<SqlParam>) -> Self {
                Self::Compare {
                    column: column.into(),
                    op: CompareOp::$op,
                    value: value.into(),
                }
            }
        )+
    };
}

impl Expr {
    compare_ctor! {
        eq => Eq,
        ne => Ne,
        gt => Gt,
        ge => Ge,
        lt => Lt,
        le => Le,
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlParam>,
    {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull(column.into())
    }

    /// Conjunction, flattening nested `And`s.
    pub fn and(self, other: Expr) -> Self {
        match (self, other) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), right) => {
                left.push(right);
                Self::And(left)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Disjunction, flattening nested `Or`s.
    pub fn or(self, other: Expr) -> Self {
        match (self, other) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), right) => {
                left.push(right);
                Self::Or(left)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    /// Render as SQL, appending bind values to `params`.
    ///
    /// Placeholders are numbered from the current length of `params`, so a
    /// caller that binds values before the WHERE clause keeps positions intact.
    pub fn render(&self, dialect: &dyn Dialect, params: &mut Vec<SqlParam>) -> String {
        match self {
            Self::Compare { column, op, value } => {
                params.push(value.clone());
                format!(
                    "{} {} {}",
                    dialect.quote_identifier(column),
                    op.symbol(),
                    dialect.placeholder(params.len())
                )
            }
            Self::Like { column, pattern } => {
                params.push(SqlParam::String(pattern.clone()));
                format!(
                    "{} LIKE {}",
                    dialect.quote_identifier(column),
                    dialect.placeholder(params.len())
                )
            }
            Self::In { values, .. } if values.is_empty() => "1=0".to_string(),
            Self::In { column, values } => {
                let markers: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        dialect.placeholder(params.len())
                    })
                    .collect();
                format!(
                    "{} IN ({})",
                    dialect.quote_identifier(column),
                    markers.join(", ")
                )
            }
            Self::IsNull(column) => format!("{} IS NULL", dialect.quote_identifier(column)),
            Self::IsNotNull(column) => {
                format!("{} IS NOT NULL", dialect.quote_identifier(column))
            }
            Self::And(items) if items.is_empty() => "1=1".to_string(),
            Self::Or(items) if items.is_empty() => "1=0".to_string(),
            Self::And(items) => render_joined(items, " AND ", dialect, params),
            Self::Or(items) => render_joined(items, " OR ", dialect, params),
            Self::Not(inner) => format!("NOT ({})", inner.render(dialect, params)),
        }
    }

    /// Whether the row satisfies the predicate. Only a definite true
    /// selects the row, as in a WHERE clause.
    pub fn matches(&self, row: &RowMap) -> bool {
        self.evaluate(row) == Some(true)
    }

    /// Evaluate against a decoded row with SQL three-valued logic: `None`
    /// is UNKNOWN. A missing column reads as NULL.
    pub fn evaluate(&self, row: &RowMap) -> Option<bool> {
        match self {
            Self::Compare { column, op, value } => {
                let left = non_null(row, column)?;
                let right = value.to_json();
                if right.is_null() {
                    return None;
                }
                Some(compare_values(left, &right).is_some_and(|o| op.accepts(o)))
            }
            Self::Like { column, pattern } => match non_null(row, column)? {
                JsonValue::String(text) => Some(like_matches(text, pattern)),
                _ => Some(false),
            },
            Self::In { values, .. } if values.is_empty() => Some(false),
            Self::In { column, values } => {
                let left = non_null(row, column)?;
                let mut unknown = false;
                for value in values {
                    let right = value.to_json();
                    if right.is_null() {
                        unknown = true;
                    } else if compare_values(left, &right) == Some(Ordering::Equal) {
                        return Some(true);
                    }
                }
                if unknown { None } else { Some(false) }
            }
            Self::IsNull(column) => Some(non_null(row, column).is_none()),
            Self::IsNotNull(column) => Some(non_null(row, column).is_some()),
            Self::And(items) => {
                let mut result = Some(true);
                for item in items {
                    match item.evaluate(row) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Self::Or(items) => {
                let mut result = Some(false);
                for item in items {
                    match item.evaluate(row) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Self::Not(inner) => inner.evaluate(row).map(|b| !b),
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

fn render_joined(
    items: &[Expr],
    separator: &str,
    dialect: &dyn Dialect,
    params: &mut Vec<SqlParam>,
) -> String {
    items
        .iter()
        .map(|item| {
            let sql = item.render(dialect, params);
            match item {
                Expr::And(nested) | Expr::Or(nested) if nested.len() > 1 => format!("({})", sql),
                _ => sql,
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn non_null<'a>(row: &'a RowMap, column: &str) -> Option<&'a JsonValue> {
    row.get(column).filter(|v| !v.is_null())
}

/// Order two non-null JSON scalars. Numbers compare numerically; booleans
/// also compare against 0/1 since some products store them as integers.
pub(crate) fn compare_values(left: &JsonValue, right: &JsonValue) -> Option<Ordering> {
    match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Number(n)) => n.as_i64().map(|i| (*a as i64).cmp(&i)),
        (JsonValue::Number(n), JsonValue::Bool(b)) => n.as_i64().map(|i| i.cmp(&(*b as i64))),
        (JsonValue::Array(_), _) | (JsonValue::Object(_), _) => {
            (left == right).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

/// SQL LIKE over characters.
fn like_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // Greedy matcher with backtracking to the last `%`
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
