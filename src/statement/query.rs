//! Query criteria shared by the SQL runtime and the in-memory repository.

use super::expr::{Expr, compare_values};
use crate::models::RowMap;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Filter, ordering and paging for a find operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; repeated calls are combined with AND.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, row: &RowMap) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(row))
    }

    /// Filter, sort and page `items` in memory. NULLs sort before any value.
    pub fn apply<T>(&self, items: Vec<T>, row_of: impl Fn(&T) -> &RowMap) -> Vec<T> {
        let mut selected: Vec<T> = items.into_iter().filter(|i| self.matches(row_of(i))).collect();

        if !self.order_by.is_empty() {
            // sort_by is stable, so ties keep key order
            selected.sort_by(|a, b| self.compare(row_of(a), row_of(b)));
        }

        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        selected.into_iter().skip(offset).take(limit).collect()
    }

    fn compare(&self, a: &RowMap, b: &RowMap) -> Ordering {
        for order in &self.order_by {
            let left = a.get(&order.column).filter(|v| !v.is_null());
            let right = b.get(&order.column).filter(|v| !v.is_null());
            let ordering = match (left, right) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = if order.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<RowMap> {
        [
            json!({"id": 1, "name": "carol", "age": 35}),
            json!({"id": 2, "name": "alice", "age": null}),
            json!({"id": 3, "name": "bob", "age": 28}),
            json!({"id": 4, "name": "dave", "age": 35}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    fn ids(rows: &[RowMap]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn test_filter_combines_with_and() {
        let query = Query::new()
            .filter(Expr::ge("age", 30))
            .filter(Expr::like("name", "d%"));
        let result = query.apply(rows(), |r| r);
        assert_eq!(ids(&result), vec![4]);
    }

    #[test]
    fn test_sort_nulls_first_and_desc() {
        let query = Query::new().order_by(OrderBy::asc("age"));
        assert_eq!(ids(&query.apply(rows(), |r| r)), vec![2, 3, 1, 4]);

        let query = Query::new()
            .order_by(OrderBy::desc("age"))
            .order_by(OrderBy::asc("name"));
        assert_eq!(ids(&query.apply(rows(), |r| r)), vec![1, 4, 3, 2]);
    }

    #[test]
    fn test_paging() {
        let query = Query::new().order_by(OrderBy::asc("id")).offset(1).limit(2);
        assert_eq!(ids(&query.apply(rows(), |r| r)), vec![2, 3]);

        let query = Query::new().offset(10);
        assert!(query.apply(rows(), |r| r).is_empty());
    }
}
