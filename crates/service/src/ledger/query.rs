//! `circles_query` request and response types.
//!
//! Queries are paginated with an event-position cursor
//! `(blockNumber, transactionIndex, logIndex)`: each page asks for rows strictly
//! after the last row of the previous page, ordered by the same columns.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Table holding base group creation events.
pub const BASE_GROUPS: TableRef = TableRef::new("CrcV2", "BaseGroupCreated", "group");

/// Table holding human avatar registrations.
pub const REGISTRATIONS: TableRef = TableRef::new("CrcV2", "RegisterHuman", "avatar");

/// View holding current trust relations.
pub const TRUST_RELATIONS: TableRef = TableRef::new("V_CrcV2", "TrustRelations", "trustee");

const CURSOR_COLUMNS: [&str; 3] = ["blockNumber", "transactionIndex", "logIndex"];

/// A table and the address column read from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    /// Query namespace
    pub namespace: &'static str,
    /// Table or view name
    pub table: &'static str,
    /// Column carrying the address of interest
    pub column: &'static str,
}

impl TableRef {
    /// Describe a table.
    pub const fn new(namespace: &'static str, table: &'static str, column: &'static str) -> Self {
        Self {
            namespace,
            table,
            column,
        }
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterType {
    /// `=`
    Equals,
    /// `>`
    GreaterThan,
}

/// Boolean combinator of a conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConjunctionType {
    /// All predicates hold
    And,
    /// Any predicate holds
    Or,
}

/// Query filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type")]
pub enum Filter {
    /// Single column comparison
    FilterPredicate {
        /// Column name
        #[serde(rename = "Column")]
        column: String,
        /// Operator
        #[serde(rename = "FilterType")]
        filter_type: FilterType,
        /// Right-hand side
        #[serde(rename = "Value")]
        value: Value,
    },
    /// Combination of filters
    Conjunction {
        /// Operator
        #[serde(rename = "ConjunctionType")]
        conjunction_type: ConjunctionType,
        /// Operands
        #[serde(rename = "Predicates")]
        predicates: Vec<Filter>,
    },
}

impl Filter {
    /// `column = value`
    pub fn equals(column: &str, value: impl Into<Value>) -> Self {
        Filter::FilterPredicate {
            column: column.to_string(),
            filter_type: FilterType::Equals,
            value: value.into(),
        }
    }

    /// `column > value`
    pub fn greater_than(column: &str, value: impl Into<Value>) -> Self {
        Filter::FilterPredicate {
            column: column.to_string(),
            filter_type: FilterType::GreaterThan,
            value: value.into(),
        }
    }

    /// All of `predicates`.
    pub fn and(predicates: Vec<Filter>) -> Self {
        Filter::Conjunction {
            conjunction_type: ConjunctionType::And,
            predicates,
        }
    }

    /// Any of `predicates`.
    pub fn or(predicates: Vec<Filter>) -> Self {
        Filter::Conjunction {
            conjunction_type: ConjunctionType::Or,
            predicates,
        }
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    /// Column name
    #[serde(rename = "Column")]
    pub column: String,
    /// "ASC" or "DESC"
    #[serde(rename = "SortOrder")]
    pub sort_order: &'static str,
}

/// One `circles_query` parameter object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryRequest {
    /// Query namespace
    pub namespace: String,
    /// Table or view
    pub table: String,
    /// Selected columns
    pub columns: Vec<String>,
    /// Filters, implicitly AND-ed
    pub filter: Vec<Filter>,
    /// Sort keys
    pub order: Vec<OrderBy>,
    /// Maximum rows
    pub limit: usize,
}

/// Position of a row in the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    /// Block number
    pub block_number: u64,
    /// Transaction index within the block
    pub transaction_index: u64,
    /// Log index within the block
    pub log_index: u64,
}

impl Cursor {
    /// Filter selecting rows strictly after this cursor.
    pub fn after(&self) -> Filter {
        let [block, tx, log] = CURSOR_COLUMNS;
        Filter::or(vec![
            Filter::greater_than(block, self.block_number),
            Filter::and(vec![
                Filter::equals(block, self.block_number),
                Filter::greater_than(tx, self.transaction_index),
            ]),
            Filter::and(vec![
                Filter::equals(block, self.block_number),
                Filter::equals(tx, self.transaction_index),
                Filter::greater_than(log, self.log_index),
            ]),
        ])
    }
}

/// Build a page request for `table`, with extra `filters`, after `cursor`.
pub fn page_request(
    table: &TableRef,
    filters: &[Filter],
    cursor: Option<&Cursor>,
    limit: usize,
) -> QueryRequest {
    let mut columns = vec![table.column.to_string()];
    columns.extend(CURSOR_COLUMNS.iter().map(|c| c.to_string()));

    let mut filter = filters.to_vec();
    if let Some(cursor) = cursor {
        filter.push(cursor.after());
    }

    QueryRequest {
        namespace: table.namespace.to_string(),
        table: table.table.to_string(),
        columns,
        filter,
        order: CURSOR_COLUMNS
            .iter()
            .map(|c| OrderBy {
                column: c.to_string(),
                sort_order: "ASC",
            })
            .collect(),
        limit,
    }
}

/// Raw `circles_query` result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    /// Column names, in row order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Row values
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

/// One page of address tokens plus the cursor of its last row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Raw address tokens, in row order
    pub tokens: Vec<String>,
    /// Cursor of the last row, if any
    pub last: Option<Cursor>,
    /// Number of rows returned
    pub row_count: usize,
}

impl QueryResult {
    /// Parse a JSON-RPC result; `null` is an empty result.
    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).context("Malformed circles_query result")
    }

    /// Extract `column` tokens and the trailing cursor.
    pub fn into_page(self, column: &str) -> Result<Page> {
        if self.rows.is_empty() {
            return Ok(Page::default());
        }

        let index = |name: &str| {
            self.columns
                .iter()
                .position(|c| c == name)
                .with_context(|| format!("circles_query result is missing column '{}'", name))
        };
        let value_idx = index(column)?;
        let [block, tx, log] = CURSOR_COLUMNS;
        let (block_idx, tx_idx, log_idx) = (index(block)?, index(tx)?, index(log)?);

        let mut tokens = Vec::with_capacity(self.rows.len());
        let mut last = None;
        for row in &self.rows {
            tokens.push(row.get(value_idx).map(token).unwrap_or_default());
            last = Some(Cursor {
                block_number: number(row.get(block_idx), block)?,
                transaction_index: number(row.get(tx_idx), tx)?,
                log_index: number(row.get(log_idx), log)?,
            });
        }

        Ok(Page {
            tokens,
            last,
            row_count: self.rows.len(),
        })
    }
}

// Non-string values are passed through as text so the canonicalizer rejects them.
fn token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number(value: Option<&Value>, column: &str) -> Result<u64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    parsed.with_context(|| format!("Invalid {} in circles_query row: {:?}", column, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = page_request(
            &TRUST_RELATIONS,
            &[Filter::equals("truster", "0xabc")],
            None,
            100,
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["Namespace"], "V_CrcV2");
        assert_eq!(value["Table"], "TrustRelations");
        assert_eq!(
            value["Columns"],
            json!(["trustee", "blockNumber", "transactionIndex", "logIndex"])
        );
        assert_eq!(
            value["Filter"],
            json!([{
                "Type": "FilterPredicate",
                "Column": "truster",
                "FilterType": "Equals",
                "Value": "0xabc"
            }])
        );
        assert_eq!(value["Order"][0], json!({"Column": "blockNumber", "SortOrder": "ASC"}));
        assert_eq!(value["Limit"], 100);
    }

    #[test]
    fn test_cursor_filter() {
        let cursor = Cursor {
            block_number: 10,
            transaction_index: 2,
            log_index: 5,
        };
        let request = page_request(&REGISTRATIONS, &[], Some(&cursor), 50);
        let value = serde_json::to_value(&request).unwrap();
        let after = &value["Filter"][0];

        assert_eq!(after["Type"], "Conjunction");
        assert_eq!(after["ConjunctionType"], "Or");
        assert_eq!(after["Predicates"][0]["FilterType"], "GreaterThan");
        assert_eq!(after["Predicates"][0]["Value"], 10);
        assert_eq!(after["Predicates"][2]["Predicates"][2]["Column"], "logIndex");
        assert_eq!(after["Predicates"][2]["Predicates"][2]["Value"], 5);
    }

    #[test]
    fn test_parse_page() {
        let result = QueryResult::from_value(json!({
            "columns": ["blockNumber", "transactionIndex", "logIndex", "avatar"],
            "rows": [
                [1, 0, 3, "0xAAAA"],
                ["2", "1", "0", "0xbbbb"],
                [2, 1, 4, 17]
            ]
        }))
        .unwrap();

        let page = result.into_page("avatar").unwrap();
        assert_eq!(page.row_count, 3);
        assert_eq!(page.tokens, vec!["0xAAAA", "0xbbbb", "17"]);
        assert_eq!(
            page.last,
            Some(Cursor {
                block_number: 2,
                transaction_index: 1,
                log_index: 4
            })
        );
    }

    #[test]
    fn test_null_result_is_empty() {
        let page = QueryResult::from_value(Value::Null)
            .unwrap()
            .into_page("group")
            .unwrap();
        assert_eq!(page, Page::default());
    }

    #[test]
    fn test_missing_column_is_error() {
        let result = QueryResult::from_value(json!({
            "columns": ["avatar"],
            "rows": [["0xaaaa"]]
        }))
        .unwrap();
        assert!(result.into_page("avatar").is_err());
    }

    #[test]
    fn test_cursor_ordering() {
        let a = Cursor {
            block_number: 1,
            transaction_index: 9,
            log_index: 9,
        };
        let b = Cursor {
            block_number: 2,
            transaction_index: 0,
            log_index: 0,
        };
        assert!(a < b);
    }
}
