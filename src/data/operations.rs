//! Table Operations Module
//! Closed set of derivations (filter, group, sort, select) applied to cached tables.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Filter operator {0:?} needs a list value")]
    ExpectedList(FilterOperator),
    #[error("Filter operator {0:?} needs a single value, got a list")]
    UnexpectedList(FilterOperator),
    #[error("Group by needs at least one key column")]
    EmptyGroupBy,
}

/// Literal compared against a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Scalar literal; lists have no single-value form.
    fn to_expr(&self) -> Option<Expr> {
        match self {
            FilterValue::Int(v) => Some(lit(*v)),
            FilterValue::Float(v) => Some(lit(*v)),
            FilterValue::Text(v) => Some(lit(v.clone())),
            FilterValue::List(_) => None,
        }
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(column: &str, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: value.into(),
        }
    }

    fn predicate(&self) -> Result<Expr, OperationError> {
        let target = col(self.column.as_str());
        let scalar = || {
            self.value
                .to_expr()
                .ok_or(OperationError::UnexpectedList(self.operator))
        };
        let expr = match self.operator {
            FilterOperator::Eq => target.eq(scalar()?),
            FilterOperator::NotEq => target.neq(scalar()?),
            FilterOperator::Gt => target.gt(scalar()?),
            FilterOperator::Lt => target.lt(scalar()?),
            FilterOperator::GtEq => target.gt_eq(scalar()?),
            FilterOperator::LtEq => target.lt_eq(scalar()?),
            FilterOperator::In => {
                let FilterValue::List(items) = &self.value else {
                    return Err(OperationError::ExpectedList(self.operator));
                };
                items
                    .iter()
                    .filter_map(FilterValue::to_expr)
                    .map(|value| col(self.column.as_str()).eq(value))
                    .reduce(|acc, e| acc.or(e))
                    .unwrap_or_else(|| lit(false))
            }
        };
        Ok(expr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFunction {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub column: String,
    pub function: AggFunction,
}

impl Aggregation {
    pub fn new(column: &str, function: AggFunction) -> Self {
        Self {
            column: column.to_string(),
            function,
        }
    }

    fn to_expr(&self) -> Expr {
        let c = col(self.column.as_str());
        match self.function {
            AggFunction::Sum => c.sum(),
            AggFunction::Mean => c.mean(),
            AggFunction::Min => c.min(),
            AggFunction::Max => c.max(),
            AggFunction::Count => c.count(),
        }
    }
}

/// A single derivation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Filter(Filter),
    GroupBy {
        columns: Vec<String>,
        aggregations: Vec<Aggregation>,
    },
    Sort {
        columns: Vec<String>,
        ascending: bool,
    },
    Select {
        columns: Vec<String>,
    },
}

impl Operation {
    pub fn select(columns: &[&str]) -> Self {
        Operation::Select {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Columns this step reads.
    fn referenced_columns(&self) -> Vec<&str> {
        match self {
            Operation::Filter(filter) => vec![filter.column.as_str()],
            Operation::GroupBy {
                columns,
                aggregations,
            } => columns
                .iter()
                .map(String::as_str)
                .chain(aggregations.iter().map(|a| a.column.as_str()))
                .collect(),
            Operation::Sort { columns, .. } | Operation::Select { columns } => {
                columns.iter().map(String::as_str).collect()
            }
        }
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame, OperationError> {
        for name in self.referenced_columns() {
            if df.column(name).is_err() {
                return Err(OperationError::UnknownColumn(name.to_string()));
            }
        }

        let lazy = df.lazy();
        let lazy = match self {
            Operation::Filter(filter) => lazy.filter(filter.predicate()?),
            Operation::GroupBy {
                columns,
                aggregations,
            } => {
                if columns.is_empty() {
                    return Err(OperationError::EmptyGroupBy);
                }
                let keys: Vec<Expr> = columns.iter().map(|c| col(c.as_str())).collect();
                let aggs: Vec<Expr> = aggregations.iter().map(Aggregation::to_expr).collect();
                lazy.group_by_stable(keys).agg(aggs)
            }
            Operation::Sort { columns, ascending } => {
                let by: Vec<Expr> = columns.iter().map(|c| col(c.as_str())).collect();
                lazy.sort_by_exprs(
                    by,
                    SortMultipleOptions::default()
                        .with_order_descending(!ascending)
                        .with_nulls_last(true)
                        .with_maintain_order(true),
                )
            }
            Operation::Select { columns } => {
                let cols: Vec<Expr> = columns.iter().map(|c| col(c.as_str())).collect();
                lazy.select(cols)
            }
        };
        Ok(lazy.collect()?)
    }
}

/// Apply `operations` in order to a copy of `df`.
pub fn apply_operations(df: &DataFrame, operations: &[Operation]) -> Result<DataFrame, OperationError> {
    operations.iter().try_fold(df.clone(), |acc, op| {
        let out = op.apply(acc)?;
        debug!(?op, rows = out.height(), "applied table operation");
        Ok(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Column::new("Municipio".into(), vec!["Serra", "Vitória", "Serra", "Linhares"]),
            Column::new("Total_Professores".into(), vec![3.0, 23.0, 7.0, 7.0]),
            Column::new("Total_Escolas".into(), vec![1u32, 2, 1, 1]),
        ])
        .unwrap()
    }

    fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn filter_compares_against_literal() {
        let out = apply_operations(
            &sample(),
            &[Operation::Filter(Filter::new(
                "Total_Professores",
                FilterOperator::GtEq,
                7.0,
            ))],
        )
        .unwrap();
        assert_eq!(strings(&out, "Municipio"), vec!["Vitória", "Serra", "Linhares"]);
    }

    #[test]
    fn filter_in_matches_any_listed_value() {
        let filter = Filter {
            column: "Municipio".to_string(),
            operator: FilterOperator::In,
            value: FilterValue::List(vec!["Serra".into(), "Linhares".into()]),
        };
        let out = apply_operations(&sample(), &[Operation::Filter(filter)]).unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn filter_in_without_list_is_rejected() {
        let filter = Filter::new("Municipio", FilterOperator::In, "Serra");
        let err = apply_operations(&sample(), &[Operation::Filter(filter)]).unwrap_err();
        assert!(matches!(err, OperationError::ExpectedList(FilterOperator::In)));
    }

    #[test]
    fn sort_descending_is_stable() {
        let out = apply_operations(
            &sample(),
            &[Operation::Sort {
                columns: vec!["Total_Professores".to_string()],
                ascending: false,
            }],
        )
        .unwrap();
        assert_eq!(
            strings(&out, "Municipio"),
            vec!["Vitória", "Serra", "Linhares", "Serra"]
        );
    }

    #[test]
    fn group_by_sums_in_first_seen_order() {
        let out = apply_operations(
            &sample(),
            &[Operation::GroupBy {
                columns: vec!["Municipio".to_string()],
                aggregations: vec![
                    Aggregation::new("Total_Professores", AggFunction::Sum),
                    Aggregation::new("Total_Escolas", AggFunction::Sum),
                ],
            }],
        )
        .unwrap();
        assert_eq!(strings(&out, "Municipio"), vec!["Serra", "Vitória", "Linhares"]);
        assert_eq!(floats(&out, "Total_Professores"), vec![10.0, 23.0, 7.0]);
        assert_eq!(floats(&out, "Total_Escolas"), vec![2.0, 2.0, 1.0]);
    }

    #[test]
    fn select_projects_columns() {
        let out = apply_operations(&sample(), &[Operation::select(&["Municipio"])]).unwrap();
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn unknown_column_is_reported() {
        let err = apply_operations(&sample(), &[Operation::select(&["Nope"])]).unwrap_err();
        assert!(matches!(err, OperationError::UnknownColumn(ref c) if c == "Nope"));
    }

    #[test]
    fn operations_deserialize_from_tagged_json() {
        let json = r#"[{"Filter":{"column":"Municipio","operator":"Eq","value":"Serra"}},
                       {"Select":{"columns":["Total_Professores"]}}]"#;
        let ops: Vec<Operation> = serde_json::from_str(json).unwrap();
        let out = apply_operations(&sample(), &ops).unwrap();
        assert_eq!(floats(&out, "Total_Professores"), vec![3.0, 7.0]);
    }
}
