//! Ordered feature derivation over a [`Table`].
//!
//! A [`Pipeline`] is a list of [`FeatureStep`]s plus an optional terminal sort. Every step adds
//! one or more columns computed row by row from columns that exist before the step runs, so
//! later steps can build on earlier ones. All binding and validation happens in
//! [`Pipeline::plan`] before any row is evaluated: a run either produces a complete table or
//! fails without output.

use smallvec::SmallVec;
use std::error::Error;
use std::fmt::{self, Write};

use crate::error::ErrorAccumulator;
use crate::expr::{BoundExpr, EvalStats, Expr, ExprError, quote_identifier};
use crate::log;
use crate::table::{Field, Schema, Table, TableError, Value};

type Outputs<T> = SmallVec<[T; 2]>;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStep {
    name: String,
    outputs: Outputs<(String, Expr)>,
}

impl FeatureStep {
    /// An empty step; add columns with [`FeatureStep::derive`].
    pub fn mutate(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outputs: Outputs::new(),
        }
    }

    /// A step producing the single column `column`, named after it.
    pub fn single(column: impl Into<String>, expr: Expr) -> Self {
        let column = column.into();
        Self::mutate(column.clone()).derive(column, expr)
    }

    /// Add an output column. Outputs of one step cannot see each other.
    pub fn derive(mut self, column: impl Into<String>, expr: Expr) -> Self {
        self.outputs.push((column.into(), expr));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.outputs.iter().map(|(c, e)| (c.as_str(), e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    NameCollision {
        step: String,
        column: String,
    },
    MissingColumn {
        step: String,
        column: String,
    },
    InvalidExpression {
        step: String,
        column: String,
        source: ExprError,
    },
    SortColumnMissing(String),
    SchemaMismatch,
    Table(TableError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::NameCollision { step, column } => {
                write!(f, "step '{step}': column '{column}' already exists")
            }
            PipelineError::MissingColumn { step, column } => {
                write!(f, "step '{step}': referenced column '{column}' not found")
            }
            PipelineError::InvalidExpression {
                step,
                column,
                source,
            } => write!(f, "step '{step}': column '{column}': {source}"),
            PipelineError::SortColumnMissing(column) => {
                write!(f, "order_by: column '{column}' not found")
            }
            PipelineError::SchemaMismatch => {
                write!(f, "input table schema differs from the planned schema")
            }
            PipelineError::Table(e) => write!(f, "{e}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::InvalidExpression { source, .. } => Some(source),
            PipelineError::Table(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TableError> for PipelineError {
    fn from(e: TableError) -> Self {
        PipelineError::Table(e)
    }
}

/// Anomaly counts for one derived column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    pub step: String,
    pub column: String,
    pub undefined: usize,
    pub unmatched: usize,
    pub nulls: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rows: usize,
    pub columns: Vec<ColumnReport>,
}

impl RunReport {
    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.column == name)
    }

    /// `; `-joined notes for columns with undefined or unmatched rows.
    pub fn summary(&self) -> Option<String> {
        let mut notes = ErrorAccumulator::default();
        for c in &self.columns {
            if c.undefined > 0 {
                notes.push(&format!(
                    "{}: {} undefined row(s) in step '{}'",
                    c.column, c.undefined, c.step
                ));
            }
            if c.unmatched > 0 {
                notes.push(&format!(
                    "{}: {} unmatched row(s) in step '{}'",
                    c.column, c.unmatched, c.step
                ));
            }
        }
        notes.take()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub table: Table,
    pub report: RunReport,
}

struct PlannedStep<'a> {
    name: &'a str,
    outputs: Vec<(&'a str, BoundExpr)>,
}

/// A validated pipeline, ready to run against tables with the schema it was planned for.
pub struct Plan<'a> {
    input: Schema,
    steps: Vec<PlannedStep<'a>>,
    output: Schema,
    order_by: Option<&'a str>,
}

impl Plan<'_> {
    pub fn output_schema(&self) -> &Schema {
        &self.output
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    steps: Vec<FeatureStep>,
    order_by: Option<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: FeatureStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Stable ascending sort on `column` after all steps; nulls sort last.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn steps(&self) -> &[FeatureStep] {
        &self.steps
    }

    /// Bind every step against the schema it will see, in declaration order.
    pub fn plan(&self, schema: &Schema) -> Result<Plan<'_>, PipelineError> {
        let mut current = schema.clone();
        let mut steps = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let mut outputs = Vec::with_capacity(step.outputs.len());
            let mut added: Vec<Field> = Vec::with_capacity(step.outputs.len());

            for (column, expr) in &step.outputs {
                if current.contains(column) || added.iter().any(|f| &f.name == column) {
                    return Err(PipelineError::NameCollision {
                        step: step.name.clone(),
                        column: column.clone(),
                    });
                }

                let bound = expr.bind(&current).map_err(|e| match e {
                    ExprError::MissingColumn(missing) => PipelineError::MissingColumn {
                        step: step.name.clone(),
                        column: missing,
                    },
                    other => PipelineError::InvalidExpression {
                        step: step.name.clone(),
                        column: column.clone(),
                        source: other,
                    },
                })?;

                added.push(Field {
                    name: column.clone(),
                    data_type: bound.data_type(),
                });
                outputs.push((column.as_str(), bound));
            }

            for field in added {
                current.push(field);
            }
            steps.push(PlannedStep {
                name: &step.name,
                outputs,
            });
        }

        if let Some(column) = &self.order_by
            && !current.contains(column)
        {
            return Err(PipelineError::SortColumnMissing(column.clone()));
        }

        Ok(Plan {
            input: schema.clone(),
            steps,
            output: current,
            order_by: self.order_by.as_deref(),
        })
    }

    pub fn run(&self, table: &Table) -> Result<PipelineOutput, PipelineError> {
        let plan = self.plan(table.schema())?;
        let output = plan.execute(table)?;

        if let Some(summary) = output.report.summary() {
            log::warn(summary);
        }
        log::info(format!(
            "pipeline derived {} column(s) over {} row(s)",
            output.report.columns.len(),
            output.report.rows
        ));

        Ok(output)
    }

    /// Render the pipeline as one DuckDB query over `source`.
    pub fn to_sql(&self, schema: &Schema, source: &str) -> Result<String, PipelineError> {
        self.plan(schema)?;

        let mut sql = format!("SELECT * FROM {}", quote_identifier(source));
        for step in &self.steps {
            let mut select = String::from("SELECT *");
            for (column, expr) in &step.outputs {
                let _ = write!(
                    select,
                    ", {} AS {}",
                    expr.to_sql(),
                    quote_identifier(column)
                );
            }
            sql = format!("{select} FROM ({sql})");
        }

        if let Some(column) = &self.order_by {
            sql = format!(
                "SELECT * FROM ({sql}) ORDER BY {} ASC NULLS LAST",
                quote_identifier(column)
            );
        }

        Ok(sql)
    }
}

impl Plan<'_> {
    /// Run against `table`, which must have the schema this plan was built from.
    pub fn execute(&self, table: &Table) -> Result<PipelineOutput, PipelineError> {
        if table.schema() != &self.input {
            return Err(PipelineError::SchemaMismatch);
        }

        let rows = table.num_rows();
        let mut current = table.clone();
        let mut report = RunReport {
            rows,
            columns: Vec::new(),
        };

        for step in &self.steps {
            // Evaluate all outputs before adding any, so outputs of one step stay independent.
            let mut derived = Vec::with_capacity(step.outputs.len());
            for (column, bound) in &step.outputs {
                let mut stats = EvalStats::default();
                let values: Vec<Value> = (0..rows)
                    .map(|row| bound.eval(current.columns(), row, &mut stats))
                    .collect();

                report.columns.push(ColumnReport {
                    step: step.name.to_string(),
                    column: column.to_string(),
                    undefined: stats.undefined,
                    unmatched: stats.unmatched,
                    nulls: values.iter().filter(|v| v.is_null()).count(),
                });
                derived.push((*column, bound.data_type(), values));
            }

            for (column, data_type, values) in derived {
                current = current.with_column(column, data_type, values)?;
            }
        }

        if let Some(column) = self.order_by {
            current = sort_stable(&current, column)?;
        }

        Ok(PipelineOutput {
            table: current,
            report,
        })
    }
}

fn sort_stable(table: &Table, column: &str) -> Result<Table, PipelineError> {
    let values = table
        .column(column)
        .ok_or_else(|| PipelineError::SortColumnMissing(column.to_string()))?;

    let mut indices: Vec<usize> = (0..table.num_rows()).collect();
    indices.sort_by(|&a, &b| values[a].sort_cmp(&values[b]));
    Ok(table.take(&indices))
}
