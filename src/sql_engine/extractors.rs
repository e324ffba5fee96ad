//! Table and function extraction from parsed SQL

use serde::Serialize;
use sqlparser::ast::{
    Expr, FromTable, Function, FunctionArg, FunctionArgExpr, FunctionArguments, ObjectName, Query,
    Statement, TableFactor, TableFunctionArgs, TableObject, Visit, Visitor,
};
use std::collections::HashSet;
use std::ops::ControlFlow;

use super::error::SqlResult;
use super::parser::SqlParser;
use super::pattern;

/// Built-in SQL functions that are not lineage-relevant calls
const BUILTIN_FUNCTIONS: &[&str] = &[
    "COUNT", "SUM", "AVG", "MIN", "MAX", "DATE", "TIME", "TIMESTAMP", "EXTRACT", "CONCAT",
    "CONCAT_WS", "SUBSTRING", "SUBSTR", "UPPER", "LOWER", "COALESCE", "NULLIF", "CAST",
    "CONVERT", "ROUND", "FLOOR", "CEILING", "CEIL", "ABS", "DATE_TRUNC", "DATE_PART",
    "DATE_DIFF", "DATE_ADD", "DATE_SUB", "DATEDIFF", "DATEADD", "DATE_FORMAT", "STR_TO_DATE",
    "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "NOW", "GETDATE", "SYSDATE",
    "CURDATE", "CURTIME", "YEAR", "MONTH", "DAY", "IF", "IFNULL", "ISNULL", "NVL", "NVL2",
    "IIF", "DECODE", "LENGTH", "LEN", "CHAR_LENGTH", "TRIM", "LTRIM", "RTRIM", "REPLACE",
    "LEFT", "RIGHT", "INSTR", "LOCATE", "POSITION", "TO_CHAR", "TO_DATE", "TO_NUMBER",
    "TO_TIMESTAMP", "MOD", "POWER", "SQRT", "GREATEST", "LEAST", "FORMAT", "ROW_NUMBER",
    "RANK", "DENSE_RANK", "NTILE", "LAG", "LEAD", "FIRST_VALUE", "LAST_VALUE",
    "STRING_AGG", "GROUP_CONCAT", "LISTAGG", "UNIX_TIMESTAMP", "FROM_UNIXTIME",
];

/// Tables read and functions called by one piece of SQL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineageFacts {
    /// Tables read, first-seen order, no duplicates
    pub tables: Vec<String>,
    /// Function and procedure signatures, first-seen order, no duplicates
    pub functions: Vec<String>,
}

/// Parse `sql` with the grammar parser and collect its lineage facts
pub fn try_grammar_parse(parser: &SqlParser, sql: &str) -> SqlResult<LineageFacts> {
    let statements = parser.parse(sql)?;
    Ok(extract_lineage(&statements))
}

/// Collect tables following `FROM`/`JOIN` without parsing. Never fails and
/// never reports functions.
pub fn pattern_parse(sql: &str) -> LineageFacts {
    LineageFacts {
        tables: pattern::find_from_tables(sql),
        functions: Vec::new(),
    }
}

/// Walk parsed statements and collect the tables they read and the functions
/// they call.
///
/// Write targets of INSERT, UPDATE, DELETE, MERGE and DDL statements are left
/// out of the read set of their statement, as are CTE names.
pub fn extract_lineage(statements: &[Statement]) -> LineageFacts {
    let mut visitor = LineageVisitor::default();
    for statement in statements {
        let _ = statement.visit(&mut visitor);
    }
    visitor.facts
}

/// Render an object name as it appears in source, without identifier quotes
pub fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// Render a call as `name(arity)`
pub fn function_signature(function: &Function) -> String {
    let arity = match &function.args {
        FunctionArguments::None => 0,
        FunctionArguments::Subquery(_) => 1,
        FunctionArguments::List(list) => list.args.len(),
    };
    format!("{}({})", object_name_to_string(&function.name), arity)
}

/// Table-valued function call in a FROM clause, `None` for plain tables.
/// MSSQL's legacy `FROM t (NOLOCK)` hint parses as arguments too and stays a table.
fn table_function_signature(relation: &TableFactor) -> Option<String> {
    let TableFactor::Table {
        name,
        args: Some(args),
        ..
    } = relation
    else {
        return None;
    };
    if is_table_hint(args) {
        return None;
    }
    Some(format!("{}({})", object_name_to_string(name), args.args.len()))
}

fn is_table_hint(args: &TableFunctionArgs) -> bool {
    !args.args.is_empty()
        && args.args.iter().all(|arg| {
            matches!(
                arg,
                FunctionArg::Unnamed(FunctionArgExpr::Expr(Expr::Identifier(ident)))
                    if ident.value.eq_ignore_ascii_case("NOLOCK")
            )
        })
}

fn is_builtin(function: &Function) -> bool {
    match function.name.0.as_slice() {
        [ident] => BUILTIN_FUNCTIONS
            .iter()
            .any(|builtin| builtin.eq_ignore_ascii_case(&ident.value)),
        _ => false,
    }
}

fn relation_name(relation: &TableFactor) -> Option<String> {
    match relation {
        TableFactor::Table { name, .. } => Some(object_name_to_string(name)),
        _ => None,
    }
}

/// Tables a statement writes to
fn write_targets(statement: &Statement) -> Vec<String> {
    match statement {
        Statement::Insert(insert) => match &insert.table {
            TableObject::TableName(name) => vec![object_name_to_string(name)],
            _ => Vec::new(),
        },
        Statement::Update { table, .. } => relation_name(&table.relation).into_iter().collect(),
        Statement::Delete(delete) => {
            let mut targets: Vec<String> = delete.tables.iter().map(object_name_to_string).collect();
            if targets.is_empty() {
                let from = match &delete.from {
                    FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
                };
                targets.extend(from.iter().filter_map(|t| relation_name(&t.relation)));
            }
            targets
        }
        Statement::Merge { table, .. } => relation_name(table).into_iter().collect(),
        Statement::CreateTable(create) => vec![object_name_to_string(&create.name)],
        Statement::CreateView { name, .. } => vec![object_name_to_string(name)],
        Statement::AlterTable { name, .. } => vec![object_name_to_string(name)],
        Statement::Drop { names, .. } => names.iter().map(object_name_to_string).collect(),
        _ => Vec::new(),
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Relations seen inside one statement, filtered when the statement ends
#[derive(Default)]
struct StatementScope {
    relations: Vec<String>,
    /// Quoted CTE names, matched exactly
    cte_names: HashSet<String>,
    /// Unquoted CTE names, lowercased
    folded_cte_names: HashSet<String>,
    write_targets: HashSet<String>,
}

impl StatementScope {
    fn is_cte(&self, relation: &str) -> bool {
        self.cte_names.contains(relation)
            || self.folded_cte_names.contains(&relation.to_lowercase())
    }
}

#[derive(Default)]
struct LineageVisitor {
    scopes: Vec<StatementScope>,
    /// Set when the next relation is the name of a table-valued function
    skip_relation: bool,
    facts: LineageFacts,
}

impl Visitor for LineageVisitor {
    type Break = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        match statement {
            Statement::Call(procedure) => {
                push_unique(&mut self.facts.functions, function_signature(procedure));
            }
            Statement::Execute {
                name, parameters, ..
            } => {
                let signature = format!("{}({})", object_name_to_string(name), parameters.len());
                push_unique(&mut self.facts.functions, signature);
            }
            _ => {}
        }
        self.scopes.push(StatementScope {
            write_targets: write_targets(statement).into_iter().collect(),
            ..Default::default()
        });
        ControlFlow::Continue(())
    }

    fn post_visit_statement(&mut self, _statement: &Statement) -> ControlFlow<Self::Break> {
        if let Some(scope) = self.scopes.pop() {
            for table in &scope.relations {
                if !scope.is_cte(table) && !scope.write_targets.contains(table) {
                    push_unique(&mut self.facts.tables, table.clone());
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let (Some(with), Some(scope)) = (&query.with, self.scopes.last_mut()) {
            for cte in &with.cte_tables {
                let name = &cte.alias.name;
                if name.quote_style.is_some() {
                    scope.cte_names.insert(name.value.clone());
                } else {
                    scope.folded_cte_names.insert(name.value.to_lowercase());
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let Some(signature) = table_function_signature(table_factor) {
            push_unique(&mut self.facts.functions, signature);
            self.skip_relation = true;
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if std::mem::take(&mut self.skip_relation) {
            return ControlFlow::Continue(());
        }
        let name = object_name_to_string(relation);
        match self.scopes.last_mut() {
            Some(scope) => scope.relations.push(name),
            None => push_unique(&mut self.facts.tables, name),
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Expr::Function(function) = expr {
            if !is_builtin(function) {
                push_unique(&mut self.facts.functions, function_signature(function));
            }
        }
        ControlFlow::Continue(())
    }
}
