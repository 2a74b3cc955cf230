//! SQL parser wrapper

use crate::dialect::SqlDialect;
use crate::error::{SqlError, SqlResult};
use sqlparser::ast::Statement;
use sqlparser::parser::Parser;

/// SQL parser wrapping sqlparser-rs with dialect support.
#[derive(Debug, Clone, Copy)]
pub struct SqlParser {
    dialect: SqlDialect,
}

impl SqlParser {
    /// Create a parser for the given dialect.
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    /// Parse SQL into AST statements.
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlError::EmptySql);
        }
        Ok(Parser::parse_sql(&*self.dialect.parser_dialect(), sql)?)
    }

    /// The dialect this parser uses.
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new(SqlDialect::DuckDb)
    }
}
