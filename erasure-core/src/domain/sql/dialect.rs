// erasure-core/src/domain/sql/dialect.rs
//
// Per-dialect SQL syntax: identifier quoting, bind placeholders, text casts
// and pagination. Values never reach the SQL text, they are always bound.

use crate::domain::datasource::Dialect;
use crate::domain::sql::statement::TableRef;

impl Dialect {
    /// Identifier as the server stores it. Oracle keeps names that are legal
    /// unquoted in upper case, so `customers` and `CUSTOMERS` are the same table;
    /// names needing quotes (mixed with spaces, symbols...) are kept verbatim.
    pub fn fold_ident(&self, ident: &str) -> String {
        match self {
            Dialect::Oracle if is_plain_oracle_ident(ident) => ident.to_uppercase(),
            _ => ident.to_string(),
        }
    }

    /// Quotes an identifier, doubling any embedded quote character.
    pub fn quote_ident(&self, ident: &str) -> String {
        let q = match self {
            Dialect::MySql => '`',
            Dialect::Oracle | Dialect::Postgres | Dialect::SqlServer => '"',
        };
        let escaped = self.fold_ident(ident).replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${}", index),
            Dialect::Oracle => format!(":{}", index),
            Dialect::SqlServer => format!("@P{}", index),
        }
    }

    pub fn qualified_table(&self, table: &TableRef) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_ident(schema),
                self.quote_ident(&table.table)
            ),
            None => self.quote_ident(&table.table),
        }
    }

    /// Column rendered as text, for reads.
    pub fn as_text(&self, column: &str) -> String {
        let col = self.quote_ident(column);
        match self {
            Dialect::MySql => format!("CAST({} AS CHAR)", col),
            Dialect::Postgres => format!("{}::text", col),
            Dialect::Oracle => format!("TO_CHAR({})", col),
            Dialect::SqlServer => format!("CAST({} AS NVARCHAR(4000))", col),
        }
    }

    /// Equality between a column and a text parameter.
    /// PostgreSQL does not coerce text parameters against typed columns, so the column is cast.
    pub fn text_equals(&self, column: &str, index: usize) -> String {
        let lhs = match self {
            Dialect::Postgres => format!("{}::text", self.quote_ident(column)),
            _ => self.quote_ident(column),
        };
        format!("{} = {}", lhs, self.placeholder(index))
    }

    /// `SELECT pk, column ... ORDER BY pk` with offset/limit bound as parameters 1 and 2
    /// (`LIMIT` first for MySQL/PostgreSQL, `OFFSET` first for Oracle/SQL Server).
    pub fn batch_select(&self, table: &TableRef, primary_key: &str, column: &str) -> String {
        let head = format!(
            "SELECT {}, {} FROM {} ORDER BY {}",
            self.as_text(primary_key),
            self.as_text(column),
            self.qualified_table(table),
            self.quote_ident(primary_key)
        );
        match self {
            Dialect::MySql | Dialect::Postgres => format!(
                "{} LIMIT {} OFFSET {}",
                head,
                self.placeholder(1),
                self.placeholder(2)
            ),
            Dialect::Oracle | Dialect::SqlServer => format!(
                "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                head,
                self.placeholder(1),
                self.placeholder(2)
            ),
        }
    }

    /// Whether [`Dialect::batch_select`] binds the limit before the offset.
    pub fn binds_limit_first(&self) -> bool {
        matches!(self, Dialect::MySql | Dialect::Postgres)
    }

    pub fn count_rows(&self, table: &TableRef) -> String {
        match self {
            Dialect::SqlServer => format!("SELECT COUNT_BIG(*) FROM {}", self.qualified_table(table)),
            _ => format!("SELECT COUNT(*) FROM {}", self.qualified_table(table)),
        }
    }

    /// Primary-key introspection. Parameter 1 is the table name, parameter 2 the schema
    /// (only bound when `with_schema` is true; otherwise the session's current schema is used).
    pub fn primary_keys_query(&self, with_schema: bool) -> String {
        match self {
            Dialect::MySql => format!(
                "SELECT CAST(COLUMN_NAME AS CHAR) FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE CONSTRAINT_NAME = 'PRIMARY' AND TABLE_NAME = ? AND TABLE_SCHEMA = {} \
                 ORDER BY ORDINAL_POSITION",
                if with_schema { "?" } else { "DATABASE()" }
            ),
            Dialect::Postgres => format!(
                "SELECT kcu.column_name::text FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                 ON tc.constraint_name = kcu.constraint_name \
                 AND tc.table_schema = kcu.table_schema AND tc.table_name = kcu.table_name \
                 WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_name = $1 \
                 AND tc.table_schema = {} ORDER BY kcu.ordinal_position",
                if with_schema { "$2" } else { "current_schema()" }
            ),
            Dialect::Oracle => format!(
                "SELECT cols.column_name FROM all_constraints cons \
                 JOIN all_cons_columns cols \
                 ON cons.constraint_name = cols.constraint_name AND cons.owner = cols.owner \
                 WHERE cons.constraint_type = 'P' AND cols.table_name = :1 AND cols.owner = {} \
                 ORDER BY cols.position",
                if with_schema { ":2" } else { "USER" }
            ),
            Dialect::SqlServer => format!(
                "SELECT kcu.COLUMN_NAME FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
                 JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
                 ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA \
                 WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_NAME = @P1 \
                 AND tc.TABLE_SCHEMA = {} ORDER BY kcu.ORDINAL_POSITION",
                if with_schema { "@P2" } else { "SCHEMA_NAME()" }
            ),
        }
    }
}

fn is_plain_oracle_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'))
        }
        _ => false,
    }
}
