//! Core types and seams shared by every component.

pub mod identifier;
pub mod schema;
pub mod sqltext;
pub mod traits;
pub mod value;

pub use identifier::{format_index_name, shrink_identifier};
pub use schema::{
    ColumnModel, IndexModel, TableModel, UpdateTableColumn, UpdateTableIndex, UpdateTableParam,
};
pub use sqltext::{is_query_statement, split_sql_statements};
pub use traits::{Connection, ConnectionOpener, Dialect, Order, Where};
pub use value::{CellValue, Page, Row, SqlStatement};
