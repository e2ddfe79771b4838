//! Export task: serialize selected owners/tables to a staging directory,
//! then archive it.
//!
//! The staging directory holds one SQL file per exported table (target
//! dialect DDL followed by inline-rendered inserts) plus a manifest. On
//! success a zip archive is produced next to the staging directory and the
//! artifact paths land in the task's extend object; on any failure the
//! staging directory is removed so no partial artifact is left behind.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{SqlRender, StatementOptions};
use crate::core::identifier::format_index_name;
use crate::core::traits::{Connection, Dialect};
use crate::core::value::Page;
use crate::dialect::DialectImpl;
use crate::error::{DbError, Result};
use crate::task::{TaskCallbacks, TaskHandle};

/// Parameters for an export task.
#[derive(Clone)]
pub struct ExportParam {
    /// Owners to export; an owner with an empty table list exports all of
    /// its tables.
    pub owners: Vec<ExportOwner>,

    /// Base directory under which the staging directory is created.
    pub export_dir: PathBuf,

    /// Rows per read page.
    pub page_size: usize,

    pub options: StatementOptions,
    pub callbacks: TaskCallbacks,
}

/// One owner selection within an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOwner {
    pub name: String,
    /// Tables to export; empty means all tables under the owner.
    #[serde(default)]
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Manifest {
    task_id: String,
    owners: Vec<ManifestOwner>,
}

#[derive(Debug, Serialize)]
struct ManifestOwner {
    name: String,
    tables: Vec<ManifestTable>,
}

#[derive(Debug, Serialize)]
struct ManifestTable {
    name: String,
    rows: i64,
}

/// Export worker body.
pub(crate) async fn run_export(
    conn: Arc<dyn Connection>,
    target: DialectImpl,
    param: ExportParam,
    handle: TaskHandle,
) -> Result<()> {
    let staging = param.export_dir.join("export").join(handle.id());
    std::fs::create_dir_all(&staging)?;

    let result = export_owners(&conn, &target, &param, &handle, &staging).await;
    match result {
        Ok(()) => {
            let zip_path = staging.with_extension("zip");
            zip_dir(&staging, &zip_path)?;
            handle.set_extend("dirPath", staging.to_string_lossy().to_string().into());
            handle.set_extend("zipPath", zip_path.to_string_lossy().to_string().into());
            handle.set_extend(
                "downloadPath",
                format!("export/{}.zip", handle.id()).into(),
            );
            info!("export task {} archived to {:?}", handle.id(), zip_path);
            Ok(())
        }
        Err(err) => {
            let _ = std::fs::remove_dir_all(&staging);
            Err(err)
        }
    }
}

async fn export_owners(
    conn: &Arc<dyn Connection>,
    target: &DialectImpl,
    param: &ExportParam,
    handle: &TaskHandle,
    staging: &Path,
) -> Result<()> {
    let mut manifest = Manifest {
        task_id: handle.id().to_string(),
        owners: Vec::new(),
    };

    for owner in &param.owners {
        if handle.is_cancelled() {
            break;
        }

        let tables = if owner.tables.is_empty() {
            conn.tables(&owner.name).await?
        } else {
            let mut selected = Vec::new();
            for name in &owner.tables {
                match conn.table_detail(&owner.name, name).await? {
                    Some(table) => selected.push(table),
                    None => {
                        return Err(DbError::Config(format!(
                            "table {}.{} not found",
                            owner.name, name
                        )))
                    }
                }
            }
            selected
        };
        handle.add_total(tables.len() as i64);

        let owner_dir = staging.join(&owner.name);
        std::fs::create_dir_all(&owner_dir)?;
        let mut manifest_owner = ManifestOwner {
            name: owner.name.clone(),
            tables: Vec::new(),
        };

        for table in &tables {
            if handle.is_cancelled() {
                break;
            }
            match export_table(conn, target, param, handle, &owner.name, &table.table_name, &owner_dir)
                .await
            {
                Ok(rows) => {
                    handle.add_success(1);
                    manifest_owner.tables.push(ManifestTable {
                        name: table.table_name.clone(),
                        rows,
                    });
                    param.callbacks.progress(handle);
                }
                Err(err) if param.options.continue_on_error => {
                    handle.add_error(1);
                    param.callbacks.error(&err);
                }
                Err(err) => return Err(err),
            }
        }

        manifest.owners.push(manifest_owner);
    }

    let manifest_path = staging.join("manifest.json");
    let file = std::fs::File::create(manifest_path)?;
    serde_json::to_writer_pretty(file, &manifest)?;
    Ok(())
}

/// Export one table: target-dialect DDL, then its rows as inline inserts.
/// Returns the number of rows written.
async fn export_table(
    conn: &Arc<dyn Connection>,
    target: &DialectImpl,
    param: &ExportParam,
    handle: &TaskHandle,
    owner_name: &str,
    table_name: &str,
    owner_dir: &Path,
) -> Result<i64> {
    let mut table = conn
        .table_detail(owner_name, table_name)
        .await?
        .ok_or_else(|| DbError::Config(format!("table {}.{} not found", owner_name, table_name)))?;

    // Generated index names go through the deterministic namer so a later
    // re-export of the same schema produces identical DDL.
    for index in &mut table.indexes {
        index.name = format_index_name(
            owner_name,
            table_name,
            index,
            param.options.format_index_name,
            target.max_identifier_length(),
        );
    }

    let owner_q = if param.options.qualify_owner {
        Some(owner_name)
    } else {
        None
    };

    let mut content = String::new();
    if param.options.include_owner_create {
        for sql in target.owner_create_sql(owner_name) {
            content.push_str(&sql);
            content.push_str(";\n");
        }
        content.push('\n');
    }
    for sql in target.table_create_sql(owner_q, &table)? {
        content.push_str(&sql);
        content.push_str(";\n");
    }
    content.push('\n');

    let select = target.select_sql(owner_q, table_name, &table.columns, &[], &[], SqlRender::Bind)?;
    let mut page_no = 1usize;
    let mut rows_written = 0i64;
    loop {
        if handle.is_cancelled() {
            break;
        }
        let page = Page::new(param.page_size, page_no);
        let (rows, _total) = conn.query_page(&select, &page).await?;
        if rows.is_empty() {
            break;
        }
        let row_count = rows.len();
        let insert = target.insert_sql(owner_q, table_name, &table.columns, &rows, SqlRender::Inline)?;
        content.push_str(&insert.sql);
        content.push_str(";\n");
        handle.add_ready(row_count as i64);
        rows_written += row_count as i64;
        if row_count < param.page_size {
            break;
        }
        page_no += 1;
    }

    let path = owner_dir.join(format!("{}.sql", table_name));
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(rows_written)
}

/// Archive a directory tree into `dest`, paths relative to `src`.
fn zip_dir(src: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::create(dest)?;
    let mut writer = zip::ZipWriter::new(file);
    add_dir_entries(&mut writer, src, src)?;
    writer.finish()?;
    Ok(())
}

fn add_dir_entries(
    writer: &mut zip::ZipWriter<std::fs::File>,
    root: &Path,
    dir: &Path,
) -> Result<()> {
    let options = zip::write::FileOptions::default();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        if path.is_dir() {
            writer.add_directory(rel, options)?;
            add_dir_entries(writer, root, &path)?;
        } else {
            writer.start_file(rel, options)?;
            let mut file = std::fs::File::open(&path)?;
            std::io::copy(&mut file, writer)?;
        }
    }
    Ok(())
}
