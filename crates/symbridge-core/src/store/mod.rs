//! # Debug Metadata Store
//!
//! Persists the debug metadata emitted while compiling a managed program to
//! native code, and answers lookups against it while debugging.
//!
//! Four record families are kept, plus the address/label table and an audit
//! table of allocated method ids:
//!
//! | records | write | lookup misses |
//! |---|---|---|
//! | [`FieldGroup`] | transactional, first write per type wins | empty group |
//! | [`FieldLayout`] | transactional, first write per name wins | [`SymbridgeError::NotFound`] |
//! | [`MethodSymbol`] | transactional, no dedup | `None` |
//! | [`LocalOrArgumentInfo`] | row by row, no transaction | empty list |
//! | [`AddressLabel`] | transactional | n/a |
//!
//! ## Example
//!
//! ```rust
//! use symbridge_core::store::DebugStore;
//! use symbridge_core::types::{AddressLabel, FieldGroup};
//!
//! let store = DebugStore::open_in_memory()?;
//! store.write_field_groups(&[FieldGroup::new("Foo", ["a", "b"])])?;
//! store.write_labels(&[AddressLabel::new(0x1000_u64, "main")])?;
//!
//! assert_eq!(store.read_field_group("Foo")?.field_names, ["a", "b"]);
//! assert_eq!(store.load_label_table()?.address_of("main").map(|a| a.value()), Some(0x1000));
//! store.close()?;
//! # Ok::<(), symbridge_core::error::SymbridgeError>(())
//! ```
//!
//! ## Thread Safety
//!
//! A single mutex guards the connection together with the dedup sets and the
//! method-id counter. Every operation, read or write, runs alone, so at most
//! one transaction is ever in flight per store.

mod schema;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, warn};

use crate::error::{Result, SymbridgeError};
use crate::labels::LabelTable;
use crate::types::{Address, AddressLabel, FieldGroup, FieldLayout, LocalOrArgumentInfo, MethodSymbol};

/// Session-scoped state behind the store lock.
struct Inner
{
    /// `None` once the store is closed.
    conn: Option<Connection>,
    /// Type names whose field groups were written by this store instance.
    written_type_names: HashSet<String>,
    /// Field names whose layouts were written by this store instance.
    written_field_names: HashSet<String>,
    /// Last id handed out by [`DebugStore::allocate_method_id`].
    last_method_id: i32,
}

/// Handle to one debug metadata store.
///
/// Own it explicitly and pass it (or an `Arc` of it) to whatever needs symbol
/// lookups; there is no process-wide current instance.
pub struct DebugStore
{
    location: Option<PathBuf>,
    inner: Mutex<Inner>,
}

impl DebugStore
{
    /// Open the store at `path`, creating the schema if it is missing.
    ///
    /// With `create_fresh`, an existing store at `path` is deleted first and
    /// recreated empty.
    ///
    /// ## Errors
    ///
    /// [`SymbridgeError::StoreUnavailable`] if the file cannot be removed,
    /// opened, locked, or holds something other than a valid store.
    pub fn create_or_open(path: impl AsRef<Path>, create_fresh: bool) -> Result<Self>
    {
        let path = path.as_ref();
        if create_fresh {
            schema::destroy(path)?;
        }

        let conn = Connection::open(path)
            .map_err(|err| SymbridgeError::StoreUnavailable(format!("cannot open {}: {err}", path.display())))?;
        schema::initialize(&conn, path)?;
        debug!("Opened debug store {} (fresh: {})", path.display(), create_fresh);

        Ok(Self::from_connection(conn, Some(path.to_path_buf())))
    }

    /// Open a private in-memory store. Everything is lost on close.
    pub fn open_in_memory() -> Result<Self>
    {
        let conn = Connection::open_in_memory()
            .map_err(|err| SymbridgeError::StoreUnavailable(format!("cannot open in-memory store: {err}")))?;
        schema::initialize(&conn, Path::new(":memory:"))?;
        Ok(Self::from_connection(conn, None))
    }

    fn from_connection(conn: Connection, location: Option<PathBuf>) -> Self
    {
        Self {
            location,
            inner: Mutex::new(Inner {
                conn: Some(conn),
                written_type_names: HashSet::new(),
                written_field_names: HashSet::new(),
                last_method_id: 0,
            }),
        }
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path>
    {
        self.location.as_deref()
    }

    /// `true` after [`DebugStore::close`].
    pub fn is_closed(&self) -> bool
    {
        self.inner.lock().map_or(true, |inner| inner.conn.is_none())
    }

    /// Insert field groups for types not yet written by this store instance.
    ///
    /// One row per `(type, field)` in the group's field order. The whole batch
    /// commits or rolls back together.
    pub fn write_field_groups(&self, groups: &[FieldGroup]) -> Result<()>
    {
        let mut guard = self.lock()?;
        let Inner {
            conn,
            written_type_names,
            ..
        } = &mut *guard;
        let conn = live(conn)?;

        let mut in_batch = HashSet::new();
        let pending: Vec<&FieldGroup> = groups
            .iter()
            .filter(|group| !written_type_names.contains(&group.type_name) && in_batch.insert(group.type_name.as_str()))
            .collect();

        in_transaction(conn, "write_field_groups", |tx| {
            let mut stmt = tx.prepare_cached(schema::INSERT_FIELD_MAPPING)?;
            for group in &pending {
                for field_name in &group.field_names {
                    stmt.execute(params![group.type_name, field_name])?;
                }
            }
            Ok(())
        })?;

        debug!("Wrote {} of {} field groups", pending.len(), groups.len());
        written_type_names.extend(pending.into_iter().map(|group| group.type_name.clone()));
        Ok(())
    }

    /// Field names stored for `type_name`, in emission order.
    ///
    /// A type that was never written yields an empty group, not an error.
    pub fn read_field_group(&self, type_name: &str) -> Result<FieldGroup>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::SELECT_FIELD_MAPPING_BY_TYPE)?;
        let field_names = stmt
            .query_map(params![type_name], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(FieldGroup {
            type_name: type_name.to_string(),
            field_names,
        })
    }

    /// Every stored field group, ordered by type name.
    ///
    /// Rows for one type need not be adjacent on disk; they come back sorted
    /// by type name and consecutive rows of the same type are folded together.
    pub fn read_all_field_groups(&self) -> Result<Vec<FieldGroup>>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::SELECT_FIELD_MAPPING)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut groups: Vec<FieldGroup> = Vec::new();
        for row in rows {
            let (type_name, field_name) = row?;
            match groups.last_mut() {
                Some(current) if current.type_name == type_name => current.field_names.push(field_name),
                _ => groups.push(FieldGroup {
                    type_name,
                    field_names: vec![field_name],
                }),
            }
        }
        Ok(groups)
    }

    /// Insert field layouts whose field name was not yet written by this store instance.
    pub fn write_field_layouts(&self, layouts: &[FieldLayout]) -> Result<()>
    {
        let mut guard = self.lock()?;
        let Inner {
            conn,
            written_field_names,
            ..
        } = &mut *guard;
        let conn = live(conn)?;

        let mut in_batch = HashSet::new();
        let pending: Vec<&FieldLayout> = layouts
            .iter()
            .filter(|layout| !written_field_names.contains(&layout.name) && in_batch.insert(layout.name.as_str()))
            .collect();

        in_transaction(conn, "write_field_layouts", |tx| {
            let mut stmt = tx.prepare_cached(schema::INSERT_FIELD_INFO)?;
            for layout in &pending {
                stmt.execute(params![layout.type_name, layout.offset, layout.name])?;
            }
            Ok(())
        })?;

        debug!("Wrote {} of {} field layouts", pending.len(), layouts.len());
        written_field_names.extend(pending.into_iter().map(|layout| layout.name.clone()));
        Ok(())
    }

    /// Layout of the field called `name`.
    ///
    /// ## Errors
    ///
    /// [`SymbridgeError::NotFound`] if no such field was stored. Callers use
    /// this for fields they know exist.
    pub fn read_field_layout(&self, name: &str) -> Result<FieldLayout>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let layout = conn
            .prepare_cached(schema::SELECT_FIELD_INFO_BY_NAME)?
            .query_row(params![name], field_layout_from_row)
            .optional()?;
        layout.ok_or_else(|| SymbridgeError::NotFound {
            kind: "field layout",
            key: name.to_string(),
        })
    }

    /// Every stored field layout, in no particular order.
    pub fn read_all_field_layouts(&self) -> Result<Vec<FieldLayout>>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::SELECT_FIELD_INFO)?;
        let layouts = stmt
            .query_map([], field_layout_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(layouts)
    }

    /// Insert method symbols, one row each.
    ///
    /// There is no dedup: a label written twice violates the unique label
    /// constraint and rolls back the whole batch.
    pub fn write_method_symbols(&self, symbols: &[MethodSymbol]) -> Result<()>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        in_transaction(conn, "write_method_symbols", |tx| {
            let mut stmt = tx.prepare_cached(schema::INSERT_MLSYMBOL)?;
            for symbol in symbols {
                stmt.execute(params![
                    symbol.label_name,
                    symbol.stack_difference,
                    symbol.assembly_file,
                    symbol.type_token,
                    symbol.method_token,
                    symbol.il_offset,
                    symbol.method_name,
                ])?;
            }
            Ok(())
        })?;

        debug!("Wrote {} method symbols", symbols.len());
        Ok(())
    }

    /// Method symbol emitted for `label_name`, if any.
    ///
    /// Queried speculatively while mapping disassembly back to IL, so a miss
    /// is `None` rather than an error.
    pub fn read_method_symbol(&self, label_name: &str) -> Result<Option<MethodSymbol>>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let symbol = conn
            .prepare_cached(schema::SELECT_MLSYMBOL_BY_LABEL)?
            .query_row(params![label_name], method_symbol_from_row)
            .optional()?;
        Ok(symbol)
    }

    /// Every stored method symbol, in write order.
    pub fn read_all_method_symbols(&self) -> Result<Vec<MethodSymbol>>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::SELECT_MLSYMBOLS)?;
        let symbols = stmt
            .query_map([], method_symbol_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(symbols)
    }

    /// Insert local/argument records one by one.
    ///
    /// Not wrapped in a transaction: the first failing record aborts the call
    /// and is reported, but rows inserted before it stay.
    pub fn write_local_argument_infos(&self, infos: &[LocalOrArgumentInfo]) -> Result<()>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::INSERT_LOCAL_ARGUMENT_INFO)?;
        for info in infos {
            stmt.execute(params![
                info.method_label_name,
                info.is_argument,
                info.is_array_element,
                info.index,
                info.offset,
                info.name,
                info.type_name,
            ])?;
        }

        debug!("Wrote {} local/argument infos", infos.len());
        Ok(())
    }

    /// Every stored local/argument record.
    pub fn read_all_local_argument_infos(&self) -> Result<Vec<LocalOrArgumentInfo>>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::SELECT_LOCAL_ARGUMENT_INFO)?;
        let infos = stmt
            .query_map([], local_argument_info_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(infos)
    }

    /// Locals and arguments of the method whose entry label is `method_label_name`.
    pub fn read_local_argument_infos_for_method(&self, method_label_name: &str) -> Result<Vec<LocalOrArgumentInfo>>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::SELECT_LOCAL_ARGUMENT_INFO_BY_METHOD)?;
        let infos = stmt
            .query_map(params![method_label_name], local_argument_info_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(infos)
    }

    /// Insert address/label pairs in one transaction.
    pub fn write_labels(&self, labels: &[AddressLabel]) -> Result<()>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        in_transaction(conn, "write_labels", |tx| {
            let mut stmt = tx.prepare_cached(schema::INSERT_LABEL)?;
            for label in labels {
                stmt.execute(params![label.label_name, address_to_sql(label.address)])?;
            }
            Ok(())
        })?;

        debug!("Wrote {} labels", labels.len());
        Ok(())
    }

    /// All labels in write order, together with a label -> address map.
    ///
    /// Both views are filled from a single pass over the table.
    pub fn read_all_labels(&self) -> Result<(Vec<AddressLabel>, HashMap<String, Address>)>
    {
        let mut guard = self.lock()?;
        let conn = live(&mut guard.conn)?;

        let mut stmt = conn.prepare_cached(schema::SELECT_LABELS)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, address_from_sql(row.get(1)?))))?;

        let mut ordered = Vec::new();
        let mut by_name = HashMap::new();
        for row in rows {
            let (label_name, address) = row?;
            by_name.insert(label_name.clone(), address);
            ordered.push(AddressLabel { address, label_name });
        }
        Ok((ordered, by_name))
    }

    /// Read every label into an immutable [`LabelTable`].
    pub fn load_label_table(&self) -> Result<LabelTable>
    {
        let (ordered, by_name) = self.read_all_labels()?;
        Ok(LabelTable::from_parts(ordered, by_name))
    }

    /// Hand out the next method id (1, 2, 3, ...) and record it with `label_prefix`.
    ///
    /// Ids are unique for the lifetime of this store instance only; a reopened
    /// store starts again at 1.
    pub fn allocate_method_id(&self, label_prefix: &str) -> Result<i32>
    {
        let mut guard = self.lock()?;
        let next = guard.last_method_id + 1;
        live(&mut guard.conn)?.execute(schema::INSERT_METHOD, params![next, label_prefix])?;
        guard.last_method_id = next;
        Ok(next)
    }

    /// Release the underlying connection.
    ///
    /// Calling this again is a no-op. Every other operation on a closed store
    /// fails with [`SymbridgeError::StoreUnavailable`].
    pub fn close(&self) -> Result<()>
    {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.conn.take() {
            if let Err((_conn, err)) = conn.close() {
                // The connection is dropped anyway, which releases the handle.
                warn!("Debug store did not close cleanly: {err}");
            }
            debug!("Closed debug store");
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>>
    {
        self.inner
            .lock()
            .map_err(|_| SymbridgeError::StoreUnavailable("store lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for DebugStore
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("DebugStore")
            .field("location", &self.location)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn live(conn: &mut Option<Connection>) -> Result<&mut Connection>
{
    conn.as_mut()
        .ok_or_else(|| SymbridgeError::StoreUnavailable("store is closed".to_string()))
}

/// Run `body` in a transaction; any failure rolls the whole batch back.
fn in_transaction<F>(conn: &mut Connection, operation: &'static str, body: F) -> Result<()>
where
    F: FnOnce(&Transaction<'_>) -> rusqlite::Result<()>,
{
    let tx = conn
        .transaction()
        .map_err(|source| SymbridgeError::TransactionFailed { operation, source })?;
    // Dropping an uncommitted transaction rolls it back.
    body(&tx).and_then(|()| tx.commit()).map_err(|source| {
        warn!("{operation} rolled back: {source}");
        SymbridgeError::TransactionFailed { operation, source }
    })
}

#[allow(clippy::cast_possible_wrap)]
fn address_to_sql(address: Address) -> i64
{
    // SQLite integers are signed; keep the bit pattern.
    address.value() as i64
}

#[allow(clippy::cast_sign_loss)]
fn address_from_sql(value: i64) -> Address
{
    Address::new(value as u64)
}

fn field_layout_from_row(row: &Row<'_>) -> rusqlite::Result<FieldLayout>
{
    Ok(FieldLayout {
        type_name: row.get(0)?,
        offset: row.get(1)?,
        name: row.get(2)?,
    })
}

fn method_symbol_from_row(row: &Row<'_>) -> rusqlite::Result<MethodSymbol>
{
    Ok(MethodSymbol {
        label_name: row.get(0)?,
        stack_difference: row.get(1)?,
        assembly_file: row.get(2)?,
        type_token: row.get(3)?,
        method_token: row.get(4)?,
        il_offset: row.get(5)?,
        method_name: row.get(6)?,
    })
}

fn local_argument_info_from_row(row: &Row<'_>) -> rusqlite::Result<LocalOrArgumentInfo>
{
    Ok(LocalOrArgumentInfo {
        method_label_name: row.get(0)?,
        is_argument: row.get(1)?,
        is_array_element: row.get(2)?,
        index: row.get(3)?,
        offset: row.get(4)?,
        name: row.get(5)?,
        type_name: row.get(6)?,
    })
}
