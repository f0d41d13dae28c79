//! Table layout and SQL statements for the debug metadata store.

use std::io;
use std::path::Path;

use rusqlite::Connection;

use crate::error::{Result, SymbridgeError};

/// Schema, created on open when absent.
///
/// `ID` gives every table a stable insertion order. `OFFSET` is quoted because
/// it is an SQL keyword.
pub(crate) const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS FIELD_MAPPING (
    ID          INTEGER PRIMARY KEY,
    TYPE_NAME   TEXT NOT NULL,
    FIELD_NAME  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS IX_FIELD_MAPPING_TYPE_NAME ON FIELD_MAPPING (TYPE_NAME);

CREATE TABLE IF NOT EXISTS FIELD_INFO (
    ID        INTEGER PRIMARY KEY,
    TYPE      TEXT NOT NULL,
    "OFFSET"  INTEGER NOT NULL,
    NAME      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS IX_FIELD_INFO_NAME ON FIELD_INFO (NAME);

CREATE TABLE IF NOT EXISTS MLSYMBOLS (
    ID           INTEGER PRIMARY KEY,
    LABELNAME    TEXT NOT NULL UNIQUE,
    STACKDIFF    INTEGER NOT NULL,
    ILASMFILE    TEXT NOT NULL,
    TYPETOKEN    INTEGER NOT NULL,
    METHODTOKEN  INTEGER NOT NULL,
    ILOFFSET     INTEGER NOT NULL,
    METHODNAME   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS LOCAL_ARGUMENT_INFO (
    ID               INTEGER PRIMARY KEY,
    METHODLABELNAME  TEXT NOT NULL,
    ISARGUMENT       INTEGER NOT NULL,
    ISARRAYELEMENT   INTEGER NOT NULL DEFAULT 0,
    INDEXINMETHOD    INTEGER NOT NULL,
    "OFFSET"         INTEGER NOT NULL,
    NAME             TEXT NOT NULL,
    TYPENAME         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS IX_LOCAL_ARGUMENT_INFO_METHOD ON LOCAL_ARGUMENT_INFO (METHODLABELNAME);

CREATE TABLE IF NOT EXISTS Labels (
    ID         INTEGER PRIMARY KEY,
    LABELNAME  TEXT NOT NULL UNIQUE,
    ADDRESS    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS IX_Labels_ADDRESS ON Labels (ADDRESS);

CREATE TABLE IF NOT EXISTS Methods (
    ID           INTEGER PRIMARY KEY,
    MethodId     INTEGER NOT NULL,
    LabelPrefix  TEXT NOT NULL
);
"#;

pub(crate) const INSERT_FIELD_MAPPING: &str = "INSERT INTO FIELD_MAPPING (TYPE_NAME, FIELD_NAME) VALUES (?1, ?2)";
pub(crate) const SELECT_FIELD_MAPPING_BY_TYPE: &str =
    "SELECT FIELD_NAME FROM FIELD_MAPPING WHERE TYPE_NAME = ?1 ORDER BY ID";
pub(crate) const SELECT_FIELD_MAPPING: &str = "SELECT TYPE_NAME, FIELD_NAME FROM FIELD_MAPPING ORDER BY TYPE_NAME, ID";

pub(crate) const INSERT_FIELD_INFO: &str = r#"INSERT INTO FIELD_INFO (TYPE, "OFFSET", NAME) VALUES (?1, ?2, ?3)"#;
pub(crate) const SELECT_FIELD_INFO_BY_NAME: &str =
    r#"SELECT TYPE, "OFFSET", NAME FROM FIELD_INFO WHERE NAME = ?1 ORDER BY ID LIMIT 1"#;
pub(crate) const SELECT_FIELD_INFO: &str = r#"SELECT TYPE, "OFFSET", NAME FROM FIELD_INFO"#;

pub(crate) const INSERT_MLSYMBOL: &str = "INSERT INTO MLSYMBOLS \
     (LABELNAME, STACKDIFF, ILASMFILE, TYPETOKEN, METHODTOKEN, ILOFFSET, METHODNAME) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
pub(crate) const SELECT_MLSYMBOL_BY_LABEL: &str = "SELECT LABELNAME, STACKDIFF, ILASMFILE, TYPETOKEN, METHODTOKEN, \
     ILOFFSET, METHODNAME FROM MLSYMBOLS WHERE LABELNAME = ?1";
pub(crate) const SELECT_MLSYMBOLS: &str = "SELECT LABELNAME, STACKDIFF, ILASMFILE, TYPETOKEN, METHODTOKEN, ILOFFSET, \
     METHODNAME FROM MLSYMBOLS ORDER BY ID";

pub(crate) const INSERT_LOCAL_ARGUMENT_INFO: &str = r#"INSERT INTO LOCAL_ARGUMENT_INFO
     (METHODLABELNAME, ISARGUMENT, ISARRAYELEMENT, INDEXINMETHOD, "OFFSET", NAME, TYPENAME)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#;
pub(crate) const SELECT_LOCAL_ARGUMENT_INFO: &str = r#"SELECT METHODLABELNAME, ISARGUMENT, ISARRAYELEMENT,
     INDEXINMETHOD, "OFFSET", NAME, TYPENAME FROM LOCAL_ARGUMENT_INFO ORDER BY ID"#;
pub(crate) const SELECT_LOCAL_ARGUMENT_INFO_BY_METHOD: &str = r#"SELECT METHODLABELNAME, ISARGUMENT, ISARRAYELEMENT,
     INDEXINMETHOD, "OFFSET", NAME, TYPENAME FROM LOCAL_ARGUMENT_INFO WHERE METHODLABELNAME = ?1 ORDER BY ID"#;

pub(crate) const INSERT_LABEL: &str = "INSERT INTO Labels (LABELNAME, ADDRESS) VALUES (?1, ?2)";
pub(crate) const SELECT_LABELS: &str = "SELECT LABELNAME, ADDRESS FROM Labels ORDER BY ID";

pub(crate) const INSERT_METHOD: &str = "INSERT INTO Methods (MethodId, LabelPrefix) VALUES (?1, ?2)";

/// Create any missing tables and indexes.
pub(crate) fn initialize(conn: &Connection, path: &Path) -> Result<()>
{
    conn.execute_batch(CREATE_TABLES)
        .map_err(|err| SymbridgeError::StoreUnavailable(format!("cannot initialize schema in {}: {err}", path.display())))
}

/// Delete a store file and the journal files SQLite may have left beside it.
pub(crate) fn destroy(path: &Path) -> Result<()>
{
    let mut targets = vec![path.to_path_buf()];
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut sibling = path.as_os_str().to_owned();
        sibling.push(suffix);
        targets.push(sibling.into());
    }

    for target in targets {
        match std::fs::remove_file(&target) {
            Ok(()) => tracing::debug!("Removed {}", target.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(SymbridgeError::StoreUnavailable(format!(
                    "cannot remove existing store {}: {err}",
                    target.display()
                )));
            }
        }
    }
    Ok(())
}
