pub const CREATE_OBLIGATIONS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS obligations (
        id TEXT PRIMARY KEY,
        contract TEXT NOT NULL,
        path TEXT NOT NULL,
        status TEXT NOT NULL,
        proof_height INTEGER NOT NULL
    )";

pub const CREATE_CHAIN_STATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS chain_state (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        height INTEGER NOT NULL,
        block_id TEXT NOT NULL
    )";

pub async fn initialize_database(conn: &libsql::Connection) -> Result<(), libsql::Error> {
    conn.execute(CREATE_OBLIGATIONS_TABLE, ()).await?;
    conn.execute(CREATE_CHAIN_STATE_TABLE, ()).await?;
    conn.query("PRAGMA journal_mode = WAL;", ()).await?;
    conn.query("PRAGMA synchronous = NORMAL;", ()).await?;
    Ok(())
}
