#![forbid(unsafe_code)]

use rusqlite::{Connection, OptionalExtension, Transaction};

use super::StoreError;

/// Version stamped into `clickbus_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the ClickBus tables inside an open SQLite database.
///
/// Foreign keys are switched on for the connection, every table and index is
/// created if missing, and the schema version is recorded. A database stamped
/// with another version is rejected; there is no migration path.
pub fn initialise_schema(connection: &mut Connection) -> Result<(), StoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| StoreError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| StoreError::Schema {
            step: "begin schema transaction",
            source,
        })?;

    create_reference_tables(&transaction)?;
    create_trip_tables(&transaction)?;
    create_cluster_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction.commit().map_err(|source| StoreError::Schema {
        step: "commit schema transaction",
        source,
    })
}

fn create_reference_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_schema_step(
        transaction,
        "create estados",
        "CREATE TABLE IF NOT EXISTS estados (
            id_estado INTEGER PRIMARY KEY,
            codigo_uf TEXT NOT NULL UNIQUE CHECK (length(codigo_uf) = 2),
            nome_estado TEXT NOT NULL
        )",
    )?;
    run_schema_step(
        transaction,
        "create municipios",
        "CREATE TABLE IF NOT EXISTS municipios (
            id_municipio INTEGER PRIMARY KEY,
            codigo_ibge INTEGER NOT NULL UNIQUE,
            nome_municipio TEXT NOT NULL,
            id_estado INTEGER NOT NULL REFERENCES estados(id_estado),
            latitude REAL,
            longitude REAL
        )",
    )
}

fn create_trip_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_schema_step(
        transaction,
        "create clientes",
        "CREATE TABLE IF NOT EXISTS clientes (
            id_cliente INTEGER PRIMARY KEY,
            hash_cliente TEXT NOT NULL UNIQUE CHECK (length(trim(hash_cliente)) > 0),
            nome_cliente TEXT,
            email TEXT,
            tipo_cliente TEXT NOT NULL DEFAULT 'PF' CHECK (tipo_cliente IN ('PF', 'PJ'))
        )",
    )?;
    run_schema_step(
        transaction,
        "create viacoes",
        "CREATE TABLE IF NOT EXISTS viacoes (
            id_viacao INTEGER PRIMARY KEY,
            hash_viacao TEXT NOT NULL UNIQUE CHECK (length(trim(hash_viacao)) > 0),
            nome_viacao TEXT
        )",
    )?;
    run_schema_step(
        transaction,
        "create rotas",
        "CREATE TABLE IF NOT EXISTS rotas (
            id_rota INTEGER PRIMARY KEY,
            id_municipio_origem INTEGER NOT NULL REFERENCES municipios(id_municipio),
            id_municipio_destino INTEGER NOT NULL REFERENCES municipios(id_municipio),
            nome_rota TEXT NOT NULL,
            distancia_km REAL,
            UNIQUE (id_municipio_origem, id_municipio_destino)
        )",
    )?;
    run_schema_step(
        transaction,
        "create pedidos",
        "CREATE TABLE IF NOT EXISTS pedidos (
            id_pedido INTEGER PRIMARY KEY,
            hash_pedido TEXT NOT NULL UNIQUE CHECK (length(trim(hash_pedido)) > 0),
            id_cliente INTEGER NOT NULL REFERENCES clientes(id_cliente),
            id_viacao INTEGER NOT NULL REFERENCES viacoes(id_viacao),
            id_rota INTEGER NOT NULL REFERENCES rotas(id_rota),
            data_compra TEXT NOT NULL,
            hora_compra TEXT NOT NULL,
            valor_total REAL NOT NULL,
            quantidade_passagens INTEGER NOT NULL CHECK (quantidade_passagens >= 0),
            valor_por_passagem REAL NOT NULL
        )",
    )
}

fn create_cluster_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_schema_step(
        transaction,
        "create clusters_clientes",
        "CREATE TABLE IF NOT EXISTS clusters_clientes (
            id_cluster INTEGER PRIMARY KEY,
            nome_cluster TEXT NOT NULL UNIQUE CHECK (length(trim(nome_cluster)) > 0)
        )",
    )?;
    run_schema_step(
        transaction,
        "create cliente_clusters",
        "CREATE TABLE IF NOT EXISTS cliente_clusters (
            id_cliente INTEGER NOT NULL REFERENCES clientes(id_cliente) ON DELETE CASCADE,
            id_cluster INTEGER NOT NULL REFERENCES clusters_clientes(id_cluster) ON DELETE CASCADE,
            pontos_fidelidade REAL NOT NULL DEFAULT 0,
            valor_reais REAL NOT NULL DEFAULT 0,
            UNIQUE (id_cliente, id_cluster)
        )",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_schema_step(
        transaction,
        "index municipios by name",
        "CREATE INDEX IF NOT EXISTS idx_municipios_nome
            ON municipios(nome_municipio, id_estado)",
    )?;
    run_schema_step(
        transaction,
        "index pedidos by route",
        "CREATE INDEX IF NOT EXISTS idx_pedidos_rota ON pedidos(id_rota)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_schema_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS clickbus_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM clickbus_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| StoreError::Schema {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(StoreError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO clickbus_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| StoreError::Schema {
                step: "record schema version",
                source,
            }),
    }
}

fn run_schema_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), StoreError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| StoreError::Schema { step, source })
}
