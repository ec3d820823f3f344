//! Read-side queries used for summaries and reporting.

use rusqlite::{OptionalExtension, Row};
use serde::Serialize;

use crate::{ClusterId, CustomerId};

use super::{SqliteStore, StoreError};

/// Mutable attributes of a customer's cluster membership.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MembershipValues {
    /// Loyalty points.
    pub loyalty_points: f64,
    /// Monetary value in reais.
    pub monetary_value: f64,
}

/// A municipality joined with its state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalitySummary {
    /// IBGE municipality code.
    pub ibge_code: i64,
    /// Display name.
    pub name: String,
    /// UF code.
    pub uf: String,
    /// State display name.
    pub state_name: String,
    /// Latitude, when recorded.
    pub latitude: Option<f64>,
    /// Longitude, when recorded.
    pub longitude: Option<f64>,
}

/// A route ranked by how many orders travelled it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularRoute {
    /// Route display name.
    pub name: String,
    /// Origin municipality name.
    pub origin: String,
    /// Destination municipality name.
    pub destination: String,
    /// Origin UF code.
    pub origin_uf: String,
    /// Destination UF code.
    pub destination_uf: String,
    /// Number of orders on the route.
    pub order_count: i64,
    /// Mean order value, absent when the route has no orders.
    pub average_order_value: Option<f64>,
    /// Road distance in kilometres, when known.
    pub distance_km: Option<f64>,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableCounts {
    /// Rows in `estados`.
    pub states: i64,
    /// Rows in `municipios`.
    pub municipalities: i64,
    /// Rows in `clientes`.
    pub customers: i64,
    /// Rows in `viacoes`.
    pub carriers: i64,
    /// Rows in `rotas`.
    pub routes: i64,
    /// Rows in `pedidos`.
    pub orders: i64,
    /// Rows in `clusters_clientes`.
    pub clusters: i64,
    /// Rows in `cliente_clusters`.
    pub memberships: i64,
}

impl SqliteStore {
    /// Read the current values of a `(customer, cluster)` membership.
    pub fn membership_values(
        &self,
        customer: CustomerId,
        cluster: ClusterId,
    ) -> Result<Option<MembershipValues>, StoreError> {
        self.connection()
            .prepare_cached(
                "SELECT pontos_fidelidade, valor_reais FROM cliente_clusters
                    WHERE id_cliente = ?1 AND id_cluster = ?2",
            )
            .and_then(|mut statement| {
                statement
                    .query_row([customer.get(), cluster.get()], |row| {
                        Ok(MembershipValues {
                            loyalty_points: row.get(0)?,
                            monetary_value: row.get(1)?,
                        })
                    })
                    .optional()
            })
            .map_err(StoreError::statement("read cluster membership"))
    }

    /// List the municipalities of a state ordered by name.
    pub fn municipalities_in_state(
        &self,
        uf: &str,
    ) -> Result<Vec<MunicipalitySummary>, StoreError> {
        self.connection()
            .prepare_cached(
                "SELECT m.codigo_ibge, m.nome_municipio, e.codigo_uf, e.nome_estado,
                        m.latitude, m.longitude
                    FROM municipios m
                    JOIN estados e ON m.id_estado = e.id_estado
                    WHERE e.codigo_uf = ?1
                    ORDER BY m.nome_municipio",
            )
            .and_then(|mut statement| {
                let rows = statement.query_map([uf], municipality_summary)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .map_err(StoreError::statement("list municipalities by state"))
    }

    /// Rank routes by order count, most travelled first.
    pub fn popular_routes(&self, limit: u32) -> Result<Vec<PopularRoute>, StoreError> {
        self.connection()
            .prepare_cached(
                "SELECT
                    r.nome_rota,
                    mo.nome_municipio,
                    md.nome_municipio,
                    eo.codigo_uf,
                    ed.codigo_uf,
                    COUNT(p.id_pedido) AS total_viagens,
                    AVG(p.valor_total),
                    r.distancia_km
                FROM rotas r
                JOIN municipios mo ON r.id_municipio_origem = mo.id_municipio
                JOIN municipios md ON r.id_municipio_destino = md.id_municipio
                JOIN estados eo ON mo.id_estado = eo.id_estado
                JOIN estados ed ON md.id_estado = ed.id_estado
                LEFT JOIN pedidos p ON r.id_rota = p.id_rota
                GROUP BY r.id_rota
                ORDER BY total_viagens DESC, r.id_rota
                LIMIT ?1",
            )
            .and_then(|mut statement| {
                let rows = statement.query_map([limit], popular_route)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .map_err(StoreError::statement("rank popular routes"))
    }

    /// Count the rows of every ClickBus table.
    pub fn table_counts(&self) -> Result<TableCounts, StoreError> {
        self.connection()
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM estados),
                    (SELECT COUNT(*) FROM municipios),
                    (SELECT COUNT(*) FROM clientes),
                    (SELECT COUNT(*) FROM viacoes),
                    (SELECT COUNT(*) FROM rotas),
                    (SELECT COUNT(*) FROM pedidos),
                    (SELECT COUNT(*) FROM clusters_clientes),
                    (SELECT COUNT(*) FROM cliente_clusters)",
                [],
                |row| {
                    Ok(TableCounts {
                        states: row.get(0)?,
                        municipalities: row.get(1)?,
                        customers: row.get(2)?,
                        carriers: row.get(3)?,
                        routes: row.get(4)?,
                        orders: row.get(5)?,
                        clusters: row.get(6)?,
                        memberships: row.get(7)?,
                    })
                },
            )
            .map_err(StoreError::statement("count table rows"))
    }
}

fn municipality_summary(row: &Row<'_>) -> rusqlite::Result<MunicipalitySummary> {
    Ok(MunicipalitySummary {
        ibge_code: row.get(0)?,
        name: row.get(1)?,
        uf: row.get(2)?,
        state_name: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
    })
}

fn popular_route(row: &Row<'_>) -> rusqlite::Result<PopularRoute> {
    Ok(PopularRoute {
        name: row.get(0)?,
        origin: row.get(1)?,
        destination: row.get(2)?,
        origin_uf: row.get(3)?,
        destination_uf: row.get(4)?,
        order_count: row.get(5)?,
        average_order_value: row.get(6)?,
        distance_km: row.get(7)?,
    })
}
