//! SQLite-backed implementation of the entity store.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    Carrier, CarrierId, ClusterId, ClusterMembership, Customer, CustomerId, Municipality,
    MunicipalityId, NewOrder, NewRoute, OrderId, RouteId, State, StateId,
};

use super::{EntityLookup, EntityUpsert, StoreError, initialise_schema};

/// Read-write store over one SQLite connection.
///
/// The store is opened once per run and passed by reference to every
/// operation. Dropping it closes the connection.
///
/// # Examples
///
/// ```
/// use clickbus_core::{Customer, EntityLookup, EntityUpsert, SqliteStore};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteStore::open_in_memory()?;
/// let customer = Customer::new("C1")?;
/// assert!(store.upsert_customer(&customer)?);
/// assert!(!store.upsert_customer(&customer)?);
/// assert!(store.find_customer_id("C1")?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    connection: Connection,
    location: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file and initialise the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection,
            location: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database with the schema initialised.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut connection = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection,
            location: None,
        })
    }

    /// Location of the database file, or `None` when in memory.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub(crate) const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Insert every state that is not yet present; returns how many were new.
    pub fn seed_states(&self, states: &[State]) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for state in states {
            if self.upsert_state(state)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Insert every named cluster that is not yet present; returns how many
    /// were new.
    pub fn seed_clusters<S: AsRef<str>>(&self, names: &[S]) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for name in names {
            if self.upsert_cluster(name.as_ref())? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn execute_insert(
        &self,
        operation: &'static str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<bool, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(sql)
            .map_err(StoreError::statement(operation))?;
        statement
            .execute(params)
            .map(|changed| changed > 0)
            .map_err(StoreError::statement(operation))
    }

    fn query_id(
        &self,
        operation: &'static str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<i64>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(sql)
            .map_err(StoreError::statement(operation))?;
        statement
            .query_row(params, |row| row.get(0))
            .optional()
            .map_err(StoreError::statement(operation))
    }
}

impl EntityUpsert for SqliteStore {
    fn upsert_state(&self, state: &State) -> Result<bool, StoreError> {
        self.execute_insert(
            "insert state",
            "INSERT INTO estados (codigo_uf, nome_estado) VALUES (?1, ?2)
                ON CONFLICT (codigo_uf) DO NOTHING",
            params![state.uf, state.name],
        )
    }

    fn upsert_municipality(&self, municipality: &Municipality) -> Result<bool, StoreError> {
        self.execute_insert(
            "insert municipality",
            "INSERT INTO municipios (codigo_ibge, nome_municipio, id_estado, latitude, longitude)
                VALUES (?1, ?2, (SELECT id_estado FROM estados WHERE codigo_uf = ?3), ?4, ?5)
                ON CONFLICT (codigo_ibge) DO NOTHING",
            params![
                municipality.ibge_code,
                municipality.name,
                municipality.uf,
                municipality.latitude,
                municipality.longitude
            ],
        )
    }

    fn upsert_customer(&self, customer: &Customer) -> Result<bool, StoreError> {
        self.execute_insert(
            "insert customer",
            "INSERT INTO clientes (hash_cliente, nome_cliente, email, tipo_cliente)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (hash_cliente) DO NOTHING",
            params![
                customer.hash,
                customer.name,
                customer.email,
                customer.kind.code()
            ],
        )
    }

    fn upsert_carrier(&self, carrier: &Carrier) -> Result<bool, StoreError> {
        self.execute_insert(
            "insert carrier",
            "INSERT INTO viacoes (hash_viacao, nome_viacao) VALUES (?1, ?2)
                ON CONFLICT (hash_viacao) DO NOTHING",
            params![carrier.hash, carrier.name],
        )
    }

    fn upsert_cluster(&self, name: &str) -> Result<bool, StoreError> {
        self.execute_insert(
            "insert cluster",
            "INSERT INTO clusters_clientes (nome_cluster) VALUES (?1)
                ON CONFLICT (nome_cluster) DO NOTHING",
            [name.trim()],
        )
    }

    fn insert_route(&self, route: &NewRoute) -> Result<RouteId, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(
                "INSERT INTO rotas (nome_rota, id_municipio_origem, id_municipio_destino, distancia_km)
                    VALUES (?1, ?2, ?3, ?4)
                    RETURNING id_rota",
            )
            .map_err(StoreError::statement("insert route"))?;
        statement
            .query_row(
                params![
                    route.name,
                    route.origin.get(),
                    route.destination.get(),
                    route.distance_km
                ],
                |row| row.get(0),
            )
            .map(RouteId)
            .map_err(StoreError::statement("insert route"))
    }

    fn insert_order(&self, order: &NewOrder) -> Result<bool, StoreError> {
        self.execute_insert(
            "insert order",
            "INSERT INTO pedidos (
                hash_pedido, id_cliente, id_viacao, id_rota,
                data_compra, hora_compra, valor_total, quantidade_passagens,
                valor_por_passagem
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (hash_pedido) DO NOTHING",
            params![
                order.hash,
                order.customer.get(),
                order.carrier.get(),
                order.route.get(),
                order.purchase_date,
                order.purchase_time,
                order.total_value,
                order.ticket_count,
                order.ticket_value
            ],
        )
    }

    fn upsert_membership(&self, membership: &ClusterMembership) -> Result<bool, StoreError> {
        let existed = self
            .membership_values(membership.customer, membership.cluster)?
            .is_some();
        self.execute_insert(
            "upsert cluster membership",
            "INSERT INTO cliente_clusters (id_cliente, id_cluster, pontos_fidelidade, valor_reais)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (id_cliente, id_cluster) DO UPDATE SET
                    pontos_fidelidade = excluded.pontos_fidelidade,
                    valor_reais = excluded.valor_reais",
            params![
                membership.customer.get(),
                membership.cluster.get(),
                membership.loyalty_points,
                membership.monetary_value
            ],
        )?;
        Ok(!existed)
    }
}

impl EntityLookup for SqliteStore {
    fn find_state_id(&self, uf: &str) -> Result<Option<StateId>, StoreError> {
        self.query_id(
            "look up state",
            "SELECT id_estado FROM estados WHERE codigo_uf = ?1 ORDER BY id_estado LIMIT 1",
            [uf],
        )
        .map(|id| id.map(StateId))
    }

    fn find_municipality_id(
        &self,
        name: &str,
        uf: &str,
    ) -> Result<Option<MunicipalityId>, StoreError> {
        self.query_id(
            "look up municipality",
            "SELECT m.id_municipio
                FROM municipios m
                JOIN estados e ON m.id_estado = e.id_estado
                WHERE m.nome_municipio = ?1 AND e.codigo_uf = ?2
                ORDER BY m.id_municipio
                LIMIT 1",
            [name, uf],
        )
        .map(|id| id.map(MunicipalityId))
    }

    fn find_customer_id(&self, hash: &str) -> Result<Option<CustomerId>, StoreError> {
        self.query_id(
            "look up customer",
            "SELECT id_cliente FROM clientes WHERE hash_cliente = ?1 ORDER BY id_cliente LIMIT 1",
            [hash],
        )
        .map(|id| id.map(CustomerId))
    }

    fn find_carrier_id(&self, hash: &str) -> Result<Option<CarrierId>, StoreError> {
        self.query_id(
            "look up carrier",
            "SELECT id_viacao FROM viacoes WHERE hash_viacao = ?1 ORDER BY id_viacao LIMIT 1",
            [hash],
        )
        .map(|id| id.map(CarrierId))
    }

    fn find_route_id(
        &self,
        origin: MunicipalityId,
        destination: MunicipalityId,
    ) -> Result<Option<RouteId>, StoreError> {
        self.query_id(
            "look up route",
            "SELECT id_rota FROM rotas
                WHERE id_municipio_origem = ?1 AND id_municipio_destino = ?2
                ORDER BY id_rota
                LIMIT 1",
            [origin.get(), destination.get()],
        )
        .map(|id| id.map(RouteId))
    }

    fn find_order_id(&self, hash: &str) -> Result<Option<OrderId>, StoreError> {
        self.query_id(
            "look up order",
            "SELECT id_pedido FROM pedidos WHERE hash_pedido = ?1 ORDER BY id_pedido LIMIT 1",
            [hash],
        )
        .map(|id| id.map(OrderId))
    }

    fn find_cluster_id(&self, name: &str) -> Result<Option<ClusterId>, StoreError> {
        self.query_id(
            "look up cluster",
            "SELECT id_cluster FROM clusters_clientes WHERE nome_cluster = ?1
                ORDER BY id_cluster
                LIMIT 1",
            [name.trim()],
        )
        .map(|id| id.map(ClusterId))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brazilian_states;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        store
            .seed_states(&brazilian_states())
            .expect("seed states");
        store
    }

    fn municipality(code: i64, name: &str, uf: &str) -> Municipality {
        Municipality::new(code, name, uf).expect("valid municipality")
    }

    #[rstest]
    fn seeding_states_is_idempotent(store: SqliteStore) {
        let again = store
            .seed_states(&brazilian_states())
            .expect("reseed states");
        assert_eq!(again, 0);
        assert!(store.find_state_id("SP").expect("lookup").is_some());
    }

    #[rstest]
    fn municipality_insert_ignores_conflicting_code(store: SqliteStore) {
        let first = municipality(3_550_308, "São Paulo", "SP");
        let renamed = municipality(3_550_308, "Sampa", "SP");
        assert!(store.upsert_municipality(&first).expect("insert"));
        assert!(!store.upsert_municipality(&renamed).expect("conflict"));
        assert!(
            store
                .find_municipality_id("Sampa", "SP")
                .expect("lookup")
                .is_none(),
            "conflicting insert must not update the name"
        );
    }

    #[rstest]
    fn municipality_with_unknown_state_fails(store: SqliteStore) {
        let orphan = municipality(9_999_999, "Atlântida", "ZZ");
        let err = store
            .upsert_municipality(&orphan)
            .expect_err("unknown UF must fail");
        assert!(matches!(
            err,
            StoreError::Statement {
                operation: "insert municipality",
                ..
            }
        ));
    }

    #[rstest]
    #[case("São Paulo", "SP", true)]
    #[case("são paulo", "SP", false)]
    #[case("São Paulo", "RJ", false)]
    fn municipality_lookup_is_exact(
        store: SqliteStore,
        #[case] name: &str,
        #[case] uf: &str,
        #[case] found: bool,
    ) {
        store
            .upsert_municipality(&municipality(3_550_308, "São Paulo", "SP"))
            .expect("insert");
        let outcome = store.find_municipality_id(name, uf).expect("lookup");
        assert_eq!(outcome.is_some(), found);
    }

    #[rstest]
    fn routes_are_directional(store: SqliteStore) {
        store
            .upsert_municipality(&municipality(3_304_557, "Rio de Janeiro", "RJ"))
            .expect("insert RJ");
        store
            .upsert_municipality(&municipality(3_550_308, "São Paulo", "SP"))
            .expect("insert SP");
        let rio = store
            .find_municipality_id("Rio de Janeiro", "RJ")
            .expect("lookup")
            .expect("rio present");
        let sao_paulo = store
            .find_municipality_id("São Paulo", "SP")
            .expect("lookup")
            .expect("sp present");

        let forward = store
            .insert_route(&NewRoute::between(
                (rio, "Rio de Janeiro"),
                (sao_paulo, "São Paulo"),
                Some(429.4),
            ))
            .expect("insert forward");
        assert_eq!(
            store.find_route_id(rio, sao_paulo).expect("lookup"),
            Some(forward)
        );
        assert_eq!(store.find_route_id(sao_paulo, rio).expect("lookup"), None);

        let backward = store
            .insert_route(&NewRoute::between(
                (sao_paulo, "São Paulo"),
                (rio, "Rio de Janeiro"),
                None,
            ))
            .expect("insert backward");
        assert_ne!(forward, backward);
    }

    #[rstest]
    fn lookups_return_none_when_absent(store: SqliteStore) {
        assert_eq!(store.find_customer_id("missing").expect("lookup"), None);
        assert_eq!(store.find_carrier_id("missing").expect("lookup"), None);
        assert_eq!(store.find_order_id("missing").expect("lookup"), None);
        assert_eq!(store.find_cluster_id("missing").expect("lookup"), None);
    }

    #[rstest]
    fn carrier_insert_is_idempotent(store: SqliteStore) {
        let carrier = Carrier::new("V1").expect("valid carrier");
        assert!(store.upsert_carrier(&carrier).expect("insert"));
        assert!(!store.upsert_carrier(&carrier).expect("conflict"));
        assert!(store.find_carrier_id("V1").expect("lookup").is_some());
    }

    #[rstest]
    fn membership_upsert_overwrites_values(store: SqliteStore) {
        store
            .upsert_customer(&Customer::new("C1").expect("valid customer"))
            .expect("insert customer");
        store.upsert_cluster("Ouro").expect("insert cluster");
        let customer = store
            .find_customer_id("C1")
            .expect("lookup")
            .expect("customer present");
        let cluster = store
            .find_cluster_id("Ouro")
            .expect("lookup")
            .expect("cluster present");

        let mut membership = ClusterMembership {
            customer,
            cluster,
            loyalty_points: 10.0,
            monetary_value: 250.0,
        };
        assert!(store.upsert_membership(&membership).expect("insert"));
        assert!(!store.upsert_membership(&membership).expect("same values"));

        membership.loyalty_points = 15.0;
        membership.monetary_value = 300.0;
        assert!(!store.upsert_membership(&membership).expect("overwrite"));

        let stored = store
            .membership_values(customer, cluster)
            .expect("read membership")
            .expect("membership present");
        assert_eq!(stored.loyalty_points, 15.0);
        assert_eq!(stored.monetary_value, 300.0);
        assert_eq!(store.table_counts().expect("counts").memberships, 1);
    }

    #[rstest]
    fn opens_database_on_disk() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("clickbus.db");
        {
            let store = SqliteStore::open(&path).expect("open store");
            assert_eq!(store.path(), Some(path.as_path()));
            store.upsert_cluster("Prata").expect("insert cluster");
        }
        let reopened = SqliteStore::open(&path).expect("reopen store");
        assert!(
            reopened
                .find_cluster_id("Prata")
                .expect("lookup")
                .is_some()
        );
    }
}
