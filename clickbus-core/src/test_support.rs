//! Seeded in-memory stores shared by unit and behaviour tests.

use crate::{EntityUpsert, Municipality, SqliteStore, StoreError, brazilian_states};

/// Municipalities seeded by [`seeded_store`]: IBGE code, name, UF.
pub const SEEDED_MUNICIPALITIES: [(i64, &str, &str); 3] = [
    (3_304_557, "Rio de Janeiro", "RJ"),
    (3_550_308, "São Paulo", "SP"),
    (3_509_502, "Campinas", "SP"),
];

/// Clusters seeded by [`seeded_store`].
pub const SEEDED_CLUSTERS: [&str; 2] = ["Ouro", "Prata"];

/// Open an in-memory store holding every state, the
/// [`SEEDED_MUNICIPALITIES`] and the [`SEEDED_CLUSTERS`].
pub fn seeded_store() -> Result<SqliteStore, StoreError> {
    let store = SqliteStore::open_in_memory()?;
    store.seed_states(&brazilian_states())?;
    for (code, name, uf) in SEEDED_MUNICIPALITIES {
        let municipality = Municipality {
            ibge_code: code,
            name: name.to_owned(),
            uf: uf.to_owned(),
            latitude: None,
            longitude: None,
        };
        store.upsert_municipality(&municipality)?;
    }
    store.seed_clusters(&SEEDED_CLUSTERS)?;
    Ok(store)
}
