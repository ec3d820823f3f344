//! Test helpers for composing CLI datasets and layered overrides.

use super::*;
use crate::import::{OrdersArgs, OrdersConfig};
use camino::{Utf8Path, Utf8PathBuf};
use clickbus_data::seed_reference_data;
use std::fs;
use tempfile::TempDir;

pub(super) const ORDER_HEADER: &str = "id_cliente,viacao,origem,destino,uf_origem,uf_destino,\
distancia_km,id_pedido,date_purchase,time_purchase,valor_total_compra,qtd_passagens,\
valor_passagem,cluster,nome_cluster,pontos,reais";

pub(super) const MUNICIPALITY_FEED: &str =
    "COD,NOME,UF\n3304557,Rio de Janeiro,RJ\n3550308,São Paulo,SP\n3509502,Campinas,SP\n";

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path, contents).unwrap_or_else(|err| panic!("failed to write {path}: {err}"));
}

/// Values a config file or the environment would contribute.
#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) database: Option<Utf8PathBuf>,
    pub(super) maps_api_key: Option<String>,
}

/// A temporary directory holding a database and feeds.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.path("data/clickbus.sqlite")
    }

    /// Create the database with states, clusters and the three test
    /// municipalities.
    pub(super) fn seed(&self) {
        let store = open_store(&self.database()).expect("open database");
        seed_reference_data(&store, &["Ouro", "Prata"]).expect("seed");
        let feed = self.path("municipios.csv");
        write_utf8(&feed, MUNICIPALITY_FEED.as_bytes());
        clickbus_data::import_municipalities_from_path(&store, &feed).expect("municipalities");
    }

    pub(super) fn write_orders(&self, name: &str, rows: &[&str]) -> Utf8PathBuf {
        let mut contents = format!("{ORDER_HEADER}\n");
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        let path = self.path(name);
        write_utf8(&path, contents.as_bytes());
        path
    }
}

pub(super) fn merge_layers(
    mut cli_args: OrdersArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<OrdersConfig, CliError> {
    merge_field(
        &mut cli_args.database,
        extract_field(&env_layer, |layer| &layer.database),
        extract_field(&file_layer, |layer| &layer.database),
    );
    merge_field(
        &mut cli_args.maps_api_key,
        extract_field(&env_layer, |layer| &layer.maps_api_key),
        extract_field(&file_layer, |layer| &layer.maps_api_key),
    );
    OrdersConfig::try_from(cli_args)
}

fn merge_field<T: Clone>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none()
        && let Some(value) = env_value.or(file_value)
    {
        *target = Some(value);
    }
}

fn extract_field<T: Clone>(
    layer: &Option<LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.as_ref().and_then(|entry| accessor(entry).clone())
}
