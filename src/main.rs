mod options;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::env;
use tx_tracker_lib::config::Config;
use tx_tracker_lib::db::create_sqlite_connection;
use tx_tracker_lib::db::ops::{get_tx_status, get_tx_statuses, tx_filter_status};
use tx_tracker_lib::error::TrackerError;
use tx_tracker_lib::runtime::start_tracker_engine;
use tx_tracker_lib::server::{configure_routes, ServerData};
use tx_tracker_lib::setup::{ChainSetup, TrackerSetup};
use tx_tracker_lib::{err_custom_create, err_from};

use crate::options::{validated_cli, RunOptions, ValidatedCommand};

fn db_filename() -> Result<String, TrackerError> {
    env::var("DB_SQLITE_FILENAME")
        .map_err(|err| err_custom_create!("DB_SQLITE_FILENAME not set: {}", err))
}

async fn run(run_options: RunOptions) -> Result<(), TrackerError> {
    let config = Config::load(&run_options.config)?;
    let mut chain_setup = ChainSetup::new(&config, &run_options.chain_name)?;
    if let Ok(ws_endpoint) = env::var("POLYGON_RPC_ENDPOINT") {
        log::info!("Using websocket endpoint from POLYGON_RPC_ENDPOINT");
        chain_setup.ws_endpoint = Some(ws_endpoint);
    }
    let setup = TrackerSetup::new(&config.tracker, run_options.max_fetch_attempts)?;

    let tr = start_tracker_engine(&db_filename()?, chain_setup, setup).await?;

    if !run_options.http {
        return tr
            .runtime_handle
            .await
            .map_err(|e| err_custom_create!("Service loop failed: {:?}", e));
    }

    let server_data = Data::new(Box::new(ServerData {
        shared_state: tr.shared_state.clone(),
        db_connection: tr.conn.clone(),
        chain_name: tr.chain_setup.chain_name.clone(),
    }));
    log::info!(
        "Starting status server on {}:{}",
        run_options.http_addr,
        run_options.http_port
    );
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_data.clone())
            .configure(configure_routes)
    })
    .workers(1)
    .bind((run_options.http_addr.as_str(), run_options.http_port))
    .map_err(err_from!())?
    .run();

    tokio::select! {
        res = server => res.map_err(err_from!()),
        res = tr.runtime_handle => {
            res.map_err(|e| err_custom_create!("Service loop failed: {:?}", e))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), TrackerError> {
    if let Err(err) = dotenv::dotenv() {
        return Err(err_custom_create!("No .env file found: {}", err));
    }
    env_logger::init();
    let cli = validated_cli()?;

    match cli {
        ValidatedCommand::Run(run_options) => run(run_options).await,
        ValidatedCommand::ShowTx(tx_hash) => {
            let mut conn = create_sqlite_connection(Some(&db_filename()?), true).await?;
            let tx = get_tx_status(&mut conn, &format!("{:#x}", tx_hash))
                .await
                .map_err(err_from!())?
                .ok_or_else(|| err_custom_create!("Transaction {:#x} not tracked", tx_hash))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&tx).map_err(|e| err_custom_create!("{}", e))?
            );
            Ok(())
        }
        ValidatedCommand::ListTxs { status, limit } => {
            let mut conn = create_sqlite_connection(Some(&db_filename()?), true).await?;
            let filter = status.map(tx_filter_status);
            let txs = get_tx_statuses(&mut conn, filter.as_deref(), Some(limit))
                .await
                .map_err(err_from!())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&txs).map_err(|e| err_custom_create!("{}", e))?
            );
            Ok(())
        }
    }
}
