use crate::db::ops::*;
use crate::runtime::SharedState;
use crate::status::{TxStatus, ALL_STATUSES};
use crate::utils::parse_h256;
use actix_web::web::Data;
use actix_web::{web, HttpRequest, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_LIST_LIMIT: i64 = 100;

pub struct ServerData {
    pub shared_state: Arc<Mutex<SharedState>>,
    pub db_connection: Arc<Mutex<SqliteConnection>>,
    pub chain_name: String,
}

macro_rules! return_on_error {
    ( $e:expr ) => {
        match $e {
            Ok(x) => x,
            Err(err) => {
                return web::Json(json!({
                    "error": err.to_string()
                }))
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TxListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn tx_status(data: Data<Box<ServerData>>, req: HttpRequest) -> impl Responder {
    let tx_hash = return_on_error!(parse_h256(req.match_info().get("tx_hash").unwrap_or("")));
    let tx_hash = format!("{:#x}", tx_hash);

    let tx = {
        let mut db_conn = data.db_connection.lock().await;
        return_on_error!(get_tx_status(&mut db_conn, &tx_hash).await)
    };

    match tx {
        Some(tx) => web::Json(json!({ "tx": tx })),
        None => web::Json(json!({ "error": format!("transaction {} not tracked", tx_hash) })),
    }
}

pub async fn tx_statuses(
    data: Data<Box<ServerData>>,
    query: web::Query<TxListQuery>,
) -> impl Responder {
    let filter = match &query.status {
        Some(status) => Some(tx_filter_status(return_on_error!(TxStatus::from_str(status)))),
        None => None,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit <= 0 {
        return web::Json(json!({ "error": "limit has to be positive" }));
    }

    let txs = {
        let mut db_conn = data.db_connection.lock().await;
        return_on_error!(get_tx_statuses(&mut db_conn, filter.as_deref(), Some(limit)).await)
    };

    web::Json(json!({
        "txs": txs,
    }))
}

pub async fn stats(data: Data<Box<ServerData>>) -> impl Responder {
    let mut counts = BTreeMap::new();
    {
        let mut db_conn = data.db_connection.lock().await;
        for status in ALL_STATUSES {
            let count = return_on_error!(
                get_tx_status_count(&mut db_conn, Some(&tx_filter_status(status))).await
            );
            counts.insert(status.as_str(), count);
        }
    }
    let shared_state = data.shared_state.lock().await.clone();

    web::Json(json!({
        "chain": data.chain_name,
        "statusCounts": counts,
        "tracker": shared_state,
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/tx/{tx_hash}", web::get().to(tx_status))
        .route("/txs", web::get().to(tx_statuses))
        .route("/stats", web::get().to(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::model::TxIdentity;
    use crate::test_utils::*;
    use actix_web::{test, App};
    use serde_json::Value;

    async fn server_data() -> Data<Box<ServerData>> {
        let db_connection = test_conn().await;
        {
            let mut conn = db_connection.lock().await;
            for (n, status) in [
                (1, TxStatus::Pending),
                (2, TxStatus::Confirmed),
                (3, TxStatus::Confirmed),
            ] {
                let identity = TxIdentity {
                    tx_hash: hash_str(n),
                    ..Default::default()
                };
                reconcile_tx_status(&mut conn, &identity, status)
                    .await
                    .unwrap();
            }
        }
        Data::new(Box::new(ServerData {
            shared_state: Arc::new(Mutex::new(SharedState::default())),
            db_connection,
            chain_name: "dev".to_string(),
        }))
    }

    #[actix_web::test]
    async fn test_tx_status_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(server_data().await)
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/tx/{}", hash_str(2)))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["tx"]["status"], "Confirmed");
        assert_eq!(resp["tx"]["txHash"], hash_str(2));

        let req = test::TestRequest::get()
            .uri(&format!("/tx/{}", hash_str(9)))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert!(resp["error"].as_str().unwrap().contains("not tracked"));

        let req = test::TestRequest::get().uri("/tx/zz").to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert!(resp.get("error").is_some());
    }

    #[actix_web::test]
    async fn test_list_and_stats_endpoints() {
        let app = test::init_service(
            App::new()
                .app_data(server_data().await)
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/txs?status=confirmed")
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["txs"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get().uri("/txs?limit=1").to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["txs"].as_array().unwrap().len(), 1);

        for bad_limit in ["0", "-1"] {
            let req = test::TestRequest::get()
                .uri(&format!("/txs?limit={}", bad_limit))
                .to_request();
            let resp: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(resp["error"], "limit has to be positive");
            assert!(resp.get("txs").is_none());
        }

        let req = test::TestRequest::get().uri("/stats").to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["statusCounts"]["Confirmed"], 2);
        assert_eq!(resp["statusCounts"]["Pending"], 1);
        assert_eq!(resp["statusCounts"]["Failed"], 0);
        assert_eq!(resp["tracker"]["blocksProcessed"], 0);
    }
}
