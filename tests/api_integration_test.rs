use axum::body::Body;
use axum::Router;
use growth_guard::app::create_app;
use growth_guard::config::AppConfig;
use growth_guard::db;
use growth_guard::state::AppState;
use http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    // keeps the database file alive for the duration of the test
    _dir: TempDir,
}

impl TestApp {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        // production pool size, so requests land on different connections
        let config = AppConfig {
            database_url: format!("sqlite://{}", dir.path().join("test.db").display()),
            ..AppConfig::default()
        };
        assert!(config.max_connections > 1);
        let pool = db::init_pool(&config).await.unwrap();
        let router = create_app(AppState::new(pool), &config);
        Self { router, _dir: dir }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(self.router.clone(), method, uri, body).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    async fn create_portfolio(&self, name: &str) -> String {
        let (status, body) = self
            .post("/api/portfolios", json!({ "name": name, "description": "test" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn trade(&self, portfolio_id: &str, side: &str, quantity: f64, price: f64) -> (StatusCode, Value) {
        self.post(
            &format!("/api/portfolios/{}/transactions", portfolio_id),
            json!({
                "stockCode": "600519",
                "stockName": "贵州茅台",
                "sector": "消费",
                "side": side,
                "quantity": quantity,
                "price": price,
            }),
        )
        .await
    }
}

async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn buy_order(quantity: f64, price: f64) -> Value {
    json!({
        "stockCode": "600519",
        "stockName": "贵州茅台",
        "sector": "消费",
        "side": "buy",
        "quantity": quantity,
        "price": price,
    })
}

fn approx(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() < 1e-6)
        .unwrap_or(false)
}

#[tokio::test]
async fn test_health_returns_envelope() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_portfolio_crud() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("长线组合").await;

    let (status, body) = app.get(&format!("/api/portfolios/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "长线组合");

    let (status, body) = app
        .put(&format!("/api/portfolios/{}", id), json!({ "name": "稳健组合" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "稳健组合");

    let (_, body) = app.get("/api/portfolios").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.delete(&format!("/api/portfolios/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Portfolio deleted");

    let (status, body) = app.get(&format!("/api/portfolios/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Portfolio not found");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_blank_portfolio_name_is_rejected() {
    let app = TestApp::spawn().await;
    let (status, body) = app.post("/api/portfolios", json!({ "name": "   " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_trade_lifecycle_opens_averages_and_closes() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("交易").await;

    let (status, body) = app.trade(&id, "buy", 100.0, 10.0).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let position = &body["data"]["position"];
    assert_eq!(body["data"]["positionClosed"], false);
    assert!(approx(&position["quantity"], 100.0));
    assert!(approx(&position["avgCost"], 10.0));
    assert!(approx(&position["stopLoss"], 9.0));
    assert!(approx(&position["takeProfit"], 12.0));
    let position_id = position["id"].as_str().unwrap().to_string();

    let (_, body) = app.trade(&id, "buy", 300.0, 14.0).await;
    let position = &body["data"]["position"];
    assert_eq!(position["id"], position_id.as_str());
    assert!(approx(&position["quantity"], 400.0));
    assert!(approx(&position["avgCost"], 13.0));
    assert!(approx(&position["currentPrice"], 14.0));

    let (status, _) = app.trade(&id, "sell", 500.0, 15.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.trade(&id, "sell", 400.0, 15.0).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["positionClosed"], true);
    assert!(body["data"]["position"].is_null());
    let transaction_id = body["data"]["transaction"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get(&format!("/api/portfolios/{}/positions", id)).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // the rejected oversell is not in the ledger
    let (_, body) = app.get(&format!("/api/portfolios/{}/transactions", id)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, body) = app.get(&format!("/api/transactions/{}", transaction_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["side"], "sell");

    let (status, _) = app.get(&format!("/api/positions/{}", position_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_position_validation() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("校验").await;
    let uri = format!("/api/portfolios/{}/positions", id);

    let (status, body) = app
        .post(
            &uri,
            json!({
                "stockCode": "AAPL",
                "stockName": "Apple",
                "sector": "Technology",
                "quantity": 10.0,
                "avgCost": 150.0,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unknown sector"));

    let (status, _) = app
        .post(
            &uri,
            json!({
                "stockCode": "688981",
                "stockName": "中芯国际",
                "sector": "科技",
                "quantity": 10.0,
                "avgCost": 0.0,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = "00000000-0000-0000-0000-000000000000";
    let (status, _) = app
        .post(
            &format!("/api/portfolios/{}/positions", missing),
            json!({
                "stockCode": "688981",
                "stockName": "中芯国际",
                "sector": "科技",
                "quantity": 10.0,
                "avgCost": 50.0,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_risk_alerts_and_rebalance() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("风控").await;

    let (status, body) = app
        .post(
            &format!("/api/portfolios/{}/positions", id),
            json!({
                "stockCode": "000858",
                "stockName": "五粮液",
                "sector": "消费",
                "quantity": 100.0,
                "avgCost": 180.5,
                "currentPrice": 185.2,
                "riskLevel": "low",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(approx(&body["data"]["stopLoss"], 162.45));
    assert!(approx(&body["data"]["takeProfit"], 216.6));
    let position_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/api/risk/portfolios/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    let risk = &body["data"];
    assert_eq!(risk["riskDistribution"]["low"], 1);
    assert_eq!(risk["positionRisks"].as_array().unwrap().len(), 1);
    assert_eq!(risk["sectorRisks"][0]["sector"], "消费");
    assert!(approx(&risk["sectorRisks"][0]["totalWeight"], 1.0));

    let (status, body) = app
        .get(&format!("/api/risk/portfolios/{}/positions/{}", id, position_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stockCode"], "000858");

    let (_, body) = app.get(&format!("/api/risk/portfolios/{}/alerts", id)).await;
    assert!(body["data"]["stopLossAlerts"].as_array().unwrap().is_empty());
    assert!(body["data"]["takeProfitAlerts"].as_array().unwrap().is_empty());

    let (status, _) = app
        .put(&format!("/api/positions/{}/price", position_id), json!({ "price": 160.0 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/risk/portfolios/{}/alerts", id)).await;
    assert_eq!(body["data"]["stopLossAlerts"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .post(
            &format!("/api/portfolios/{}/prices", id),
            json!([{ "stockCode": "000858", "price": 220.0 }, { "stockCode": "999999", "price": 1.0 }]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(approx(&body["data"][0]["currentPrice"], 220.0));
    let (_, body) = app.get(&format!("/api/risk/portfolios/{}/alerts", id)).await;
    assert!(body["data"]["stopLossAlerts"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["takeProfitAlerts"].as_array().unwrap().len(), 1);

    // a single holding breaks both the position and the sector cap
    let (_, body) = app.get(&format!("/api/risk/portfolios/{}/rebalance", id)).await;
    let suggestions = body["data"].as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0]["action"], "reduce");
    assert_eq!(suggestions[1]["action"], "diversify");

    let (status, body) = app.get(&format!("/api/portfolios/{}/report", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["positionCount"], 1);
    assert_eq!(body["data"]["rebalanceSuggestions"].as_array().unwrap().len(), 2);
    assert!(body["data"]["generatedAt"].is_string());
}

#[tokio::test]
async fn test_empty_portfolio_assessment_is_low() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("空仓").await;

    let (status, body) = app.get(&format!("/api/risk/portfolios/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["overallRiskLevel"], "low");
    assert!(approx(&body["data"]["weightedRiskScore"], 0.0));
}

#[tokio::test]
async fn test_unknown_portfolio_risk_is_not_found() {
    let app = TestApp::spawn().await;
    let missing = "00000000-0000-0000-0000-000000000000";

    let (status, body) = app.get(&format!("/api/risk/portfolios/{}", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.get(&format!("/api/risk/portfolios/{}/settings", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_drive_new_positions() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("纪律").await;
    let uri = format!("/api/risk/portfolios/{}/settings", id);

    let (status, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(approx(&body["data"]["stopLossPercent"], 0.10));
    assert!(approx(&body["data"]["takeProfitPercent"], 0.20));
    assert_eq!(body["data"]["riskLevelSource"], "stored");

    let (status, _) = app.put(&uri, json!({ "stopLossPercent": 1.5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(&uri, json!({ "stopLossPercent": 0.05, "riskLevelSource": "assessed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(approx(&body["data"]["stopLossPercent"], 0.05));
    assert!(approx(&body["data"]["takeProfitPercent"], 0.20));
    assert_eq!(body["data"]["riskLevelSource"], "assessed");

    let (_, body) = app.trade(&id, "buy", 100.0, 20.0).await;
    assert!(approx(&body["data"]["position"]["stopLoss"], 19.0));
    assert!(approx(&body["data"]["position"]["takeProfit"], 24.0));
}

#[tokio::test]
async fn test_deleting_portfolio_removes_positions() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("清仓").await;
    let (_, body) = app.trade(&id, "buy", 10.0, 100.0).await;
    let position_id = body["data"]["position"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.delete(&format!("/api/portfolios/{}", id)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/api/positions/{}", position_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_new_records_are_visible_to_the_next_request() {
    let app = TestApp::spawn().await;

    for round in 0..20 {
        let id = app.create_portfolio(&format!("组合{}", round)).await;

        let (status, body) = app.get(&format!("/api/portfolios/{}/summary", id)).await;
        assert_eq!(status, StatusCode::OK, "round {}: {}", round, body);

        let (status, body) = app.trade(&id, "buy", 100.0, 10.0).await;
        assert_eq!(status, StatusCode::CREATED, "round {}: {}", round, body);

        let (status, body) = app
            .put(
                &format!("/api/risk/portfolios/{}/settings", id),
                json!({ "stopLossPercent": 0.05 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "round {}: {}", round, body);

        let (status, body) = app.trade(&id, "buy", 100.0, 20.0).await;
        assert_eq!(status, StatusCode::CREATED, "round {}: {}", round, body);
        assert!(approx(&body["data"]["position"]["quantity"], 200.0));

        let (status, body) = app
            .post(
                &format!("/api/portfolios/{}/positions", id),
                json!({
                    "stockCode": "000858",
                    "stockName": "五粮液",
                    "sector": "消费",
                    "quantity": 10.0,
                    "avgCost": 100.0,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "round {}: {}", round, body);
        // created after the settings change
        assert!(approx(&body["data"]["stopLoss"], 95.0));

        let (_, body) = app.get(&format!("/api/portfolios/{}/positions", id)).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2, "round {}", round);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_trades_on_one_stock_all_apply() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("并发").await;
    let uri = format!("/api/portfolios/{}/transactions", id);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = app.router.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                send(router, Method::POST, &uri, Some(buy_order(10.0, 10.0 + i as f64))).await
            })
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let (_, body) = app.get(&format!("/api/portfolios/{}/positions", id)).await;
    let positions = body["data"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert!(approx(&positions[0]["quantity"], 80.0));
    // (10 + 11 + ... + 17) / 8
    assert!(approx(&positions[0]["avgCost"], 13.5));

    let (_, body) = app.get(&uri).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_trade_with_different_sector_than_holding_is_rejected() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("行业").await;
    app.trade(&id, "buy", 100.0, 10.0).await;

    let mut order = buy_order(10.0, 10.0);
    order["sector"] = json!("科技");
    let (status, body) = app
        .post(&format!("/api/portfolios/{}/transactions", id), order)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = app.get(&format!("/api/portfolios/{}/transactions", id)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_price_batch_for_missing_portfolio_or_bad_price_changes_nothing() {
    let app = TestApp::spawn().await;
    let id = app.create_portfolio("报价").await;
    app.trade(&id, "buy", 100.0, 10.0).await;

    let (status, _) = app
        .post(
            &format!("/api/portfolios/{}/prices", id),
            json!([{ "stockCode": "600519", "price": 12.0 }, { "stockCode": "600519", "price": -1.0 }]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/api/portfolios/{}/positions", id)).await;
    assert!(approx(&body["data"][0]["currentPrice"], 10.0));

    let missing = "00000000-0000-0000-0000-000000000000";
    let (status, _) = app
        .post(
            &format!("/api/portfolios/{}/prices", missing),
            json!([{ "stockCode": "600519", "price": 12.0 }]),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
