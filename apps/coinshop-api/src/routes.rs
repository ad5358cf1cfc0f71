//! HTTP routes.
//!
//! | Method | Path            | Handler      |
//! |--------|-----------------|--------------|
//! | POST   | `/api/auth`     | [`auth`]     |
//! | GET    | `/api/info`     | [`info`]     |
//! | POST   | `/api/sendCoin` | [`send_coin`]|
//! | GET    | `/api/buy/{item}` | [`buy`]    |
//! | GET    | `/health`       | [`health`]   |

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::extract_bearer_token;
use crate::error::ApiError;
use crate::service::LedgerFacade;
use coinshop_core::validation::parse_amount;
use coinshop_core::{AccountSummary, Coins, LedgerError};

/// Builds the application router.
pub fn router(facade: LedgerFacade) -> Router {
    Router::new()
        .route("/api/auth", post(auth))
        .route("/api/info", get(info))
        .route("/api/sendCoin", post(send_coin))
        .route("/api/buy/{item}", get(buy))
        .route("/health", get(health))
        .with_state(facade)
}

// =============================================================================
// Extractors
// =============================================================================

/// The raw token from the `Authorization` header.
///
/// A missing header or empty token is rejected as `InvalidToken`.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .map(|token| BearerToken(token.to_string()))
            .ok_or(ApiError::Ledger(LedgerError::InvalidToken))
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(format!("invalid json: {}", rejection.body_text())))
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCoinRequest {
    pub to_user: String,
    pub amount: AmountField,
}

/// Transfer amount as a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(i64),
    Text(String),
}

impl AmountField {
    fn to_coins(&self) -> Result<Coins, LedgerError> {
        match self {
            AmountField::Number(n) => Ok(Coins::new(*n)),
            AmountField::Text(raw) => Ok(parse_amount(raw)?),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub coins: i64,
    pub inventory: Vec<InventoryItem>,
    pub coin_history: CoinHistoryBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoinHistoryBody {
    pub received: Vec<ReceivedEntry>,
    pub sent: Vec<SentEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedEntry {
    pub from_user: Option<String>,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentEntry {
    pub to_user: Option<String>,
    pub amount: i64,
}

impl From<AccountSummary> for InfoResponse {
    fn from(summary: AccountSummary) -> Self {
        InfoResponse {
            coins: summary.balance.amount(),
            inventory: summary
                .inventory
                .into_iter()
                .map(|entry| InventoryItem {
                    item_type: entry.item,
                    quantity: entry.quantity,
                })
                .collect(),
            coin_history: CoinHistoryBody {
                received: summary
                    .history
                    .received
                    .into_iter()
                    .map(|entry| ReceivedEntry {
                        from_user: entry.counterpart,
                        amount: entry.amount.amount(),
                    })
                    .collect(),
                sent: summary
                    .history
                    .sent
                    .into_iter()
                    .map(|entry| SentEntry {
                        to_user: entry.counterpart,
                        amount: entry.amount.amount(),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/auth`
pub async fn auth(
    State(facade): State<LedgerFacade>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let request = json_body(payload)?;
    let token = facade
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(Json(AuthResponse { token }))
}

/// `GET /api/info`
pub async fn info(
    State(facade): State<LedgerFacade>,
    BearerToken(token): BearerToken,
) -> Result<Json<InfoResponse>, ApiError> {
    let summary = facade.account_summary(&token).await?;
    Ok(Json(InfoResponse::from(summary)))
}

/// `POST /api/sendCoin`
pub async fn send_coin(
    State(facade): State<LedgerFacade>,
    BearerToken(token): BearerToken,
    payload: Result<Json<SendCoinRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let request = json_body(payload)?;
    let amount = request.amount.to_coins()?;
    facade.transfer(&token, &request.to_user, amount).await?;
    Ok(StatusCode::OK)
}

/// `GET /api/buy/{item}`
pub async fn buy(
    State(facade): State<LedgerFacade>,
    BearerToken(token): BearerToken,
    Path(item): Path<String>,
) -> Result<StatusCode, ApiError> {
    facade.purchase(&token, &item).await?;
    Ok(StatusCode::OK)
}

/// `GET /health`
pub async fn health(State(facade): State<LedgerFacade>) -> Json<HealthResponse> {
    let database = facade.is_healthy().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" }.to_string(),
        database,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::facade_for_tests;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::response::Response;
    use tower::ServiceExt;

    async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<&str>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sign_in(app: &Router, username: &str) -> String {
        let response = call(
            app,
            Method::POST,
            "/api/auth",
            None,
            Some(format!(r#"{{"username":"{}","password":"pass"}}"#, username).as_str()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json::<AuthResponse>(response).await.token
    }

    #[tokio::test]
    async fn test_full_flow_over_http() {
        let app = router(facade_for_tests().await);
        let alice = sign_in(&app, "alice").await;
        sign_in(&app, "bob").await;

        let response = call(
            &app,
            Method::POST,
            "/api/sendCoin",
            Some(alice.as_str()),
            Some(r#"{"toUser":"bob","amount":200}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = call(&app, Method::GET, "/api/buy/pen", Some(alice.as_str()), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = call(&app, Method::GET, "/api/info", Some(alice.as_str()), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let info: serde_json::Value = body_json(response).await;

        assert_eq!(info["coins"], 790);
        assert_eq!(info["inventory"][0]["type"], "pen");
        assert_eq!(info["inventory"][0]["quantity"], 1);
        assert_eq!(info["coinHistory"]["sent"][0]["toUser"], "bob");
        assert_eq!(info["coinHistory"]["sent"][0]["amount"], 200);
        assert_eq!(info["coinHistory"]["received"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_amount_as_string() {
        let app = router(facade_for_tests().await);
        let alice = sign_in(&app, "alice").await;
        let bob = sign_in(&app, "bob").await;

        let response = call(
            &app,
            Method::POST,
            "/api/sendCoin",
            Some(alice.as_str()),
            Some(r#"{"toUser":"bob","amount":"25"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let info: InfoResponse =
            body_json(call(&app, Method::GET, "/api/info", Some(bob.as_str()), None).await).await;
        assert_eq!(info.coins, 1025);
        assert_eq!(info.coin_history.received[0].from_user.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_bare_token_accepted() {
        let app = router(facade_for_tests().await);
        let alice = sign_in(&app, "alice").await;

        let request = Request::builder()
            .uri("/api/info")
            .header(AUTHORIZATION, alice)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unauthorized_requests() {
        let app = router(facade_for_tests().await);

        let response = call(&app, Method::GET, "/api/info", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = call(&app, Method::GET, "/api/buy/cup", Some("forged"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["error"], "invalid token");
    }

    #[tokio::test]
    async fn test_wrong_password_is_401() {
        let app = router(facade_for_tests().await);
        sign_in(&app, "alice").await;

        let response = call(
            &app,
            Method::POST,
            "/api/auth",
            None,
            Some(r#"{"username":"alice","password":"nope"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_business_errors_are_400() {
        let app = router(facade_for_tests().await);
        let alice = sign_in(&app, "alice").await;

        let cases = [
            (Method::GET, "/api/buy/yacht", None),
            (Method::POST, "/api/sendCoin", Some(r#"{"toUser":"ghost","amount":1}"#)),
            (Method::POST, "/api/sendCoin", Some(r#"{"toUser":"alice","amount":1}"#)),
            (Method::POST, "/api/sendCoin", Some(r#"{"toUser":"alice","amount":-5}"#)),
            (Method::POST, "/api/sendCoin", Some(r#"{"toUser":"alice","amount":"lots"}"#)),
            (Method::POST, "/api/sendCoin", Some(r#"{"toUser":"alice","amount":999999}"#)),
            (Method::POST, "/api/sendCoin", Some("not json")),
        ];

        for (method, uri, body) in cases {
            let response = call(&app, method, uri, Some(alice.as_str()), body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {:?}", uri, body);
            let body: serde_json::Value = body_json(response).await;
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(facade_for_tests().await);

        let response = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = body_json(response).await;
        assert!(health.database);
        assert_eq!(health.status, "ok");
    }
}
