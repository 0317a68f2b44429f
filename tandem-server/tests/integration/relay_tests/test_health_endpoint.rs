use axum::body::Body;
use axum::http::{Request, StatusCode};
use tandem_server::{ServerConfig, build_router};
use tower::ServiceExt;

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _signaling) = build_router(&ServerConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["peers"], 0);
}
