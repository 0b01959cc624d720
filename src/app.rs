use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, recipes, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(recipes::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis();
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use super::*;

    const RECIPE_JSON: &str = r#"```json
{"title": "Tomato Soup", "ingredients": ["tomatoes", "onion"], "instructions": ["chop", "simmer"],
 "category": "Comfort Food", "cuisine": "Italian", "mealType": "Lunch", "dietary": "Vegan",
 "prepTime": "10 min", "cookTime": "30 min", "servings": 4}
```"#;

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn signup(app: &Router, email: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/api/auth/signup",
            Some(json!({
                "name": "A",
                "email": email,
                "password": "p1",
                "confirmPassword": "p1"
            })),
        )
        .await
    }

    async fn save(app: &Router, email: &str, title: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/api/recipes/save",
            Some(json!({
                "email": email,
                "title": title,
                "ingredients": ["eggs"],
                "instructions": ["whisk"],
                "category": "Breakfast Favorites",
                "servings": 1
            })),
        )
        .await
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake(None));
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signup_then_login() {
        let app = build_app(AppState::fake(None));

        let (status, body) = signup(&app, "a@x.com").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"].get("passwordHash").is_none());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "a@x.com", "password": "p1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();
        assert!(!token.is_empty());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "a@x.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/api/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_failures_are_401_whatever_the_email() {
        let app = build_app(AppState::fake(None));
        signup(&app, "a@x.com").await;

        for email in ["a@x.com", "ghost@x.com", "chef@localhost"] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": email, "password": "wrong" })),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
            assert_eq!(body["error"], "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn update_of_unknown_user_with_taken_username_is_404() {
        let app = build_app(AppState::fake(None));
        signup(&app, "a@x.com").await;
        send(
            &app,
            Method::PATCH,
            "/api/user/update",
            Some(json!({ "email": "a@x.com", "username": "chef" })),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/user/update",
            Some(json!({ "email": "ghost@x.com", "username": "chef" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let app = build_app(AppState::fake(None));
        assert_eq!(signup(&app, "a@x.com").await.0, StatusCode::CREATED);

        let (status, body) = signup(&app, "A@X.com").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn bad_bodies_are_400() {
        let app = build_app(AppState::fake(None));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/signup",
            Some(json!({ "email": "a@x.com", "password": "p1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PATCH, "/api/recipes/favorite", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn save_for_unknown_user_is_404() {
        let app = build_app(AppState::fake(None));
        let (status, body) = save(&app, "ghost@x.com", "Omelette").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");

        let (_, body) = send(&app, Method::GET, "/api/recipes/all", None).await;
        assert_eq!(body["recipes"], json!([]));
    }

    #[tokio::test]
    async fn save_toggle_and_list_favorites() {
        let app = build_app(AppState::fake(None));
        signup(&app, "a@x.com").await;
        signup(&app, "b@x.com").await;

        let (status, body) = save(&app, "a@x.com", "Omelette").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["recipe"]["isFavorite"], false);
        let id = body["recipe"]["id"].as_str().unwrap().to_string();
        save(&app, "b@x.com", "Waffles").await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/recipes/favorite",
            Some(json!({ "_id": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recipe"]["isFavorite"], true);
        assert_eq!(body["message"], "Recipe marked as favorite");

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/recipes/user",
            Some(json!({ "email": "a@x.com" })),
        )
        .await;
        let favorites = body["recipes"].as_array().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0]["title"], "Omelette");

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/recipes/user",
            Some(json!({ "email": "b@x.com" })),
        )
        .await;
        assert_eq!(body["recipes"], json!([]));

        let (_, body) = send(
            &app,
            Method::PATCH,
            "/api/recipes/favorite",
            Some(json!({ "id": id })),
        )
        .await;
        assert_eq!(body["recipe"]["isFavorite"], false);

        let (_, body) = send(&app, Method::GET, "/api/recipes/all", None).await;
        let all = body["recipes"].as_array().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["title"], "Waffles");
    }

    #[tokio::test]
    async fn toggle_unknown_recipe_is_404() {
        let app = build_app(AppState::fake(None));
        let (status, _) = send(
            &app,
            Method::PATCH,
            "/api/recipes/favorite",
            Some(json!({ "id": uuid::Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_user_profile() {
        let app = build_app(AppState::fake(None));
        signup(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/user/update",
            Some(json!({ "email": "a@x.com", "username": "chef", "bio": "I cook" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "chef");
        assert_eq!(body["user"]["name"], "A");
        assert_eq!(body["message"], "User updated successfully");

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/api/user/update",
            Some(json!({ "email": "nobody@x.com", "name": "N" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_rejects_unparsable_model_output() {
        let app = build_app(AppState::fake(Some("Sure! Here is a lovely recipe.")));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/recipes/generate",
            Some(json!({ "prompt": "tomato soup" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("parse"));
    }

    #[tokio::test]
    async fn generate_returns_recipe_with_stored_image() {
        let app = build_app(AppState::fake(Some(RECIPE_JSON)));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/recipes/generate",
            Some(json!({ "prompt": "tomato soup", "cuisine": "Italian" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recipe"]["title"], "Tomato Soup");
        assert_eq!(body["recipe"]["category"], "Comfort Food");
        assert!(body["recipe"]["image"]
            .as_str()
            .unwrap()
            .starts_with("https://fake.local/recipes/Tomato_Soup_"));
    }
}
