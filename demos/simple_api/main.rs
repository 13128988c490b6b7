//! Simple API guarded by field-guard
//!
//! Run with `RUST_LOG=field_guard=debug,tower_http=info` to see rejections.
//!
//! ```text
//! curl -X POST localhost:3000/users -H 'content-type: application/json' \
//!      -d '{"name": "Alice", "email": "alice@example.com"}'
//! curl localhost:3000/users/42
//! curl 'localhost:3000/search?term=rust&page=2'
//! ```

use axum::Json;
use axum::extract::{Path, Query};
use field_guard::prelude::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const SCHEMAS: &str = r#"
options:
  report: all_faults
schemas:
  search:
    location: query
    isOptional: true
    data:
      term: { expectedType: string }
      page: { expectedType: string, pattern: "^[0-9]+$" }
"#;

async fn create_user(Json(user): Json<Value>) -> Json<Value> {
    Json(json!({ "created": user }))
}

async fn get_user(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "id": id, "name": "Alice" }))
}

async fn search(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({ "query": query, "results": [] }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let new_user = SchemaDefinition::new(Location::Body)
        .field("name", RuleDefinition::string().pattern(r"^[A-Za-z ]+$"))
        .field(
            "email",
            RuleDefinition::string().pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
        )
        .field("age", RuleDefinition::number().optional());

    let user_id = SchemaDefinition::new(Location::Params)
        .field("id", RuleDefinition::string().pattern(r"^[0-9]+$"));

    let config = GuardConfig::from_yaml_str(SCHEMAS)?;
    let search_guard = config
        .layer("search")
        .ok_or_else(|| anyhow::anyhow!("schema 'search' is not declared"))?;

    let app = Router::new()
        .route(
            "/users",
            post(create_user).route_layer(ValidationLayer::new(Validator::new(&new_user))),
        )
        .route(
            "/users/{id}",
            get(get_user).route_layer(ValidationLayer::new(Validator::new(&user_id))),
        )
        .route("/search", get(search).route_layer(search_guard))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
