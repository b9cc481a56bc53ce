//! OpenAPI description of the HTTP API.
//!
//! The document is maintained by hand next to the route table; the tests
//! check that both list the same operations.

use axum::Json;
use serde_json::{Value, json};

/// Every documented `(method, path)` pair, in OpenAPI path syntax.
pub const OPERATIONS: &[(&str, &str)] = &[
    ("get", "/health"),
    ("get", "/products"),
    ("get", "/products/{id}"),
    ("post", "/subscriptions"),
    ("get", "/subscriptions/{id}"),
    ("post", "/subscriptions/{id}/purchase"),
    ("patch", "/subscriptions/{id}/pause"),
    ("patch", "/subscriptions/{id}/unpause"),
    ("patch", "/subscriptions/{id}/cancel"),
    ("get", "/api-docs/openapi.json"),
];

/// `GET /api-docs/openapi.json`
pub async fn openapi_json() -> Json<Value> {
    Json(document())
}

/// The OpenAPI 3.0 document for this service.
#[must_use]
pub fn document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "subserv",
            "description": "Subscription lifecycle service",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "components": {
            "securitySchemes": {
                "bearer": { "type": "http", "scheme": "bearer" },
            },
            "parameters": {
                "id": {
                    "name": "id",
                    "in": "path",
                    "required": true,
                    "schema": { "type": "integer", "format": "int64", "minimum": 1 },
                },
            },
            "schemas": schemas(),
        },
        "paths": {
            "/health": {
                "get": {
                    "summary": "Liveness check",
                    "responses": {
                        "200": { "description": "Service is up", "content": { "text/plain": { "schema": { "type": "string" } } } },
                    },
                },
            },
            "/products": {
                "get": {
                    "summary": "List the product catalog",
                    "responses": {
                        "200": body("Products", "ProductList"),
                        "404": error("The catalog is empty"),
                    },
                },
            },
            "/products/{id}": {
                "get": {
                    "summary": "Fetch one product",
                    "parameters": [id_param()],
                    "responses": {
                        "200": body("Product", "Product"),
                        "400": error("Malformed id"),
                        "404": error("Unknown product"),
                    },
                },
            },
            "/subscriptions": {
                "post": {
                    "summary": "Create a pending subscription for the caller",
                    "security": [{ "bearer": [] }],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("CreateSubscriptionRequest") } },
                    },
                    "responses": {
                        "201": body("Pending subscription", "Subscription"),
                        "400": error("Malformed body"),
                        "401": error("Missing or unknown token"),
                        "404": error("Unknown user or product"),
                    },
                },
            },
            "/subscriptions/{id}": {
                "get": {
                    "summary": "Fetch one subscription",
                    "security": [{ "bearer": [] }],
                    "parameters": [id_param()],
                    "responses": {
                        "200": body("Subscription", "Subscription"),
                        "400": error("Malformed id"),
                        "401": error("Missing or unknown token"),
                        "404": error("Unknown subscription"),
                    },
                },
            },
            "/subscriptions/{id}/purchase": {
                "post": {
                    "summary": "Charge a pending subscription and activate it",
                    "security": [{ "bearer": [] }],
                    "parameters": [id_param()],
                    "responses": {
                        "200": body("Payment receipt", "PurchaseResponse"),
                        "401": error("Missing or unknown token"),
                        "402": error("Payment declined"),
                        "404": error("Unknown subscription"),
                        "409": error("Not pending or concurrently modified"),
                    },
                },
            },
            "/subscriptions/{id}/pause": transition("Pause an active subscription"),
            "/subscriptions/{id}/unpause": transition("Resume a paused subscription"),
            "/subscriptions/{id}/cancel": transition("Cancel a subscription"),
            "/api-docs/openapi.json": {
                "get": {
                    "summary": "This document",
                    "responses": {
                        "200": { "description": "OpenAPI document", "content": { "application/json": {} } },
                    },
                },
            },
        },
    })
}

fn schemas() -> Value {
    let timestamp = json!({ "type": "string", "format": "date-time" });
    json!({
        "Error": object(&["code", "message"], &json!({
            "code": { "type": "string" },
            "message": { "type": "string" },
        })),
        "Product": object(&["id", "name", "description", "price", "tax_rate", "duration_secs"], &json!({
            "id": { "type": "integer", "format": "int64" },
            "name": { "type": "string" },
            "description": { "type": "string" },
            "price": { "type": "integer", "format": "int64", "description": "Cents" },
            "tax_rate": { "type": "integer", "minimum": 0, "maximum": 100 },
            "duration_secs": { "type": "integer", "format": "int64" },
        })),
        "ProductList": object(&["products"], &json!({
            "products": { "type": "array", "items": schema_ref("Product") },
        })),
        "CreateSubscriptionRequest": object(&["product_id"], &json!({
            "product_id": { "type": "integer", "format": "int64", "minimum": 1 },
        })),
        "Subscription": object(
            &["id", "user_id", "product_id", "state", "price_cent", "tax_rate", "start", "end", "version"],
            &json!({
                "id": { "type": "integer", "format": "int64" },
                "user_id": { "type": "integer", "format": "int64" },
                "product_id": { "type": "integer", "format": "int64" },
                "state": {
                    "type": "string",
                    "enum": ["pending", "active", "paused", "cancelled", "expired", "failed"],
                },
                "price_cent": { "type": "integer", "format": "int64" },
                "tax_rate": { "type": "integer", "minimum": 0, "maximum": 100 },
                "start": timestamp,
                "end": timestamp,
                "paused_at": timestamp,
                "version": { "type": "integer", "format": "int64" },
            }),
        ),
        "PurchaseResponse": object(&["message", "transaction_id", "amount_cent", "subscription"], &json!({
            "message": { "type": "string" },
            "transaction_id": { "type": "string" },
            "amount_cent": { "type": "integer", "format": "int64", "description": "Price with tax" },
            "subscription": schema_ref("Subscription"),
        })),
    })
}

fn object(required: &[&str], properties: &Value) -> Value {
    json!({ "type": "object", "required": required, "properties": properties })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn id_param() -> Value {
    json!({ "$ref": "#/components/parameters/id" })
}

fn body(description: &str, schema: &str) -> Value {
    json!({ "description": description, "content": { "application/json": { "schema": schema_ref(schema) } } })
}

fn error(description: &str) -> Value {
    body(description, "Error")
}

fn transition(summary: &str) -> Value {
    json!({
        "patch": {
            "summary": summary,
            "security": [{ "bearer": [] }],
            "parameters": [id_param()],
            "responses": {
                "202": body("Updated subscription", "Subscription"),
                "401": error("Missing or unknown token"),
                "404": error("Unknown subscription"),
                "409": error("Not allowed from the current state"),
            },
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_documented() {
        let doc = document();
        let paths = doc["paths"].as_object().unwrap();

        for (method, path) in OPERATIONS {
            assert!(paths[*path][*method].is_object(), "{method} {path} missing");
        }
        let documented: usize = paths.values().map(|p| p.as_object().unwrap().len()).sum();
        assert_eq!(documented, OPERATIONS.len());
    }

    #[test]
    fn every_reference_resolves() {
        fn refs(value: &Value, out: &mut Vec<String>) {
            match value {
                Value::Object(map) => {
                    if let Some(Value::String(target)) = map.get("$ref") {
                        out.push(target.clone());
                    }
                    map.values().for_each(|v| refs(v, out));
                }
                Value::Array(items) => items.iter().for_each(|v| refs(v, out)),
                _ => {}
            }
        }

        let doc = document();
        let mut targets = Vec::new();
        refs(&doc, &mut targets);
        assert!(!targets.is_empty());

        for target in targets {
            let pointer = target.trim_start_matches('#');
            assert!(doc.pointer(pointer).is_some(), "dangling {target}");
        }
    }

    #[test]
    fn subscription_schema_matches_response_fields() {
        let mut subscription = subserv_testing::fixtures::subscription(
            1,
            subserv_core::types::SubscriptionState::Paused,
            chrono::Utc::now(),
        );
        subscription.paused_at = Some(chrono::Utc::now());
        let sample = serde_json::to_value(crate::dto::SubscriptionResponse::from(subscription)).unwrap();

        let doc = document();
        let properties = doc["components"]["schemas"]["Subscription"]["properties"]
            .as_object()
            .unwrap();
        let fields = sample.as_object().unwrap();

        assert_eq!(properties.len(), fields.len());
        for key in fields.keys() {
            assert!(properties.contains_key(key), "{key} undocumented");
        }
    }
}
