pub mod models;
pub mod routes;
pub mod seed;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookbay_kernel::{InitCtx, Module};
use serde_json::json;

use service::CatalogService;

/// Catalog module: book listing, search and maintenance.
pub struct BooksModule {
    catalog: Arc<CatalogService>,
}

impl BooksModule {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let seeded = self.catalog.seed().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            cache = self.catalog.cache().backend(),
            seeded,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Book" }
                    }
                }
            })
        };
        let book_list = json!({
            "description": "Books",
            "content": {
                "application/json": {
                    "schema": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Book" }
                    }
                }
            }
        });
        let input_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/BookInput" }
                }
            }
        });
        let id_param = json!({
            "name": "id", "in": "path", "required": true, "schema": { "type": "string" }
        });

        Some(json!({
            "paths": {
                "": {
                    "get": {
                        "summary": "List all books, newest first",
                        "tags": ["Books"],
                        "responses": { "200": book_list, "503": error("Store unavailable") }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "requestBody": input_body,
                        "responses": {
                            "201": book("Created"),
                            "400": error("Invalid book"),
                            "409": error("Duplicate isbn")
                        }
                    }
                },
                "/search": {
                    "get": {
                        "summary": "Search title, author, description and category",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "query", "in": "query", "required": false,
                            "schema": { "type": "string" }
                        }],
                        "responses": { "200": book_list }
                    }
                },
                "/categories": {
                    "get": {
                        "summary": "Distinct categories, ascending",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Categories",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": { "type": "string" } }
                                    }
                                }
                            }
                        }
                    }
                },
                "/category/{category}": {
                    "get": {
                        "summary": "Books whose category contains the given text",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "category", "in": "path", "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": { "200": book_list }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": { "200": book("Book"), "404": error("Book not found") }
                    },
                    "put": {
                        "summary": "Replace a book's fields",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "requestBody": input_body,
                        "responses": {
                            "200": book("Updated"),
                            "400": error("Invalid book"),
                            "404": error("Book not found"),
                            "409": error("Duplicate isbn")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": {
                                "description": "Deleted",
                                "content": { "application/json": { "schema": { "type": "boolean" } } }
                            },
                            "404": error("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "price": { "type": "number", "minimum": 0 },
                            "description": { "type": "string" },
                            "stock": { "type": "integer", "minimum": 0 },
                            "isbn": { "type": "string" },
                            "category": { "type": "string" },
                            "publishedDate": { "type": "string", "format": "date" },
                            "createdAt": { "type": "string", "format": "date-time" }
                        },
                        "required": [
                            "id", "title", "author", "price", "description", "stock",
                            "isbn", "category", "publishedDate", "createdAt"
                        ]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "price": { "type": "number", "minimum": 0 },
                            "description": { "type": "string" },
                            "stock": { "type": "integer", "minimum": 0 },
                            "isbn": { "type": "string" },
                            "category": { "type": "string" },
                            "publishedDate": { "type": "string", "format": "date" }
                        },
                        "required": [
                            "title", "author", "price", "description", "stock",
                            "isbn", "category", "publishedDate"
                        ]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}
