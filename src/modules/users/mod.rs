pub mod models;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookbay_kernel::{InitCtx, Module};
use serde_json::json;

use service::UserService;

/// User module: registration, login and the authenticated profile.
pub struct UsersModule {
    users: Arc<UserService>,
}

impl UsersModule {
    pub fn new(users: Arc<UserService>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.auth.uses_fallback_secret() {
            tracing::warn!(
                module = self.name(),
                "signing tokens with the fallback secret; set BOOKBAY_AUTH__JWT_SECRET"
            );
        }
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.users.clone())
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
        let auth_result = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/AuthResponse" }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/register": {
                    "post": {
                        "summary": "Register a user",
                        "tags": ["Users"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/RegisterRequest" }
                                }
                            }
                        },
                        "responses": {
                            "201": auth_result("User registered successfully"),
                            "400": error("Missing fields, short password or email taken")
                        }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Log in",
                        "tags": ["Users"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/LoginRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": auth_result("Login successful"),
                            "400": error("Missing fields"),
                            "401": error("Invalid email or password")
                        }
                    }
                },
                "/profile": {
                    "get": {
                        "summary": "Current user's profile",
                        "tags": ["Users"],
                        "security": [{ "bearerAuth": [] }],
                        "responses": {
                            "200": {
                                "description": "Profile retrieved successfully",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "message": { "type": "string" },
                                                "data": { "$ref": "#/components/schemas/User" }
                                            }
                                        }
                                    }
                                }
                            },
                            "401": error("Access token required"),
                            "403": error("Invalid or expired token"),
                            "404": error("User not found")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "User service health",
                        "tags": ["Users"],
                        "responses": { "200": { "description": "OK" } }
                    }
                }
            },
            "components": {
                "securitySchemes": {
                    "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
                },
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "email": { "type": "string", "format": "email" },
                            "name": { "type": "string" },
                            "role": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "email", "name", "role", "createdAt"]
                    },
                    "RegisterRequest": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string", "minLength": 6 },
                            "name": { "type": "string" },
                            "role": { "type": "string" }
                        },
                        "required": ["email", "password", "name"]
                    },
                    "LoginRequest": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string" }
                        },
                        "required": ["email", "password"]
                    },
                    "AuthResponse": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "data": {
                                "type": "object",
                                "properties": {
                                    "user": { "$ref": "#/components/schemas/User" },
                                    "token": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module stopped");
        Ok(())
    }
}
