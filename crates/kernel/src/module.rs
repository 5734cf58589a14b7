use async_trait::async_trait;
use axum::Router;

/// Borrowed view handed to modules on `init` and `start`
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// A mountable slice of a BookBay service.
///
/// Dependencies (stores, caches, credential services) are handed to a module
/// when it is constructed; the trait only drives its lifecycle.
#[async_trait]
pub trait Module: Sync + Send {
    /// Path segment under `/api`; also used in logs
    fn name(&self) -> &'static str;

    /// Runs before the listener binds. Seeding belongs here.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Mounted at `/api/{name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths`, `components`) with paths relative to the mount point
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once the server has drained, in reverse registration order
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
