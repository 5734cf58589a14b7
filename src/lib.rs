//! BookBay application library
//!
//! Wires the catalog and user modules onto the BookBay kernel and runs one
//! HTTP server per service.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use bookbay_authz::TokenService;
use bookbay_db::Database;
use bookbay_kernel::settings::{ServiceSettings, Settings};
use bookbay_kernel::{InitCtx, ModuleRegistry};

pub mod modules;

use modules::books::{service::CatalogService, store::DocumentBookStore, BooksModule};
use modules::users::{service::UserService, UsersModule};

pub const CATALOG_SERVICE: &str = "catalog-service";
pub const USER_SERVICE: &str = "user-service";

/// Which services a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceSelection {
    Catalog,
    Users,
    #[default]
    All,
}

impl FromStr for ServiceSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catalog" => Ok(Self::Catalog),
            "users" => Ok(Self::Users),
            "all" => Ok(Self::All),
            other => bail!("unknown service '{}'; expected catalog/users/all", other),
        }
    }
}

impl fmt::Display for ServiceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Catalog => "catalog",
            Self::Users => "users",
            Self::All => "all",
        })
    }
}

/// Shared backends and the services built on them.
pub struct Services {
    pub database: Database,
    pub catalog: Arc<CatalogService>,
    pub users: Arc<UserService>,
}

impl Services {
    /// Connect the document store and cache named in `settings`.
    pub async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let database = Database::connect(&settings.database.url)
            .with_context(|| format!("failed to open document store {}", settings.database.url))?;
        let cache = bookbay_cache::connect(&settings.cache).await;

        let store = DocumentBookStore::new(database.collection()?);
        let catalog = Arc::new(CatalogService::new(Arc::new(store), cache));

        let tokens = TokenService::new(&settings.auth.jwt_secret);
        let users = Arc::new(UserService::new(database.collection()?, tokens));

        Ok(Self {
            database,
            catalog,
            users,
        })
    }

    pub fn catalog_registry(&self) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new(CATALOG_SERVICE);
        registry.register(Arc::new(BooksModule::new(self.catalog.clone())));
        registry
    }

    pub fn users_registry(&self) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new(USER_SERVICE);
        registry.register(Arc::new(UsersModule::new(self.users.clone())));
        registry
    }
}

/// Run the selected services until shutdown.
pub async fn run(settings: Settings, selection: ServiceSelection) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        services = %selection,
        "bookbay bootstrap starting"
    );

    if selection == ServiceSelection::All && settings.catalog == settings.users {
        bail!(
            "catalog and users services cannot share {}",
            settings.catalog.bind_addr()
        );
    }

    let services = Services::connect(&settings).await?;

    let result = match selection {
        ServiceSelection::Catalog => {
            serve(services.catalog_registry(), &settings.catalog, &settings).await
        }
        ServiceSelection::Users => {
            serve(services.users_registry(), &settings.users, &settings).await
        }
        ServiceSelection::All => tokio::try_join!(
            serve(services.catalog_registry(), &settings.catalog, &settings),
            serve(services.users_registry(), &settings.users, &settings),
        )
        .map(|_| ()),
    };

    services.database.close();
    result
}

async fn serve(
    registry: ModuleRegistry,
    service: &ServiceSettings,
    settings: &Settings,
) -> anyhow::Result<()> {
    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookbay_http::start_server(&registry, service, settings).await;

    registry.stop_modules().await?;
    served
}
