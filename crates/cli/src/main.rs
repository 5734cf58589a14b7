use anyhow::Context;
use bookbay_app::ServiceSelection;
use bookbay_authz::TokenService;
use bookbay_kernel::settings::Settings;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "bookbay-cli", version, about = "Run and inspect the BookBay services")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start HTTP servers for the selected services
    Serve {
        #[arg(long, value_enum, default_value_t = ServiceArg::All)]
        service: ServiceArg,
    },
    /// Print the resolved configuration (secrets redacted)
    Config,
    /// Verify a session token against the configured secret and print its claims
    Token { token: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ServiceArg {
    Catalog,
    Users,
    All,
}

impl From<ServiceArg> for ServiceSelection {
    fn from(arg: ServiceArg) -> Self {
        match arg {
            ServiceArg::Catalog => ServiceSelection::Catalog,
            ServiceArg::Users => ServiceSelection::Users,
            ServiceArg::All => ServiceSelection::All,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load BookBay settings")?;

    match cli.command {
        Command::Serve { service } => {
            bookbay_telemetry::init(&settings.telemetry);
            bookbay_app::run(settings, service.into()).await
        }
        Command::Config => {
            println!("{:#?}", settings);
            Ok(())
        }
        Command::Token { token } => {
            let claims = TokenService::new(&settings.auth.jwt_secret)
                .verify(&token)
                .context("token rejected")?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(())
        }
    }
}
