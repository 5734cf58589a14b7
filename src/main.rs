use anyhow::Context;
use bookbay_app::ServiceSelection;
use bookbay_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load BookBay settings")?;
    bookbay_telemetry::init(&settings.telemetry);

    bookbay_app::run(settings, ServiceSelection::All).await
}
