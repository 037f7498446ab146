use std::sync::Arc;

use wa_bridge_core::{config, config::Config, Error};

fn main() -> Result<(), Error> {
    // Environment writes happen here, before the runtime spawns its workers.
    config::load_dotenv();
    run()
}

#[tokio::main]
async fn run() -> Result<(), Error> {
    wa_bridge_core::logging::init("wa-bridge")?;

    let cfg = Arc::new(Config::load()?);

    wa_bridge_whatsapp::router::run(cfg)
        .await
        .map_err(|e| Error::External(format!("whatsapp bridge failed: {e}")))?;

    Ok(())
}
