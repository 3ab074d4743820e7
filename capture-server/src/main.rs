use capture_server::{App, CaptureServer, Config, FingerprintStore};
use failure::Error;
use log::info;
use sgfplib_rs::CaptureController;
use std::sync::Arc;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let sdk = sgfplib_rs::load(config.library_path.as_deref())?;
    info!("sgfplib loaded from {}", sdk.path().display());

    let store = FingerprintStore::open(&config.static_dir)?;
    info!("Storing captures in {}", store.dir().display());

    let controller = Arc::new(CaptureController::new(
        Arc::new(sdk),
        config.capture.clone(),
    ));
    let app = App::new(controller, store, config.request_timeout);

    CaptureServer::bind(&config.address, app)?.serve();

    Ok(())
}
