//! Daemon entry point: parses flags, wires up logging, the persisted
//! default Profile, and the [`Manager`], then runs until shut down.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use clap::Parser as _;
use shill::{
    cli::Cli,
    dispatcher::EventDispatcher,
    manager::Manager,
    paths::Paths,
    portal_detector::ReqwestProber,
    profile::Profile,
    proxy_factory::DbusProxyFactory,
    store::{JsonStore, StoreInterface},
};

/// How often the main loop re-runs the default-Service election and the
/// auto-connect policy.
const POLICY_TICK: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.foreground {
        shill::logging::init()?;
    } else {
        shill::logging::init_with_file()?;
    }

    tracing::info!(
        foreground = cli.foreground,
        passive_mode = cli.passive_mode,
        device_black_list = ?cli.device_black_list,
        "starting shilld"
    );

    let dispatcher = EventDispatcher::new();
    let prober = Arc::new(ReqwestProber::new());
    let mut manager = Manager::new(prober, dispatcher.clone());
    manager.set_default_technology_order(cli.technology_order());
    manager.set_device_black_list(cli.device_black_list.clone());
    manager.set_passive_mode(cli.passive_mode);
    manager.set_portal_url(cli.portal_list.first().cloned());

    let default_profile_path = Paths::profiles_dir()?.join("default.json");
    let store: Box<dyn StoreInterface> = Box::new(JsonStore::open(default_profile_path)?);
    manager.push_profile(Profile::new("default", store, true));

    // Connecting to the system bus now surfaces a misconfigured D-Bus
    // policy immediately rather than on the first proxy call.
    let _proxy_factory = DbusProxyFactory::system().await?;

    tracing::info!("shilld initialized, entering main loop");

    let mut tick = tokio::time::interval(POLICY_TICK);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = Utc::now();
                manager.drive_auto_connect(now);
                manager.recompute_default_service(now, |service_id, result| {
                    tracing::debug!(service = service_id, ?result, "portal check result");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal, stopping");
                break;
            }
        }
    }
    dispatcher.shutdown();

    Ok(())
}
