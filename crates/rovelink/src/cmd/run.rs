use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rovelink::sim::{LoggingOutput, SimulatedSensors, SyntheticCamera};
use rovelink_session::settings;
use rovelink_session::{ConfigStore, JsonFileStore, Link, LinkConfig};
use rovelink_transport::{tcp::socket_addr, TcpConnector};
use tracing::info;

use crate::cmd::{parse_duration, runtime, RunArgs};
use crate::exit::{session_error, store_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat, config: &Path) -> CliResult<i32> {
    let store = JsonFileStore::open(config).map_err(|err| store_error("open config failed", err))?;
    if let Some(endpoint) = &args.endpoint {
        socket_addr(endpoint).map_err(|err| transport_error("invalid endpoint", err))?;
        settings::save_ws_uri(&store, endpoint)
            .map_err(|err| store_error("save endpoint failed", err))?;
    }
    let endpoint = settings::load_ws_uri(&store)
        .map_err(|err| store_error("read endpoint failed", err))?;
    let duration = args.duration.as_deref().map(parse_duration).transpose()?;

    let sensors = match args.seed {
        Some(seed) => SimulatedSensors::seeded(args.battery, seed),
        None => SimulatedSensors::new(args.battery),
    };
    let store: Arc<dyn ConfigStore> = Arc::new(store);
    let mut link = Link::new(
        LinkConfig::default(),
        store,
        Arc::new(TcpConnector::default()),
        Box::new(LoggingOutput::new()),
        Box::new(SyntheticCamera::new(args.frame_size)),
        Arc::new(sensors),
    )
    .map_err(|err| session_error("link setup failed", err))?;
    if args.no_camera {
        link.set_camera_state(false);
    }

    runtime()?.block_on(async move {
        link.start()
            .await
            .map_err(|err| session_error("link start failed", err))?;
        wait_for_stop(duration).await;

        let state = link.state();
        let (motor1, motor2) = link.motors().states();
        let camera = link.camera_enabled();
        let camera_fps = link.camera_fps();
        link.shutdown().await;

        print_record(
            &[
                ("endpoint", endpoint.unwrap_or_else(|| "-".to_string())),
                ("state", state.to_string()),
                ("motor1", motor1.to_string()),
                ("motor2", motor2.to_string()),
                ("camera", camera.to_string()),
                ("camera_fps", camera_fps.to_string()),
            ],
            format,
        );
        Ok(SUCCESS)
    })
}

async fn wait_for_stop(duration: Option<Duration>) {
    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => info!("run duration elapsed"),
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
        None => {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupted");
        }
    }
}
