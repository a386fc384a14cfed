//! Shared test support: scripted encode runners and a bound-listener server
//! harness.
#![allow(dead_code)]

use async_trait::async_trait;
use opusrack::config::Config;
use opusrack::convert::{ConversionService, EncodeJobSpec, EncodeRunner, JobOutcome};
use opusrack::server::{create_router, AppContext};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// What a scripted runner should do for one bitrate.
#[derive(Debug, Clone)]
pub enum Script {
    /// Write a placeholder output file, then report success
    Succeed,
    /// Report failure with the given reason
    Fail(&'static str),
    /// Write the output file first, then report failure (partial output)
    FailAfterWrite(&'static str),
    /// Sleep, then succeed
    SucceedAfter(Duration),
    /// Sleep, then fail
    FailAfter(Duration, &'static str),
    /// Never finish within any test deadline
    Hang,
}

/// Runner whose behavior is scripted per bitrate.
pub struct ScriptedRunner {
    scripts: HashMap<u32, Script>,
}

impl ScriptedRunner {
    pub fn new(scripts: impl IntoIterator<Item = (u32, Script)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts.into_iter().collect(),
        })
    }

    /// Every bitrate succeeds immediately.
    pub fn all_succeeding() -> Arc<Self> {
        Self::new([320, 160, 80, 40].map(|b| (b, Script::Succeed)))
    }

    async fn write_output(spec: &EncodeJobSpec) {
        if let Some(parent) = spec.destination.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        tokio::fs::write(&spec.destination, b"opus")
            .await
            .expect("write scripted output");
    }
}

#[async_trait]
impl EncodeRunner for ScriptedRunner {
    async fn run(&self, spec: EncodeJobSpec) -> JobOutcome {
        let script = self
            .scripts
            .get(&spec.bitrate.kbps())
            .cloned()
            .unwrap_or(Script::Succeed);

        match script {
            Script::Succeed => {
                Self::write_output(&spec).await;
                JobOutcome::success(spec)
            }
            Script::Fail(reason) => JobOutcome::failed(spec, reason),
            Script::FailAfterWrite(reason) => {
                Self::write_output(&spec).await;
                JobOutcome::failed(spec, reason)
            }
            Script::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                Self::write_output(&spec).await;
                JobOutcome::success(spec)
            }
            Script::FailAfter(delay, reason) => {
                tokio::time::sleep(delay).await;
                JobOutcome::failed(spec, reason)
            }
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                JobOutcome::failed(spec, "unreachable")
            }
        }
    }
}

/// Spin up the full router on an ephemeral port with the given config and
/// runner. Returns the bound address.
pub async fn spawn_server(config: Config, runner: Arc<dyn EncodeRunner>) -> SocketAddr {
    tokio::fs::create_dir_all(&config.encoder.output_dir)
        .await
        .unwrap();
    tokio::fs::create_dir_all(&config.encoder.work_dir)
        .await
        .unwrap();

    let conversion =
        Arc::new(ConversionService::with_runner(runner, &config.encoder).expect("valid bitrates"));

    let (accounts, store) = if config.store.enabled {
        (
            Some(Arc::new(opusrack::accounts::AccountRegistry::new(
                &config.store,
            ))),
            Some(Arc::new(opusrack::storage::BlobStore::new(&config.store))),
        )
    } else {
        (None, None)
    };

    let ctx = AppContext {
        config: Arc::new(config),
        conversion,
        accounts,
        store,
    };

    let app = create_router(ctx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Config rooted in a fresh temp directory, auth disabled.
pub fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.encoder.output_dir = root.join("output");
    config.encoder.work_dir = root.join("work");
    config.encoder.batch_timeout_secs = 30;
    config
}

/// Multipart form carrying `bytes` in the `music` field.
pub fn music_form(file_name: &str, bytes: &[u8]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
    reqwest::multipart::Form::new().part("music", part)
}
