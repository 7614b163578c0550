use std::sync::Arc;
use tokio::sync::broadcast;

use crate::clients::browser::ChromeLauncher;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::services::{CaptchaGate, CaseFetcher, CourtFetcher, FetchTimings};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub event_bus: broadcast::Sender<NotificationEvent>,

    pub captcha: Arc<CaptchaGate>,

    pub fetcher: Arc<dyn CaseFetcher>,
}

impl SharedState {
    /// Wires the Chrome-backed fetcher.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let court = config.court.clone();
        Self::with_fetcher(config, move |captcha| {
            let search_url = court.search_url.clone();
            let timings = FetchTimings::from(&court);
            let launcher = Arc::new(ChromeLauncher::new(court));
            Arc::new(CourtFetcher::new(launcher, captcha, search_url, timings))
        })
        .await
    }

    /// Wires a caller-supplied fetcher. The builder receives the checkpoint
    /// gate so the fetcher and the operator endpoints share it.
    pub async fn with_fetcher(
        config: Config,
        build_fetcher: impl FnOnce(Arc<CaptchaGate>) -> Arc<dyn CaseFetcher>,
    ) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);

        let store = Store::new(&config.database).await?;

        let captcha = Arc::new(CaptchaGate::new(
            event_bus.clone(),
            config.captcha.max_wait(),
        ));
        let fetcher = build_fetcher(captcha.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            event_bus,
            captcha,
            fetcher,
        })
    }
}
