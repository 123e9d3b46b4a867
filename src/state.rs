use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::AppConfig;
use crate::proxy::mock::{MockCatalog, MockSwitch};
use crate::session::{SessionClient, SessionOptions};
use crate::types::Service;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub mocks: Arc<MockCatalog>,
    pub mock_switch: MockSwitch,
    pub sessions: SessionClient,
}

impl AppState {
    /// Mock mode follows the `MOCK_MODE` variable at request time
    pub fn new(config: AppConfig, mocks: MockCatalog) -> Result<Self, reqwest::Error> {
        let switch = MockSwitch::from_env("MOCK_MODE", config.mock.enabled);
        Self::with_switch(config, mocks, switch)
    }

    pub fn with_switch(
        config: AppConfig,
        mocks: MockCatalog,
        mock_switch: MockSwitch,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.proxy.connect_timeout_ms))
            .read_timeout(Duration::from_millis(config.proxy.stream_idle_timeout_ms))
            // Redirects are relayed to the browser, not followed here
            .redirect(reqwest::redirect::Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let refresh_url = refresh_url(&config);
        if refresh_url.is_none() {
            tracing::warn!(
                "{} is not set; upstream 401s will be returned without a session refresh",
                Service::Auth.env_key()
            );
        }

        let sessions = SessionClient::new(
            http,
            SessionOptions {
                refresh_url,
                timeout: Duration::from_millis(config.proxy.timeout_ms),
                refresh_timeout: Duration::from_millis(config.proxy.refresh_timeout_ms),
                single_flight: config.session.single_flight,
            },
        );

        Ok(Self {
            config: Arc::new(config),
            mocks: Arc::new(mocks),
            mock_switch,
            sessions,
        })
    }
}

/// Auth service base URL joined with the configured refresh path
fn refresh_url(config: &AppConfig) -> Option<Url> {
    let base = config.services.base_url(Service::Auth)?;
    let mut url = Url::parse(base).ok()?;
    {
        let mut path = url.path_segments_mut().ok()?;
        path.pop_if_empty();
        path.extend(config.session.refresh_path.split('/').filter(|s| !s.is_empty()));
    }
    Some(url)
}
