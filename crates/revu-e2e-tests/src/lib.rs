pub mod rest;

use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::Rng as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use revu_auth::token::TokenManager;
use revu_server::config::{Parser as _, ServerConfig};
use revu_types::claim::{ApiClaim, Role};
use tempfile::TempDir;
use tracing::debug;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "revu-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Test caller identities, carrying the user id for the token subject.
#[derive(Debug, Clone, Copy)]
pub enum TestUser {
    Buyer(i64),
    Admin(i64),
    NoRole(i64),
}

impl TestUser {
    fn claim(&self) -> ApiClaim {
        match *self {
            TestUser::Buyer(id) => ApiClaim::new_expired(id.to_string(), [Role::Buyer]),
            TestUser::Admin(id) => ApiClaim::new_expired(id.to_string(), [Role::Admin]),
            TestUser::NoRole(id) => ApiClaim::new_expired(id.to_string(), []),
        }
    }
}

pub struct TestEnv {
    pub base_url: reqwest::Url,
    pub pool: revu_dal::Pool,
    tokens: TokenManager,
    // keeps the server alive; dropping it triggers graceful shutdown
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

/// Boots the real server in-process on the configured port and waits for it
/// to answer health checks.
pub async fn launch_env(config: ServerConfig) -> Result<TestEnv> {
    let state = revu_server::build_state(&config).await?;
    let pool = state.pool().clone();

    // mint tokens with the same secret the server just created
    let secret = tokio::fs::read(config.data_dir().join("secret")).await?;
    let tokens = TokenManager::new(&secret, config.token_validity);

    let base_url = config.base_url.clone();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(revu_server::run::run_graceful_with_state(
        config,
        state,
        async move {
            let _ = shutdown_rx.await;
        },
    ));

    wait_healthy(&base_url).await?;

    Ok(TestEnv {
        base_url,
        pool,
        tokens,
        _shutdown: shutdown_tx,
    })
}

async fn wait_healthy(base_url: &reqwest::Url) -> Result<()> {
    let health_url = base_url.join("health")?;
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(response) = client.get(health_url.clone()).send().await {
            if response.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not become healthy"))
}

impl TestEnv {
    /// Client authenticated as the given test user.
    pub fn client(&self, user: TestUser) -> Result<reqwest::Client> {
        let token = self.tokens.issue(user.claim())?;
        debug!("Issued token for {:?}", user);
        client_with_token(&token)
    }

    /// Client without an Authorization header.
    pub fn anonymous_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::new())
    }

    /// Client with an arbitrary (e.g. garbage) bearer token.
    pub fn client_with_raw_token(&self, token: &str) -> Result<reqwest::Client> {
        client_with_token(token)
    }
}

fn client_with_token(token: &str) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    Ok(client)
}
