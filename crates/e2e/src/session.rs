//! Browser session management - spawning the WebDriver and opening the form

use async_trait::async_trait;
use fantoccini::ClientBuilder;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::driver::{Driver, WebDriverClient};
use crate::error::{E2eError, E2eResult};
use crate::wait::Waiter;

/// Handle to a running chromedriver process
pub struct DriverProcess {
    child: Child,
    pub url: String,
    pub port: u16,
    stopped: bool,
}

impl DriverProcess {
    /// Spawn the driver binary and wait until it accepts sessions
    pub async fn spawn(
        binary: &Path,
        port: Option<u16>,
        startup_timeout: Duration,
    ) -> E2eResult<Self> {
        let port = match port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let url = format!("http://127.0.0.1:{}", port);

        info!("Spawning {} on port {}", binary.display(), port);

        let child = Command::new(binary)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                E2eError::Launch(format!("Failed to spawn {}: {}", binary.display(), e))
            })?;

        let mut process = DriverProcess {
            child,
            url,
            port,
            stopped: false,
        };

        if let Err(e) = process.wait_for_healthy(startup_timeout).await {
            process.stop().await;
            return Err(e);
        }

        info!("WebDriver is ready at {}", process.url);
        Ok(process)
    }

    /// Poll the WebDriver status endpoint until it reports success
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let status_url = format!("{}/status", self.url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| E2eError::Launch(format!("HTTP client for health check: {}", e)))?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("WebDriver status returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for WebDriver to start...");
                    }
                    // Connection refused is expected while the driver is starting
                    if !e.is_connect() {
                        warn!("WebDriver status error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::Launch(format!(
            "WebDriver at {} not healthy after {} attempts",
            self.url, attempts
        )))
    }

    /// Stop the driver process, giving it a moment to exit on SIGTERM
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        debug!("Stopping WebDriver (pid: {})", self.child.id());

        if self.terminate() {
            sleep(Duration::from_millis(200)).await;
        }
        self.reap();
    }

    /// Send SIGTERM; false when no signal could be delivered
    #[cfg(unix)]
    fn terminate(&self) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = Pid::from_raw(self.child.id() as i32);
        kill(pid, Signal::SIGTERM).is_ok()
    }

    #[cfg(not(unix))]
    fn terminate(&self) -> bool {
        false
    }

    fn reap(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.terminate();
            self.reap();
        }
    }
}

/// One live browser session, owned by a single scenario
pub struct Session<D: Driver> {
    driver: D,
    url: String,
    waiter: Waiter,
    process: Option<DriverProcess>,
}

impl<D: Driver> Session<D> {
    /// Navigate `driver` to `url` and wrap it as a session.
    ///
    /// The driver is quit again if navigation fails.
    pub async fn start(driver: D, url: &str, waiter: Waiter) -> E2eResult<Self> {
        if let Err(e) = driver.goto(url).await {
            if let Err(quit) = driver.quit().await {
                warn!("Failed to quit after navigation error: {}", quit);
            }
            return Err(e);
        }

        Ok(Self {
            driver,
            url: url.to_string(),
            waiter,
            process: None,
        })
    }

    /// Tie a spawned driver process to this session's lifetime
    pub fn with_process(mut self, process: DriverProcess) -> Self {
        self.process = Some(process);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    /// URL the session was opened on
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Release the browser and driver process; never fails
    pub async fn close(mut self) {
        if let Err(e) = self.driver.quit().await {
            warn!("Failed to close browser session: {}", e);
        }
        if let Some(mut process) = self.process.take() {
            process.stop().await;
        }
        debug!("Session for {} closed", self.url);
    }
}

impl Session<WebDriverClient> {
    /// Obtain a WebDriver (spawned or pre-existing), open Chrome and navigate to `url`
    pub async fn open(config: &SessionConfig, url: &str) -> E2eResult<Self> {
        let (webdriver_url, process) = match &config.webdriver_url {
            Some(existing) => (existing.clone(), None),
            None => {
                let process = DriverProcess::spawn(
                    &config.driver_binary(),
                    config.port,
                    config.startup_timeout,
                )
                .await?;
                (process.url.clone(), Some(process))
            }
        };

        let client = ClientBuilder::native()
            .capabilities(capabilities(config.headless))
            .connect(&webdriver_url)
            .await?;

        info!("Opening {}", url);
        let session = Session::start(WebDriverClient::new(client), url, config.wait).await?;

        Ok(match process {
            Some(process) => session.with_process(process),
            None => session,
        })
    }
}

/// Chrome capabilities for a new session
fn capabilities(headless: bool) -> Map<String, Value> {
    let mut args = vec!["--window-size=1280,720", "--disable-gpu"];
    if headless {
        args.push("--headless=new");
    }

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

/// Opens a fresh session for each scenario
#[async_trait]
pub trait Launcher: Send + Sync {
    type Driver: Driver;

    async fn launch(&self, url: &str) -> E2eResult<Session<Self::Driver>>;
}

/// Launches real Chrome sessions over WebDriver
#[derive(Debug, Clone, Default)]
pub struct WebDriverLauncher {
    config: SessionConfig,
}

impl WebDriverLauncher {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Launcher for WebDriverLauncher {
    type Driver = WebDriverClient;

    async fn launch(&self, url: &str) -> E2eResult<Session<WebDriverClient>> {
        Session::open(&self.config, url).await
    }
}

/// Find a free port to use
fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
