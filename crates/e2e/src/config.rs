//! Suite configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::locator::Query;
use crate::outcome::ValidationMessages;
use crate::wait::Waiter;

/// Public URL of the contact form under test
pub const FORM_URL: &str =
    "https://docs.google.com/forms/d/e/1FAIpQLScVG7idLWR8sxNQygSnLuhehUNVFti0FnVviWCSjDh-JNhsMA/viewform";

/// What the suite knows about the form it drives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormProfile {
    /// Page to open at session start
    pub url: String,

    /// Label of the choice that activates the contact sub-form
    pub choice: String,

    /// Text shown on the confirmation page
    pub success_phrase: String,

    /// Submit button label in each language the form may render in
    pub submit_labels: Vec<String>,

    /// Localized validation messages
    pub messages: ValidationMessages,
}

impl Default for FormProfile {
    fn default() -> Self {
        Self {
            url: FORM_URL.to_string(),
            choice: "Option 3".to_string(),
            success_phrase: "Thanks for submitting your contact info!".to_string(),
            submit_labels: vec!["Submit".to_string(), "Saada ära".to_string()],
            messages: ValidationMessages::default(),
        }
    }
}

impl FormProfile {
    /// The radio option labelled `choice`
    pub fn choice_query(choice: &str) -> Query {
        Query::text("span", choice)
    }

    pub fn submit_query(&self) -> Query {
        Query::role_with_label("div", "button", &self.submit_labels)
    }
}

/// How a browser session is obtained
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connect to an already running WebDriver instead of spawning one
    pub webdriver_url: Option<String>,

    /// Driver executable (None = pick by platform under `driver_dir`)
    pub driver_binary: Option<PathBuf>,

    /// Directory holding the per-platform driver executables
    pub driver_dir: PathBuf,

    /// Port for a spawned driver (None = find free port)
    pub port: Option<u16>,

    /// Run Chrome headless
    pub headless: bool,

    /// Timeout for the driver to report ready
    pub startup_timeout: Duration,

    /// Poll settings used by every wait in the session
    pub wait: Waiter,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            driver_binary: None,
            driver_dir: PathBuf::from("drivers"),
            port: None,
            headless: true,
            startup_timeout: Duration::from_secs(30),
            wait: Waiter::default(),
        }
    }
}

impl SessionConfig {
    /// Resolve the driver executable to spawn
    pub fn driver_binary(&self) -> PathBuf {
        self.driver_binary
            .clone()
            .unwrap_or_else(|| DriverPlatform::current().binary_path(&self.driver_dir))
    }
}

/// Platforms with a bundled chromedriver build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPlatform {
    MacIntel,
    MacArm,
    Linux,
    Windows,
}

impl DriverPlatform {
    /// Pick a platform from an OS name and CPU architecture.
    ///
    /// Anything unrecognised falls back to the Apple Silicon build.
    pub fn detect(os: &str, arch: &str) -> Self {
        match os {
            "macos" if arch == "x86_64" => DriverPlatform::MacIntel,
            "windows" => DriverPlatform::Windows,
            "linux" => DriverPlatform::Linux,
            _ => DriverPlatform::MacArm,
        }
    }

    pub fn current() -> Self {
        Self::detect(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn binary_path(&self, driver_dir: &Path) -> PathBuf {
        let (dir, file) = match self {
            DriverPlatform::MacIntel => ("macos", "chromedriver_mac_intel"),
            DriverPlatform::MacArm => ("macos", "chromedriver_mac_arm"),
            DriverPlatform::Linux => ("linux", "chromedriver_linux"),
            DriverPlatform::Windows => ("windows", "chromedriver_windows.exe"),
        };
        driver_dir.join(dir).join(file)
    }
}
