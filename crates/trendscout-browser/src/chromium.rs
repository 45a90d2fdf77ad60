//! Chromium DevTools backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EnableParams, EventAuthRequired, EventRequestPaused,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use trendscout_core::EngineConfig;

use crate::behavior::{BehaviorSettings, BehaviorSimulator};
use crate::error::SessionError;
use crate::fingerprint::Fingerprint;
use crate::pacer::Pacing;
use crate::page::BrowserPage;
use crate::pool::Identity;
use crate::session::{SessionFactory, StealthSession};
use crate::stealth::stealth_script;

/// Find a Chromium-family executable.
///
/// Order: the configured path, then `PATH`, then well-known install locations.
#[must_use]
pub fn find_chrome_executable(configured: Option<&str>) -> Option<String> {
    if let Some(path) = configured {
        if Path::new(path).exists() {
            return Some(path.to_string());
        }
        tracing::warn!(path, "configured browser executable not found");
    }

    let names = [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "brave-browser",
        "chrome",
    ];
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            for name in names {
                let full = dir.join(name);
                if full.exists() {
                    return Some(full.to_string_lossy().into_owned());
                }
            }
        }
    }

    let well_known: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/snap/bin/chromium",
        ]
    };
    well_known
        .iter()
        .find(|p| Path::new(p).exists())
        .map(|p| (*p).to_string())
}

/// Launches one headless Chromium per session.
#[derive(Debug, Clone)]
pub struct ChromiumSessionFactory {
    executable: String,
    headless: bool,
    page_load_timeout: Duration,
    behavior: BehaviorSettings,
    pacing: Pacing,
}

impl ChromiumSessionFactory {
    /// # Errors
    ///
    /// Returns [`SessionError::BrowserInit`] if no browser executable is found.
    pub fn from_config(config: &EngineConfig, pacing: Pacing) -> Result<Self, SessionError> {
        let executable = find_chrome_executable(config.chrome_executable.as_deref()).ok_or_else(
            || {
                SessionError::BrowserInit(
                    "no Chromium-family browser found; set CHROME_EXECUTABLE".to_string(),
                )
            },
        )?;
        Ok(Self {
            executable,
            headless: config.headless,
            page_load_timeout: config.page_load_timeout(),
            behavior: BehaviorSettings::from_config(config),
            pacing,
        })
    }

    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    fn browser_config(
        &self,
        identity: &Identity,
        profile_dir: &Path,
    ) -> Result<BrowserConfig, SessionError> {
        let fp = &identity.fingerprint;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(profile_dir)
            .viewport(Viewport {
                width: fp.viewport.width,
                height: fp.viewport.height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .window_size(fp.viewport.width, fp.viewport.height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg(format!("--user-agent={}", fp.user_agent))
            .arg(format!("--lang={}", fp.locale));
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(lease) = &identity.proxy {
            builder = builder.arg(format!("--proxy-server={}", lease.endpoint.server_arg()));
        }
        builder.build().map_err(SessionError::BrowserInit)
    }

    async fn prepare_page(page: &Page, identity: &Identity) -> Result<(), SessionError> {
        let fp = &identity.fingerprint;

        let mut ua = SetUserAgentOverrideParams::new(fp.user_agent.clone());
        ua.accept_language = Some(fp.accept_language());
        ua.platform = Some(fp.platform.clone());
        page.execute(ua).await.map_err(cdp_error)?;

        page.execute(SetTimezoneOverrideParams::new(fp.timezone.clone()))
            .await
            .map_err(cdp_error)?;
        page.execute(SetLocaleOverrideParams {
            locale: Some(fp.locale.clone()),
        })
        .await
        .map_err(cdp_error)?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(stealth_script(fp)))
            .await
            .map_err(cdp_error)?;
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn create_session(&self, identity: &Identity) -> Result<StealthSession, SessionError> {
        let profile_dir = std::env::temp_dir().join(format!("trendscout-{}", uuid::Uuid::new_v4()));
        let config = self.browser_config(identity, &profile_dir)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::BrowserInit(e.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "devtools handler event error");
                }
            }
        });

        let setup = async {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| SessionError::BrowserInit(e.to_string()))?;
            Self::prepare_page(&page, identity).await?;
            let auth_task = match identity.proxy.as_ref().and_then(|l| l.endpoint.credentials()) {
                Some((user, pass)) => Some(spawn_proxy_auth(&page, user, pass).await?),
                None => None,
            };
            Ok::<_, SessionError>((page, auth_task))
        }
        .await;

        let (page, auth_task) = match setup {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::debug!(error = %close_err, "browser close after failed init");
                }
                handler_task.abort();
                remove_profile(&profile_dir).await;
                return Err(match e {
                    SessionError::Cdp(msg) => SessionError::BrowserInit(msg),
                    other => other,
                });
            }
        };

        tracing::debug!(identity = %identity.label(), "browser session launched");
        let chromium_page = ChromiumPage {
            page,
            inner: Mutex::new(Some(Launched {
                browser,
                handler_task,
                auth_task,
                profile_dir,
            })),
            focused: Mutex::new(None),
        };
        let behavior = BehaviorSimulator::new(
            self.behavior,
            identity.fingerprint.viewport,
            self.pacing.clone(),
        );
        Ok(StealthSession::new(
            Box::new(chromium_page),
            behavior,
            self.page_load_timeout,
            identity.label(),
        ))
    }
}

/// Answer proxy authentication challenges and release every paused request.
async fn spawn_proxy_auth(page: &Page, user: &str, pass: &str) -> Result<JoinHandle<()>, SessionError> {
    let mut auth_events = page
        .event_listener::<EventAuthRequired>()
        .await
        .map_err(cdp_error)?;
    let mut paused_events = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(cdp_error)?;
    page.execute(EnableParams::builder().handle_auth_requests(true).build())
        .await
        .map_err(cdp_error)?;

    let page = page.clone();
    let user = user.to_string();
    let pass = pass.to_string();
    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = auth_events.next() => {
                    let response = AuthChallengeResponse {
                        response: AuthChallengeResponseResponse::ProvideCredentials,
                        username: Some(user.clone()),
                        password: Some(pass.clone()),
                    };
                    let params = ContinueWithAuthParams::new(event.request_id.clone(), response);
                    if let Err(e) = page.execute(params).await {
                        tracing::debug!(error = %e, "proxy auth response failed");
                    }
                }
                Some(event) = paused_events.next() => {
                    let params = ContinueRequestParams::new(event.request_id.clone());
                    if let Err(e) = page.execute(params).await {
                        tracing::debug!(error = %e, "continue paused request failed");
                    }
                }
                else => break,
            }
        }
    }))
}

fn cdp_error(e: chromiumoxide::error::CdpError) -> SessionError {
    SessionError::from_cdp_message(e.to_string())
}

async fn remove_profile(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        tracing::debug!(dir = %dir.display(), error = %e, "profile cleanup failed");
    }
}

struct Launched {
    browser: Browser,
    handler_task: JoinHandle<()>,
    auth_task: Option<JoinHandle<()>>,
    profile_dir: PathBuf,
}

struct ChromiumPage {
    page: Page,
    inner: Mutex<Option<Launched>>,
    focused: Mutex<Option<Element>>,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.focused.lock().await.take();
        self.page.goto(url).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn html(&self) -> Result<String, SessionError> {
        self.page.content().await.map_err(cdp_error)
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.page.url().await.map_err(cdp_error)?.unwrap_or_default())
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        let element = self.page.find_element(selector).await.map_err(cdp_error)?;
        element.click().await.map_err(cdp_error)?;
        *self.focused.lock().await = Some(element);
        Ok(())
    }

    async fn type_str(&self, text: &str) -> Result<(), SessionError> {
        let focused = self.focused.lock().await;
        let element = focused
            .as_ref()
            .ok_or_else(|| SessionError::Cdp("no focused element to type into".to_string()))?;
        element.type_str(text).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), SessionError> {
        let focused = self.focused.lock().await;
        let element = focused
            .as_ref()
            .ok_or_else(|| SessionError::Cdp("no focused element to submit".to_string()))?;
        element.press_key("Enter").await.map_err(cdp_error)?;
        Ok(())
    }

    async fn scroll_by(&self, delta_y: i64) -> Result<(), SessionError> {
        self.page
            .evaluate(format!("window.scrollBy({{top: {delta_y}, behavior: 'smooth'}});"))
            .await
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<(), SessionError> {
        self.page.move_mouse(Point::new(x, y)).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        let Some(mut launched) = self.inner.lock().await.take() else {
            return Ok(());
        };
        self.focused.lock().await.take();
        let closed = launched.browser.close().await;
        if let Some(task) = launched.auth_task.take() {
            task.abort();
        }
        launched.handler_task.abort();
        remove_profile(&launched.profile_dir).await;
        closed.map(|_| ()).map_err(cdp_error)
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if let Some(launched) = self.inner.get_mut().take() {
            tracing::warn!("browser session dropped without close; aborting handler");
            if let Some(task) = launched.auth_task {
                task.abort();
            }
            launched.handler_task.abort();
        }
    }
}
