//! Device fingerprints presented to visited sites.

use std::path::Path;

use serde::{Deserialize, Serialize};
use trendscout_core::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// A coherent set of browser/device characteristics.
///
/// Every field must agree with the others: a macOS user agent with a
/// Direct3D renderer string is itself a detection signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub name: String,
    pub user_agent: String,
    pub viewport: ViewportSize,
    /// BCP 47 tag such as `en-US`.
    pub locale: String,
    /// IANA zone such as `America/New_York`.
    pub timezone: String,
    /// Value reported by `navigator.platform`.
    pub platform: String,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default = "default_hardware_concurrency")]
    pub hardware_concurrency: u32,
}

fn default_hardware_concurrency() -> u32 {
    8
}

impl Fingerprint {
    /// `navigator.languages` derived from the locale, e.g. `["en-US", "en"]`.
    #[must_use]
    pub fn languages(&self) -> Vec<String> {
        let mut langs = vec![self.locale.clone()];
        if let Some((base, _)) = self.locale.split_once('-') {
            langs.push(base.to_string());
        }
        langs
    }

    /// `Accept-Language` header value consistent with [`Fingerprint::languages`].
    #[must_use]
    pub fn accept_language(&self) -> String {
        match self.locale.split_once('-') {
            Some((base, _)) => format!("{},{base};q=0.9", self.locale),
            None => self.locale.clone(),
        }
    }

    #[must_use]
    pub fn is_firefox(&self) -> bool {
        self.user_agent.contains("Firefox/")
    }

    /// HTTP request headers a real browser with this fingerprint would send.
    #[must_use]
    pub fn request_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("User-Agent", self.user_agent.clone()),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language", self.accept_language()),
            ("Upgrade-Insecure-Requests", "1".to_string()),
            ("Sec-Fetch-Dest", "document".to_string()),
            ("Sec-Fetch-Mode", "navigate".to_string()),
            ("Sec-Fetch-Site", "none".to_string()),
            ("Sec-Fetch-User", "?1".to_string()),
        ];
        if !self.is_firefox() {
            headers.push(("Sec-Ch-Ua-Mobile", "?0".to_string()));
        }
        headers
    }
}

#[derive(Debug, Deserialize)]
struct FingerprintsFile {
    fingerprints: Vec<Fingerprint>,
}

/// Built-in desktop fingerprints used when no catalogue file is configured.
#[must_use]
pub fn default_fingerprints() -> Vec<Fingerprint> {
    vec![
        Fingerprint {
            name: "windows-chrome".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            viewport: ViewportSize {
                width: 1366,
                height: 768,
            },
            locale: "en-US".to_string(),
            timezone: "America/New_York".to_string(),
            platform: "Win32".to_string(),
            webgl_vendor: "Google Inc. (Intel)".to_string(),
            webgl_renderer: "ANGLE (Intel, Intel(R) UHD Graphics 620 Direct3D11 vs_5_0 ps_5_0, D3D11)"
                .to_string(),
            plugins: vec![
                "Chrome PDF Plugin".to_string(),
                "Chrome PDF Viewer".to_string(),
                "Native Client".to_string(),
            ],
            hardware_concurrency: 8,
        },
        Fingerprint {
            name: "macos-chrome".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            viewport: ViewportSize {
                width: 1440,
                height: 900,
            },
            locale: "en-US".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            platform: "MacIntel".to_string(),
            webgl_vendor: "Apple Inc.".to_string(),
            webgl_renderer: "Apple GPU".to_string(),
            plugins: vec![
                "Chrome PDF Plugin".to_string(),
                "Chrome PDF Viewer".to_string(),
            ],
            hardware_concurrency: 10,
        },
        Fingerprint {
            name: "linux-chrome".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            viewport: ViewportSize {
                width: 1280,
                height: 720,
            },
            locale: "en-GB".to_string(),
            timezone: "Europe/London".to_string(),
            platform: "Linux x86_64".to_string(),
            webgl_vendor: "Mesa".to_string(),
            webgl_renderer: "llvmpipe (LLVM 12.0.0, 256 bits)".to_string(),
            plugins: vec!["Chrome PDF Plugin".to_string()],
            hardware_concurrency: 4,
        },
        Fingerprint {
            name: "windows-firefox".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) \
                         Gecko/20100101 Firefox/121.0"
                .to_string(),
            viewport: ViewportSize {
                width: 1366,
                height: 768,
            },
            locale: "en-US".to_string(),
            timezone: "America/Chicago".to_string(),
            platform: "Win32".to_string(),
            webgl_vendor: "Mozilla".to_string(),
            webgl_renderer: "Mozilla -- llvmpipe (LLVM 12.0.0, 256 bits)".to_string(),
            plugins: vec![
                "OpenH264 Video Codec".to_string(),
                "Widevine Content Decryption Module".to_string(),
            ],
            hardware_concurrency: 8,
        },
    ]
}

/// Load and validate a fingerprint catalogue from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_fingerprints(path: &Path) -> Result<Vec<Fingerprint>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_fingerprints(&content, &path.display().to_string())
}

fn parse_fingerprints(content: &str, origin: &str) -> Result<Vec<Fingerprint>, ConfigError> {
    let file: FingerprintsFile =
        serde_yaml::from_str(content).map_err(|e| ConfigError::FileParse {
            path: origin.to_string(),
            source: e,
        })?;
    validate_fingerprints(&file.fingerprints)?;
    Ok(file.fingerprints)
}

fn validate_fingerprints(fingerprints: &[Fingerprint]) -> Result<(), ConfigError> {
    if fingerprints.is_empty() {
        return Err(ConfigError::Validation(
            "fingerprint catalogue must contain at least one entry".to_string(),
        ));
    }
    for fp in fingerprints {
        if fp.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "fingerprint '{}' has an empty user agent",
                fp.name
            )));
        }
        if fp.viewport.width == 0 || fp.viewport.height == 0 {
            return Err(ConfigError::Validation(format!(
                "fingerprint '{}' has a zero-sized viewport",
                fp.name
            )));
        }
        if fp.timezone.trim().is_empty() || fp.locale.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "fingerprint '{}' must declare both locale and timezone",
                fp.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_distinct() {
        let fps = default_fingerprints();
        assert_eq!(fps.len(), 4);
        validate_fingerprints(&fps).unwrap();
        let mut names: Vec<&str> = fps.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn languages_follow_locale() {
        let fp = &default_fingerprints()[2];
        assert_eq!(fp.languages(), vec!["en-GB".to_string(), "en".to_string()]);
        assert_eq!(fp.accept_language(), "en-GB,en;q=0.9");
    }

    #[test]
    fn firefox_headers_omit_client_hints() {
        let firefox = &default_fingerprints()[3];
        assert!(firefox.is_firefox());
        assert!(firefox
            .request_headers()
            .iter()
            .all(|(name, _)| !name.starts_with("Sec-Ch-Ua")));

        let chrome = &default_fingerprints()[0];
        assert!(chrome
            .request_headers()
            .iter()
            .any(|(name, _)| *name == "Sec-Ch-Ua-Mobile"));
    }

    #[test]
    fn parses_yaml_catalogue() {
        let yaml = r"
fingerprints:
  - name: studio
    user_agent: Mozilla/5.0 (Macintosh) Chrome/121.0
    viewport: { width: 1920, height: 1080 }
    locale: de-DE
    timezone: Europe/Berlin
    platform: MacIntel
    webgl_vendor: Apple Inc.
    webgl_renderer: Apple M2
";
        let fps = parse_fingerprints(yaml, "inline").unwrap();
        assert_eq!(fps.len(), 1);
        assert!(fps[0].plugins.is_empty());
        assert_eq!(fps[0].hardware_concurrency, 8);
    }

    #[test]
    fn rejects_empty_catalogue() {
        let err = parse_fingerprints("fingerprints: []", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_zero_viewport() {
        let mut fps = default_fingerprints();
        fps[1].viewport.width = 0;
        let err = validate_fingerprints(&fps).unwrap_err();
        assert!(err.to_string().contains("macos-chrome"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_fingerprints("fingerprints: [", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::FileParse { .. }));
    }
}
