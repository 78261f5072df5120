//! User agent parsing.
//!
//! Parsing is best-effort and total: an unrecognized or empty user agent
//! yields a [`ParsedUserAgent`] with empty fields, never an error.

use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uaparser::{Parser, UserAgentParser};

/// Rule set compiled into the binary, in uap-core `regexes.yaml` format.
static BUILTIN_REGEXES: &[u8] = include_bytes!("../../data/ua_regexes.yaml");

/// Errors loading a rule set. Only possible at startup.
#[derive(Debug, thiserror::Error)]
pub enum UaParserError {
    #[error("Failed to read user agent rules from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid user agent rules: {0}")]
    Rules(String),
}

/// Structured breakdown of a user agent string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParsedUserAgent {
    pub name: String,
    pub version: String,
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "OSVersion")]
    pub os_version: String,
    pub device: String,
    pub mobile: bool,
    pub tablet: bool,
    pub desktop: bool,
    pub bot: bool,
    /// Contact URL advertised in the string, typically by crawlers.
    #[serde(rename = "URL")]
    pub url: String,
    pub string: String,
    pub version_no: VersionNo,
    #[serde(rename = "OSVersionNo")]
    pub os_version_no: VersionNo,
}

/// Numeric form of a dotted version. Missing or non-numeric parts are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionNo {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionNo {
    fn parse(version: &str) -> Self {
        let mut parts = version.split('.').map(leading_number);
        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }
}

fn leading_number(part: &str) -> u32 {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..end].parse().unwrap_or(0)
}

/// User agent parser built from a uap-core rule set.
pub struct UaParser {
    inner: UserAgentParser,
}

impl std::fmt::Debug for UaParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UaParser").finish_non_exhaustive()
    }
}

impl UaParser {
    /// Parser using the built-in rule set.
    pub fn builtin() -> Result<Self, UaParserError> {
        Self::from_bytes(BUILTIN_REGEXES)
    }

    /// Parser using an operator-supplied `regexes.yaml`.
    pub fn from_file(path: &Path) -> Result<Self, UaParserError> {
        let bytes = std::fs::read(path).map_err(|source| UaParserError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, UaParserError> {
        let inner = UserAgentParser::builder()
            .with_unicode_support(false)
            .build_from_bytes(bytes)
            .map_err(|e| UaParserError::Rules(format!("{e:?}")))?;
        Ok(Self { inner })
    }

    /// Parse a raw user agent string.
    pub fn parse(&self, user_agent: &str) -> ParsedUserAgent {
        if user_agent.trim().is_empty() {
            return ParsedUserAgent::default();
        }

        let client = self.inner.parse(user_agent);
        let device = known(&client.device.family);
        let os = known(&client.os.family);

        let bot = device == "Spider";
        let (mobile, tablet) = if bot {
            (false, false)
        } else {
            form_factor(&device, &os, user_agent)
        };
        let desktop = !bot && !tablet && !mobile && is_desktop_os(&os);

        let version = join_version(&[
            &client.user_agent.major,
            &client.user_agent.minor,
            &client.user_agent.patch,
        ]);
        let os_version = join_version(&[&client.os.major, &client.os.minor, &client.os.patch]);

        ParsedUserAgent {
            name: known(&client.user_agent.family),
            version_no: VersionNo::parse(&version),
            version,
            os_version_no: VersionNo::parse(&os_version),
            os_version,
            os,
            device,
            mobile,
            tablet,
            desktop,
            bot,
            url: contact_url(user_agent),
            string: user_agent.to_string(),
        }
    }
}

/// uap-core reports unrecognized families as "Other".
fn known(family: &str) -> String {
    if family == "Other" {
        String::new()
    } else {
        family.to_string()
    }
}

fn join_version(parts: &[&Option<Cow<'_, str>>]) -> String {
    parts
        .iter()
        .map_while(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// `(mobile, tablet)`. Android sets the `Mobile` token on phones only.
fn form_factor(device: &str, os: &str, user_agent: &str) -> (bool, bool) {
    if os == "Android" {
        let mobile = user_agent.contains("Mobile");
        return (mobile, !mobile);
    }

    let tablet = matches!(device, "iPad" | "Kindle") || device.contains("Tablet");
    let mobile = !tablet
        && (matches!(device, "iPhone" | "iPod" | "Generic Smartphone") || os == "Windows Phone");
    (mobile, tablet)
}

/// First `http(s)://` token, with a leading `+` dropped.
fn contact_url(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c.is_whitespace() || matches!(c, ';' | '(' | ')'))
        .map(|token| token.trim_start_matches('+'))
        .find(|token| token.starts_with("http://") || token.starts_with("https://"))
        .unwrap_or_default()
        .to_string()
}

fn is_desktop_os(os: &str) -> bool {
    matches!(
        os,
        "Windows" | "Mac OS X" | "Linux" | "Ubuntu" | "Fedora" | "Chrome OS"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Mobile/15E148 Safari/604.1";
    const FIREFOX_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36 Edg/91.0.864.59";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
    const CHROME_WIN8: &str = "Mozilla/5.0 (Windows NT 6.2; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/49.0.2623.112 Safari/537.36";
    const IE_VISTA: &str = "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 6.0; Trident/5.0)";
    const REDMI_PHONE: &str = "Mozilla/5.0 (Linux; Android 10; Redmi Note 8 Build/QKQ1.200114.002) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36";
    const SAMSUNG_TABLET: &str = "Mozilla/5.0 (Linux; Android 12; SM-X200) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    fn parser() -> UaParser {
        UaParser::builtin().unwrap()
    }

    #[test]
    fn test_desktop_chrome() {
        let parsed = parser().parse(CHROME_MAC);
        assert_eq!(parsed.name, "Chrome");
        assert_eq!(parsed.version, "91.0.4472");
        assert_eq!(parsed.os, "Mac OS X");
        assert_eq!(parsed.os_version, "10.15.7");
        assert_eq!(parsed.device, "Mac");
        assert!(parsed.desktop);
        assert!(!parsed.mobile);
        assert_eq!(parsed.string, CHROME_MAC);
        assert_eq!(
            parsed.version_no,
            VersionNo {
                major: 91,
                minor: 0,
                patch: 4472
            }
        );
        assert_eq!(
            parsed.os_version_no,
            VersionNo {
                major: 10,
                minor: 15,
                patch: 7
            }
        );
        assert_eq!(parsed.url, "");
    }

    #[test]
    fn test_older_windows_versions() {
        let win8 = parser().parse(CHROME_WIN8);
        assert_eq!(win8.os, "Windows");
        assert_eq!(win8.os_version, "8");
        assert_eq!(win8.os_version_no.major, 8);
        assert!(win8.desktop);

        let vista = parser().parse(IE_VISTA);
        assert_eq!(vista.name, "IE");
        assert_eq!(vista.os_version, "Vista");
        assert_eq!(vista.os_version_no, VersionNo::default());
    }

    #[test]
    fn test_android_phone_and_tablet() {
        let phone = parser().parse(REDMI_PHONE);
        assert_eq!(phone.name, "Chrome Mobile");
        assert_eq!(phone.os, "Android");
        assert_eq!(phone.os_version, "10");
        assert_eq!(phone.device, "XiaoMi Redmi Note 8");
        assert!(phone.mobile);
        assert!(!phone.tablet);

        let tablet = parser().parse(SAMSUNG_TABLET);
        assert_eq!(tablet.name, "Chrome");
        assert_eq!(tablet.device, "Samsung SM-X200");
        assert!(tablet.tablet);
        assert!(!tablet.mobile);
        assert!(!tablet.desktop);
    }

    #[test]
    fn test_mobile_safari() {
        let parsed = parser().parse(SAFARI_IPHONE);
        assert_eq!(parsed.name, "Mobile Safari");
        assert_eq!(parsed.os, "iOS");
        assert_eq!(parsed.os_version, "14.6");
        assert!(parsed.mobile);
        assert!(!parsed.desktop);
    }

    #[test]
    fn test_windows_browsers() {
        let firefox = parser().parse(FIREFOX_WINDOWS);
        assert_eq!(firefox.name, "Firefox");
        assert_eq!(firefox.version, "89.0");
        assert_eq!(firefox.os, "Windows");
        assert_eq!(firefox.os_version, "10");
        assert!(firefox.desktop);

        let edge = parser().parse(EDGE_WINDOWS);
        assert_eq!(edge.name, "Edge");
    }

    #[test]
    fn test_bot() {
        let parsed = parser().parse(GOOGLEBOT);
        assert_eq!(parsed.name, "Googlebot");
        assert!(parsed.bot);
        assert!(!parsed.desktop);
        assert_eq!(parsed.url, "http://www.google.com/bot.html");
    }

    #[test]
    fn test_unknown_and_empty_are_empty() {
        let parser = parser();
        assert_eq!(parser.parse(""), ParsedUserAgent::default());

        let parsed = parser.parse("definitely not a browser");
        assert_eq!(parsed.name, "");
        assert_eq!(parsed.os, "");
        assert_eq!(parsed.string, "definitely not a browser");
    }

    #[test]
    fn test_serialized_field_names() {
        let parsed = parser().parse(CHROME_MAC);
        let value = serde_json::to_value(&parsed).unwrap();
        assert_eq!(value["Name"], "Chrome");
        assert_eq!(value["OS"], "Mac OS X");
        assert_eq!(value["OSVersion"], "10.15.7");
        assert_eq!(value["Desktop"], true);
        assert_eq!(value["URL"], "");
        assert_eq!(value["VersionNo"]["Major"], 91);
        assert_eq!(value["OSVersionNo"]["Minor"], 15);
    }

    #[test]
    fn test_missing_rules_file() {
        let err = UaParser::from_file(Path::new("/nonexistent/regexes.yaml")).unwrap_err();
        assert!(matches!(err, UaParserError::Read { .. }));
    }
}
