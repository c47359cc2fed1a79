//! Navigator

use serde_json::{json, Value};

/// `window.navigator`
#[derive(Debug, Clone, PartialEq)]
pub struct Navigator {
    pub user_agent: String,
    pub app_code_name: &'static str,
    pub app_name: &'static str,
    pub app_version: String,
    pub platform: &'static str,
    pub product: &'static str,
    pub vendor: &'static str,
    pub language: &'static str,
    pub languages: Vec<&'static str>,
    pub cookie_enabled: bool,
    pub on_line: bool,
    pub hardware_concurrency: usize,
}

impl Navigator {
    pub fn new(user_agent: &str) -> Self {
        let app_version = user_agent
            .strip_prefix("Mozilla/")
            .unwrap_or(user_agent)
            .to_string();
        Self {
            user_agent: user_agent.to_string(),
            app_code_name: "Mozilla",
            app_name: "Netscape",
            app_version,
            platform: "",
            product: "Gecko",
            vendor: "Apple Computer, Inc.",
            language: "en-US",
            languages: vec!["en-US", "en"],
            cookie_enabled: true,
            on_line: true,
            hardware_concurrency: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    /// Property bag exposed to script
    pub fn to_json(&self) -> Value {
        json!({
            "userAgent": self.user_agent,
            "appCodeName": self.app_code_name,
            "appName": self.app_name,
            "appVersion": self.app_version,
            "platform": self.platform,
            "product": self.product,
            "vendor": self.vendor,
            "language": self.language,
            "languages": self.languages,
            "cookieEnabled": self.cookie_enabled,
            "onLine": self.on_line,
            "hardwareConcurrency": self.hardware_concurrency,
        })
    }
}
