//! Outbound connectivity check through a worker's SOCKS5 port.
//!
//! The front end uses this to tell whether a strategy actually unblocks a
//! link: the request is sent through the worker's local SOCKS5 endpoint
//! with remote DNS resolution, so a reply proves the whole chain works.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::{Duration, Instant};

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36 Edg/136.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:138.0) Gecko/20100101 Firefox/138.0",
    "Mozilla/5.0 (Linux; Android 14; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.6998.135 Mobile Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:139.0) Gecko/20100101 Firefox/139.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_7_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.4 Mobile/15E148 Safari/604.1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckMethod {
    Get,
    Head,
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub socks5_server_ip: String,
    pub socks5_server_port: u16,
    pub link: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_timeout")]
    pub max_timeout_secs: u64,
    #[serde(default = "default_method")]
    pub method: CheckMethod,
    /// 1-based index into the canned user-agent table.
    #[serde(default = "default_user_agent")]
    pub user_agent: u8,
    #[serde(default = "default_attempts")]
    pub attempts: u8,
    #[serde(default)]
    pub follow_redirects: bool,
}

fn default_connect_timeout() -> u64 {
    2
}
fn default_max_timeout() -> u64 {
    5
}
fn default_method() -> CheckMethod {
    CheckMethod::Head
}
fn default_user_agent() -> u8 {
    1
}
fn default_attempts() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub result: bool,
    pub http_status: String,
    pub link: String,
    pub elapsed_ms: u64,
    pub message: String,
}

impl CheckRequest {
    /// Clamp and sanity-check the knobs before building a client.
    pub fn validate(&self) -> Result<()> {
        let _ip: IpAddr = self
            .socks5_server_ip
            .parse()
            .map_err(|_| miette::miette!("'{}' is not a valid IP address", self.socks5_server_ip))?;
        miette::ensure!(self.socks5_server_port > 0, "SOCKS5 port must be nonzero");
        miette::ensure!(!self.link.is_empty(), "link must not be empty");
        miette::ensure!(self.link.len() <= 2000, "link is too long");
        miette::ensure!(
            (1..=5).contains(&self.connect_timeout_secs),
            "connect timeout must be 1-5 seconds"
        );
        miette::ensure!(
            (1..=10).contains(&self.max_timeout_secs),
            "max timeout must be 1-10 seconds"
        );
        miette::ensure!(
            (1..=USER_AGENTS.len() as u8).contains(&self.user_agent),
            "user agent id must be 1-{}",
            USER_AGENTS.len()
        );
        miette::ensure!(
            (1..=5).contains(&self.attempts),
            "attempts must be 1-5"
        );
        Ok(())
    }

    /// `0.0.0.0` means "the worker bound every interface"; reach it via
    /// loopback.
    fn proxy_ip(&self) -> String {
        if self.socks5_server_ip == "0.0.0.0" {
            "127.0.0.1".to_string()
        } else {
            self.socks5_server_ip.clone()
        }
    }

    fn url(&self) -> String {
        if self.link.starts_with("http://") || self.link.starts_with("https://") {
            self.link.clone()
        } else {
            format!("https://{}", self.link)
        }
    }
}

/// Run the check, repeating up to `attempts` times to probe stability.
/// A transport failure stops the loop early; the last attempt wins.
pub async fn run_check(req: &CheckRequest) -> Result<CheckOutcome> {
    req.validate()?;

    // socks5h: let the proxy resolve names, the local resolver may be poisoned
    let proxy_url = format!("socks5h://{}:{}", req.proxy_ip(), req.socks5_server_port);
    let proxy = reqwest::Proxy::all(&proxy_url)
        .map_err(|e| miette::miette!("invalid proxy {proxy_url}: {e}"))?;
    let redirect = if req.follow_redirects {
        reqwest::redirect::Policy::limited(5)
    } else {
        reqwest::redirect::Policy::none()
    };
    let client = reqwest::Client::builder()
        .proxy(proxy)
        .connect_timeout(Duration::from_secs(req.connect_timeout_secs))
        .timeout(Duration::from_secs(req.max_timeout_secs))
        .redirect(redirect)
        .user_agent(USER_AGENTS[(req.user_agent - 1) as usize])
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| miette::miette!("failed to build HTTP client: {e}"))?;

    let url = req.url();
    let mut outcome = attempt(&client, req.method, &url).await;
    for _ in 1..req.attempts {
        if !outcome.result {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        outcome = attempt(&client, req.method, &url).await;
    }
    Ok(outcome)
}

async fn attempt(client: &reqwest::Client, method: CheckMethod, url: &str) -> CheckOutcome {
    let started = Instant::now();
    let request = match method {
        CheckMethod::Get => client.get(url),
        CheckMethod::Head => client.head(url),
        CheckMethod::Post => client.post(url),
    };
    match request.send().await {
        Ok(response) => CheckOutcome {
            result: true,
            http_status: response.status().as_u16().to_string(),
            link: url.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            message: "request completed".to_string(),
        },
        Err(e) => CheckOutcome {
            result: false,
            http_status: "000".to_string(),
            link: url.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            message: e.to_string(),
        },
    }
}
