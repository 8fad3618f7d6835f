#![forbid(unsafe_code)]

//! Redemption client: the engine's only network boundary.
//!
//! The client sends a [`CheatId`], never the typed sequence, and turns the
//! verifier's reply into an [`EffectDescriptor`]. It performs no retries and
//! holds no state between calls; the anti-forgery token is read from the
//! cookie jar on every request.
//!
//! # Wire format
//!
//! ```text
//! POST /api/verify-cheat/
//! Content-Type: application/json
//! X-CSRFToken: <csrftoken cookie>
//!
//! {"cheat_id": 101}
//!
//! 200 {"status": "success", "effect": {"action": "redirect", "url": "/promo/", "message": "..."}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RedemptionConfig;
use crate::notify::Severity;
use crate::trigger::CheatId;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Outgoing POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Offline, DNS, CORS, or the host's fetch rejected.
    Network(String),
    /// The response body could not be read.
    Body(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Body(msg) => write!(f, "failed to read response body: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Non-blocking HTTP POST supplied by the host.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Source of the raw `document.cookie` string.
pub trait CookieSource {
    fn cookie_string(&self) -> String;
}

/// Find cookie `name` in a `document.cookie`-style string.
///
/// The value is percent-decoded; if decoding fails the raw value is returned.
#[must_use]
pub fn read_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| percent_decode(value).unwrap_or_else(|| value.to_owned()))
    })
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// The single action a redemption performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectAction {
    /// Copy a coupon code to the clipboard.
    Coupon { code: Option<String> },
    /// Temporary cosmetic rotation.
    GodMode,
    /// Navigate after the redirect delay.
    Redirect { url: String },
    /// Flip a named toggle effect.
    Toggle { effect: String },
    /// Persist and apply a season.
    Season { season: String },
    /// Clear the season and reload.
    SeasonReset,
    /// Missing or unrecognized action.
    Noop,
}

/// What the verifier authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub message: Option<String>,
    pub severity: Severity,
    pub action: EffectAction,
}

#[derive(Debug, Default, Deserialize)]
struct RawDescriptor {
    message: Option<String>,
    // `type` and its older spelling may both be present; `type` wins.
    #[serde(rename = "type")]
    kind: Option<String>,
    severity: Option<String>,
    action: Option<String>,
    code: Option<String>,
    value: Option<String>,
    url: Option<String>,
    effect: Option<String>,
    name: Option<String>,
    season: Option<String>,
}

impl RawDescriptor {
    fn into_descriptor(self, fallback_message: Option<String>) -> EffectDescriptor {
        let severity = self
            .kind
            .as_deref()
            .and_then(Severity::parse)
            .or_else(|| self.severity.as_deref().and_then(Severity::parse))
            .unwrap_or_default();
        let code = self.code.or(self.value);
        let action = match self.action.as_deref().map(str::trim) {
            Some("coupon") => EffectAction::Coupon { code },
            Some("godmode") => EffectAction::GodMode,
            Some("redirect") => match self.url {
                Some(url) if !url.is_empty() => EffectAction::Redirect { url },
                _ => EffectAction::Noop,
            },
            Some("toggle") => match self.effect.or(self.name) {
                Some(effect) => EffectAction::Toggle { effect },
                None => EffectAction::Noop,
            },
            Some("season") => match self.season.or(code) {
                Some(season) => EffectAction::Season { season },
                None => EffectAction::Noop,
            },
            Some("season_reset") => EffectAction::SeasonReset,
            _ => EffectAction::Noop,
        };
        EffectDescriptor {
            message: self.message.or(fallback_message).filter(|m| !m.is_empty()),
            severity,
            action,
        }
    }
}

#[derive(Debug, Serialize)]
struct VerifyRequest {
    cheat_id: CheatId,
}

#[derive(Debug, Deserialize)]
struct VerifyReply {
    status: String,
    #[serde(default)]
    effect: Option<RawDescriptor>,
    #[serde(default)]
    message: Option<String>,
}

/// Reply from the legacy coupon endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl LegacyReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Toast severity derived from `status`.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self.status.as_str() {
            "error" => Severity::Error,
            "info" => Severity::Info,
            _ => Severity::Success,
        }
    }
}

/// Why a redemption produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemError {
    Transport(TransportError),
    /// Non-2xx HTTP status.
    Status(u16),
    /// Body was not the expected JSON.
    Malformed(String),
    /// Verifier answered with a non-success status.
    Rejected(Option<String>),
}

impl fmt::Display for RedeemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::Status(code) => write!(f, "verifier returned HTTP {code}"),
            Self::Malformed(msg) => write!(f, "malformed verifier reply: {msg}"),
            Self::Rejected(Some(msg)) => write!(f, "verifier rejected redemption: {msg}"),
            Self::Rejected(None) => write!(f, "verifier rejected redemption"),
        }
    }
}

impl std::error::Error for RedeemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for RedeemError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Parse a verifier reply.
pub fn parse_verify_response(response: &HttpResponse) -> Result<EffectDescriptor, RedeemError> {
    if !response.is_success() {
        return Err(RedeemError::Status(response.status));
    }
    let reply: VerifyReply = serde_json::from_str(&response.body)
        .map_err(|e| RedeemError::Malformed(e.to_string()))?;
    if reply.status != "success" {
        return Err(RedeemError::Rejected(reply.message));
    }
    Ok(reply
        .effect
        .unwrap_or_default()
        .into_descriptor(reply.message))
}

/// Parse a legacy coupon reply. The body is honored whatever the HTTP status.
pub fn parse_legacy_response(response: &HttpResponse) -> Result<LegacyReply, RedeemError> {
    serde_json::from_str(&response.body).map_err(|e| RedeemError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A redemption the engine wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionRequest {
    Verify(CheatId),
    LegacyCoupon,
}

/// Outcome handed back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionResult {
    Verify(Result<EffectDescriptor, RedeemError>),
    LegacyCoupon(Result<LegacyReply, RedeemError>),
}

/// Stateless verifier client.
#[derive(Debug)]
pub struct RedemptionClient<T, C> {
    transport: T,
    cookies: C,
    config: RedemptionConfig,
}

impl<T: HttpTransport, C: CookieSource> RedemptionClient<T, C> {
    #[must_use]
    pub fn new(transport: T, cookies: C, config: RedemptionConfig) -> Self {
        Self {
            transport,
            cookies,
            config,
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_owned(), "application/json".to_owned())];
        match read_cookie(&self.cookies.cookie_string(), &self.config.csrf_cookie) {
            Some(token) => headers.push((self.config.csrf_header.clone(), token)),
            None => {
                crate::debug!(cookie = %self.config.csrf_cookie, "no anti-forgery cookie");
            }
        }
        headers
    }

    /// Submit `id` to the verifier.
    pub async fn redeem(&self, id: CheatId) -> Result<EffectDescriptor, RedeemError> {
        let body = serde_json::to_string(&VerifyRequest { cheat_id: id })
            .map_err(|e| RedeemError::Malformed(e.to_string()))?;
        let request = HttpRequest {
            url: self.config.verify_endpoint.clone(),
            headers: self.headers(),
            body: Some(body),
        };
        let response = self.transport.post(request).await?;
        parse_verify_response(&response)
    }

    /// Claim a coupon from the legacy endpoint.
    pub async fn claim_legacy_coupon(&self) -> Result<LegacyReply, RedeemError> {
        let request = HttpRequest {
            url: self.config.legacy_endpoint.clone(),
            headers: self.headers(),
            body: None,
        };
        let response = self.transport.post(request).await?;
        parse_legacy_response(&response)
    }

    /// Perform whichever call `request` names.
    pub async fn execute(&self, request: RedemptionRequest) -> RedemptionResult {
        match request {
            RedemptionRequest::Verify(id) => RedemptionResult::Verify(self.redeem(id).await),
            RedemptionRequest::LegacyCoupon => {
                RedemptionResult::LegacyCoupon(self.claim_legacy_coupon().await)
            }
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
