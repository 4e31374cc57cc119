// src/timezone.rs
// Timezone challenge state machine shared by the detect and network
// variants. Defers the real downstream response behind a client-side
// timezone-collection page, then either replays it (declared timezone
// matches the one the location gate recorded) or blocks.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use spin_sdk::http::{Request, Response};

use crate::block_page::{self, BlockReason};
use crate::config::Config;
use crate::session::{DeferredResponse, KeyValueStore, Session, TZ_UNKNOWN};
use crate::Handler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Plain detect: challenges only clients the location gate has seen,
    /// and judges a mismatch even when the server timezone is unknown.
    Detect,
    /// Network/VPN: supports a cool-down period and never judges a
    /// mismatch against an unknown server timezone.
    Network,
}

impl Variant {
    fn enabled(&self, cfg: &Config) -> bool {
        match self {
            Variant::Detect => cfg.forbid_vpn,
            Variant::Network => cfg.vpn,
        }
    }

    fn forbidden_redirect<'a>(&self, cfg: &'a Config) -> Option<&'a str> {
        match self {
            Variant::Detect => cfg.forbidden_url.as_deref(),
            Variant::Network => cfg.forbidden_vpn_url.as_deref(),
        }
    }
}

pub fn intercept<S, H>(
    store: &S,
    cfg: &Config,
    req: &Request,
    variant: Variant,
    next: &H,
) -> Response
where
    S: KeyValueStore,
    H: Handler,
{
    if !variant.enabled(cfg) {
        return next.handle(req);
    }
    // AJAX/API clients bypass the challenge entirely.
    let accept = req.header("accept").and_then(|v| v.as_str());
    if !accepts_html(accept) {
        return next.handle(req);
    }

    let ip = crate::extract_client_ip(req);
    let mut session = Session::load(store, &ip);

    // First-visit safety valve: without a recorded timezone the detect
    // variant would redirect-loop before the location gate ever ran.
    if variant == Variant::Detect && session.tz.is_none() {
        return next.handle(req);
    }

    let now = now_epoch();
    if variant == Variant::Network {
        if let (Some(period), Some(last)) = (cfg.period, session.last_access) {
            if now - last < period {
                return next.handle(req);
            }
        }
    }

    if session.tz.is_some() {
        if let Some(pending) = session.pending.take() {
            return resolve_challenge(store, cfg, req, variant, session, pending, &ip, now);
        }
    }

    // No challenge in flight: capture the real response and answer with
    // the timezone-collection page instead.
    let response = next.handle(req);
    session.pending = Some(snapshot(&response));
    session.save(store, &ip);
    render_challenge_page()
}

#[allow(clippy::too_many_arguments)]
fn resolve_challenge<S: KeyValueStore>(
    store: &S,
    cfg: &Config,
    req: &Request,
    variant: Variant,
    mut session: Session,
    pending: DeferredResponse,
    ip: &str,
    now: f64,
) -> Response {
    let tz = session.tz.clone().unwrap_or_else(|| TZ_UNKNOWN.to_string());
    let declared = form_field(req.body(), "timezone").unwrap_or_else(|| TZ_UNKNOWN.to_string());

    let mismatch = declared != tz;
    let judged = match variant {
        Variant::Detect => mismatch,
        // An unresolved server timezone cannot be judged as mismatching.
        Variant::Network => tz != TZ_UNKNOWN && mismatch,
    };

    if judged {
        // Pending state is cleared whether the challenge passes or fails.
        session.save(store, ip);
        println!("[VPN DENY] ip={} declared={} expected={}", ip, declared, tz);
        if let Some(url) = variant.forbidden_redirect(cfg) {
            return block_page::redirect_to(url);
        }
        return block_page::forbidden(BlockReason::VpnDetected);
    }

    if variant == Variant::Network {
        session.last_access = Some(now);
    }
    session.save(store, ip);
    replay(&pending)
}

/// True when the Accept header advertises an HTML-capable client: any
/// type/subtype entry whose subtype is html, xhtml+xml, or xml. An
/// absent header means not HTML-capable.
pub fn accepts_html(accept: Option<&str>) -> bool {
    let Some(accept) = accept else {
        return false;
    };
    accept.split(',').any(|entry| {
        let media_range = entry.split(';').next().unwrap_or("").trim();
        let mut parts = media_range.splitn(2, '/');
        let mime_type = parts.next().unwrap_or("");
        let subtype = parts.next().unwrap_or("");
        !mime_type.is_empty()
            && mime_type.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            && matches!(subtype, "html" | "xhtml+xml" | "xml")
    })
}

/// Captures the downstream response so it can be replayed after the
/// challenge resolves. The body is stored as text decoded per the
/// response charset.
pub fn snapshot(response: &Response) -> DeferredResponse {
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
        if let Some(v) = value.as_str() {
            headers.insert(name.to_ascii_lowercase(), v.to_string());
        }
    }
    let charset = headers
        .get("content-type")
        .and_then(|v| charset_of(v))
        .unwrap_or_else(|| "utf-8".to_string());
    let status = response.status();
    DeferredResponse {
        content: String::from_utf8_lossy(response.body()).to_string(),
        charset,
        status: *status,
        reason: reason_phrase(*status).to_string(),
        headers,
    }
}

/// Reconstructs the deferred response verbatim.
pub fn replay(pending: &DeferredResponse) -> Response {
    let mut builder = Response::builder();
    builder.status(pending.status);
    for (name, value) in &pending.headers {
        builder.header(name.as_str(), value.as_str());
    }
    builder.body(pending.content.clone().into_bytes()).build()
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let mut parts = param.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim().trim_matches('"');
        if key.eq_ignore_ascii_case("charset") && !value.is_empty() {
            Some(value.to_ascii_lowercase())
        } else {
            None
        }
    })
}

pub(crate) fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Challenge page: collects the browser timezone and resubmits it via
/// POST to the same URL. Served at 302 so clients never cache it as
/// the real resource.
pub fn render_challenge_page() -> Response {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Checking your browser</title>
</head>
<body>
  <form id="challenge" method="POST">
    <input type="hidden" name="timezone" value="N/A" />
  </form>
  <script>
    var form = document.getElementById('challenge');
    try {
      form.timezone.value = Intl.DateTimeFormat().resolvedOptions().timeZone;
    } catch (e) {}
    form.submit();
  </script>
  <noscript>Please enable JavaScript to continue.</noscript>
</body>
</html>
"#;
    Response::builder()
        .status(302)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html)
        .build()
}

pub(crate) fn form_field(body: &[u8], name: &str) -> Option<String> {
    let form = String::from_utf8_lossy(body);
    for pair in form.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(k), Some(v)) = (parts.next(), parts.next()) {
            if k == name {
                return Some(url_decode(v));
            }
        }
    }
    None
}

fn url_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8_lossy()
        .to_string()
}
