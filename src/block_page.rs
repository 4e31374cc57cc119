// src/block_page.rs
// Forbidden pages and redirect responses for the VPN/geo gate.

use spin_sdk::http::Response;

pub enum BlockReason {
    LocationPolicy,
    VpnDetected,
}

/// 403 response with the block page for the given reason.
pub fn forbidden(reason: BlockReason) -> Response {
    Response::builder()
        .status(403)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(render_block_page(reason))
        .build()
}

/// 302 redirect to a configured forbidden URL.
pub fn redirect_to(url: &str) -> Response {
    Response::builder()
        .status(302)
        .header("Location", url)
        .body(Vec::new())
        .build()
}

pub fn render_block_page(reason: BlockReason) -> String {
    match reason {
        BlockReason::LocationPolicy => BLOCK_LOCATION_HTML.to_string(),
        BlockReason::VpnDetected => BLOCK_VPN_HTML.to_string(),
    }
}

const BLOCK_LOCATION_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Access Restricted</title>
  <style>
    body { font-family: sans-serif; background: #f9f9f9; margin: 2em; }
    .block-container { background: #fff; padding: 2em; border-radius: 8px; box-shadow: 0 2px 8px #ccc; max-width: 480px; margin: auto; }
    h1 { color: #c00; }
  </style>
</head>
<body>
  <div class="block-container">
    <h1>Access Restricted</h1>
    <p>This service is not available from your region.</p>
    <p>If you believe this is an error, contact the site administrator.</p>
  </div>
</body>
</html>
"#;

const BLOCK_VPN_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Access Blocked</title>
  <style>
    body { font-family: sans-serif; background: #f9f9f9; margin: 2em; }
    .block-container { background: #fff; padding: 2em; border-radius: 8px; box-shadow: 0 2px 8px #ccc; max-width: 480px; margin: auto; }
    h1 { color: #c00; }
  </style>
</head>
<body>
  <div class="block-container">
    <h1>Access Blocked</h1>
    <p>Your connection appears to come through a VPN or proxy and has been blocked.</p>
    <p>Disable the VPN and reload the page, or contact the site administrator.</p>
  </div>
</body>
</html>
"#;
