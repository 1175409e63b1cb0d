//! HTML Rendering
//!
//! Server-rendered pages for the browser side of the device flow, and the QR code
//! pointing at the verification URI.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::render::svg;
use qrcode::QrCode;

use crate::error::{DeviceFlowError, OAuth2Error};
use crate::types::DeviceAuthorizationResponse;

const STYLE: &str = r#"
        body { font-family: system-ui, -apple-system, sans-serif; max-width: 640px; margin: 40px auto; padding: 0 20px; color: #333; }
        .card { border: 1px solid #ddd; border-radius: 8px; padding: 24px; background: #fafafa; }
        .code { font-family: monospace; font-size: 2em; letter-spacing: 0.15em; margin: 16px 0; }
        .status { font-weight: bold; }
        .authorized { color: #3c763d; }
        .unauthorized { color: #8a6d3b; }
        nav a { margin-right: 16px; }
        img.qr { display: block; margin: 16px 0; }
"#;

/// Escape text for element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(ch),
        }
    }
    output
}

/// Encode `target` as a QR code and return it as an SVG data URL.
pub fn qr_data_url(target: &str) -> Result<String, OAuth2Error> {
    let code = QrCode::new(target.as_bytes()).map_err(|e| {
        OAuth2Error::DeviceFlow(DeviceFlowError::QrEncoding {
            message: e.to_string(),
        })
    })?;

    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
    )
}

/// Landing page showing whether a token is held.
pub fn render_home(is_authorized: bool) -> String {
    let body = if is_authorized {
        r#"    <h1>Device Authorization</h1>
    <div class="card">
        <p class="status authorized">Authorized</p>
        <nav><a href="/userinfo">View user info</a><a href="/logout">Log out</a></nav>
    </div>"#
    } else {
        r#"    <h1>Device Authorization</h1>
    <div class="card">
        <p class="status unauthorized">Not authorized</p>
        <nav><a href="/authorize">Authorize this device</a></nav>
    </div>"#
    };

    page("Device Authorization", body)
}

/// Instructions page for a freshly started flow.
///
/// The embedded script asks `/status` at the server's interval and returns to the
/// landing page once the flow settles.
pub fn render_authorize(response: &DeviceAuthorizationResponse, qr_data_url: &str) -> String {
    let target = escape_html(response.verification_target());
    let verification_uri = escape_html(&response.verification_uri);
    let interval_ms = response.polling_interval().saturating_mul(1000);

    let body = format!(
        r#"    <h1>Authorize this device</h1>
    <div class="card">
        <p>Scan the QR code or visit <a href="{target}" target="_blank" rel="noopener">{verification_uri}</a> and enter:</p>
        <p class="code">{user_code}</p>
        <img class="qr" src="{qr}" alt="QR code for {target}" width="200" height="200">
        <p id="status">Waiting for approval&hellip;</p>
    </div>
    <script>
        (function poll() {{
            fetch('/status')
                .then(function (r) {{ return r.json(); }})
                .then(function (s) {{
                    if (s.status === 'pending') {{
                        setTimeout(poll, (s.interval || {interval_secs}) * 1000);
                    }} else {{
                        window.location.href = '/';
                    }}
                }})
                .catch(function () {{ setTimeout(poll, {interval_ms}); }});
        }})();
    </script>"#,
        user_code = escape_html(&response.user_code),
        qr = escape_html(qr_data_url),
        interval_secs = response.polling_interval(),
    );

    page("Authorize this device", &body)
}
