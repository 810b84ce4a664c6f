use crate::probe::OsProbe;
use crate::resolver;
use crate::servers::ServersFile;
use crate::state::PortState;
use axum::response::Html;

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} - shaperctl</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 2rem; }}
        table {{ border-collapse: collapse; }}
        td, th {{ padding: 0.3rem 0.8rem; text-align: left; }}
        .running {{ color: #0a0; }}
        .foreign {{ color: #c00; }}
        .free {{ color: #888; }}
    </style>
</head>
<body>
    <h1>shaperctl</h1>
    {content}
</body>
</html>"#
    )
}

/// Plain status page. The panel front end drives the JSON API; this page is
/// just for a quick look in a browser.
pub async fn index() -> Html<String> {
    let servers = match ServersFile::load() {
        Ok(s) => s,
        Err(e) => {
            let content = format!(
                r#"<p class="foreign">failed to read servers file: {}</p>"#,
                html_escape(&e.to_string())
            );
            return Html(base_html("Error", &content));
        }
    };

    if servers.servers.is_empty() {
        return Html(base_html("Servers", "<p>no servers configured</p>"));
    }

    let probe = OsProbe;
    let mut rows = String::new();
    for (index, profile) in servers.servers.iter() {
        let (class, label, pid) =
            match resolver::resolve(&probe, profile.port, &profile.real_full_path) {
                Ok(PortState::Free) => ("free", "free".to_string(), String::new()),
                Ok(PortState::OwnedByUs(worker)) => {
                    ("running", "running".to_string(), worker.pid.to_string())
                }
                Ok(PortState::OwnedByForeign) => {
                    ("foreign", "foreign".to_string(), String::new())
                }
                Err(e) => ("foreign", format!("error: {e}"), String::new()),
            };
        rows.push_str(&format!(
            r#"<tr><td>{index}</td><td>{port}</td><td class="{class}">{label}</td><td>{pid}</td><td>{path}</td></tr>"#,
            port = profile.port,
            label = html_escape(&label),
            path = html_escape(&profile.real_full_path.display().to_string()),
        ));
    }

    let content = format!(
        r#"<table>
        <thead><tr><th>#</th><th>Port</th><th>State</th><th>PID</th><th>Path</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>"#
    );
    Html(base_html("Servers", &content))
}
