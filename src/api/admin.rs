use axum::{
    extract::{Query, State},
    response::Html,
};
use sqlx::PgPool;

use crate::db::models::ShortCircuit;
use crate::faults::{FaultPage, FaultService};

use super::dto::PageQuery;

/// Human-facing fault dashboard. Unlike the JSON API, out-of-range pagination
/// parameters are clamped rather than rejected.
pub async fn short_circuits_dashboard(
    State(pool): State<PgPool>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let (page, per_page) = clamp_pagination(&query);

    match FaultService::new(pool).list_faults(page, per_page).await {
        Ok(page) => Html(render_dashboard(&page)),
        Err(err) => {
            err.log_server_detail();
            Html(render_error(&err.public_message()))
        }
    }
}

fn clamp_pagination(query: &PageQuery) -> (i64, i64) {
    let page = match query.page {
        Some(p) if p >= 1 => p,
        _ => 1,
    };
    let per_page = match query.per_page {
        Some(p) if (1..=100).contains(&p) => p,
        _ => 10,
    };
    (page, per_page)
}

fn render_dashboard(page: &FaultPage) -> String {
    let mut rows = String::new();
    for record in &page.records {
        rows.push_str(&render_row(record));
    }
    if page.records.is_empty() {
        rows.push_str(r#"<tr><td colspan="7" class="empty">No short-circuit events recorded</td></tr>"#);
    }

    let pager = render_pager(page);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Short-Circuit Events</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; }}
th {{ background: #f0f0f0; }}
.active {{ color: #b00; font-weight: bold; }}
.empty {{ text-align: center; color: #888; }}
.pager {{ margin-top: 1rem; }}
.pager a {{ margin-right: 0.5rem; }}
</style>
</head>
<body>
<h1>Short-Circuit Events</h1>
<p>{total} event(s) total, page {page} of {total_pages}</p>
<table>
<thead>
<tr><th>Id</th><th>Control MAC</th><th>WiFi MAC</th><th>Timestamp</th>
<th>Current</th><th>Previous</th><th>Previous timestamp</th></tr>
</thead>
<tbody>
{rows}
</tbody>
</table>
{pager}
</body>
</html>
"#,
        total = page.total_records,
        page = page.page,
        total_pages = page.total_pages,
        rows = rows,
        pager = pager,
    )
}

fn render_row(record: &ShortCircuit) -> String {
    let current = if record.current_active {
        format!(
            r#"<span class="active">active</span> ({}s)"#,
            record.current_duration_seconds
        )
    } else {
        format!("inactive ({}s)", record.current_duration_seconds)
    };

    let previous = match record.previous_active {
        Some(active) => format!(
            "{} ({}s)",
            if active { "active" } else { "inactive" },
            record.previous_duration_seconds.unwrap_or(0)
        ),
        None => "—".to_owned(),
    };

    let previous_timestamp = record
        .previous_timestamp
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "—".to_owned());

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        record.id,
        escape_html(record.control_mac.as_deref().unwrap_or("—")),
        escape_html(record.wifi_mac.as_deref().unwrap_or("—")),
        record.timestamp.to_rfc3339(),
        current,
        previous,
        previous_timestamp,
    )
}

fn render_pager(page: &FaultPage) -> String {
    let mut pager = String::from(r#"<div class="pager">"#);
    if page.page > 1 {
        pager.push_str(&format!(
            r#"<a href="/admin/short-circuits?page={}&per_page={}">&laquo; Previous</a>"#,
            page.page - 1,
            page.per_page
        ));
    }
    if page.page < page.total_pages {
        pager.push_str(&format!(
            r#"<a href="/admin/short-circuits?page={}&per_page={}">Next &raquo;</a>"#,
            page.page + 1,
            page.per_page
        ));
    }
    pager.push_str("</div>");
    pager
}

fn render_error(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Error</title></head>
<body><h1>Something went wrong</h1><p>{}</p></body>
</html>
"#,
        escape_html(message)
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
