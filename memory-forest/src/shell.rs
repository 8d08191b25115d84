//! Navigation shell: decides which screen a client sees and wraps pages in
//! the sidebar layout.

use crate::client::{Notice, NoticeKind};
use crate::session::SessionState;

pub const APP_NAME: &str = "Memory Forest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Session still resolving: spinner only.
    Loading,
    /// Not signed in: send to the entry screen.
    Entry,
    Dashboard,
}

pub fn resolve(state: &SessionState) -> Screen {
    match state {
        SessionState::Loading => Screen::Loading,
        SessionState::Unauthenticated => Screen::Entry,
        SessionState::Ready(_) => Screen::Dashboard,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Forest,
    Grove,
}

struct NavItem {
    section: Section,
    title: &'static str,
    href: &'static str,
    icon: &'static str,
}

const NAV_ITEMS: [NavItem; 2] = [
    NavItem {
        section: Section::Forest,
        title: "My Forest",
        href: "/",
        icon: "🌲",
    },
    NavItem {
        section: Section::Grove,
        title: "Social Grove",
        href: "/grove",
        icon: "👥",
    },
];

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub const STYLE: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: Georgia, serif; background: #0b1a12; color: #e8e2cf; }
a { color: inherit; text-decoration: none; }
.shell { display: flex; min-height: 100vh; }
.sidebar { width: 240px; border-right: 1px solid #233b2c; background: #0f2218; display: flex; flex-direction: column; }
.brand { padding: 20px; border-bottom: 1px solid #233b2c; }
.brand h2 { margin: 0; color: #d4af37; font-size: 18px; letter-spacing: 1px; }
.brand p { margin: 4px 0 0; font-size: 12px; color: #8da393; }
.plant { margin: 16px; display: block; text-align: center; padding: 12px; border-radius: 8px; background: #d4af37; color: #0b1a12; }
.nav a { display: block; padding: 10px 20px; color: #b9c7bc; }
.nav a.active, .nav a:hover { background: #1a3325; color: #e8e2cf; }
.footer { margin-top: auto; padding: 12px 20px; border-top: 1px solid #233b2c; }
.footer button { background: none; border: none; color: #8da393; cursor: pointer; font: inherit; }
.footer button:hover { color: #e5736b; }
.main { flex: 1; display: flex; flex-direction: column; }
.content { flex: 1; display: flex; }
.notice { margin: 12px 16px 0; padding: 10px 14px; border-radius: 6px; font-size: 14px; }
.notice.success { background: #1f5133; }
.notice.error { background: #5a2320; }
.spinner { min-height: 100vh; display: flex; align-items: center; justify-content: center; font-size: 32px; }
"#;

pub fn notice_html(notice: Option<&Notice>) -> String {
    match notice {
        Some(n) => {
            let class = match n.kind {
                NoticeKind::Success => "success",
                NoticeKind::Error => "error",
            };
            format!(
                r#"<div class="notice {}">{}</div>"#,
                class,
                escape_html(&n.message)
            )
        }
        None => String::new(),
    }
}

/// Full page without the sidebar (entry screen, loading).
pub fn bare_page(title: &str, extra_style: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · {app}</title>
<style>{style}{extra}</style>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape_html(title),
        app = APP_NAME,
        style = STYLE,
        extra = extra_style,
        body = body
    )
}

pub fn loading_page() -> String {
    bare_page(
        "Loading",
        "",
        r#"<div class="spinner"><meta http-equiv="refresh" content="1">🍃</div>"#,
    )
}

/// Page inside the sidebar layout.
pub fn layout(
    title: &str,
    active: Section,
    notice: Option<&Notice>,
    extra_style: &str,
    content: &str,
) -> String {
    let nav: String = NAV_ITEMS
        .iter()
        .map(|item| {
            format!(
                r#"<a href="{}"{}>{} {}</a>"#,
                item.href,
                if item.section == active { r#" class="active""# } else { "" },
                item.icon,
                item.title
            )
        })
        .collect();

    let body = format!(
        r#"<div class="shell">
<aside class="sidebar">
  <div class="brand"><h2>🌳 {app}</h2><p>Your living journal</p></div>
  <a class="plant" href="/?plant=1">＋ Plant Memory</a>
  <nav class="nav">{nav}</nav>
  <div class="footer">
    <form method="post" action="/auth/sign-out"><button type="submit">⎋ Leave Forest</button></form>
  </div>
</aside>
<div class="main">
{notice}
<div class="content">
{content}
</div>
</div>
</div>"#,
        app = APP_NAME,
        nav = nav,
        notice = notice_html(notice),
        content = content
    );
    bare_page(title, extra_style, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Session;
    use memory_forest_types::AuthUser;

    #[test]
    fn test_resolve_screens() {
        assert_eq!(resolve(&SessionState::Loading), Screen::Loading);
        assert_eq!(resolve(&SessionState::Unauthenticated), Screen::Entry);
        let ready = SessionState::Ready(Session {
            access_token: "t".to_string(),
            refresh_token: None,
            user: AuthUser {
                id: "u1".to_string(),
                email: None,
            },
        });
        assert_eq!(resolve(&ready), Screen::Dashboard);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_layout_marks_active_section() {
        let page = layout("Grove", Section::Grove, None, "", "<p>hi</p>");
        assert!(page.contains(r#"<a href="/grove" class="active">"#));
        assert!(page.contains(r#"<a href="/">"#));
        assert!(page.contains("Leave Forest"));
    }
}
