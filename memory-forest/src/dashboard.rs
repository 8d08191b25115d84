//! HTML page bodies: entry screen, dashboard (tree, feed, plant form) and the
//! social grove. Self-contained markup with inline CSS.

use crate::client::Notice;
use crate::feed::{EMPTY_FEED_MESSAGE, FeedItem, FeedState};
use crate::form::FormFields;
use crate::grove::{GroveState, KEEPERS};
use crate::shell::{APP_NAME, Section, bare_page, escape_html, layout, notice_html};
use crate::tree::{Geometry, TreeState};
use memory_forest_types::Emotion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

const ENTRY_STYLE: &str = r#"
.entry { min-height: 100vh; display: flex; align-items: center; justify-content: center; background: radial-gradient(circle at 30% 25%, #163324, #0b1a12 60%); }
.entry-box { width: 100%; max-width: 420px; padding: 24px; }
.logo { text-align: center; margin-bottom: 32px; }
.logo h1 { color: #d4af37; font-size: 36px; margin: 12px 0 4px; letter-spacing: 1px; }
.logo p { margin: 0; font-size: 12px; letter-spacing: 3px; text-transform: uppercase; color: #8da393; }
.card { background: #12271bcc; border: 1px solid #233b2c; border-radius: 10px; padding: 28px; }
.tabs { display: flex; gap: 8px; margin-bottom: 24px; }
.tabs a { flex: 1; text-align: center; padding: 10px; border-radius: 6px; background: #1a3325; color: #8da393; font-size: 14px; }
.tabs a.on { background: #d4af37; color: #0b1a12; }
label { display: block; font-size: 13px; color: #cfd8c9; margin: 14px 0 6px; }
input, textarea, select { width: 100%; padding: 10px; border-radius: 6px; border: 1px solid #2d4a38; background: #0b1a12; color: #e8e2cf; font: inherit; }
button.primary { width: 100%; margin-top: 22px; padding: 12px; border: none; border-radius: 6px; background: #d4af37; color: #0b1a12; font: inherit; cursor: pointer; }
button.primary:disabled { opacity: .5; cursor: default; }
"#;

const DASHBOARD_STYLE: &str = r#"
.tree { flex: 1; position: relative; display: flex; align-items: center; justify-content: center; background: radial-gradient(circle at 50% 40%, #14301f, #0b1a12 70%); }
.tree svg { width: 70%; max-width: 420px; }
.tree .caption { position: absolute; left: 16px; bottom: 16px; font-size: 12px; color: #8da393; }
.tree .error { position: absolute; left: 16px; top: 16px; font-size: 12px; color: #e5736b; }
.feed { width: 320px; border-left: 1px solid #233b2c; background: #0f2218; display: flex; flex-direction: column; }
.feed header { padding: 20px; border-bottom: 1px solid #233b2c; }
.feed h3 { margin: 0; color: #d4af37; font-size: 18px; }
.feed header p { margin: 4px 0 0; font-size: 12px; color: #8da393; }
.feed .list { flex: 1; overflow-y: auto; padding: 12px; }
.item { padding: 12px; margin-bottom: 12px; border-radius: 8px; background: #1a3325; border: 1px solid #233b2c; }
.item img { width: 100%; height: 128px; object-fit: cover; border-radius: 6px; margin-bottom: 10px; opacity: .85; }
.item .row { display: flex; gap: 8px; }
.item p { margin: 0; font-size: 14px; }
.item .date { margin-top: 4px; font-size: 12px; color: #8da393; }
.gold-glow { color: #f3cf55; } .muted { color: #8da393; } .primary { color: #d4af37; }
.empty { text-align: center; padding: 48px 16px; color: #8da393; font-size: 14px; }
.modal { position: fixed; inset: 0; background: #000a; display: flex; align-items: center; justify-content: center; }
.modal .panel { width: 100%; max-width: 520px; background: #12271b; border: 1px solid #233b2c; border-radius: 10px; padding: 24px; }
.modal h2 { margin: 0 0 8px; color: #d4af37; }
.modal .close { float: right; color: #8da393; }
.modal .grid { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
.modal .attached { font-size: 12px; color: #8da393; margin-top: 6px; }
.modal .form-error { margin-top: 12px; color: #e5736b; font-size: 14px; }
"#;

const GROVE_STYLE: &str = r#"
.grove { padding: 32px; }
.grove h1 { color: #d4af37; font-size: 20px; margin: 0 0 6px; }
.grove > p { color: #8da393; font-size: 14px; margin: 0 0 24px; }
.keepers { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 24px; max-width: 720px; }
.keeper { border: 1px solid #233b2c; border-radius: 12px; background: #12271b; padding: 24px; display: flex; flex-direction: column; align-items: center; gap: 14px; }
.avatar { width: 64px; height: 64px; border-radius: 50%; display: flex; align-items: center; justify-content: center; color: #fff; font-size: 22px; }
.keeper button { width: 100%; padding: 8px; border: none; border-radius: 8px; background: #d4af37; color: #0b1a12; font: inherit; cursor: pointer; }
.keeper button:disabled { background: #1a3325; color: #8da393; cursor: default; }
"#;

// =====================================================
// Entry screen
// =====================================================

pub fn entry_page(mode: AuthMode, notice: Option<&Notice>) -> String {
    let (action, submit, signin_cls, signup_cls) = match mode {
        AuthMode::SignIn => ("/auth/sign-in", "Enter the Forest", "on", ""),
        AuthMode::SignUp => ("/auth/sign-up", "Plant Your Roots", "", "on"),
    };
    let body = format!(
        r#"<div class="entry"><div class="entry-box">
  <div class="logo"><div style="font-size:40px">🌲</div><h1>{app}</h1><p>Plant your memories, watch them grow</p></div>
  {notice}
  <div class="card">
    <div class="tabs">
      <a class="{signin_cls}" href="/auth">Enter Forest</a>
      <a class="{signup_cls}" href="/auth?mode=signup">Plant Roots</a>
    </div>
    <form method="post" action="{action}">
      <label for="email">Email</label>
      <input id="email" name="email" type="email" placeholder="your@email.com" required>
      <label for="password">Password</label>
      <input id="password" name="password" type="password" placeholder="••••••••" required minlength="6">
      <button class="primary" type="submit">{submit}</button>
    </form>
  </div>
</div></div>"#,
        app = APP_NAME,
        notice = notice_html(notice),
        signin_cls = signin_cls,
        signup_cls = signup_cls,
        action = action,
        submit = submit
    );
    bare_page("Welcome", ENTRY_STYLE, &body)
}

// =====================================================
// Dashboard
// =====================================================

pub struct DashboardView<'a> {
    pub tree: &'a TreeState,
    pub feed: &'a FeedState,
    pub form_open: bool,
    pub form_loading: bool,
    pub fields: &'a FormFields,
    pub form_error: Option<&'a str>,
}

pub fn dashboard_page(view: &DashboardView<'_>, notice: Option<&Notice>) -> String {
    let mut content = String::new();
    content.push_str(&tree_panel(view.tree));
    content.push_str(&feed_panel(view.feed));
    if view.form_open {
        content.push_str(&plant_modal(view.fields, view.form_loading, view.form_error));
    }
    layout("My Forest", Section::Forest, notice, DASHBOARD_STYLE, &content)
}

/// SVG stand-in for the 3D scene: same meshes, projected onto the x/y plane.
fn tree_panel(state: &TreeState) -> String {
    const UNIT: f32 = 40.0;
    const ORIGIN_X: f32 = 150.0;
    const GROUND_Y: f32 = 280.0;

    let scene = state.scene();
    let mut shapes = String::new();
    for mesh in &scene.meshes {
        let cx = ORIGIN_X + mesh.position[0] * UNIT;
        let cy = GROUND_Y - mesh.position[1] * UNIT;
        match mesh.geometry {
            Geometry::Cylinder([top, bottom, height, _]) => {
                let half_h = height * UNIT / 2.0;
                shapes.push_str(&format!(
                    r#"<polygon points="{:.1},{:.1} {:.1},{:.1} {:.1},{:.1} {:.1},{:.1}" fill="{}"/>"#,
                    cx - top * UNIT, cy - half_h,
                    cx + top * UNIT, cy - half_h,
                    cx + bottom * UNIT, cy + half_h,
                    cx - bottom * UNIT, cy + half_h,
                    mesh.color
                ));
            }
            Geometry::Icosahedron([radius, _]) => {
                shapes.push_str(&format!(
                    r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"/>"#,
                    cx,
                    cy,
                    radius * UNIT,
                    mesh.color
                ));
            }
        }
    }

    let scene_json = serde_json::to_string(&scene)
        .unwrap_or_default()
        .replace("</", "<\\/");
    let error = state
        .error
        .as_deref()
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape_html(e)))
        .unwrap_or_default();

    format!(
        r#"<section class="tree">
<svg viewBox="0 0 300 300" role="img" aria-label="Memory tree">
  <g transform="translate({ox} {gy}) scale({scale}) translate(-{ox} -{gy})">{shapes}</g>
</svg>
<script type="application/json" id="tree-scene">{json}</script>
{error}
<div class="caption">{caption}</div>
</section>"#,
        ox = ORIGIN_X,
        gy = GROUND_Y,
        scale = scene.scale,
        shapes = shapes,
        json = scene_json,
        error = error,
        caption = if state.loading {
            "…".to_string()
        } else {
            state.caption()
        }
    )
}

fn icon_glyph(icon: &str) -> &'static str {
    match icon {
        "frown" => "😢",
        "star" => "⭐",
        _ => "😊",
    }
}

fn feed_item(item: &FeedItem) -> String {
    let image = item
        .image_url
        .as_deref()
        .map(|url| format!(r#"<img src="{}" alt="Memory">"#, escape_html(url)))
        .unwrap_or_default();
    format!(
        r#"<div class="item">{image}<div class="row"><span class="{color}">{icon}</span><div><p title="{full}">{preview}</p><p class="date">{date}</p></div></div></div>"#,
        image = image,
        color = item.style.color,
        icon = icon_glyph(item.style.icon),
        full = escape_html(&item.description),
        preview = escape_html(&item.preview),
        date = escape_html(&item.date_label)
    )
}

fn feed_panel(state: &FeedState) -> String {
    let list = match state {
        FeedState::Loading => r#"<div class="empty">🍃 Loading…</div>"#.to_string(),
        FeedState::Empty => format!(r#"<div class="empty">🍃<br>{}</div>"#, EMPTY_FEED_MESSAGE),
        FeedState::Failed(msg) => format!(
            r#"<div class="empty">Could not load memories: {}</div>"#,
            escape_html(msg)
        ),
        FeedState::Loaded(items) => items.iter().map(feed_item).collect(),
    };
    format!(
        r#"<aside class="feed"><header><h3>Recent Memories</h3><p>{}</p></header><div class="list">{}</div></aside>"#,
        state.planted_label(),
        list
    )
}

fn plant_modal(fields: &FormFields, loading: bool, error: Option<&str>) -> String {
    let options: String = Emotion::ALL
        .iter()
        .map(|e| {
            format!(
                r#"<option value="{v}"{sel}>{emoji} {v}</option>"#,
                v = e.as_str(),
                sel = if fields.emotion == e.as_str() { " selected" } else { "" },
                emoji = e.emoji()
            )
        })
        .collect();
    let placeholder_sel = if Emotion::from_label(&fields.emotion).is_none() {
        " selected"
    } else {
        ""
    };
    let attached = fields
        .image
        .as_ref()
        .map(|img| {
            format!(
                r#"<div class="attached">Attached: {} (choose another file to replace it)</div>"#,
                escape_html(&img.file_name)
            )
        })
        .unwrap_or_default();
    let error = error
        .map(|e| format!(r#"<div class="form-error">{}</div>"#, escape_html(e)))
        .unwrap_or_default();
    let disabled = if loading || fields.description.is_empty() || fields.emotion.is_empty() {
        " disabled"
    } else {
        ""
    };

    format!(
        r#"<div class="modal"><div class="panel">
<a class="close" href="/?plant=0">✕</a>
<h2>Plant a Memory</h2>
<form id="plant" method="post" action="/memories/plant" enctype="multipart/form-data">
  <label for="image">Memory Image</label>
  <input id="image" name="image" type="file" accept="image/*">
  {attached}
  <label for="description">Description *</label>
  <textarea id="description" name="description" rows="3" placeholder="What happened in this memory?">{description}</textarea>
  <div class="grid">
    <div><label for="memory_date">Date *</label><input id="memory_date" name="memory_date" type="date" value="{date}"></div>
    <div><label for="emotion">Emotion *</label><select id="emotion" name="emotion"><option value=""{placeholder_sel}>How did it feel?</option>{options}</select></div>
  </div>
  {error}
  <button class="primary" type="submit"{disabled}>{label}</button>
</form>
<script>
(function() {{
  var f = document.getElementById('plant');
  var b = f.querySelector('button');
  function sync() {{ b.disabled = !f.description.value || !f.emotion.value; }}
  f.addEventListener('input', sync);
  f.addEventListener('change', sync);
  f.addEventListener('submit', function() {{ b.disabled = true; b.textContent = '✨'; }});
}})();
</script>
</div></div>"#,
        attached = attached,
        description = escape_html(&fields.description),
        date = fields.memory_date.format("%Y-%m-%d"),
        placeholder_sel = placeholder_sel,
        options = options,
        error = error,
        disabled = disabled,
        label = if loading { "✨" } else { "⬆ Plant This Memory" }
    )
}

// =====================================================
// Social grove
// =====================================================

pub fn grove_page(grove: &GroveState, notice: Option<&Notice>) -> String {
    let cards: String = KEEPERS
        .iter()
        .map(|k| {
            let sent = grove.is_sent(k.name);
            format!(
                r#"<div class="keeper"><div class="avatar" style="background:{color}">{initial}</div><span>{name}</span>
<form method="post" action="/grove/connect"><input type="hidden" name="name" value="{name}"><button type="submit"{disabled}>{label}</button></form></div>"#,
                color = k.color,
                initial = k.initial(),
                name = k.name,
                disabled = if sent { " disabled" } else { "" },
                label = if sent { "Request Sent" } else { "Connect" }
            )
        })
        .collect();
    let content = format!(
        r#"<section class="grove"><h1>👥 Social Grove</h1><p>Connect with other forest keepers</p><div class="keepers">{}</div></section>"#,
        cards
    );
    layout("Social Grove", Section::Grove, notice, GROVE_STYLE, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NoticeKind;
    use crate::form::FormFields;
    use crate::store::ImageFile;

    fn tree(count: u64) -> TreeState {
        TreeState {
            loading: false,
            count,
            error: None,
        }
    }

    #[test]
    fn test_empty_feed_renders_message() {
        let fields = FormFields::initial();
        let page = dashboard_page(
            &DashboardView {
                tree: &tree(0),
                feed: &FeedState::Empty,
                form_open: false,
                form_loading: false,
                fields: &fields,
                form_error: None,
            },
            None,
        );
        assert!(page.contains(EMPTY_FEED_MESSAGE));
        assert!(page.contains("0 memories planted"));
        assert!(page.contains("scale(1)"));
        assert!(!page.contains("Plant a Memory"));
    }

    #[test]
    fn test_open_form_keeps_fields() {
        let mut fields = FormFields::initial();
        fields.description = "Picnic <at> the lake".to_string();
        fields.emotion = "Sad".to_string();
        fields.image = Some(ImageFile {
            file_name: "lake.jpg".to_string(),
            content_type: None,
            bytes: vec![1],
        });
        let page = dashboard_page(
            &DashboardView {
                tree: &tree(2),
                feed: &FeedState::Loading,
                form_open: true,
                form_loading: false,
                fields: &fields,
                form_error: Some("Payload too large"),
            },
            Some(&Notice {
                kind: NoticeKind::Error,
                message: "Payload too large".to_string(),
            }),
        );
        assert!(page.contains("Picnic &lt;at&gt; the lake"));
        assert!(page.contains(r#"<option value="Sad" selected>"#));
        assert!(page.contains("Attached: lake.jpg"));
        assert!(page.contains(r#"class="form-error""#));
        assert!(page.contains("scale(1.5)"));
        assert!(page.contains("2 memories planted"));
    }

    #[test]
    fn test_submit_disabled_until_required_fields() {
        let fields = FormFields::initial();
        let html = plant_modal(&fields, false, None);
        assert!(html.contains(r#"type="submit" disabled>"#));
        assert!(html.contains(r#"<option value="" selected>How did it feel?</option>"#));
    }

    #[test]
    fn test_entry_modes() {
        assert!(entry_page(AuthMode::SignIn, None).contains(r#"action="/auth/sign-in""#));
        let signup = entry_page(AuthMode::SignUp, None);
        assert!(signup.contains(r#"action="/auth/sign-up""#));
        assert!(signup.contains("Plant Your Roots"));
    }

    #[test]
    fn test_grove_marks_sent_requests() {
        let grove = GroveState::default();
        grove.connect("Nadun").unwrap();
        let page = grove_page(&grove, None);
        assert_eq!(page.matches("Request Sent").count(), 1);
        assert_eq!(page.matches(">Connect<").count(), 2);
    }
}
