//! SVG badge keyed on the achieved certification level.

use certkit_core::CertificationLevel;

const UNRATED_COLOR: &str = "#9F9F9F";

/// Self-contained SVG badge. `Unrated` renders a grey "Not certified" badge.
pub fn render_badge(level: CertificationLevel) -> String {
    let (color, title, label) = match level.definition() {
        Some(def) => (def.badge_color, def.display_name, capitalize(level.as_str())),
        None => (UNRATED_COLOR, "Not certified", "Unrated".to_string()),
    };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="220" height="64" role="img" aria-label="{title}">
  <title>{title}</title>
  <linearGradient id="s" x2="0" y2="100%">
    <stop offset="0" stop-color="#bbb" stop-opacity=".1"/>
    <stop offset="1" stop-opacity=".1"/>
  </linearGradient>
  <clipPath id="r">
    <rect width="220" height="64" rx="8" fill="#fff"/>
  </clipPath>
  <g clip-path="url(#r)">
    <rect width="110" height="64" fill="#555"/>
    <rect x="110" width="110" height="64" fill="{color}"/>
    <rect width="220" height="64" fill="url(#s)"/>
  </g>
  <g fill="#fff" text-anchor="middle" font-family="DejaVu Sans,Verdana,Geneva,sans-serif" font-size="13">
    <text x="55" y="22" fill="#010101" fill-opacity=".3">certkit</text>
    <text x="55" y="21">certkit</text>
    <text x="55" y="38" fill="#010101" fill-opacity=".3">Self-Assessed</text>
    <text x="55" y="37">Self-Assessed</text>
  </g>
  <g fill="#fff" text-anchor="middle" font-family="DejaVu Sans,Verdana,Geneva,sans-serif" font-size="15" font-weight="bold">
    <text x="165" y="37" fill="#010101" fill-opacity=".3">{label}</text>
    <text x="165" y="36">{label}</text>
  </g>
</svg>
"##
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
