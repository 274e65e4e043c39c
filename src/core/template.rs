//! Static single-column HTML email.

use crate::domain::model::ExportedArtifact;
use std::borrow::Cow;
use std::fmt::Write;

pub const DEFAULT_CONTENT_WIDTH: u32 = 600;

/// Directory the images live in next to `index.html`.
pub const IMAGE_DIR: &str = "images";

#[derive(Debug, Clone, PartialEq)]
pub struct Footer {
    pub text: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateOptions {
    pub content_width: u32,
    pub title: String,
    pub background: String,
    pub footer: Option<Footer>,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            content_width: DEFAULT_CONTENT_WIDTH,
            title: "Email".to_string(),
            background: "#ffffff".to_string(),
            footer: None,
        }
    }
}

/// Escapes `&`, `"`, `<` and `>`.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Renders one table row per artifact with default options.
pub fn render_html(artifacts: &[ExportedArtifact]) -> String {
    render_html_with(artifacts, &TemplateOptions::default())
}

pub fn render_html_with(artifacts: &[ExportedArtifact], options: &TemplateOptions) -> String {
    let width = options.content_width;
    let background = escape_html(&options.background);
    let mut html = String::with_capacity(2048 + artifacts.len() * 400);

    // Writing into a String cannot fail.
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta http-equiv="X-UA-Compatible" content="IE=edge">
<title>{title}</title>
<style type="text/css">
body {{ margin: 0; padding: 0; }}
table, td {{ border-collapse: collapse; mso-table-lspace: 0pt; mso-table-rspace: 0pt; }}
img {{ border: 0; outline: none; text-decoration: none; -ms-interpolation-mode: bicubic; display: block; }}
</style>
</head>
<body style="margin:0;padding:0;background-color:{background};">
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background-color:{background};">
<tr>
<td align="center" style="padding:0;">
<table role="presentation" width="{width}" cellpadding="0" cellspacing="0" border="0" style="width:100%;max-width:{width}px;border-collapse:collapse;">
"#,
        title = escape_html(&options.title),
    );

    for artifact in artifacts {
        let img = format!(
            r#"<img src="{dir}/{file}" width="{width}" alt="" style="display:block;width:100%;max-width:{width}px;height:auto;border:0;outline:none;text-decoration:none;">"#,
            dir = IMAGE_DIR,
            file = artifact.file_name,
        );
        let cell = match &artifact.link_url {
            Some(url) => format!(
                r#"<a href="{}" target="_blank" style="display:block;text-decoration:none;">{}</a>"#,
                escape_html(url),
                img
            ),
            None => img,
        };
        let _ = writeln!(
            html,
            r#"<tr>
<td style="padding:0;margin:0;font-size:0;line-height:0;">{}</td>
</tr>"#,
            cell
        );
    }

    if let Some(footer) = &options.footer {
        let text = escape_html(&footer.text);
        let content = match &footer.url {
            Some(url) => format!(
                r#"<a href="{}" target="_blank" style="color:#666666;text-decoration:underline;">{}</a>"#,
                escape_html(url),
                text
            ),
            None => text.into_owned(),
        };
        let _ = writeln!(
            html,
            r#"<tr>
<td align="center" style="padding:16px;font-family:Arial,Helvetica,sans-serif;font-size:12px;line-height:18px;color:#666666;">{}</td>
</tr>"#,
            content
        );
    }

    html.push_str(
        r#"</table>
</td>
</tr>
</table>
</body>
</html>
"#,
    );
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(file: &str, link: Option<&str>) -> ExportedArtifact {
        ExportedArtifact {
            file_name: file.to_string(),
            image_bytes: vec![],
            width: 600,
            height: 300,
            absolute_x: 0.0,
            absolute_y: 0.0,
            link_url: link.map(str::to_string),
        }
    }

    /// Rows inside the content table, i.e. everything after the inner `<table`.
    fn content_rows(html: &str) -> Vec<&str> {
        let inner = html.match_indices("<table").nth(1).unwrap().0;
        html[inner..].split("<tr>").skip(1).collect()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("plain"), "plain");
        assert!(matches!(escape_html("plain"), Cow::Borrowed(_)));
        assert_eq!(
            escape_html(r#"a&b"<c>"#),
            "a&amp;b&quot;&lt;c&gt;"
        );
    }

    #[test]
    fn test_one_row_and_image_per_artifact() {
        let artifacts = vec![
            artifact("header.png", None),
            artifact("hero.png", Some("https://example.com")),
            artifact("footer.png", None),
        ];
        let html = render_html(&artifacts);

        let rows = content_rows(&html);
        assert_eq!(rows.len(), 3);
        for (row, artifact) in rows.iter().zip(&artifacts) {
            assert_eq!(row.matches("<img ").count(), 1);
            assert!(row.contains(&format!(r#"src="images/{}""#, artifact.file_name)));
        }
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_link_is_escaped_and_opens_new_window() {
        let html = render_html(&[artifact(
            "cta.png",
            Some(r#"https://example.com/?a=1&b="2"<x>"#),
        )]);
        assert!(html.contains(
            r#"<a href="https://example.com/?a=1&amp;b=&quot;2&quot;&lt;x&gt;" target="_blank""#
        ));
    }

    #[test]
    fn test_standalone_document() {
        let html = render_html(&[]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<meta charset="UTF-8">"#));
        assert!(html.contains(r#"name="viewport""#));
        assert!(html.contains("max-width:600px"));
        assert!(!html.contains("<link"));
        assert!(content_rows(&html).is_empty());
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_footer_and_width_options() {
        let options = TemplateOptions {
            content_width: 640,
            title: "Spring <Sale>".to_string(),
            background: "#f4f4f4".to_string(),
            footer: Some(Footer {
                text: "Unsubscribe & preferences".to_string(),
                url: Some("https://example.com/unsub".to_string()),
            }),
        };
        let html = render_html_with(&[artifact("a.png", None)], &options);

        assert!(html.contains("<title>Spring &lt;Sale&gt;</title>"));
        assert!(html.contains("max-width:640px"));
        assert!(html.contains("background-color:#f4f4f4"));
        assert!(html.contains("Unsubscribe &amp; preferences"));
        assert!(html.contains(r#"href="https://example.com/unsub""#));
        assert_eq!(content_rows(&html).len(), 2);
    }
}
