// src/extract/body.rs
//! Post-body extraction: the content-selector variant of the site
//! strategies, plus media segmentation.
//!
//! Post bodies embed media two ways: bare image/video URLs on their own
//! line, and bracket-tagged markers (`[이미지 1]` followed by the URL).
//! Downstream rendering treats those lines differently from prose, so the
//! body is kept as structured segments instead of one flattened string.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::config::Source;
use crate::extract::{absolutize, element_text};

/// The body container must hold at least this much text to be accepted;
/// shorter matches are navigation shells around the real content.
const MIN_CONTENT_CHARS: usize = 100;

/// Noise-text lines are dropped only when short; long prose that merely
/// mentions a noise word stays.
const NOISE_LINE_MAX_CHARS: usize = 100;

static IMAGE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://\S+\.(jpe?g|png|gif|webp)(\?\S*)?$").unwrap()
});
static VIDEO_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://\S+\.(mp4|webm|mov)(\?\S*)?$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum BodySegment {
    Text(String),
    Image { url: String, alt: String },
    Video { url: String },
    /// Bracket-tagged media marker line kept verbatim (`[이미지 1]` style).
    Marker(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostBody {
    pub segments: Vec<BodySegment>,
}

impl PostBody {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Flatten to the wire format: one segment per line, media URLs kept
    /// on their own line so renderers can recognize them.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match seg {
                BodySegment::Text(t) => lines.push(t.clone()),
                BodySegment::Marker(m) => lines.push(m.clone()),
                BodySegment::Image { url, alt } => {
                    lines.push(url.clone());
                    if !alt.is_empty() {
                        lines.push(alt.clone());
                    }
                }
                BodySegment::Video { url } => lines.push(url.clone()),
            }
        }
        lines.join("\n")
    }
}

fn classify_line(line: &str) -> BodySegment {
    if line.starts_with("[이미지") || line.starts_with("[동영상") {
        return BodySegment::Marker(line.to_string());
    }
    if IMAGE_URL_RE.is_match(line) {
        return BodySegment::Image {
            url: line.to_string(),
            alt: String::new(),
        };
    }
    if VIDEO_URL_RE.is_match(line)
        || line.contains("youtube.com/watch")
        || line.contains("youtu.be/")
        || line.contains("vimeo.com/")
    {
        return BodySegment::Video {
            url: line.to_string(),
        };
    }
    BodySegment::Text(line.to_string())
}

fn is_noise_line(line: &str, source: &Source) -> bool {
    line.chars().count() < NOISE_LINE_MAX_CHARS
        && source.noise_patterns.iter().any(|p| line.contains(p))
}

/// Resolve an `<img src>` the way browsers do: protocol-relative, rooted,
/// and bare-relative forms all become absolute against the site base.
fn absolutize_src(base: &str, src: &str) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        return format!("https://{rest}");
    }
    absolutize(base, src)
}

/// Shared body walk: probe content-selector variants in order, take the
/// first container with enough text, emit its text lines as classified
/// segments, then append embedded images as marker + image segments.
pub(crate) fn select_body(html: &str, source: &Source, content_selectors: &[Selector]) -> PostBody {
    static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

    let doc = Html::parse_document(html);

    let container = content_selectors.iter().find_map(|sel| {
        doc.select(sel)
            .find(|el| element_text(el).chars().count() > MIN_CONTENT_CHARS)
    });
    let Some(container) = container else {
        return PostBody::default();
    };

    let mut segments = Vec::new();
    for node in container.text() {
        let line = node.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() || is_noise_line(&line, source) {
            continue;
        }
        segments.push(classify_line(&line));
    }

    for (idx, img) in container.select(&IMG).enumerate() {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        let alt = img.value().attr("alt").unwrap_or_default().to_string();
        segments.push(BodySegment::Marker(format!("[이미지 {}]", idx + 1)));
        segments.push(BodySegment::Image {
            url: absolutize_src(&source.base_url, src),
            alt,
        });
    }

    PostBody { segments }
}
