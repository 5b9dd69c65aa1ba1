//! Font identity resolution
//!
//! Built once per document from the extracted font programs. Display names
//! come from the embedded name table when a program was recovered, falling
//! back to the internal reference name; style suffixes are stripped so
//! regular/bold/italic variants of one family share a family name. Fonts
//! with recovered bytes are also embedded as @font-face rules.

use std::collections::HashMap;
use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use regex::Regex;
use tracing::warn;

use crate::pdf::{EmbeddedFont, FontProgram};

/// Web-safe stacks for common font name substrings, used when a span's
/// font is not in the extracted table
const FAMILY_ALIASES: &[(&str, &str)] = &[
    ("times", "'Times New Roman', Times, serif"),
    ("georgia", "Georgia, serif"),
    ("garamond", "Garamond, 'Times New Roman', serif"),
    ("cambria", "Cambria, Georgia, serif"),
    ("courier", "'Courier New', Courier, monospace"),
    ("consolas", "Consolas, 'Courier New', monospace"),
    ("mono", "'Courier New', Courier, monospace"),
    ("arial", "Arial, Helvetica, sans-serif"),
    ("helvetica", "Helvetica, Arial, sans-serif"),
    ("verdana", "Verdana, Geneva, sans-serif"),
    ("tahoma", "Tahoma, Geneva, sans-serif"),
    ("calibri", "Calibri, 'Segoe UI', sans-serif"),
];

const GENERIC_FALLBACK: &str = "Arial, sans-serif";

/// Family and style resolved for one span
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFont {
    /// Complete font-family value, quoted where needed
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

/// Per-document font lookup table
#[derive(Debug, Default)]
pub struct FontResolver {
    /// internal reference name -> normalized display name
    by_internal: HashMap<String, String>,
    /// normalized internal name -> normalized display name
    by_normalized: HashMap<String, String>,
    face_css: String,
}

impl FontResolver {
    pub fn build(fonts: &[EmbeddedFont]) -> Self {
        let mut resolver = FontResolver::default();
        let mut rules = Vec::new();

        for font in fonts {
            let display = font
                .bytes
                .as_deref()
                .and_then(name_table_full_name)
                .unwrap_or_else(|| strip_subset(&font.internal_name).to_string());
            let display = normalize_family(&display);

            resolver.register(&font.internal_name, &display);

            if let Some(bytes) = &font.bytes {
                let program = font.program.unwrap_or(FontProgram::TrueType);
                rules.push(format!(
                    "@font-face {{ font-family: '{}'; src: url(data:{};base64,{}) format('{}'); }}",
                    display,
                    program.mime_type(),
                    BASE64.encode(bytes),
                    program.css_format(),
                ));
            }
        }

        resolver.face_css = rules.join("\n");
        resolver
    }

    fn register(&mut self, internal: &str, display: &str) {
        self.by_internal
            .entry(internal.to_string())
            .or_insert_with(|| display.to_string());
        self.by_normalized
            .entry(normalize_family(internal))
            .or_insert_with(|| display.to_string());

        // Subset-tagged names ("ABCDEF+Foo") are also referenced bare
        let bare = strip_subset(internal);
        if bare != internal {
            self.by_internal
                .entry(bare.to_string())
                .or_insert_with(|| display.to_string());
            self.by_normalized
                .entry(normalize_family(bare))
                .or_insert_with(|| display.to_string());
        }
    }

    /// Embeddable @font-face rules for every font with recovered bytes
    pub fn face_css(&self) -> &str {
        &self.face_css
    }

    /// Resolve the family stack and style flags for a span's internal
    /// font name
    pub fn resolve(&self, internal: &str) -> ResolvedFont {
        // Style detection runs on the raw internal name, before
        // normalization strips the very tokens it looks for
        let lower = internal.to_lowercase();
        let bold = lower.contains("bold");
        let italic = lower.contains("italic") || lower.contains("oblique");

        ResolvedFont {
            family: self.family_stack(internal),
            bold,
            italic,
        }
    }

    fn family_stack(&self, internal: &str) -> String {
        let bare = strip_subset(internal);

        if let Some(display) = self
            .by_internal
            .get(internal)
            .or_else(|| self.by_internal.get(bare))
        {
            return format!("'{}', {}", display, GENERIC_FALLBACK);
        }

        if let Some(display) = self.by_normalized.get(&normalize_family(bare)) {
            return format!("'{}', {}", display, GENERIC_FALLBACK);
        }

        let lower = bare.to_lowercase();
        for (needle, stack) in FAMILY_ALIASES {
            if lower.contains(needle) {
                return (*stack).to_string();
            }
        }

        GENERIC_FALLBACK.to_string()
    }
}

/// Drop the six-letter subset tag PDF producers prefix embedded fonts with
fn strip_subset(name: &str) -> &str {
    name.split_once('+').map(|(_, rest)| rest).unwrap_or(name)
}

/// Strip style suffixes so family variants share one name:
/// "Liberation Serif Bold" and "LiberationSerif-Italic" both reduce to
/// their base family
pub fn normalize_family(name: &str) -> String {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let re = SUFFIX.get_or_init(|| {
        Regex::new(r"(?i)[, \-](bold|italic|oblique)").expect("valid style-suffix pattern")
    });
    re.replace_all(name, "").trim().to_string()
}

/// Full name (id 4) from an outline font's name table: Windows platform
/// record first, Macintosh fallback
fn name_table_full_name(bytes: &[u8]) -> Option<String> {
    let face = match ttf_parser::Face::parse(bytes, 0) {
        Ok(face) => face,
        Err(e) => {
            warn!(error = %e, "embedded font program not parseable as outline font");
            return None;
        }
    };

    let mut mac_fallback: Option<String> = None;
    for name in face.names() {
        if name.name_id != ttf_parser::name_id::FULL_NAME {
            continue;
        }
        match name.platform_id {
            ttf_parser::PlatformId::Windows if name.is_unicode() => {
                if let Some(s) = name.to_string() {
                    if !s.is_empty() {
                        return Some(s);
                    }
                }
            }
            ttf_parser::PlatformId::Macintosh if mac_fallback.is_none() => {
                // Macintosh records are Roman-encoded single bytes
                let s: String = name.name.iter().map(|&b| b as char).collect();
                if !s.is_empty() {
                    mac_fallback = Some(s);
                }
            }
            _ => {}
        }
    }
    mac_fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(internal: &str) -> EmbeddedFont {
        EmbeddedFont {
            internal_name: internal.to_string(),
            bytes: None,
            program: None,
        }
    }

    #[test]
    fn normalization_strips_style_suffixes() {
        assert_eq!(normalize_family("ArialMT-Bold"), "ArialMT");
        assert_eq!(normalize_family("Liberation Serif Italic"), "Liberation Serif");
        assert_eq!(normalize_family("Foo,Oblique"), "Foo");
        assert_eq!(normalize_family("Plain"), "Plain");
    }

    #[test]
    fn variants_share_a_family_name() {
        assert_eq!(
            normalize_family("LiberationSerif-Bold"),
            normalize_family("LiberationSerif-Italic")
        );
    }

    #[test]
    fn alias_table_resolves_unextracted_fonts() {
        let resolver = FontResolver::build(&[]);

        let arial = resolver.resolve("ArialMT-Bold");
        assert!(arial.family.contains("Arial"));
        assert!(arial.bold);
        assert!(!arial.italic);

        let times = resolver.resolve("TimesNewRomanPS-ItalicMT");
        assert!(times.family.contains("serif"));
        assert!(times.italic);

        let courier = resolver.resolve("CourierNewPSMT");
        assert!(courier.family.contains("monospace"));
    }

    #[test]
    fn unknown_font_falls_back_to_sans() {
        let resolver = FontResolver::build(&[]);
        let resolved = resolver.resolve("ZapfChanceryWhatever");
        assert_eq!(resolved.family, GENERIC_FALLBACK);
    }

    #[test]
    fn extracted_name_wins_over_alias() {
        let resolver = FontResolver::build(&[font("ABCDEF+CustomSans-Bold")]);

        // Exact internal name
        let exact = resolver.resolve("ABCDEF+CustomSans-Bold");
        assert!(exact.family.starts_with("'CustomSans'"));
        assert!(exact.bold);

        // Bare name without the subset tag
        let bare = resolver.resolve("CustomSans-Bold");
        assert!(bare.family.starts_with("'CustomSans'"));

        // Normalized variant lookup
        let variant = resolver.resolve("CustomSans-Italic");
        assert!(variant.family.starts_with("'CustomSans'"));
        assert!(variant.italic);
    }

    #[test]
    fn style_detection_runs_before_normalization() {
        let resolver = FontResolver::build(&[font("Helvetica-BoldOblique")]);
        let resolved = resolver.resolve("Helvetica-BoldOblique");
        assert!(resolved.bold);
        assert!(resolved.italic);
    }

    #[test]
    fn face_css_only_for_recovered_bytes() {
        let with_bytes = EmbeddedFont {
            internal_name: "Embedded".to_string(),
            bytes: Some(vec![0u8; 8]),
            program: Some(FontProgram::TrueType),
        };
        let resolver = FontResolver::build(&[with_bytes, font("NoBytes")]);

        assert_eq!(resolver.face_css().matches("@font-face").count(), 1);
        assert!(resolver.face_css().contains("font/ttf"));
        assert!(resolver.face_css().contains("format('truetype')"));
        // The byteless font still resolves by name
        assert!(resolver.resolve("NoBytes").family.starts_with("'NoBytes'"));
    }
}
