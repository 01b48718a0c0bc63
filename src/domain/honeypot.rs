//! Honeypot decoy field.
//!
//! The decoy is rendered off-screen, cannot be reached with the keyboard and
//! has autocomplete disabled, so only automated form fillers put a value in it.

use crate::domain::sanitizer::escape_html;
use serde::Serialize;

/// Inline style that moves the decoy out of view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotStyle {
    pub position: &'static str,
    pub left: &'static str,
    pub width: &'static str,
    pub height: &'static str,
    pub opacity: f32,
}

/// Descriptor of the decoy input, ready to be handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub input_type: &'static str,
    pub tab_index: i32,
    pub auto_complete: &'static str,
    pub style: HoneypotStyle,
}

impl HoneypotField {
    /// CSS declaration list for the `style` attribute.
    pub fn inline_style(&self) -> String {
        format!(
            "position:{};left:{};width:{};height:{};opacity:{}",
            self.style.position,
            self.style.left,
            self.style.width,
            self.style.height,
            self.style.opacity
        )
    }

    /// Render the decoy as an `<input>` element.
    pub fn to_html(&self) -> String {
        format!(
            r#"<input type="{}" name="{}" tabindex="{}" autocomplete="{}" style="{}" aria-hidden="true">"#,
            escape_html(self.input_type),
            escape_html(self.name),
            self.tab_index,
            escape_html(self.auto_complete),
            escape_html(&self.inline_style())
        )
    }
}

/// Build the decoy field descriptor.
///
/// The name is deliberately plausible ("website") so that bots fill it in.
pub fn create_honeypot() -> HoneypotField {
    HoneypotField {
        name: "website",
        input_type: "text",
        tab_index: -1,
        auto_complete: "off",
        style: HoneypotStyle {
            position: "absolute",
            left: "-9999px",
            width: "1px",
            height: "1px",
            opacity: 0.0,
        },
    }
}

/// A non-blank honeypot value means the form was filled in by a bot.
///
/// # Example
/// ```
/// use form_guard::is_bot;
///
/// assert!(!is_bot(""));
/// assert!(is_bot("  x "));
/// ```
pub fn is_bot(value: &str) -> bool {
    !value.trim().is_empty()
}
