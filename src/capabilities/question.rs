//! Question prompt generation.

/// Style used when the requested one isn't known
pub const DEFAULT_STYLE: &str = "friendly";

const FRIENDLY_PREFIX: &str = "Could you please tell me more about";

const STYLE_PREFIXES: [(&str, &str); 4] = [
    (DEFAULT_STYLE, FRIENDLY_PREFIX),
    ("formal", "I would like to inquire about"),
    ("casual", "What's up with"),
    ("academic", "Could you provide detailed information regarding"),
];

/// Names of every recognized style, in table order
#[inline]
pub fn styles() -> impl Iterator<Item = &'static str> {
    STYLE_PREFIXES.iter().map(|(style, _)| *style)
}

/// Opening phrase for `style`, or the friendly phrase for unknown styles
#[inline]
pub fn style_prefix(style: &str) -> &'static str {
    lookup(style).unwrap_or(FRIENDLY_PREFIX)
}

fn lookup(style: &str) -> Option<&'static str> {
    STYLE_PREFIXES
        .iter()
        .find(|(name, _)| *name == style)
        .map(|(_, prefix)| *prefix)
}

/// Generate a question prompt about a topic
#[inline]
pub fn ask_question(topic: &str, style: &str) -> String {
    format!(
        "{} {}? I'm really interested to learn more!",
        style_prefix(style),
        topic
    )
}
