//! Japanese text helpers: answer normalization and ideograph checks.

/// Marker prefix that tells the game loop to ignore a message (so the
/// player can talk to a friend in the same channel mid-game).
pub const ESCAPE_MARKER: char = '\\';

/// Normalize a game answer by removing plain (U+0020) and ideographic
/// (U+3000) space characters.
///
/// Idempotent: `normalize_answer(normalize_answer(x)) ==
/// normalize_answer(x)`.
#[must_use]
pub fn normalize_answer(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ' ' && *c != '\u{3000}')
        .collect()
}

/// Returns `true` if the message text counts as a game answer (it is not
/// prefixed with the escape marker).
#[must_use]
pub fn is_game_answer(text: &str) -> bool {
    !text.starts_with(ESCAPE_MARKER)
}

/// Returns `true` if `c` is a CJK unified or compatibility ideograph.
///
/// Mirrors a Unicode character-name check for the `CJK UNIFIED
/// IDEOGRAPH` / `CJK COMPATIBILITY IDEOGRAPH` prefixes, expressed as the
/// corresponding block ranges (URO, extensions A-H, both compatibility
/// blocks). Matching whole blocks over-approximates a name lookup: the
/// few unassigned codepoints inside the extension blocks are accepted
/// too, and left for the dictionary lookup to reject.
#[must_use]
pub fn is_cjk_ideograph(c: char) -> bool {
    matches!(
        u32::from(c),
        0x3400..=0x4DBF      // Extension A
        | 0x4E00..=0x9FFF    // Unified Repertoire and Ordering
        | 0xF900..=0xFAFF    // Compatibility Ideographs
        | 0x20000..=0x2A6DF  // Extension B
        | 0x2A700..=0x2EE5F  // Extensions C-F, I
        | 0x2F800..=0x2FA1F  // Compatibility Ideographs Supplement
        | 0x30000..=0x323AF  // Extensions G, H
    )
}
