//! Prefix command parsing.
//!
//! A message is a command when it starts with the configured prefix.
//! Unknown command names are ignored entirely (no reply); a known name
//! with a missing or malformed argument yields a usage message instead
//! of a command. Argument *validation* beyond shape (ideograph checks,
//! time-limit range) happens in the command runners.

use crate::shiritori::TIME_LIMIT_MESSAGE;

/// A fully parsed command, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `kanji <character>` — KANJIDIC2 lookup.
    Kanji(String),
    /// `strokeorder <character>` — stroke diagram lookup.
    StrokeOrder(String),
    /// `shiritori [time_limit]` — start a game session.
    Shiritori {
        /// Per-turn time limit in seconds.
        time_limit: u64,
    },
    /// `shiritori check <word>` — one-shot word validation.
    ShiritoriCheck(String),
    /// `jisho <word...>` — dictionary lookup.
    Jisho(String),
}

/// Outcome of parsing a prefixed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// A dispatchable command.
    Command(Command),
    /// A recognized command with unusable arguments; reply this text.
    Usage(&'static str),
}

/// Parse a message into a command. Returns `None` for messages without
/// the prefix and for unknown command names.
#[must_use]
pub fn parse(prefix: &str, text: &str) -> Option<Parsed> {
    let rest = text.strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?.to_lowercase();

    let parsed = match name.as_str() {
        "kanji" | "k" | "かんじ" | "漢字" => match words.next() {
            Some(arg) => Parsed::Command(Command::Kanji(arg.to_string())),
            None => Parsed::Usage("A kanji character is required."),
        },
        "strokeorder" | "stroke_order" | "so" | "ひつじゅん" | "筆順" | "かきじゅん"
        | "書き順" => match words.next() {
            Some(arg) => Parsed::Command(Command::StrokeOrder(arg.to_string())),
            None => Parsed::Usage("A Japanese character is required."),
        },
        "shiritori" | "しりとり" | "尻取り" => match words.next() {
            None => Parsed::Command(Command::Shiritori {
                time_limit: crate::shiritori::DEFAULT_TIME_LIMIT,
            }),
            Some("check" | "かくにん" | "確認") => match words.next() {
                Some(word) => Parsed::Command(Command::ShiritoriCheck(word.to_string())),
                None => Parsed::Usage("A word to check is required."),
            },
            Some(arg) => match arg.parse::<u64>() {
                Ok(time_limit) => Parsed::Command(Command::Shiritori { time_limit }),
                Err(_) => Parsed::Usage(TIME_LIMIT_MESSAGE),
            },
        },
        "jisho" | "j" | "じしょ" | "辞書" => {
            let query = words.collect::<Vec<_>>().join(" ");
            if query.is_empty() {
                Parsed::Usage("A word to look up is required.")
            } else {
                Parsed::Command(Command::Jisho(query))
            }
        },
        _ => return None,
    };
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_t(text: &str) -> Option<Parsed> {
        parse("t!", text)
    }

    #[test]
    fn messages_without_prefix_are_not_commands() {
        assert_eq!(parse_t("kanji 猫"), None);
        assert_eq!(parse_t("ねこ"), None);
        assert_eq!(parse_t(""), None);
    }

    #[test]
    fn unknown_names_are_ignored() {
        assert_eq!(parse_t("t!frobnicate"), None);
        assert_eq!(parse_t("t!"), None);
    }

    #[test]
    fn kanji_command_and_aliases() {
        for name in ["kanji", "k", "かんじ", "漢字"] {
            assert_eq!(
                parse_t(&format!("t!{name} 猫")),
                Some(Parsed::Command(Command::Kanji("猫".to_string()))),
                "{name}"
            );
        }
    }

    #[test]
    fn kanji_without_argument_is_usage() {
        assert_eq!(parse_t("t!kanji"), Some(Parsed::Usage("A kanji character is required.")));
    }

    #[test]
    fn stroke_order_command_and_aliases() {
        for name in ["strokeorder", "stroke_order", "so", "筆順", "書き順"] {
            assert_eq!(
                parse_t(&format!("t!{name} 猫")),
                Some(Parsed::Command(Command::StrokeOrder("猫".to_string()))),
                "{name}"
            );
        }
    }

    #[test]
    fn shiritori_defaults_the_time_limit() {
        assert_eq!(
            parse_t("t!shiritori"),
            Some(Parsed::Command(Command::Shiritori { time_limit: 20 }))
        );
    }

    #[test]
    fn shiritori_takes_an_explicit_time_limit() {
        assert_eq!(
            parse_t("t!shiritori 45"),
            Some(Parsed::Command(Command::Shiritori { time_limit: 45 }))
        );
        assert_eq!(
            parse_t("t!しりとり 45"),
            Some(Parsed::Command(Command::Shiritori { time_limit: 45 }))
        );
    }

    #[test]
    fn shiritori_rejects_a_malformed_time_limit() {
        assert_eq!(parse_t("t!shiritori soon"), Some(Parsed::Usage(TIME_LIMIT_MESSAGE)));
        assert_eq!(parse_t("t!shiritori -5"), Some(Parsed::Usage(TIME_LIMIT_MESSAGE)));
    }

    #[test]
    fn shiritori_check_subcommand_and_aliases() {
        for sub in ["check", "かくにん", "確認"] {
            assert_eq!(
                parse_t(&format!("t!shiritori {sub} ねこ")),
                Some(Parsed::Command(Command::ShiritoriCheck("ねこ".to_string()))),
                "{sub}"
            );
        }
    }

    #[test]
    fn shiritori_check_without_word_is_usage() {
        assert_eq!(
            parse_t("t!shiritori check"),
            Some(Parsed::Usage("A word to check is required."))
        );
    }

    #[test]
    fn jisho_keeps_multi_word_queries() {
        assert_eq!(
            parse_t("t!jisho 日 sunlight"),
            Some(Parsed::Command(Command::Jisho("日 sunlight".to_string())))
        );
        assert_eq!(
            parse_t("t!j house"),
            Some(Parsed::Command(Command::Jisho("house".to_string())))
        );
    }

    #[test]
    fn command_names_are_case_insensitive() {
        assert_eq!(
            parse_t("t!Kanji 猫"),
            Some(Parsed::Command(Command::Kanji("猫".to_string())))
        );
    }
}
