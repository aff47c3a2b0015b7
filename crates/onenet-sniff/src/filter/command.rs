//! Text filter commands.
//!
//! ```text
//! <field> add <value|lo-hi>
//! <field> remove <value|lo-hi>
//! <field> display | clear
//! <predicate> match | nomatch | any | display
//! key add|remove|display [<32 hex digits>]
//! invitekey add|remove|display [<8 character code>]
//! ```
//!
//! Numbers are decimal or `0x` hex.

use std::str::FromStr;

use onenet_core::KeyScope;
use onenet_crypto::Key;

use super::field::{FilterField, MatchPredicate, Predicate};
use super::Filter;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    Accept { field: FilterField, lo: u64, hi: u64 },
    Reject { field: FilterField, lo: u64, hi: u64 },
    Display(FilterField),
    Clear(FilterField),
    SetPredicate(Predicate, MatchPredicate),
    DisplayPredicate(Predicate),
    AcceptKey { scope: KeyScope, key: Key },
    RejectKey { scope: KeyScope, key: Key },
    DisplayKeys(KeyScope),
}

/// Parses a decimal or `0x`-prefixed hex number.
pub fn parse_number(text: &str) -> Result<u64, ConfigError> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|_| ConfigError::BadNumber(text.to_string()))
}

/// Parses `value` or `lo-hi`.
pub fn parse_range(text: &str) -> Result<(u64, u64), ConfigError> {
    match text.split_once('-') {
        Some((lo, hi)) => Ok((parse_number(lo)?, parse_number(hi)?)),
        None => {
            let value = parse_number(text)?;
            Ok((value, value))
        }
    }
}

fn parse_key_command(scope: KeyScope, words: &[&str], line: &str) -> Result<FilterCommand, ConfigError> {
    let bad = || ConfigError::BadCommand(line.to_string());
    let (&action, rest) = words.split_first().ok_or_else(bad)?;
    if action.eq_ignore_ascii_case("display") && rest.is_empty() {
        return Ok(FilterCommand::DisplayKeys(scope));
    }
    if rest.is_empty() {
        return Err(bad());
    }
    let text = rest.join(" ");
    let key = match scope {
        KeyScope::Network => Key::parse_hex(&text)?,
        KeyScope::Invite => Key::parse_invite(&text)?,
    };
    match action.to_ascii_lowercase().as_str() {
        "add" => Ok(FilterCommand::AcceptKey { scope, key }),
        "remove" => Ok(FilterCommand::RejectKey { scope, key }),
        _ => Err(bad()),
    }
}

impl FromStr for FilterCommand {
    type Err = ConfigError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let bad = || ConfigError::BadCommand(line.trim().to_string());
        let (&target, rest) = words.split_first().ok_or_else(bad)?;

        match target.to_ascii_lowercase().as_str() {
            "key" => return parse_key_command(KeyScope::Network, rest, line.trim()),
            "invitekey" => return parse_key_command(KeyScope::Invite, rest, line.trim()),
            _ => {}
        }

        if let Ok(predicate) = target.parse::<Predicate>() {
            return match rest {
                [state] if state.eq_ignore_ascii_case("display") => {
                    Ok(FilterCommand::DisplayPredicate(predicate))
                }
                [state] => Ok(FilterCommand::SetPredicate(predicate, state.parse()?)),
                _ => Err(bad()),
            };
        }

        let field: FilterField = target.parse()?;
        match rest {
            [action] if action.eq_ignore_ascii_case("display") => Ok(FilterCommand::Display(field)),
            [action] if action.eq_ignore_ascii_case("clear") => Ok(FilterCommand::Clear(field)),
            [action, value] => {
                let (lo, hi) = parse_range(value)?;
                match action.to_ascii_lowercase().as_str() {
                    "add" => Ok(FilterCommand::Accept { field, lo, hi }),
                    "remove" => Ok(FilterCommand::Reject { field, lo, hi }),
                    _ => Err(bad()),
                }
            }
            _ => Err(bad()),
        }
    }
}

impl FilterCommand {
    /// Applies the command; display commands return their text.
    pub fn apply(&self, filter: &mut Filter) -> Result<Option<String>, ConfigError> {
        match self {
            FilterCommand::Accept { field, lo, hi } => filter.accept_range(*field, *lo, *hi)?,
            FilterCommand::Reject { field, lo, hi } => filter.reject_range(*field, *lo, *hi)?,
            FilterCommand::Display(field) => return Ok(Some(filter.describe(*field))),
            FilterCommand::Clear(field) => filter.clear_field(*field),
            FilterCommand::SetPredicate(predicate, state) => filter.set_predicate(*predicate, *state),
            FilterCommand::DisplayPredicate(predicate) => {
                return Ok(Some(format!("{predicate}: {}", filter.predicate(*predicate))))
            }
            FilterCommand::AcceptKey { scope, key } => {
                filter.accept_key(*scope, *key);
            }
            FilterCommand::RejectKey { scope, key } => {
                filter.reject_key(*scope, key);
            }
            FilterCommand::DisplayKeys(scope) => {
                let ring = filter.accepted_keys(*scope);
                let text = if ring.is_empty() {
                    "any".to_string()
                } else {
                    ring.iter()
                        .map(|k| match scope {
                            KeyScope::Network => k.to_string(),
                            KeyScope::Invite => k.invite_code().unwrap_or_else(|| k.to_string()),
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onenet_crypto::DEFAULT_NETWORK_KEY;

    #[test]
    fn numbers_accept_decimal_and_hex() {
        assert_eq!(parse_number("42"), Ok(42));
        assert_eq!(parse_number("0x2A"), Ok(42));
        assert_eq!(parse_range("0x10-0x20"), Ok((0x10, 0x20)));
        assert_eq!(parse_number("4z"), Err(ConfigError::BadNumber("4z".into())));
    }

    #[test]
    fn parses_field_commands() {
        assert_eq!(
            "dst add 0x001-0x003".parse(),
            Ok(FilterCommand::Accept {
                field: FilterField::DstDid,
                lo: 1,
                hi: 3
            })
        );
        assert_eq!(
            "msgid remove 7".parse(),
            Ok(FilterCommand::Reject {
                field: FilterField::MsgId,
                lo: 7,
                hi: 7
            })
        );
        assert_eq!("nid display".parse(), Ok(FilterCommand::Display(FilterField::Nid)));
    }

    #[test]
    fn parses_predicate_and_key_commands() {
        assert_eq!(
            "valid nomatch".parse(),
            Ok(FilterCommand::SetPredicate(Predicate::Valid, MatchPredicate::MustNotMatch))
        );
        assert_eq!(
            "key add 00010203-04050607-08090A0B-0C0D0E0F".parse(),
            Ok(FilterCommand::AcceptKey {
                scope: KeyScope::Network,
                key: DEFAULT_NETWORK_KEY
            })
        );
        assert!(matches!(
            "invitekey remove abcd-1234".parse::<FilterCommand>(),
            Ok(FilterCommand::RejectKey {
                scope: KeyScope::Invite,
                ..
            })
        ));
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert_eq!(
            "bogus add 1".parse::<FilterCommand>(),
            Err(ConfigError::UnknownField("bogus".into()))
        );
        assert_eq!(
            "dst frobnicate 1".parse::<FilterCommand>(),
            Err(ConfigError::BadCommand("dst frobnicate 1".into()))
        );
        assert!(matches!(
            "key add 0102".parse::<FilterCommand>(),
            Err(ConfigError::Key(_))
        ));
        assert!("".parse::<FilterCommand>().is_err());
    }

    #[test]
    fn apply_updates_filter_and_displays_state() {
        let mut filter = Filter::new();
        for line in ["src add 10-20", "src remove 15", "hdrcrcvalid match"] {
            let cmd: FilterCommand = line.parse().unwrap();
            assert_eq!(cmd.apply(&mut filter), Ok(None));
        }
        let shown = FilterCommand::Display(FilterField::SrcDid).apply(&mut filter).unwrap();
        assert_eq!(shown.as_deref(), Some("src: 0xA-0xE, 0x10-0x14"));
        let shown = FilterCommand::DisplayPredicate(Predicate::HeaderCrcValid)
            .apply(&mut filter)
            .unwrap();
        assert_eq!(shown.as_deref(), Some("hdrcrcvalid: match"));

        let err = "hops add 9".parse::<FilterCommand>().unwrap().apply(&mut filter);
        assert!(matches!(err, Err(ConfigError::Range { field: "hops", .. })));
    }
}
