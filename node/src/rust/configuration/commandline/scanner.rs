//! Argument scanner
//!
//! Walks the token list once, matches each token's flag name against the
//! option registry, extracts the inline-or-next-token argument and emits
//! one raw event per matched flag. Matching is exact string comparison on
//! the long-form name; there is no abbreviation or prefix matching.

use super::options::{find_option, OptionId};
use crate::rust::configuration::errors::ParseError;

/// One scanned (identifier, raw argument) event, consumed immediately by
/// the option mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub id: OptionId,
    pub arg: Option<String>,
}

pub struct ArgumentScanner<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl<'a> ArgumentScanner<'a> {
    /// `tokens` is argv without the leading program name.
    pub fn new(tokens: &'a [String]) -> Self {
        ArgumentScanner { tokens, pos: 0 }
    }

    /// Produce the next event, or `None` once the token list is exhausted.
    /// The first malformed token aborts the scan.
    pub fn next_event(&mut self) -> Result<Option<RawEvent>, ParseError> {
        let token = match self.tokens.get(self.pos) {
            Some(token) => token,
            None => return Ok(None),
        };

        let body = token
            .strip_prefix("--")
            .ok_or_else(|| ParseError::UnexpectedArgument {
                token: token.clone(),
            })?;

        let (name, inline_arg) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };

        let opt = find_option(name).ok_or_else(|| ParseError::UnrecognizedOption {
            token: token.clone(),
        })?;

        self.pos += 1;
        if !opt.takes_arg() {
            // An inline `=value` on a value-less flag is ignored.
            return Ok(Some(RawEvent {
                id: opt.id,
                arg: None,
            }));
        }

        let arg = match inline_arg {
            Some(value) => value.to_string(),
            None => {
                let next = self
                    .tokens
                    .get(self.pos)
                    .ok_or_else(|| ParseError::MissingArgument {
                        flag: opt.flag.to_string(),
                    })?;
                self.pos += 1;
                next.clone()
            }
        };

        Ok(Some(RawEvent {
            id: opt.id,
            arg: Some(arg),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn scan_all(args: &[&str]) -> Result<Vec<RawEvent>, ParseError> {
        let tokens = tokens(args);
        let mut scanner = ArgumentScanner::new(&tokens);
        let mut events = Vec::new();
        while let Some(event) = scanner.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    #[test]
    fn test_inline_and_separate_arguments_scan_alike() {
        let events = scan_all(&["--allow-http=true", "--http-port", "8000"]).unwrap();
        assert_eq!(
            events,
            vec![
                RawEvent {
                    id: OptionId::AllowHttp,
                    arg: Some("true".to_string()),
                },
                RawEvent {
                    id: OptionId::HttpPort,
                    arg: Some("8000".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_unrecognized_option_is_terminal() {
        let err = scan_all(&["--no-such-flag", "--allow-http=true"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnrecognizedOption {
                token: "--no-such-flag".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_argument() {
        let err = scan_all(&["--http-port"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingArgument {
                flag: "http-port".to_string(),
            }
        );
    }

    #[test]
    fn test_non_flag_token_is_unexpected() {
        let err = scan_all(&["--allow-http=true", "stray"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedArgument {
                token: "stray".to_string(),
            }
        );
    }

    #[test]
    fn test_flag_without_value_ignores_inline_argument() {
        let events = scan_all(&["--disable-auto-complete-config=true"]).unwrap();
        assert_eq!(
            events,
            vec![RawEvent {
                id: OptionId::DisableAutoCompleteConfig,
                arg: None,
            }]
        );
    }

    #[test]
    fn test_next_token_is_consumed_whole_as_argument() {
        // Even a leading-dash token is swallowed as the pending argument.
        let events = scan_all(&["--id", "--my-server"]).unwrap();
        assert_eq!(
            events,
            vec![RawEvent {
                id: OptionId::ServerId,
                arg: Some("--my-server".to_string()),
            }]
        );
    }

    #[test]
    fn test_empty_inline_value_is_kept() {
        let events = scan_all(&["--id="]).unwrap();
        assert_eq!(events[0].arg.as_deref(), Some(""));
    }
}
