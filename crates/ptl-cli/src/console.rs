//! Line-oriented operator console on stdin.
//!
//! ```text
//! 4006381333931                 simulated scan (with --simulate)
//! :blink 12                     blink one line; 48 blinks every line
//! :sweep 0                      walk every line from 0
//! :target <addr> <svc> <char>   retarget the session
//! :reload                       reread the access table
//! :log                          print recent scans
//! ```

use ptl_core::PinAddress;
use thiserror::Error;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan(String),
    Blink(PinAddress),
    Sweep(PinAddress),
    Target {
        address: String,
        service: String,
        characteristic: String,
    },
    Reload,
    Log,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(String);

impl Command {
    /// Parse a console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Self, ParseError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix(':') else {
            return Some(Ok(Command::Scan(line.to_string())));
        };

        let mut words = rest.split_whitespace();
        let command = match (words.next(), words.next(), words.next(), words.next()) {
            (Some("blink"), Some(pin), None, None) => parse_pin(pin).map(Command::Blink),
            (Some("sweep"), start, None, None) => {
                start.map_or(Ok(PinAddress::new(0)), parse_pin).map(Command::Sweep)
            }
            (Some("target"), Some(address), Some(service), Some(characteristic))
                if words.next().is_none() =>
            {
                Ok(Command::Target {
                    address: address.to_string(),
                    service: service.to_string(),
                    characteristic: characteristic.to_string(),
                })
            }
            (Some("reload"), None, None, None) => Ok(Command::Reload),
            (Some("log"), None, None, None) => Ok(Command::Log),
            _ => Err(ParseError(format!("unrecognised command: {}", line))),
        };
        Some(command)
    }
}

fn parse_pin(word: &str) -> Result<PinAddress, ParseError> {
    word.parse::<u16>()
        .map(PinAddress::new)
        .map_err(|_| ParseError(format!("invalid pin index: {}", word)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4006381333931", Command::Scan("4006381333931".into()))]
    #[case("  042A ", Command::Scan("042A".into()))]
    #[case(":blink 12", Command::Blink(PinAddress::new(12)))]
    #[case(":blink 48", Command::Blink(PinAddress::ALL))]
    #[case(":sweep", Command::Sweep(PinAddress::new(0)))]
    #[case(":sweep 30", Command::Sweep(PinAddress::new(30)))]
    #[case(":reload", Command::Reload)]
    #[case(":log", Command::Log)]
    fn test_parse(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(line), Some(Ok(expected)));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            Command::parse(":target AA:BB:CC:DD:EE:FF ffe0 ffe1"),
            Some(Ok(Command::Target {
                address: "AA:BB:CC:DD:EE:FF".into(),
                service: "ffe0".into(),
                characteristic: "ffe1".into(),
            }))
        );
    }

    #[rstest]
    #[case(":blink")]
    #[case(":blink x")]
    #[case(":blink 1 2")]
    #[case(":target a b")]
    #[case(":target a b c d")]
    #[case(":frobnicate")]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(matches!(Command::parse(line), Some(Err(_))));
    }

    #[test]
    fn test_blank_line_ignored() {
        assert_eq!(Command::parse("   "), None);
    }
}
