//! Tagged key/value line parser.
//!
//! A line is a space separated list of tokens; the first character of each
//! token is its tag:
//!
//! | tag | meaning        | payload |
//! |-----|----------------|---------|
//! | `i` | crane id       | integer |
//! | `m` | raw ADC counts | integer |
//! | `x` | X position     | integer |
//! | `y` | Y position     | integer |
//! | `k` | no-load marker | none    |
//!
//! Unknown tags are kept as [`Token::Unknown`] and otherwise ignored.
//! The radio coordinator prefixes frames with a length byte and pads fields
//! with NULs; ASCII control characters are stripped from every token before
//! the tag is read.

use crate::error::LineError;

/// Full frames carry at least this many tokens; shorter ones must be heartbeats.
pub const MIN_FULL_TOKENS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Id(u32),
    Mass(i64),
    PosX(i32),
    PosY(i32),
    NoLoad,
    Unknown(char),
}

/// Fields extracted from one line. Repeated tags: the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub crane_id: Option<u32>,
    pub adc: Option<i64>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub no_load: bool,
    pub token_count: usize,
}

impl ParsedFields {
    /// Short frame carrying the no-load marker.
    pub fn is_heartbeat(&self) -> bool {
        self.no_load && self.token_count < MIN_FULL_TOKENS
    }

    /// Everything needed to build a record without consulting earlier lines.
    pub fn is_complete(&self) -> bool {
        self.crane_id.is_some()
            && self.adc.is_some()
            && (self.no_load || (self.x.is_some() && self.y.is_some()))
    }

    /// Position to report, honouring the no-load sentinel.
    pub fn position(&self) -> Option<(i32, i32)> {
        if self.no_load {
            let s = crane_traits::NO_LOAD_POSITION;
            return Some((s, s));
        }
        Some((self.x?, self.y?))
    }
}

fn clean(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_ascii_control()).collect()
}

fn number<T: std::str::FromStr>(tag: char, payload: &str) -> Result<T, LineError> {
    payload.parse::<T>().map_err(|_| LineError::MalformedField {
        tag,
        value: payload.to_string(),
    })
}

/// Decode a single token. `None` for tokens that are empty once cleaned.
pub fn parse_token(raw: &str) -> Option<Result<Token, LineError>> {
    let tok = clean(raw);
    let mut chars = tok.chars();
    let tag = chars.next()?;
    let payload = chars.as_str();
    let parsed = match tag {
        'i' => number(tag, payload).map(Token::Id),
        'm' => number(tag, payload).map(Token::Mass),
        'x' => number(tag, payload).map(Token::PosX),
        'y' => number(tag, payload).map(Token::PosY),
        'k' => Ok(Token::NoLoad),
        other => Ok(Token::Unknown(other)),
    };
    Some(parsed)
}

/// Split a line into tokens, stopping at the first malformed one.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LineError> {
    line.split(' ')
        .filter(|t| !t.is_empty())
        .filter_map(parse_token)
        .collect()
}

/// Parse a line into fields and check it is usable.
///
/// Heartbeats are accepted without an ADC reading; the caller decides whether
/// an earlier reading can stand in for it.
pub fn parse(line: &str) -> Result<ParsedFields, LineError> {
    let tokens = tokenize(line)?;
    let mut fields = ParsedFields {
        token_count: tokens.len(),
        ..ParsedFields::default()
    };
    for tok in tokens {
        match tok {
            Token::Id(v) => fields.crane_id = Some(v),
            Token::Mass(v) => fields.adc = Some(v),
            Token::PosX(v) => fields.x = Some(v),
            Token::PosY(v) => fields.y = Some(v),
            Token::NoLoad => fields.no_load = true,
            Token::Unknown(_) => {}
        }
    }

    if fields.token_count == 0 {
        return Err(LineError::IncompleteFrame("empty line"));
    }
    if fields.token_count < MIN_FULL_TOKENS && !fields.no_load {
        return Err(LineError::IncompleteFrame("short frame without no-load marker"));
    }
    if fields.crane_id.is_none() {
        return Err(LineError::IncompleteFrame("missing crane id"));
    }
    if fields.is_heartbeat() || fields.is_complete() {
        return Ok(fields);
    }
    if fields.adc.is_none() {
        Err(LineError::IncompleteFrame("missing ADC reading"))
    } else {
        Err(LineError::IncompleteFrame("missing position"))
    }
}
