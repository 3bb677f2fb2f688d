//! Decomposition of concatenated derivative contract tokens.
//!
//! The futures & options master list encodes a whole contract in one token
//! with no separators. The grammar, all uppercase:
//!
//! ```text
//! token  := root year2 tail
//! tail   := "FUT"                        future (monthly expiry)
//!         | month3 strike right          monthly option
//!         | mcode day2 strike right      weekly option
//! root   := [A-Z] [A-Z0-9&-]*            underlying ticker
//! year2  := two digits                   20xx
//! month3 := JAN | FEB | ... | DEC
//! mcode  := 1-9 (Jan-Sep) | O | N | D    single-char month
//! day2   := two digits                   day of month
//! strike := digits, optional "." digits
//! right  := "CE" | "PE"
//! ```
//!
//! `BANKNIFTY24OCTFUT` is the October 2024 future; `NIFTY24NOV24000CE` the
//! monthly November call at 24000; `NIFTY24N2124800CE` the weekly call
//! expiring 2024-11-21 at 24800.
//!
//! The root may itself contain digits (`NIFTYNXT50`), so the root/tail split
//! is found by trying candidate roots shortest-first and accepting the first
//! whose remainder parses as a valid tail; the two year digits must sit
//! directly after the root, and the month/day constraints reject splits that
//! land inside the root. A token that matches no split fails explicitly
//! rather than yielding wrong fields.

use chrono::{Datelike, NaiveDate, Weekday};
use thiserror::Error;

use crate::models::instrument::OptionRight;

#[derive(Debug, Error)]
pub enum ContractParseError {
    #[error("contract token '{0}' is too short")]
    TooShort(String),

    #[error("contract token '{0}' does not match the futures/options grammar")]
    NoMatch(String),
}

/// A decomposed derivative contract token.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractToken {
    pub root: String,
    pub expiry: NaiveDate,
    /// Strike price; `None` for futures.
    pub strike: Option<f64>,
    /// Call/put; `None` for futures.
    pub right: Option<OptionRight>,
}

impl ContractToken {
    pub fn is_future(&self) -> bool {
        self.right.is_none()
    }
}

/// Parses one master-list token into its contract fields.
pub fn parse_contract_token(token: &str) -> Result<ContractToken, ContractParseError> {
    let normalized = token.trim().to_ascii_uppercase();
    if normalized.len() < 6 {
        return Err(ContractParseError::TooShort(token.to_string()));
    }

    if let Some(stem) = normalized.strip_suffix("FUT") {
        return parse_future(stem)
            .ok_or_else(|| ContractParseError::NoMatch(token.to_string()));
    }

    let (stem, right) = if let Some(stem) = normalized.strip_suffix("CE") {
        (stem, OptionRight::Call)
    } else if let Some(stem) = normalized.strip_suffix("PE") {
        (stem, OptionRight::Put)
    } else {
        return Err(ContractParseError::NoMatch(token.to_string()));
    };

    // Shortest candidate root first: the year digits must directly follow
    // the root, and the month/day constraints are tight enough that the
    // first successful split is the right one.
    for root_len in 1..stem.len() {
        let (root, rest) = stem.split_at(root_len);
        if !is_valid_root(root) {
            continue;
        }
        if let Some((expiry, strike)) = parse_option_tail(rest) {
            return Ok(ContractToken {
                root: root.to_string(),
                expiry,
                strike: Some(strike),
                right: Some(right),
            });
        }
    }
    Err(ContractParseError::NoMatch(token.to_string()))
}

/// Parses `root year2 month3`, the part of a futures token before `FUT`.
fn parse_future(stem: &str) -> Option<ContractToken> {
    if stem.len() < 6 {
        return None;
    }
    let (rest, mon) = stem.split_at(stem.len() - 3);
    let month = month3_to_num(mon)?;
    let (root, yy) = rest.split_at(rest.len().checked_sub(2)?);
    let year = parse_year(yy)?;
    if !is_valid_root(root) {
        return None;
    }
    Some(ContractToken {
        root: root.to_string(),
        expiry: last_thursday(year, month)?,
        strike: None,
        right: None,
    })
}

/// Parses `year2 (month3 | mcode day2) strike`, the part of an option token
/// between the root and the right.
fn parse_option_tail(rest: &str) -> Option<(NaiveDate, f64)> {
    if rest.len() < 6 {
        return None;
    }
    let (yy, tail) = rest.split_at(2);
    let year = parse_year(yy)?;

    // Monthly: three-letter month name, expiry on the last Thursday.
    if tail.len() >= 4 {
        if let Some(month) = month3_to_num(tail.get(..3)?) {
            let strike = parse_strike(&tail[3..])?;
            return Some((last_thursday(year, month)?, strike));
        }
    }

    // Weekly: single-char month code plus an explicit day.
    if tail.len() >= 4 {
        let mut chars = tail.chars();
        let month = match chars.next()? {
            c @ '1'..='9' => c.to_digit(10)?,
            'O' => 10,
            'N' => 11,
            'D' => 12,
            _ => return None,
        };
        let day: u32 = tail.get(1..3)?.parse().ok()?;
        let strike = parse_strike(tail.get(3..)?)?;
        let expiry = NaiveDate::from_ymd_opt(year, month, day)?;
        return Some((expiry, strike));
    }
    None
}

fn is_valid_root(root: &str) -> bool {
    let mut chars = root.chars();
    matches!(chars.next(), Some('A'..='Z'))
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '&' || c == '-')
}

fn parse_year(yy: &str) -> Option<i32> {
    if yy.len() == 2 && yy.bytes().all(|b| b.is_ascii_digit()) {
        yy.parse::<i32>().ok().map(|y| 2000 + y)
    } else {
        None
    }
}

fn parse_strike(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    s.parse().ok()
}

fn month3_to_num(mon: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];
    MONTHS.iter().position(|&m| m == mon).map(|i| i as u32 + 1)
}

/// Monthly contracts expire on the last Thursday of their month.
fn last_thursday(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }?;
    let mut day = first_of_next.pred_opt()?;
    while day.weekday() != Weekday::Thu {
        day = day.pred_opt()?;
    }
    Some(day)
}
