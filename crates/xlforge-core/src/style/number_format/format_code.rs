//! Parses Excel custom number-format codes and renders a number through
//! them.
//!
//! A format code has up to four `;`-separated sections
//! (`positive ; negative ; zero ; text`); a code with fewer sections reuses
//! the last one for the missing cases (one section applies to everything,
//! two sections split positive/zero from negative, three add a dedicated
//! zero section). Each section is a token stream: digit placeholders
//! (`0`/`#`/`?`), a decimal point, thousands separators (`,`), a percent
//! literal (`%`), quoted text, an underscore/asterisk spacer pair, date/time
//! parts, `AM/PM`, and `[h]`/`[m]`/`[s]` elapsed-time brackets. A section may
//! carry a leading condition (`[Red]`, `[>100]`, `[$-409]`) that gates
//! whether it applies.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

#[derive(Debug, Clone)]
enum Token {
    Digit0,
    DigitHash,
    DigitQuestion,
    DecimalPoint,
    ThousandsSep,
    Percent,
    Literal(String),
    Spacer,
    Year2,
    Year4,
    MonthOrMinute,
    Day,
    Hour,
    Minute,
    Second,
    AmPm,
    ElapsedHours,
    ElapsedMinutes,
    ElapsedSeconds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Condition {
    None,
    Compare(Comparator, Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparator {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

#[derive(Debug, Clone)]
struct Section {
    condition: Condition,
    tokens: Vec<Token>,
    is_text_section: bool,
}

/// A parsed Excel custom format code, ready to render numbers through.
#[derive(Debug, Clone)]
pub struct FormatCodeParser {
    sections: Vec<Section>,
}

impl FormatCodeParser {
    /// Parse a format code string into its sections.
    pub fn parse(code: &str) -> Self {
        let raw_sections = split_top_level(code, ';');
        let mut sections: Vec<Section> = raw_sections.iter().map(|s| parse_section(s)).collect();
        if sections.is_empty() {
            sections.push(parse_section("General"));
        }
        Self { sections }
    }

    /// Select which section applies to `value` under Excel's section-count
    /// rules, then render `value` through it.
    pub fn render(&self, value: Decimal) -> String {
        let section = self.select_section(value);
        // A lone section has to represent both signs itself, the way Excel's
        // built-in `General`/`0.00` do; a dedicated negative section (the
        // second of a 2- or 3-section code) is responsible for its own sign
        // presentation (parens, a literal `-`, ...) instead.
        let auto_sign = self.sections.len() == 1;
        render_section(section, value, auto_sign)
    }

    fn select_section(&self, value: Decimal) -> &Section {
        match self.sections.len() {
            1 => &self.sections[0],
            2 => {
                if value.is_sign_negative() {
                    &self.sections[1]
                } else {
                    &self.sections[0]
                }
            }
            3 => {
                if value.is_zero() {
                    &self.sections[2]
                } else if value.is_sign_negative() {
                    &self.sections[1]
                } else {
                    &self.sections[0]
                }
            }
            _ => {
                for section in &self.sections {
                    if matches_condition(section.condition, value) {
                        return section;
                    }
                }
                if value.is_zero() && self.sections.len() > 2 {
                    &self.sections[2]
                } else if value.is_sign_negative() && self.sections.len() > 1 {
                    &self.sections[1]
                } else {
                    &self.sections[0]
                }
            }
        }
    }
}

fn matches_condition(condition: Condition, value: Decimal) -> bool {
    match condition {
        Condition::None => true,
        Condition::Compare(cmp, target) => match cmp {
            Comparator::Lt => value < target,
            Comparator::Lte => value <= target,
            Comparator::Gt => value > target,
            Comparator::Gte => value >= target,
            Comparator::Eq => value == target,
            Comparator::Neq => value != target,
        },
    }
}

/// Split on `sep` outside of `"..."` quotes and `[...]` brackets.
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut bracket_depth = 0u32;
    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '[' if !in_quotes => {
                bracket_depth += 1;
                current.push(c);
            }
            ']' if !in_quotes && bracket_depth > 0 => {
                bracket_depth -= 1;
                current.push(c);
            }
            c if c == sep && !in_quotes && bracket_depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn parse_section(raw: &str) -> Section {
    if raw.trim().eq_ignore_ascii_case("general") || raw.trim().is_empty() {
        return Section { condition: Condition::None, tokens: vec![Token::DigitHash], is_text_section: false };
    }

    let mut rest = raw;
    let mut condition = Condition::None;
    let mut is_text_section = false;

    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(end) = stripped.find(']') else { break };
        let inner = &stripped[..end];
        if let Some(parsed) = parse_condition_bracket(inner) {
            condition = parsed;
            rest = &stripped[end + 1..];
        } else if is_elapsed_bracket(inner) {
            break; // elapsed-time brackets are tokens, handled below
        } else {
            // color/locale bracket with no semantic effect on rendering
            rest = &stripped[end + 1..];
        }
    }

    let mut tokens = Vec::new();
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '@' => {
                is_text_section = true;
                i += 1;
            }
            '"' => {
                let mut lit = String::new();
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    lit.push(chars[i]);
                    i += 1;
                }
                i += 1; // closing quote
                tokens.push(Token::Literal(lit));
            }
            '\\' => {
                i += 1;
                if i < chars.len() {
                    tokens.push(Token::Literal(chars[i].to_string()));
                    i += 1;
                }
            }
            '_' => {
                i += 1;
                if i < chars.len() {
                    i += 1; // spacer width character, no visible output
                }
                tokens.push(Token::Spacer);
            }
            '*' => {
                i += 1;
                if i < chars.len() {
                    i += 1; // fill character, not rendered to a fixed width here
                }
            }
            '[' => {
                let Some(end) = chars[i..].iter().position(|&c| c == ']') else {
                    i += 1;
                    continue;
                };
                let inner: String = chars[i + 1..i + end].iter().collect();
                match inner.to_lowercase().as_str() {
                    "h" => tokens.push(Token::ElapsedHours),
                    "m" => tokens.push(Token::ElapsedMinutes),
                    "s" => tokens.push(Token::ElapsedSeconds),
                    _ => {}
                }
                i += end + 1;
            }
            '0' => {
                tokens.push(Token::Digit0);
                i += 1;
            }
            '#' => {
                tokens.push(Token::DigitHash);
                i += 1;
            }
            '?' => {
                tokens.push(Token::DigitQuestion);
                i += 1;
            }
            '.' => {
                tokens.push(Token::DecimalPoint);
                i += 1;
            }
            ',' => {
                tokens.push(Token::ThousandsSep);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            'y' | 'Y' => {
                let count = count_run(&chars, i, |c| c == 'y' || c == 'Y');
                tokens.push(if count >= 4 { Token::Year4 } else { Token::Year2 });
                i += count;
            }
            'm' | 'M' => {
                let count = count_run(&chars, i, |c| c == 'm' || c == 'M');
                tokens.push(Token::MonthOrMinute);
                i += count;
            }
            'd' | 'D' => {
                let count = count_run(&chars, i, |c| c == 'd' || c == 'D');
                tokens.push(Token::Day);
                i += count;
            }
            'h' | 'H' => {
                let count = count_run(&chars, i, |c| c == 'h' || c == 'H');
                tokens.push(Token::Hour);
                i += count;
            }
            's' | 'S' => {
                let count = count_run(&chars, i, |c| c == 's' || c == 'S');
                tokens.push(Token::Second);
                i += count;
            }
            'A' | 'a' => {
                if chars[i..].iter().collect::<String>().to_uppercase().starts_with("AM/PM") {
                    tokens.push(Token::AmPm);
                    i += 5;
                } else {
                    i += 1;
                }
            }
            ' ' => {
                tokens.push(Token::Literal(" ".into()));
                i += 1;
            }
            other => {
                tokens.push(Token::Literal(other.to_string()));
                i += 1;
            }
        }
    }

    disambiguate_minutes(&mut tokens);

    Section { condition, tokens, is_text_section }
}

fn count_run(chars: &[char], start: usize, matches: impl Fn(char) -> bool) -> usize {
    let mut n = 0;
    while start + n < chars.len() && matches(chars[start + n]) {
        n += 1;
    }
    n
}

fn is_elapsed_bracket(inner: &str) -> bool {
    matches!(inner.to_lowercase().as_str(), "h" | "m" | "s")
}

fn parse_condition_bracket(inner: &str) -> Option<Condition> {
    for (prefix, cmp) in [
        (">=", Comparator::Gte),
        ("<=", Comparator::Lte),
        ("<>", Comparator::Neq),
        (">", Comparator::Gt),
        ("<", Comparator::Lt),
        ("=", Comparator::Eq),
    ] {
        if let Some(rest) = inner.strip_prefix(prefix) {
            if let Ok(n) = rest.trim().parse::<Decimal>() {
                return Some(Condition::Compare(cmp, n));
            }
        }
    }
    None
}

/// `m` means minute when it immediately follows an `h` token or immediately
/// precedes an `s` token; otherwise it means month. Applied as a pass over
/// the already-tokenized stream since the rule needs neighboring context.
fn disambiguate_minutes(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        let is_month_or_minute = matches!(tokens[i], Token::MonthOrMinute);
        if !is_month_or_minute {
            continue;
        }
        let after_hour = i > 0 && matches!(tokens[i - 1], Token::Hour | Token::ElapsedHours);
        let before_second = tokens.get(i + 1).map(|t| matches!(t, Token::Second | Token::ElapsedSeconds)).unwrap_or(false);
        if after_hour || before_second {
            tokens[i] = Token::Minute;
        }
    }
}

fn render_section(section: &Section, value: Decimal, auto_sign: bool) -> String {
    if section.is_text_section {
        return value.normalize().to_string();
    }
    if is_date_tokens(&section.tokens) {
        return render_date(section, value);
    }
    render_numeric(section, value, auto_sign)
}

fn is_date_tokens(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| {
        matches!(
            t,
            Token::Year2
                | Token::Year4
                | Token::Minute
                | Token::MonthOrMinute
                | Token::Day
                | Token::Hour
                | Token::Second
                | Token::AmPm
                | Token::ElapsedHours
                | Token::ElapsedMinutes
                | Token::ElapsedSeconds
        )
    })
}

fn render_date(section: &Section, serial: Decimal) -> String {
    use chrono::{Datelike, Timelike};
    let dt = crate::style::number_format::serial_to_naive_datetime(serial);
    let total_seconds = serial
        .fract()
        .max(Decimal::ZERO)
        .checked_mul(Decimal::from(86_400i64))
        .unwrap_or(Decimal::ZERO);
    let elapsed_total_hours = (serial.to_f64().unwrap_or(0.0) * 24.0).floor() as i64;
    let elapsed_total_minutes = (serial.to_f64().unwrap_or(0.0) * 24.0 * 60.0).floor() as i64;
    let elapsed_total_seconds_i = total_seconds.to_i64().unwrap_or(0)
        + (serial.trunc().to_i64().unwrap_or(0)) * 86_400;

    let is_pm = dt.hour() >= 12;
    let hour12 = match dt.hour() % 12 {
        0 => 12,
        h => h,
    };

    let mut out = String::new();
    for token in &section.tokens {
        match token {
            Token::Year4 => out.push_str(&format!("{:04}", dt.year())),
            Token::Year2 => out.push_str(&format!("{:02}", dt.year().rem_euclid(100))),
            Token::MonthOrMinute => out.push_str(&format!("{:02}", dt.month())),
            Token::Minute => out.push_str(&format!("{:02}", dt.minute())),
            Token::Day => out.push_str(&format!("{:02}", dt.day())),
            Token::Hour => {
                let uses_ampm = section.tokens.iter().any(|t| matches!(t, Token::AmPm));
                if uses_ampm {
                    out.push_str(&format!("{hour12}"));
                } else {
                    out.push_str(&format!("{:02}", dt.hour()));
                }
            }
            Token::Second => out.push_str(&format!("{:02}", dt.second())),
            Token::AmPm => out.push_str(if is_pm { "PM" } else { "AM" }),
            Token::ElapsedHours => out.push_str(&elapsed_total_hours.to_string()),
            Token::ElapsedMinutes => out.push_str(&elapsed_total_minutes.to_string()),
            Token::ElapsedSeconds => out.push_str(&elapsed_total_seconds_i.to_string()),
            Token::Literal(s) => out.push_str(s),
            Token::Spacer => out.push(' '),
            _ => {}
        }
    }
    out
}

fn decimal_places(tokens: &[Token]) -> usize {
    let mut seen_point = false;
    let mut places = 0;
    for t in tokens {
        match t {
            Token::DecimalPoint => seen_point = true,
            Token::Digit0 | Token::DigitHash | Token::DigitQuestion if seen_point => places += 1,
            _ => {}
        }
    }
    places
}

fn uses_thousands_sep(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| matches!(t, Token::ThousandsSep))
}

fn min_integer_digits(tokens: &[Token]) -> usize {
    let mut seen_point = false;
    let mut min_digits = 0;
    for t in tokens {
        match t {
            Token::DecimalPoint => seen_point = true,
            Token::Digit0 if !seen_point => min_digits += 1,
            _ if seen_point => break,
            _ => {}
        }
    }
    min_digits
}

fn render_numeric(section: &Section, value: Decimal, auto_sign: bool) -> String {
    let is_percent = section.tokens.iter().any(|t| matches!(t, Token::Percent));
    let scaled = if is_percent { value * Decimal::from(100) } else { value };
    let magnitude = scaled.abs();

    let places = decimal_places(&section.tokens);
    let rounded = round_half_to_even(magnitude, places);
    let (int_part, frac_part) = split_integer_fraction(rounded, places);

    let min_int_digits = min_integer_digits(&section.tokens);
    let mut int_str = int_part.to_string();
    while int_str.len() < min_int_digits {
        int_str.insert(0, '0');
    }
    if uses_thousands_sep(&section.tokens) {
        int_str = insert_thousands_separators(&int_str);
    }

    let mut body = int_str;
    if places > 0 {
        body.push('.');
        body.push_str(&frac_part);
    }

    let mut out = String::new();
    if auto_sign && value.is_sign_negative() && section_emits_sign(&section.tokens) {
        out.push('-');
    }

    let mut digits_emitted = false;
    for token in &section.tokens {
        match token {
            Token::Digit0 | Token::DigitHash | Token::DigitQuestion | Token::DecimalPoint | Token::ThousandsSep => {
                if !digits_emitted {
                    out.push_str(&body);
                    digits_emitted = true;
                }
            }
            Token::Percent => out.push('%'),
            Token::Literal(s) => out.push_str(s),
            Token::Spacer => out.push(' '),
            _ => {}
        }
    }
    out
}

/// Excel colors negatives via a dedicated section or a literal `-`; a
/// section with neither still needs the sign so values aren't silently
/// rendered as positive.
fn section_emits_sign(tokens: &[Token]) -> bool {
    !tokens.iter().any(|t| matches!(t, Token::Literal(s) if s == "-"))
}

fn split_integer_fraction(rounded: Decimal, places: usize) -> (u128, String) {
    let scale = Decimal::from(10i64.pow(places as u32));
    let scaled_int = (rounded * scale).round();
    let scaled_str = scaled_int.trunc().to_string();
    let digits: String = scaled_str.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = if digits.is_empty() { "0".to_string() } else { digits };
    if places == 0 {
        return (digits.parse().unwrap_or(0), String::new());
    }
    let digits = if digits.len() <= places {
        format!("{:0>width$}", digits, width = places + 1)
    } else {
        digits
    };
    let split_at = digits.len() - places;
    let int_part: u128 = digits[..split_at].parse().unwrap_or(0);
    let frac_part = digits[split_at..].to_string();
    (int_part, frac_part)
}

/// Round half-to-even ("banker's rounding") to `places` decimal digits.
fn round_half_to_even(value: Decimal, places: usize) -> Decimal {
    value.round_dp_with_strategy(places as u32, rust_decimal::RoundingStrategy::MidpointNearestEven)
}

fn insert_thousands_separators(int_digits: &str) -> String {
    let bytes = int_digits.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 3);
    let first_group = bytes.len() % 3;
    let first_group = if first_group == 0 { 3 } else { first_group };
    out.extend_from_slice(&bytes[..first_group]);
    let mut i = first_group;
    while i < bytes.len() {
        out.push(b',');
        out.extend_from_slice(&bytes[i..i + 3]);
        i += 3;
    }
    String::from_utf8(out).unwrap_or_else(|_| int_digits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn thousands_separator_groups_from_the_right() {
        let p = FormatCodeParser::parse("#,##0.00");
        assert_eq!(p.render(d("1234567.5")), "1,234,567.50");
    }

    #[test]
    fn negative_section_drops_the_sign_literal() {
        let p = FormatCodeParser::parse("0.00;(0.00)");
        assert_eq!(p.render(d("-3.5")), "(3.50)");
        assert_eq!(p.render(d("3.5")), "3.50");
    }

    #[test]
    fn percent_scales_by_one_hundred() {
        let p = FormatCodeParser::parse("0.0%");
        assert_eq!(p.render(d("0.4567")), "45.7%");
    }

    #[test]
    fn rounds_half_to_even() {
        let p = FormatCodeParser::parse("0");
        assert_eq!(p.render(d("2.5")), "2");
        assert_eq!(p.render(d("3.5")), "4");
    }

    #[test]
    fn zero_section_is_used_for_zero_in_three_section_code() {
        let p = FormatCodeParser::parse("0.00;(0.00);\"-\"");
        assert_eq!(p.render(Decimal::ZERO), "-");
    }

    #[test]
    fn month_before_hour_is_a_month_not_a_minute() {
        let p = FormatCodeParser::parse("mm/dd/yyyy");
        // serial 0 is 1899-12-30
        assert_eq!(p.render(Decimal::ZERO), "12/30/1899");
    }

    #[test]
    fn month_between_hour_and_second_is_a_minute() {
        let p = FormatCodeParser::parse("h:mm:ss");
        // 1.5 days -> 36:00:00 elapsed, i.e. 1900-01-01 12:00:00
        assert_eq!(p.render(d("1.5")), "12:00:00");
    }

    #[test]
    fn minimum_integer_digits_are_zero_padded() {
        let p = FormatCodeParser::parse("0000");
        assert_eq!(p.render(d("42")), "0042");
    }
}
