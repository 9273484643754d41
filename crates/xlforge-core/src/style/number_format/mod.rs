//! Number format types and the Excel-accurate display renderer.

mod format_code;

pub use format_code::FormatCodeParser;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Render `value` (a raw cell number, or a date/time's Excel serial) through
/// `format_code`, an Excel custom format string such as `"#,##0.00"` or
/// `"yyyy-mm-dd"`.
pub fn render(value: Decimal, format_code: &str) -> String {
    FormatCodeParser::parse(format_code).render(value)
}

/// Excel's 1900 date system epoch, anchored the same way
/// `xlforge_formula::functions::date` anchors it: 1899-12-30 absorbs the
/// fictional 1900-02-29 leap bug without a serial-60 special case.
pub(crate) fn serial_to_naive_datetime(serial: Decimal) -> NaiveDateTime {
    use chrono::{NaiveDate, NaiveTime};
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let days: i64 = serial.trunc().to_string().parse().unwrap_or(0);
    let date = epoch + chrono::Duration::days(days);
    let seconds: u32 = (serial.fract().max(Decimal::ZERO) * Decimal::from(86_400i32))
        .round()
        .to_string()
        .parse()
        .unwrap_or(0);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0).unwrap_or_default();
    NaiveDateTime::new(date, time)
}

/// Number format for cell display.
///
/// `Integer`/`Decimal`/`Currency`/`Percent`/`Date` are semantic shorthands
/// that map onto a built-in `styles.xml` format id; `BuiltIn` covers an id
/// chosen directly (e.g. by the codec while reading an existing workbook),
/// and `Custom` carries a literal format code for anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,
    /// `0`
    Integer,
    /// `0.00`
    Decimal,
    /// `#,##0.00;(#,##0.00)` (id 39 — accounting decimal)
    Currency,
    /// `0.00%`
    Percent,
    /// `mm-dd-yy`
    Date,
    /// Built-in format by ID
    BuiltIn(u32),
    /// Custom format string
    Custom(String),
}

impl NumberFormat {
    pub fn is_general(&self) -> bool {
        matches!(self, NumberFormat::General)
    }
}

impl NumberFormat {
    /// General format
    pub const GENERAL: Self = NumberFormat::General;

    // Built-in format IDs
    /// 0 - General
    pub const ID_GENERAL: u32 = 0;
    /// 1 - 0
    pub const ID_NUMBER_INT: u32 = 1;
    /// 2 - 0.00
    pub const ID_NUMBER_DEC2: u32 = 2;
    /// 3 - #,##0
    pub const ID_NUMBER_SEP: u32 = 3;
    /// 4 - #,##0.00
    pub const ID_NUMBER_SEP_DEC2: u32 = 4;
    /// 9 - 0%
    pub const ID_PERCENT_INT: u32 = 9;
    /// 10 - 0.00%
    pub const ID_PERCENT_DEC2: u32 = 10;
    /// 11 - 0.00E+00
    pub const ID_SCIENTIFIC: u32 = 11;
    /// 12 - # ?/?
    pub const ID_FRACTION: u32 = 12;
    /// 13 - # ??/??
    pub const ID_FRACTION2: u32 = 13;
    /// 14 - mm-dd-yy
    pub const ID_DATE_SHORT: u32 = 14;
    /// 15 - d-mmm-yy
    pub const ID_DATE_MEDIUM: u32 = 15;
    /// 16 - d-mmm
    pub const ID_DATE_DAY_MONTH: u32 = 16;
    /// 17 - mmm-yy
    pub const ID_DATE_MONTH_YEAR: u32 = 17;
    /// 18 - h:mm AM/PM
    pub const ID_TIME_AMPM: u32 = 18;
    /// 19 - h:mm:ss AM/PM
    pub const ID_TIME_AMPM_SEC: u32 = 19;
    /// 20 - h:mm
    pub const ID_TIME_24H: u32 = 20;
    /// 21 - h:mm:ss
    pub const ID_TIME_24H_SEC: u32 = 21;
    /// 22 - m/d/yy h:mm
    pub const ID_DATETIME: u32 = 22;
    /// 37 - #,##0 ;(#,##0)
    pub const ID_ACCOUNTING_INT: u32 = 37;
    /// 38 - #,##0 ;[Red](#,##0)
    pub const ID_ACCOUNTING_INT_RED: u32 = 38;
    /// 39 - #,##0.00;(#,##0.00)
    pub const ID_ACCOUNTING_DEC2: u32 = 39;
    /// 40 - #,##0.00;[Red](#,##0.00)
    pub const ID_ACCOUNTING_DEC2_RED: u32 = 40;
    /// 49 - @
    pub const ID_TEXT: u32 = 49;

    /// Create a number format from a format string
    pub fn from_string<S: Into<String>>(format: S) -> Self {
        NumberFormat::Custom(format.into())
    }

    /// Create a built-in format by ID
    pub fn from_id(id: u32) -> Self {
        NumberFormat::BuiltIn(id)
    }

    /// Integer format (0)
    pub fn integer() -> Self {
        NumberFormat::BuiltIn(Self::ID_NUMBER_INT)
    }

    /// Decimal format (0.00)
    pub fn decimal() -> Self {
        NumberFormat::BuiltIn(Self::ID_NUMBER_DEC2)
    }

    /// Number with thousands separator (#,##0)
    pub fn thousands() -> Self {
        NumberFormat::BuiltIn(Self::ID_NUMBER_SEP)
    }

    /// Number with thousands separator and decimals (#,##0.00)
    pub fn thousands_decimal() -> Self {
        NumberFormat::BuiltIn(Self::ID_NUMBER_SEP_DEC2)
    }

    /// Percentage (0%)
    pub fn percent() -> Self {
        NumberFormat::BuiltIn(Self::ID_PERCENT_INT)
    }

    /// Percentage with decimals (0.00%)
    pub fn percent_decimal() -> Self {
        NumberFormat::BuiltIn(Self::ID_PERCENT_DEC2)
    }

    /// Scientific notation (0.00E+00)
    pub fn scientific() -> Self {
        NumberFormat::BuiltIn(Self::ID_SCIENTIFIC)
    }

    /// Short date (mm-dd-yy)
    pub fn date_short() -> Self {
        NumberFormat::BuiltIn(Self::ID_DATE_SHORT)
    }

    /// Time with AM/PM (h:mm AM/PM)
    pub fn time_ampm() -> Self {
        NumberFormat::BuiltIn(Self::ID_TIME_AMPM)
    }

    /// Date and time (m/d/yy h:mm)
    pub fn datetime() -> Self {
        NumberFormat::BuiltIn(Self::ID_DATETIME)
    }

    /// Text format (@)
    pub fn text() -> Self {
        NumberFormat::BuiltIn(Self::ID_TEXT)
    }

    /// Get the format string
    pub fn format_string(&self) -> &str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::Integer => Self::builtin_format_string(Self::ID_NUMBER_INT),
            NumberFormat::Decimal => Self::builtin_format_string(Self::ID_NUMBER_DEC2),
            NumberFormat::Currency => Self::builtin_format_string(Self::ID_ACCOUNTING_DEC2),
            NumberFormat::Percent => Self::builtin_format_string(Self::ID_PERCENT_DEC2),
            NumberFormat::Date => Self::builtin_format_string(Self::ID_DATE_SHORT),
            NumberFormat::BuiltIn(id) => Self::builtin_format_string(*id),
            NumberFormat::Custom(s) => s,
        }
    }

    /// Get built-in format string by ID
    fn builtin_format_string(id: u32) -> &'static str {
        match id {
            0 => "General",
            1 => "0",
            2 => "0.00",
            3 => "#,##0",
            4 => "#,##0.00",
            9 => "0%",
            10 => "0.00%",
            11 => "0.00E+00",
            12 => "# ?/?",
            13 => "# ??/??",
            14 => "mm-dd-yy",
            15 => "d-mmm-yy",
            16 => "d-mmm",
            17 => "mmm-yy",
            18 => "h:mm AM/PM",
            19 => "h:mm:ss AM/PM",
            20 => "h:mm",
            21 => "h:mm:ss",
            22 => "m/d/yy h:mm",
            37 => "#,##0 ;(#,##0)",
            38 => "#,##0 ;[Red](#,##0)",
            39 => "#,##0.00;(#,##0.00)",
            40 => "#,##0.00;[Red](#,##0.00)",
            49 => "@",
            _ => "General",
        }
    }

    /// Check if this is a date/time format
    pub fn is_date_format(&self) -> bool {
        match self {
            NumberFormat::Date => true,
            NumberFormat::BuiltIn(id) => matches!(id, 14..=22),
            NumberFormat::Custom(s) => {
                // Simple heuristic: contains date/time placeholders but not literal text
                let lower = s.to_lowercase();
                (lower.contains('y')
                    || lower.contains('m')
                    || lower.contains('d')
                    || lower.contains('h')
                    || lower.contains('s'))
                    && !lower.contains('"')
            }
            NumberFormat::General
            | NumberFormat::Integer
            | NumberFormat::Decimal
            | NumberFormat::Currency
            | NumberFormat::Percent => false,
        }
    }
}
