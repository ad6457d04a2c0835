use std::{fmt, num::ParseFloatError, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};

const DEGREE_SYMBOL: &str = "°C";

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Fahrenheit(f64);

impl Fahrenheit {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<Fahrenheit> for f64 {
    fn from(value: Fahrenheit) -> Self {
        value.0
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum TemperatureError {
    #[error("Bad temperature `{input}`: {source}")]
    NotANumber {
        input: String,
        source: ParseFloatError,
    },
    #[error("Bad temperature `{0}`: expecting a finite number")]
    NotFinite(String),
}

impl FromStr for Fahrenheit {
    type Err = TemperatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|source| TemperatureError::NotANumber {
                input: s.to_string(),
                source,
            })?;
        if !value.is_finite() {
            return Err(TemperatureError::NotFinite(s.to_string()));
        }
        Ok(Self(value))
    }
}

/// A temperature ready to be displayed. Never rounded by itself, see
/// [`convert_f_to_c`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Celsius(f64);

impl Celsius {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<Fahrenheit> for Celsius {
    fn from(value: Fahrenheit) -> Self {
        Self((value.0 - 32.0) * 5.0 / 9.0)
    }
}

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Integral values keep their decimal: `20.0°C`, not `20°C`.
        if self.0.is_finite() && self.0.fract() == 0.0 {
            write!(f, "{:.1}{DEGREE_SYMBOL}", self.0)
        } else {
            write!(f, "{}{DEGREE_SYMBOL}", self.0)
        }
    }
}

pub fn format_temperature(value: f64) -> String {
    Celsius::new(value).to_string()
}

/// Converts a Fahrenheit reading to Celsius, rounded to one decimal place.
///
/// The Celsius value is scaled by ten then rounded with ties to even. For
/// whole-degree readings this gives the same tenth as rounding the exact
/// value. Readings with decimals may land one tenth away when the scaling
/// itself rounds, e.g. `-198.31` gives `-128.0` rather than `-127.9`.
pub fn convert_f_to_c(value: impl Into<f64>) -> f64 {
    let celsius = Celsius::from(Fahrenheit::new(value.into())).value();
    (celsius * 10.0).round_ties_even() / 10.0
}

#[derive(Debug, Error, Diagnostic)]
pub enum DateError {
    #[error("Bad date `{input}`: {source}")]
    #[diagnostic(help("expecting a timestamp like `2021-07-02T07:00:00+07:00`"))]
    Parse {
        input: String,
        source: time::error::Parse,
    },
    #[error(transparent)]
    Format(#[from] time::error::Format),
}

/// Parses `YYYY-MM-DDTHH:MM:SS` followed by an offset written `±HH:MM`,
/// `±HHMM` or `Z`.
pub fn parse_timestamp(input: &str) -> Result<OffsetDateTime, DateError> {
    let extended = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    );
    let basic = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
    );
    let zulu = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

    let source = match OffsetDateTime::parse(input, extended) {
        Ok(date) => return Ok(date),
        Err(e) => e,
    };
    if let Ok(date) = OffsetDateTime::parse(input, basic) {
        return Ok(date);
    }
    if let Ok(date) = PrimitiveDateTime::parse(input, zulu) {
        return Ok(date.assume_utc());
    }

    Err(DateError::Parse {
        input: input.to_string(),
        source,
    })
}

/// Renders a timestamp as `Friday 02 July 2021`, using the calendar date of
/// the timestamp's own offset.
pub fn convert_date(iso: &str) -> Result<String, DateError> {
    let date = parse_timestamp(iso)?;
    Ok(date.format(format_description!(
        "[weekday] [day] [month repr:long] [year]"
    ))?)
}
