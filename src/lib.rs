use miette::Diagnostic;
use thiserror::Error;

mod convert;
mod loader;

pub use convert::{
    convert_date, convert_f_to_c, format_temperature, parse_timestamp, Celsius, DateError,
    Fahrenheit, TemperatureError,
};
pub use loader::LoadError;

/// One day of weather data.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// ISO-8601 timestamp with a UTC offset, kept as it was read.
    pub date: String,
    pub min: Fahrenheit,
    pub max: Fahrenheit,
}

impl Reading {
    pub fn new(date: impl Into<String>, min: impl Into<f64>, max: impl Into<f64>) -> Self {
        Self {
            date: date.into(),
            min: Fahrenheit::new(min.into()),
            max: Fahrenheit::new(max.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    // Readings are kept in report order, dates may repeat
    pub readings: Vec<Reading>,
}

impl Series {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn daily_summary(&self) -> Result<String, DateError> {
        generate_daily_summary(&self.readings)
    }

    pub fn overview(&self) -> Result<String, SummaryError> {
        generate_summary(&self.readings)
    }
}

impl From<Vec<Reading>> for Series {
    fn from(readings: Vec<Reading>) -> Self {
        Self::new(readings)
    }
}

/// An extreme value and the index it was found at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub value: f64,
    pub position: usize,
}

fn find_extremum<T: Copy + Into<f64>>(
    values: &[T],
    keep: fn(current: f64, candidate: f64) -> bool,
) -> Option<Extremum> {
    values
        .iter()
        .map(|value| (*value).into())
        .enumerate()
        .fold(None, |best, (position, value)| match best {
            Some(current) if keep(current.value, value) => best,
            _ => Some(Extremum { value, position }),
        })
}

/// Smallest value of `values`. When it appears several times the **last**
/// occurrence is reported.
pub fn find_min<T: Copy + Into<f64>>(values: &[T]) -> Option<Extremum> {
    find_extremum(values, |current, candidate| current < candidate)
}

/// Largest value of `values`. When it appears several times the **last**
/// occurrence is reported.
pub fn find_max<T: Copy + Into<f64>>(values: &[T]) -> Option<Extremum> {
    find_extremum(values, |current, candidate| current > candidate)
}

#[derive(Debug, Error, Diagnostic)]
pub enum SummaryError {
    #[error("Cannot summarise an empty series")]
    EmptyInput,
    #[error(transparent)]
    #[diagnostic(transparent)]
    Date(#[from] DateError),
}

pub fn calculate_mean<T: Copy + Into<f64>>(values: &[T]) -> Result<f64, SummaryError> {
    if values.is_empty() {
        return Err(SummaryError::EmptyInput);
    }
    let sum: f64 = values.iter().map(|value| (*value).into()).sum();
    Ok(sum / values.len() as f64)
}

/// One block per reading:
///
/// ```text
/// ---- Friday 02 July 2021 ----
///   Minimum Temperature: 9.4°C
///   Maximum Temperature: 19.4°C
///
/// ```
pub fn generate_daily_summary(readings: &[Reading]) -> Result<String, DateError> {
    let mut summary = String::new();

    for reading in readings {
        let date = convert_date(&reading.date)?;
        let min = format_temperature(convert_f_to_c(reading.min));
        let max = format_temperature(convert_f_to_c(reading.max));

        summary.push_str(&format!("---- {date} ----\n"));
        summary.push_str(&format!("  Minimum Temperature: {min}\n"));
        summary.push_str(&format!("  Maximum Temperature: {max}\n\n"));
    }

    Ok(summary)
}

/// Overview of the whole series. The lowest temperature is taken from the
/// minimums and the highest from the maximums, averages are computed in
/// Fahrenheit then converted.
pub fn generate_summary(readings: &[Reading]) -> Result<String, SummaryError> {
    if readings.is_empty() {
        return Err(SummaryError::EmptyInput);
    }

    let mins: Vec<Fahrenheit> = readings.iter().map(|reading| reading.min).collect();
    let maxs: Vec<Fahrenheit> = readings.iter().map(|reading| reading.max).collect();

    let lowest = find_min(&mins).ok_or(SummaryError::EmptyInput)?;
    let highest = find_max(&maxs).ok_or(SummaryError::EmptyInput)?;
    let lowest_date = convert_date(&readings[lowest.position].date)?;
    let highest_date = convert_date(&readings[highest.position].date)?;

    let average_low = format_temperature(convert_f_to_c(calculate_mean(&mins)?));
    let average_high = format_temperature(convert_f_to_c(calculate_mean(&maxs)?));
    let lowest = format_temperature(convert_f_to_c(lowest.value));
    let highest = format_temperature(convert_f_to_c(highest.value));

    let mut summary = format!("{} Day Overview\n", readings.len());
    summary.push_str(&format!(
        "  The lowest temperature will be {lowest}, and will occur on {lowest_date}.\n"
    ));
    summary.push_str(&format!(
        "  The highest temperature will be {highest}, and will occur on {highest_date}.\n"
    ));
    summary.push_str(&format!("  The average low this week is {average_low}.\n"));
    summary.push_str(&format!("  The average high this week is {average_high}.\n"));

    Ok(summary)
}
