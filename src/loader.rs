use std::{borrow::Cow, ops::Range, path::Path, str::FromStr};

use logos::Logos;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{parse_timestamp, DateError, Fahrenheit, Reading, Series, TemperatureError};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t]+")] // Ignore this regex pattern between tokens
enum Token {
    // `""` stands for a single quote, commas and newlines are kept as is
    #[regex(r#""([^"]|"")*""#)]
    Quoted,
    // Runs of bare words in one field form a single value, blanks included
    #[regex(r#"[^,"\r\n \t]+"#)]
    Bare,

    #[token(",")]
    Comma,
    #[regex(r"\r?\n")]
    Crlf,
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Missing header")]
    #[diagnostic(help("the first line should name the `date`, `min` and `max` columns"))]
    MissingHeader,
    #[error("Missing column `{0}`")]
    MissingColumn(&'static str),
    #[error("Unexpected token")]
    #[diagnostic(help("quote fields that contain commas, quotes or newlines"))]
    UnexpectedToken {
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
    #[error("Bad row: expecting {expected} fields, found {found}")]
    BadRow {
        #[source_code]
        src: String,
        #[label("this row")]
        span: SourceSpan,
        expected: usize,
        found: usize,
    },
    #[error("Bad date")]
    BadDate {
        #[source_code]
        src: String,
        #[label("this date")]
        span: SourceSpan,
        source: DateError,
    },
    #[error("Bad temperature")]
    BadTemperature {
        #[source_code]
        src: String,
        #[label("this temperature")]
        span: SourceSpan,
        source: TemperatureError,
    },
}

/// A field between two commas. An empty field still has a position so it can
/// be pointed at.
#[derive(Debug)]
struct Field {
    token: Option<Token>,
    span: Range<usize>,
}

impl Field {
    fn text<'a>(&self, s: &'a str) -> Cow<'a, str> {
        let raw = &s[self.span.clone()];
        match self.token {
            Some(Token::Quoted) => {
                let inner = raw[1..raw.len() - 1].trim();
                if inner.contains("\"\"") {
                    Cow::Owned(inner.replace("\"\"", "\""))
                } else {
                    Cow::Borrowed(inner)
                }
            }
            _ => Cow::Borrowed(raw),
        }
    }
}

#[derive(Debug)]
struct Row {
    fields: Vec<Field>,
    span: Range<usize>,
}

impl Row {
    fn start(at: usize) -> Self {
        Self {
            fields: vec![Field {
                token: None,
                span: at..at,
            }],
            span: at..at,
        }
    }

    fn is_blank(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].token.is_none()
    }
}

fn rows(s: &str) -> Result<Vec<Row>, LoadError> {
    let mut lexer = Token::lexer(s);
    let mut rows = Vec::new();
    let mut row = Row::start(0);

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        match token {
            Ok(Token::Crlf) => {
                let next = Row::start(span.end);
                let done = std::mem::replace(&mut row, next);
                if !done.is_blank() {
                    rows.push(done);
                }
            }
            Ok(Token::Comma) => {
                row.fields.push(Field {
                    token: None,
                    span: span.end..span.end,
                });
                row.span.end = span.end;
            }
            Ok(token) => {
                // `fields` always holds at least the field opened by the row or the last comma
                let Some(field) = row.fields.last_mut() else {
                    continue;
                };
                match (field.token, token) {
                    (None, _) => {
                        field.token = Some(token);
                        field.span = span.clone();
                    }
                    (Some(Token::Bare), Token::Bare) => field.span.end = span.end,
                    _ => {
                        return Err(LoadError::UnexpectedToken {
                            src: s.to_string(),
                            span: span.into(),
                        })
                    }
                }
                if row.span.is_empty() {
                    row.span.start = span.start;
                }
                row.span.end = span.end;
            }
            Err(()) => {
                return Err(LoadError::UnexpectedToken {
                    src: s.to_string(),
                    span: span.into(),
                })
            }
        }
    }
    if !row.is_blank() {
        rows.push(row);
    }

    Ok(rows)
}

/// Position of the `date`, `min` and `max` columns.
#[derive(Debug)]
struct Header {
    width: usize,
    date: usize,
    min: usize,
    max: usize,
}

impl Header {
    fn parse(s: &str, row: &Row) -> Result<Self, LoadError> {
        let names: Vec<String> = row
            .fields
            .iter()
            .map(|field| field.text(s).to_lowercase())
            .collect();
        let column = |name: &'static str| {
            names
                .iter()
                .position(|n| n == name)
                .ok_or(LoadError::MissingColumn(name))
        };

        Ok(Self {
            width: names.len(),
            date: column("date")?,
            min: column("min")?,
            max: column("max")?,
        })
    }
}

impl Reading {
    /// Also returns the parsed date so the caller can check the ordering.
    fn parse(s: &str, header: &Header, row: &Row) -> Result<(Self, OffsetDateTime), LoadError> {
        if row.fields.len() != header.width {
            return Err(LoadError::BadRow {
                src: s.to_string(),
                span: row.span.clone().into(),
                expected: header.width,
                found: row.fields.len(),
            });
        }

        let field = &row.fields[header.date];
        let text = field.text(s);
        let date = parse_timestamp(&text).map_err(|source| LoadError::BadDate {
            src: s.to_string(),
            span: field.span.clone().into(),
            source,
        })?;

        let temperature = |field: &Field| {
            field
                .text(s)
                .parse::<Fahrenheit>()
                .map_err(|source| LoadError::BadTemperature {
                    src: s.to_string(),
                    span: field.span.clone().into(),
                    source,
                })
        };

        let reading = Self {
            date: text.into_owned(),
            min: temperature(&row.fields[header.min])?,
            max: temperature(&row.fields[header.max])?,
        };
        Ok((reading, date))
    }
}

impl FromStr for Series {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows = rows(s)?;
        let mut rows = rows.iter();
        let header = Header::parse(s, rows.next().ok_or(LoadError::MissingHeader)?)?;

        let mut readings: Vec<Reading> = Vec::new();
        let mut previous: Option<OffsetDateTime> = None;
        for row in rows {
            let (reading, date) = Reading::parse(s, &header, row)?;
            if previous.is_some_and(|previous| previous >= date) {
                warn!(date = %reading.date, "dates are not ordered");
            }
            previous = Some(date);
            readings.push(reading);
        }
        debug!(readings = readings.len(), "loaded series");

        Ok(Self { readings })
    }
}

impl Series {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading series");
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "date,min,max
2021-07-02T07:00:00+08:00,49,67
2021-07-03T07:00:00+08:00,53,68
";

    #[test]
    fn parse_series() {
        let series = Series::from_str(CSV).unwrap();
        assert_eq!(
            series.readings,
            vec![
                Reading::new("2021-07-02T07:00:00+08:00", 49, 67),
                Reading::new("2021-07-03T07:00:00+08:00", 53, 68),
            ]
        );
    }

    #[test]
    fn columns_in_any_order() {
        let series = Series::from_str(
            "Max, station, Date, MIN\r\n68.5, home, 2021-07-02T07:00:00+0800, -3.5\r\n",
        )
        .unwrap();
        assert_eq!(
            series.readings,
            vec![Reading::new("2021-07-02T07:00:00+0800", -3.5, 68.5)]
        );
    }

    #[test]
    fn quoted_fields() {
        let series = Series::from_str(
            "\"date\",\"min\",\"max\"\n\"2021-07-02T07:00:00+08:00\",\"49\",\"67\"\n",
        )
        .unwrap();
        assert_eq!(
            series.readings,
            vec![Reading::new("2021-07-02T07:00:00+08:00", 49, 67)]
        );
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let input = "station,date,min,max
\"home, \"\"garden\"\"\",2021-07-02T07:00:00+08:00, \"49\" ,67
\"roof
north\",2021-07-03T07:00:00+08:00,53,68
";
        let series = Series::from_str(input).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.readings[0].min, Fahrenheit::new(49.0));
        assert_eq!(series.readings[1].date, "2021-07-03T07:00:00+08:00");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let series = Series::from_str(
            "\ndate,min,max\n\n2021-07-02T07:00:00Z,49,67\n  \n2021-07-03T07:00:00Z,53,68",
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.readings[1].max, Fahrenheit::new(68.0));
    }

    #[test]
    fn header_only() {
        let series = Series::from_str("date,min,max\n").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn missing_header() {
        assert!(matches!(
            Series::from_str(""),
            Err(LoadError::MissingHeader)
        ));
        assert!(matches!(
            Series::from_str("\n\n"),
            Err(LoadError::MissingHeader)
        ));
    }

    #[test]
    fn missing_column() {
        assert!(matches!(
            Series::from_str("date,low,max\n"),
            Err(LoadError::MissingColumn("min"))
        ));
    }

    #[test]
    fn bad_temperature() {
        let input = "date,min,max\n2021-07-02T07:00:00+08:00,cold,67\n";
        match Series::from_str(input) {
            Err(LoadError::BadTemperature { span, source, .. }) => {
                assert_eq!(span.offset(), input.find("cold").unwrap());
                assert_eq!(span.len(), 4);
                assert!(matches!(source, TemperatureError::NotANumber { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_temperature_points_at_the_whole_field() {
        for field in ["49 50", "49;67"] {
            let input = format!("date,min,max\n2021-07-02T07:00:00+08:00,{field},67\n");
            match Series::from_str(&input) {
                Err(LoadError::BadTemperature { span, .. }) => {
                    assert_eq!(span.offset(), input.find(field).unwrap());
                    assert_eq!(span.len(), field.len());
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn empty_temperature() {
        let input = "date,min,max\n2021-07-02T07:00:00+08:00,,67\n";
        assert!(matches!(
            Series::from_str(input),
            Err(LoadError::BadTemperature { .. })
        ));
    }

    #[test]
    fn bad_date() {
        let input = "date,min,max\n2021-13-02T07:00:00+08:00,49,67\n";
        match Series::from_str(input) {
            Err(LoadError::BadDate { span, .. }) => {
                assert_eq!(span.offset(), 13);
                assert_eq!(span.len(), 25);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            Series::from_str("date,min,max\nyesterday,49,67\n"),
            Err(LoadError::BadDate { .. })
        ));
    }

    #[test]
    fn date_without_time_is_a_bad_date() {
        match Series::from_str("date,min,max\n2021-07-02,49,67\n") {
            Err(LoadError::BadDate { span, .. }) => {
                assert_eq!(span.offset(), 13);
                assert_eq!(span.len(), 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_row() {
        let input = "date,min,max\n2021-07-02T07:00:00+08:00,49\n";
        assert!(matches!(
            Series::from_str(input),
            Err(LoadError::BadRow {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn unexpected_token() {
        // Text glued to a quoted field
        assert!(matches!(
            Series::from_str("date,min,max\n2021-07-02T07:00:00+08:00,\"49\"F,67\n"),
            Err(LoadError::UnexpectedToken { .. })
        ));
        // Quote never closed
        assert!(matches!(
            Series::from_str("date,min,max\n2021-07-02T07:00:00+08:00,\"49,67\n"),
            Err(LoadError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn out_of_order_dates_are_kept() {
        let series = Series::from_str(
            "date,min,max\n2021-07-03T07:00:00+08:00,53,68\n2021-07-02T07:00:00+08:00,49,67\n",
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.readings[0].date, "2021-07-03T07:00:00+08:00");
    }
}
