use forecast::{convert_f_to_c, find_max, find_min, parse_timestamp, DateError, Series};
use plotters::prelude::*;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt::init();

    let input = std::env::args().nth(1).expect("Missing filename");
    tracing::info!("opening {input}");
    let output = format!("{input}.svg");
    let series = Series::load(&input)?;
    if series.is_empty() {
        miette::bail!("{input} has no readings");
    }

    let days = series
        .readings
        .iter()
        .map(|reading| {
            let date = parse_timestamp(&reading.date)?.date();
            let date = chrono::NaiveDate::from_ymd_opt(
                date.year(),
                date.month() as u32,
                date.day() as u32,
            )
            .expect("time and chrono disagree on the calendar");
            Ok((date, convert_f_to_c(reading.min), convert_f_to_c(reading.max)))
        })
        .collect::<Result<Vec<_>, DateError>>()?;

    let first_date = days.iter().map(|day| day.0).min().unwrap();
    let last_date = days.iter().map(|day| day.0).max().unwrap();
    let lows: Vec<f64> = days.iter().map(|day| day.1).collect();
    let highs: Vec<f64> = days.iter().map(|day| day.2).collect();
    let low = find_min(&lows).unwrap().value;
    let high = find_max(&highs).unwrap().value;

    let root = SVGBackend::new(&output, (1920, 1080)).into_drawing_area();
    root.fill(&WHITE).unwrap();
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Temperature from {first_date} to {last_date}"),
            ("sans-serif", 60).into_font(),
        )
        .margin(5)
        .x_label_area_size(80)
        .y_label_area_size(80)
        .build_cartesian_2d(
            first_date..last_date.succ_opt().unwrap_or(last_date),
            (low - 1.0)..(high + 1.0),
        )
        .unwrap();

    chart.configure_mesh().draw().unwrap();

    chart
        .draw_series(LineSeries::new(
            days.iter().map(|(date, _, high)| (*date, *high)),
            RED,
        ))
        .unwrap()
        .label("Maximum temperature")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart
        .draw_series(LineSeries::new(
            days.iter().map(|(date, low, _)| (*date, *low)),
            BLUE,
        ))
        .unwrap()
        .label("Minimum temperature")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .unwrap();

    root.present().unwrap();
    println!("Wrote {output}");

    Ok(())
}
