use forecast::Series;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt::init();

    let file = std::env::args().nth(1).expect("Missing filename");
    tracing::info!("opening {file}");
    let series = Series::load(&file)?;

    print!("{}", series.overview()?);
    println!();
    print!("{}", series.daily_summary()?);

    Ok(())
}
