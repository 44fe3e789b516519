use anyhow::Context;
use clap::{arg, Command};

use timetabler::export::HtmlExporter;
use timetabler::import::JsonImporter;
use timetabler::scheduler::{ScheduleOptions, WeeklyScheduler};

const DEFAULT_OUTPUT_FOLDER: &str = "schedules";
const DEFAULT_DATA_FOLDER: &str = "data";

fn cli() -> Command {
    Command::new("timetabler")
        .about("Schedules university course sessions week by week via mixed-integer programming")
        .arg_required_else_help(true)
        .arg(arg!(<INPUT> "Problem description JSON file"))
        .arg(arg!([OUTPUT] "Output folder for generated timetables").default_value(DEFAULT_OUTPUT_FOLDER))
        .arg(arg!([DATA] "Data folder holding shared assets (style.css)").default_value(DEFAULT_DATA_FOLDER))
}

fn run() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let input = matches.get_one::<String>("INPUT").expect("required arg");
    let output = matches.get_one::<String>("OUTPUT").expect("defaulted arg");
    let data = matches.get_one::<String>("DATA").expect("defaulted arg");

    println!("Importing timetabling problem from '{input}'");
    println!("Exporting timetables to '{output}'");

    let importer = JsonImporter::new(input);
    let mut exporter = HtmlExporter::new(data, output);
    let options = ScheduleOptions::default().with_rooms([
        "Lab 3 og 4",
        "Lab 5 og 6",
        "IMADAs terminalrum",
        "Fysik øvelseslab",
    ]);

    let schedules = WeeklyScheduler::new(&importer, &mut exporter)
        .with_options(options)
        .run()
        .context("scheduling failed")?;

    println!("Scheduled {} week(s)", schedules.len());
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
