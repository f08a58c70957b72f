//! Loads a roster from a JSON file of employee records, prints it in both
//! traversal orders and writes it back out in ascending id order.
//!
//! ```text
//! cargo run --example roster -- employees.json [saved.json]
//! ```

use std::error::Error;
use std::fs;

use avl_roster::{Record, Roster};
use log::info;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

const SAMPLE: &str = r#"[
    {"ID": "1", "Name": "Nguyen Ba Ngoc Dung", "Date of Birth": "03/09/1990", "Place of Birth": "VT"},
    {"ID": "4", "Name": "Python Awesome", "Date of Birth": "02/07/1980", "Place of Birth": "USA"},
    {"ID": "6", "Name": "Johny Bravo", "Date of Birth": "05/01/2000", "Place of Birth": "UK"},
    {"ID": "9", "Name": "Aisha Nguyen", "Date of Birth": "09/11/2010", "Place of Birth": "HCM"},
    {"ID": "15", "Name": "Monkey D. Luffy", "Date of Birth": "03/09/1990", "Place of Birth": "VT"},
    {"ID": "20", "Name": "Roronoa Zoro", "Date of Birth": "02/07/1980", "Place of Birth": "USA"},
    {"ID": "170", "Name": "Gold D. Ace", "Date of Birth": "05/01/2000", "Place of Birth": "UK"}
]"#;

fn show(records: &[Record]) {
    println!(
        "{:^4} | {:^20} | {:^14} | {:<10}",
        "ID", "Name", "Date of Birth", "Place of Birth"
    );
    for record in records {
        println!(
            "{:<4} | {:<20} | {:^14} | {:^10}",
            record.id, record.name, record.date_of_birth, record.place_of_birth
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE.to_string(),
    };
    let records: Vec<Record> = serde_json::from_str(&input)?;
    let report = Roster::load(records);
    info!(
        "loaded {} employees, skipped {} duplicates",
        report.roster.len(),
        report.duplicates.len()
    );
    let mut roster = report.roster;

    println!("In-order:");
    show(&roster.records_inorder());
    println!("\nLevel-order:");
    show(&roster.records_level_order());

    println!("\nTree:");
    for links in roster.links_level_order() {
        let fmt_id = |id: Option<i64>| id.map_or_else(|| "None".to_string(), |id| id.to_string());
        let parent = links.parent.map_or_else(|| "Root".to_string(), |id| id.to_string());
        println!(
            "ID: {:<5} | Parent: {:<5} | Left: {:<5} | Right: {:<5}",
            links.id,
            parent,
            fmt_id(links.left),
            fmt_id(links.right)
        );
    }

    if let Some(first) = roster.root().map(|node| *node.key()) {
        let removed = roster.remove_record(first)?;
        info!("removed employee {} ({})", removed.id, removed.name);
    }

    let saved = serde_json::to_string_pretty(&roster.records_inorder())?;
    match args.next() {
        Some(path) => fs::write(path, saved)?,
        None => println!("\n{saved}"),
    }
    Ok(())
}
