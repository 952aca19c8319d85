//! # UL Bridge CLI
//!
//! Command-line utilities for inspecting UltraLight payloads and topics.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;
use ulbridge_core::UlValue;
use ulbridge_proto::{format_message, parse_message, topics, Command};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "parse" => {
            if args.len() < 4 {
                eprintln!("Usage: ulbridge parse <topic> <payload>");
                std::process::exit(1);
            }
            let message = parse_message(&args[2], &args[3]);
            let json =
                serde_json::to_string_pretty(&message).context("Failed to serialize message")?;
            println!("{json}");
        }
        "format" => {
            if args.len() < 4 {
                eprintln!("Usage: ulbridge format <entity> <command> [k=v ...|value]");
                std::process::exit(1);
            }
            let value = value_from_args(&args[4..])?;
            let payload = format_message(&args[2], &Command::from_wire(&args[3]), &value);
            println!("{payload}");
        }
        "topics" => {
            if args.len() < 3 {
                eprintln!("Usage: ulbridge topics <device> [sensor]");
                std::process::exit(1);
            }
            for (label, topic) in topics_for(&args[2], args.get(3).map(String::as_str))? {
                println!("{label:<10} {topic}");
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Build a command value from `k=v` pairs, or a single scalar.
fn value_from_args(args: &[String]) -> Result<UlValue> {
    if args.iter().all(|arg| !arg.contains('=')) {
        if args.len() > 1 {
            bail!("expected a single scalar value or k=v pairs");
        }
        return Ok(UlValue::from(args.first().map_or("", String::as_str)));
    }

    let mut map = BTreeMap::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .with_context(|| format!("expected k=v, got '{arg}'"))?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(UlValue::from(map))
}

fn topics_for(device: &str, sensor: Option<&str>) -> Result<Vec<(&'static str, String)>> {
    let mut out = vec![
        ("command", topics::device_command(device)),
        ("ack", topics::ack(&topics::device_command(device))),
    ];

    if let Some(sensor) = sensor {
        let sensor_id: u32 = sensor
            .parse()
            .with_context(|| format!("sensor id must be an integer, got '{sensor}'"))?;
        let command = topics::sensor_command(device, sensor_id);
        out.extend([
            ("ack", topics::ack(&command)),
            ("telemetry", topics::telemetry(device, sensor_id)),
        ]);
        out.insert(2, ("command", command));
    }

    Ok(out)
}

fn print_help() {
    println!(
        r"UL Bridge CLI

USAGE:
    ulbridge <COMMAND> [OPTIONS]

COMMANDS:
    parse <topic> <payload>                 Parse an inbound command and print it as JSON
    format <entity> <command> [k=v ...]     Format a command payload
    topics <device> [sensor]                Print command, ack and telemetry topics
    help                                    Show this help message

EXAMPLES:
    ulbridge parse /default/dev1/cmd 'dev1@setConfig|sensor_id=1|event_flags=8|time_sec=30'
    ulbridge format 2 setData 25
    ulbridge topics dev1 2
"
    );
}
