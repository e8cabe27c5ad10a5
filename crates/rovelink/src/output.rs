use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rovelink_frame::Message;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Printable view of a decoded message.
#[derive(Debug, Serialize)]
pub struct MessageOutput {
    pub kind: &'static str,
    pub id: u8,
    pub size: usize,
    pub fields: serde_json::Value,
    pub timestamp: String,
}

impl MessageOutput {
    pub fn from_message(message: &Message) -> Self {
        Self {
            kind: message.kind().name(),
            id: message.kind().id(),
            size: message.wire_size(),
            fields: message_fields(message),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn message_fields(message: &Message) -> serde_json::Value {
    use serde_json::json;

    match message {
        Message::MotorState(cmd) => json!({
            "motor": cmd.motor.to_string(),
            "state": cmd.state.to_string(),
        }),
        Message::Telemetry(t) => json!({
            "motor1": t.motor1.to_string(),
            "motor2": t.motor2.to_string(),
            "battery": t.battery,
            "distance": t.distance,
            "camera_fps": t.camera_fps,
        }),
        Message::CameraControl { on } => json!({ "on": on }),
        Message::CameraChunk(data) => json!({ "bytes": data.len() }),
        Message::MotorControl(ctl) => json!({
            "motor1": ctl.motor1.to_string(),
            "motor2": ctl.motor2.to_string(),
        }),
        Message::MoveControl(cmd) => {
            let (motor, state) = cmd.actuation();
            json!({
                "cmd": *cmd as u8,
                "motor": motor.to_string(),
                "state": state.to_string(),
            })
        }
        Message::BatteryLevel(level) => json!({ "level": level }),
        Message::DistanceReading(cm) => json!({ "forward": cm }),
    }
}

fn fields_inline(fields: &serde_json::Value) -> String {
    match fields.as_object() {
        Some(map) => map
            .iter()
            .map(|(key, value)| match value.as_str() {
                Some(text) => format!("{key}={text}"),
                None => format!("{key}={value}"),
            })
            .collect::<Vec<_>>()
            .join(" "),
        None => fields.to_string(),
    }
}

pub fn print_message(message: &Message, raw: &[u8], format: OutputFormat) {
    let out = MessageOutput::from_message(message);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "ID", "SIZE", "FIELDS"])
                .add_row(vec![
                    out.kind.to_string(),
                    out.id.to_string(),
                    out.size.to_string(),
                    fields_inline(&out.fields),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} (id={}) size={} {}",
                out.kind,
                out.id,
                out.size,
                fields_inline(&out.fields)
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

/// Print a flat key/value record.
pub fn print_record(record: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = record
                .iter()
                .map(|(key, value)| ((*key).to_string(), serde_json::Value::from(value.clone())))
                .collect();
            print_json(&map);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in record {
                table.add_row(vec![(*key).to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (key, value) in record {
                println!("{key}: {value}");
            }
        }
    }
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
