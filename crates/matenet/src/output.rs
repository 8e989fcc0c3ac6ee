use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use matenet_frame::port_name;
use matenet_protocol::{DeviceType, Revision};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

#[derive(Serialize)]
pub struct QueryOutput {
    pub port: u8,
    pub register: u16,
    pub parameter: u16,
    pub value: u16,
}

#[derive(Serialize)]
pub struct ControlOutput {
    pub port: u8,
    pub register: u16,
    pub value: u16,
    pub acknowledged: bool,
}

#[derive(Serialize)]
pub struct ScanOutput {
    pub port: u8,
    pub port_name: &'static str,
    pub device: DeviceType,
    pub code: u16,
    pub name: &'static str,
}

impl ScanOutput {
    pub fn new(port: u8, device: DeviceType) -> Self {
        Self {
            port,
            port_name: port_name(port),
            device,
            code: device.code(),
            name: device.name(),
        }
    }
}

#[derive(Serialize)]
pub struct RevisionOutput {
    pub port: u8,
    pub revision: String,
    #[serde(flatten)]
    pub fields: Revision,
}

impl RevisionOutput {
    pub fn new(port: u8, fields: Revision) -> Self {
        Self {
            port,
            revision: fields.to_string(),
            fields,
        }
    }
}

/// One request served by the device emulator.
#[derive(Serialize)]
pub struct ServedOutput {
    pub port: u8,
    pub register: u16,
    pub parameter: u16,
    /// `None` when the register is unknown and the request went unanswered.
    pub response: Option<u16>,
}

pub fn print_query(out: &QueryOutput, format: OutputFormat) {
    emit(
        out,
        format,
        &["PORT", "REGISTER", "PARAMETER", "VALUE", "SIGNED"],
        vec![
            out.port.to_string(),
            hex16(out.register),
            hex16(out.parameter),
            hex16(out.value),
            (out.value as i16).to_string(),
        ],
    );
}

pub fn print_control(out: &ControlOutput, format: OutputFormat) {
    emit(
        out,
        format,
        &["PORT", "REGISTER", "VALUE", "ACK"],
        vec![
            out.port.to_string(),
            hex16(out.register),
            hex16(out.value),
            out.acknowledged.to_string(),
        ],
    );
}

pub fn print_scan(out: &ScanOutput, format: OutputFormat) {
    emit(
        out,
        format,
        &["PORT", "DEVICE", "CODE"],
        vec![
            format!("{} ({})", out.port, out.port_name),
            out.name.to_string(),
            out.code.to_string(),
        ],
    );
}

pub fn print_revision(out: &RevisionOutput, format: OutputFormat) {
    emit(
        out,
        format,
        &["PORT", "REVISION"],
        vec![out.port.to_string(), out.revision.clone()],
    );
}

pub fn print_served(out: &ServedOutput, format: OutputFormat) {
    let response = out
        .response
        .map(hex16)
        .unwrap_or_else(|| "-".to_string());
    emit(
        out,
        format,
        &["PORT", "REGISTER", "PARAMETER", "RESPONSE"],
        vec![
            out.port.to_string(),
            hex16(out.register),
            hex16(out.parameter),
            response,
        ],
    );
}

/// Render one record. Column headers and `row` line up for table and
/// pretty output; json serializes `value` as is.
fn emit<T: Serialize>(value: &T, format: OutputFormat, headers: &[&str], row: Vec<String>) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(headers.to_vec())
                .add_row(row);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", pretty_line(headers, &row)),
    }
}

fn pretty_line(headers: &[&str], row: &[String]) -> String {
    headers
        .iter()
        .zip(row)
        .map(|(header, cell)| format!("{}={cell}", header.to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn hex16(value: u16) -> String {
    format!("{value:#06x}")
}
