use crate::error::CliError;
use chromaseek::{
    Sample,
    Trace,
};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{
    debug,
    warn,
};

/// Reads every channel of a CSV trace file.
///
/// The first column is the position (minutes), every other column is a
/// channel. Samples are named after the file stem, suffixed by the channel
/// name when the file holds more than one channel.
pub fn read_trace_file(path: &Path) -> Result<Vec<Sample>, CliError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CliError::DataReading(format!("Invalid file name: {}", path.display())))?
        .to_string();
    let file = File::open(path)?;
    parse_traces(file, &stem).map_err(|e| match e {
        CliError::DataReading(msg) => {
            CliError::DataReading(format!("{} (file {})", msg, path.display()))
        }
        other => other,
    })
}

pub fn parse_traces<R: Read>(reader: R, stem: &str) -> Result<Vec<Sample>, CliError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let channels: Vec<String> = rdr.headers()?.iter().skip(1).map(String::from).collect();
    if channels.is_empty() {
        return Err(CliError::DataReading(
            "Expected a position column and at least one signal column".to_string(),
        ));
    }

    let mut pairs: Vec<Vec<(f64, f64)>> = vec![Vec::new(); channels.len()];
    let mut skipped = 0;
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let position = match parse_cell(record.get(0), line)? {
            Some(x) => x,
            None => {
                skipped += 1;
                continue;
            }
        };
        for (channel, values) in pairs.iter_mut().enumerate() {
            // Missing cells are gaps, not zeros
            if let Some(y) = parse_cell(record.get(channel + 1), line)? {
                values.push((position, y));
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} rows without a position in {}", skipped, stem);
    }

    let multichannel = channels.len() > 1;
    channels
        .into_iter()
        .zip(pairs)
        .map(|(channel, values)| -> Result<Sample, CliError> {
            let id = if multichannel {
                format!("{}_{}", stem, channel)
            } else {
                stem.to_string()
            };
            debug!("Read {} points for {}", values.len(), id);
            let trace = Trace::from_pairs(values)
                .map_err(|e| e.append_to_context(&format!(" (sample {})", id)))?;
            Ok(Sample::new(id, trace))
        })
        .collect()
}

fn parse_cell(cell: Option<&str>, line: usize) -> Result<Option<f64>, CliError> {
    match cell {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<f64>().map(Some).map_err(|_| {
            CliError::DataReading(format!(
                "Could not parse '{}' as a number on data row {}",
                value,
                line + 1
            ))
        }),
    }
}

/// Deserializes every row of a headed CSV file.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CliError> {
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        out.push(record?);
    }
    Ok(out)
}
