//! CLI utilities for Floe.
//!
//! The utilities present in this module can be used to create an
//! interactive administration shell for a remote Floe server.
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::tablet::{Compressor, DataType, TsEncoding, Value};

/// List of possible errors that a command can throw.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),

    #[error("invalid '{command}' command, {reason}")]
    InvalidCommandArguments { command: String, reason: String },

    #[error("no command provided")]
    Empty,
}

/// Possible commands from a user.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Exit command `.exit`
    Exit,
    /// Register a storage group
    SetStorageGroup(String),
    /// Drop one or more storage groups
    DeleteStorageGroups(Vec<String>),
    /// Register a single time series
    CreateTimeseries {
        path: String,
        data_type: DataType,
        encoding: TsEncoding,
        compressor: Compressor,
    },
    /// Drop one or more time series
    DeleteTimeseries(Vec<String>),
    /// Delete a time range of points for a set of paths
    DeleteData {
        paths: Vec<String>,
        start_time: i64,
        end_time: i64,
    },
    /// Report the session time zone
    GetTimeZone,
    /// Push a time zone to the server
    SetTimeZone(String),
    /// Insert one row for one device
    Insert {
        device_id: String,
        timestamp: i64,
        measurements: Vec<String>,
        values: Vec<Value>,
    },
}

impl TryInto<Command> for &str {
    type Error = CommandError;

    fn try_into(self) -> Result<Command, Self::Error> {
        let parts = self.trim().split_whitespace().collect::<Vec<&str>>();

        match parts.as_slice() {
            [] => Err(CommandError::Empty),
            [".exit"] => Ok(Command::Exit),
            ["set_storage_group", group] => Ok(Command::SetStorageGroup(group.to_string())),
            ["delete_storage_group", groups @ ..] if !groups.is_empty() => Ok(
                Command::DeleteStorageGroups(groups.iter().map(|g| g.to_string()).collect()),
            ),
            ["create_timeseries", path, data_type, encoding, compressor] => {
                Ok(Command::CreateTimeseries {
                    path: path.to_string(),
                    data_type: parse_keyword(data_type, "create_timeseries")?,
                    encoding: parse_keyword(encoding, "create_timeseries")?,
                    compressor: parse_keyword(compressor, "create_timeseries")?,
                })
            }
            ["delete_timeseries", paths @ ..] if !paths.is_empty() => Ok(
                Command::DeleteTimeseries(paths.iter().map(|p| p.to_string()).collect()),
            ),
            ["delete_data", start, end, paths @ ..] if !paths.is_empty() => {
                Ok(Command::DeleteData {
                    paths: paths.iter().map(|p| p.to_string()).collect(),
                    start_time: parse_timestamp(start, "delete_data")?,
                    end_time: parse_timestamp(end, "delete_data")?,
                })
            }
            ["time_zone"] => Ok(Command::GetTimeZone),
            ["time_zone", zone] => Ok(Command::SetTimeZone(zone.to_string())),
            ["insert", device, timestamp, cells @ ..] if !cells.is_empty() => {
                let mut measurements = Vec::with_capacity(cells.len());
                let mut values = Vec::with_capacity(cells.len());
                for cell in cells {
                    let (measurement, value) = parse_cell(cell)?;
                    measurements.push(measurement);
                    values.push(value);
                }
                Ok(Command::Insert {
                    device_id: device.to_string(),
                    timestamp: parse_timestamp(timestamp, "insert")?,
                    measurements,
                    values,
                })
            }
            _ => Err(CommandError::UnrecognizedCommand(self.trim().to_string())),
        }
    }
}

fn parse_keyword<T: std::str::FromStr>(s: &str, command: &str) -> Result<T, CommandError>
where
    T::Err: std::fmt::Display,
{
    s.parse().map_err(|e: T::Err| CommandError::InvalidCommandArguments {
        command: command.to_string(),
        reason: e.to_string(),
    })
}

fn parse_timestamp(s: &str, command: &str) -> Result<i64, CommandError> {
    s.parse::<i64>()
        .map_err(|_| CommandError::InvalidCommandArguments {
            command: command.to_string(),
            reason: format!("'{s}' is not a valid timestamp"),
        })
}

/// Parse a `measurement:type=value` cell, e.g. `temperature:float=21.5`.
fn parse_cell(cell: &str) -> Result<(String, Value), CommandError> {
    let invalid = |reason: String| CommandError::InvalidCommandArguments {
        command: "insert".to_string(),
        reason,
    };

    let (measurement, rest) = cell
        .split_once(':')
        .ok_or_else(|| invalid(format!("cell '{cell}' is missing ':'. Example: s1:int32=5")))?;
    let (data_type, literal) = rest
        .split_once('=')
        .ok_or_else(|| invalid(format!("cell '{cell}' is missing '='. Example: s1:int32=5")))?;
    let data_type: DataType = parse_keyword(data_type, "insert")?;

    let value = match data_type {
        DataType::Boolean => literal
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid(format!("'{literal}' is not a boolean"))),
        DataType::Int32 => literal
            .parse::<i32>()
            .map(Value::Int32)
            .map_err(|_| invalid(format!("'{literal}' is not an int32"))),
        DataType::Int64 => literal
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|_| invalid(format!("'{literal}' is not an int64"))),
        DataType::Float => literal
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| invalid(format!("'{literal}' is not a float"))),
        DataType::Double => literal
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| invalid(format!("'{literal}' is not a double"))),
        DataType::Text => Ok(Value::Text(literal.to_string())),
    }?;

    Ok((measurement.to_string(), value))
}

/// Prompt user for a valid Floe command.
///
/// # Panics
/// If the reader or writer fails.
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> Result<Command, CommandError>
where
    R: BufRead,
    W: Write,
{
    let mut s = String::default();
    write!(&mut writer, "> ").expect("failed to write to writer.");
    writer.flush().expect("failed to flush writer.");

    reader
        .read_line(&mut s)
        .expect("failed to read from reader.");

    s.as_str().try_into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_string() {
        let inputs = vec![
            (".exit", Command::Exit),
            (
                "set_storage_group root.sg1",
                Command::SetStorageGroup("root.sg1".to_string()),
            ),
            (
                "delete_storage_group root.sg1 root.sg2",
                Command::DeleteStorageGroups(vec![
                    "root.sg1".to_string(),
                    "root.sg2".to_string(),
                ]),
            ),
            (
                "create_timeseries root.sg1.d1.s1 int64 rle snappy",
                Command::CreateTimeseries {
                    path: "root.sg1.d1.s1".to_string(),
                    data_type: DataType::Int64,
                    encoding: TsEncoding::Rle,
                    compressor: Compressor::Snappy,
                },
            ),
            (
                "delete_timeseries root.sg1.d1.s1",
                Command::DeleteTimeseries(vec!["root.sg1.d1.s1".to_string()]),
            ),
            (
                "delete_data 0 100 root.sg1.d1.s1",
                Command::DeleteData {
                    paths: vec!["root.sg1.d1.s1".to_string()],
                    start_time: 0,
                    end_time: 100,
                },
            ),
            ("time_zone", Command::GetTimeZone),
            (
                "time_zone UTC+08:00",
                Command::SetTimeZone("UTC+08:00".to_string()),
            ),
        ];

        for (cmd, expected) in inputs {
            let command: Command = cmd.try_into().unwrap();
            assert_eq!(command, expected);
        }
    }

    #[test]
    fn insert_command_parses_typed_cells() {
        let command: Command = "insert root.sg1.d1 100 s1:int32=5 s2:bool=true s3:text=ok"
            .try_into()
            .unwrap();

        assert_eq!(
            command,
            Command::Insert {
                device_id: "root.sg1.d1".to_string(),
                timestamp: 100,
                measurements: vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
                values: vec![
                    Value::Int32(5),
                    Value::Bool(true),
                    Value::Text("ok".to_string()),
                ],
            }
        );
    }

    #[test]
    fn malformed_cell_is_rejected() {
        let result: Result<Command, _> = "insert root.sg1.d1 100 s1=5".try_into();
        assert!(matches!(
            result,
            Err(CommandError::InvalidCommandArguments { .. })
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        let result: Result<Command, _> = "\n".try_into();
        assert_eq!(result, Err(CommandError::Empty));
    }

    #[test]
    fn unrecognized_command() {
        let result: Result<Command, _> = "drop everything".try_into();
        assert_eq!(
            result,
            Err(CommandError::UnrecognizedCommand(
                "drop everything".to_string()
            ))
        );
    }

    #[test]
    fn prompt_prints_correctly() {
        let input = b"time_zone\n";
        let mut output = Vec::new();

        prompt(&input[..], &mut output).unwrap();

        let output = String::from_utf8(output).expect("not valid UTF-8");
        assert_eq!("> ", output);
    }
}
