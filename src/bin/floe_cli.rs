use clap::Parser;
use std::{error::Error, io};

use floe::{Command, Session, prompt, session::SessionError};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server host
    host: String,
    /// Server port
    port: u16,
    #[arg(long, default_value = "root")]
    username: String,
    #[arg(long, default_value = "root")]
    password: String,
    /// Time zone to push at handshake; the server's default is adopted when unset
    #[arg(long)]
    time_zone: Option<String>,
    /// Use the compact wire encoding
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let mut session = Session::new(cli.host, cli.port).with_credentials(cli.username, cli.password);
    if let Some(time_zone) = cli.time_zone {
        session = session.with_time_zone(time_zone);
    }

    session.open(cli.compact)?;
    println!(
        "session {} open (statement {})",
        session.session_id(),
        session.statement_id()
    );

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    loop {
        match prompt(&mut stdin, &mut stdout) {
            Ok(Command::Exit) => break,
            Ok(command) => match run(&mut session, command) {
                Ok(code) => println!("{code}"),
                Err(e) => eprintln!("error: {e}"),
            },
            Err(e) => eprintln!("error: {e}"),
        }
    }

    session.close();
    Ok(())
}

fn run(session: &mut Session, command: Command) -> Result<i32, SessionError> {
    match command {
        Command::Exit => Ok(0),
        Command::SetStorageGroup(group) => session.set_storage_group(&group),
        Command::DeleteStorageGroups(groups) => session.delete_storage_groups(groups),
        Command::CreateTimeseries {
            path,
            data_type,
            encoding,
            compressor,
        } => session.create_time_series(&path, data_type, encoding, compressor),
        Command::DeleteTimeseries(paths) => session.delete_time_series(paths),
        Command::DeleteData {
            paths,
            start_time,
            end_time,
        } => session.delete_data(paths, start_time, end_time),
        Command::GetTimeZone => {
            println!("{}", session.get_time_zone()?);
            Ok(0)
        }
        Command::SetTimeZone(zone) => session.set_time_zone(&zone),
        Command::Insert {
            device_id,
            timestamp,
            measurements,
            values,
        } => session.insert_record(&device_id, measurements, values, timestamp),
    }
}
