use std::io::{self, prelude::*, BufReader};

use anyhow::Error;
use interprocess::local_socket::{LocalSocketListener, LocalSocketStream};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::ChargingEvent;

/// Turn one line of the control protocol into an event.
///
/// Commands are `connected`, `disconnected`, `refresh`, `all-led on` and
/// `all-led off`, case-insensitive.
pub fn parse_command(line: &str) -> Option<ChargingEvent> {
    let words: Vec<String> = line
        .split_whitespace()
        .map(|word| word.to_ascii_lowercase())
        .collect();
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    match words.as_slice() {
        ["connected"] => Some(ChargingEvent::PowerConnected),
        ["disconnected"] => Some(ChargingEvent::PowerDisconnected),
        ["refresh"] => Some(ChargingEvent::Refresh),
        ["all-led", "on"] => Some(ChargingEvent::AllLed { claim: true }),
        ["all-led", "off"] => Some(ChargingEvent::AllLed { claim: false }),
        _ => None,
    }
}

fn handle_error(conn: io::Result<LocalSocketStream>) -> Option<LocalSocketStream> {
    match conn {
        Ok(val) => Some(val),
        Err(error) => {
            error!("Incoming control connection failed: {}", error);
            None
        }
    }
}

/// Read commands from every line of `reader` until it closes. Returns `false`
/// if the event queue is gone.
pub fn forward_commands(reader: impl BufRead, events: &mpsc::Sender<ChargingEvent>) -> bool {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Control connection dropped: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Some(event) => {
                debug!("Control command: {:?}", event);
                if events.blocking_send(event).is_err() {
                    return false;
                }
            }
            None => warn!("Unknown control command {:?}", line.trim()),
        }
    }
    true
}

/// Serve the control socket on the calling thread. Blocks, so run it on a
/// dedicated thread.
pub fn serve(path: &str, events: mpsc::Sender<ChargingEvent>) -> Result<(), Error> {
    // A socket left behind by a previous run would make the bind fail
    if std::path::Path::new(path).exists() {
        std::fs::remove_file(path)?;
    }

    let listener = LocalSocketListener::bind(path)?;
    info!("Listening for control commands on {}", path);

    for conn in listener.incoming().filter_map(handle_error) {
        if !forward_commands(BufReader::new(conn), &events) {
            break;
        }
    }

    Ok(())
}
