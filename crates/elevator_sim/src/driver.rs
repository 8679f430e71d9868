//! Request sources feeding the controller: the random generator and the
//! interactive console.

use std::io::BufRead;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use elevator_control::{ElevatorController, RequestGenerator};

use crate::command::{self, Command, HELP};

/// Submit generated requests until `cancel` fires.
pub async fn run_generator(
    controller: &ElevatorController,
    mut generator: RequestGenerator,
    cancel: CancellationToken,
) {
    info!("random request generator started");
    loop {
        let request = generator.next_request();
        if let Err(e) = controller.process_request(request) {
            warn!(%e, "generated request rejected");
        }

        let pause = generator.next_pause();
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(pause) => {}
        }
    }
    debug!("random request generator stopped");
}

/// Read console commands from stdin until `q`, end of input, or `cancel`.
///
/// Returns when the operator asked to quit or stdin closed.
pub async fn run_console(controller: &ElevatorController, cancel: CancellationToken) {
    let mut lines = spawn_stdin_reader();
    println!("{HELP}");

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => return,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            info!("console input closed");
            return;
        };
        if line.trim().is_empty() {
            continue;
        }

        match command::parse(&line) {
            Ok(Command::Quit) => return,
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Status(None)) => controller.report_status(),
            Ok(Command::Status(Some(id))) => {
                if let Err(e) = controller.report_elevator(id) {
                    println!("{e}");
                }
            }
            Ok(Command::Request(request)) => match controller.process_request(request) {
                Ok(id) => println!("elevator {id} assigned"),
                Err(e) => println!("request rejected: {e}"),
            },
            Err(e) => println!("{e}"),
        }
    }
}

/// Stdin is read on a detached thread. Shutdown must not wait on a pending
/// read.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(%e, "failed to read console input");
                    break;
                }
            }
        }
    });
    rx
}
