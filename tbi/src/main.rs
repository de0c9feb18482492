use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, TryRecvError};

use tbi::{config, Control, Message, Session};

/// Tetris move engine speaking newline-delimited JSON over stdin and stdout.
#[derive(Parser, Debug)]
struct Cli {
    /// YAML settings file; written with the defaults if it doesn't exist
    #[arg(long, default_value = "tbi.yaml")]
    config: PathBuf,
    /// Built-in weight profile to use when a start message doesn't name one
    #[arg(long)]
    profile: Option<String>,
    /// JSON weight profile that start messages can select by name
    #[arg(long)]
    weights: Option<PathBuf>,
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, created) = config::load_config(&cli.config)?;
    if created {
        eprintln!("[tbi] wrote default settings to {}", cli.config.display());
    }
    if let Some(profile) = cli.profile {
        config.engine.profile = profile;
    }
    config.verbose |= cli.verbose;
    let custom = match &cli.weights {
        Some(path) => Some(config::load_weights(path)?),
        None => None,
    };

    let mut session = Session::new(&config, custom).context("couldn't pick a weight profile")?;
    let token = session.cancel_token();

    let (send, recv) = unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            if send.send(serde_json::from_str::<Message>(&line)).is_err() {
                break;
            }
            token.cancel();
        }
    });

    let stdout = std::io::stdout();
    let mut replies = vec![];
    loop {
        session.cancel_token().reset();
        let msg = if session.is_thinking() {
            match recv.try_recv() {
                Ok(msg) => Some(msg),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match recv.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            }
        };

        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                session.log(&format!("malformed message: {}", e));
                replies.push(Message::error("malformed-message", e));
                write_replies(&stdout, &mut replies)?;
                continue;
            }
            None => {
                session.think();
                continue;
            }
        };

        let control = session.handle(msg, &mut replies);
        write_replies(&stdout, &mut replies)?;
        if control == Control::Quit {
            break;
        }
    }

    Ok(())
}

fn write_replies(stdout: &std::io::Stdout, replies: &mut Vec<Message>) -> Result<()> {
    let mut out = stdout.lock();
    for reply in replies.drain(..) {
        serde_json::to_writer(&mut out, &reply).context("couldn't encode reply")?;
        writeln!(out).context("couldn't write reply")?;
    }
    out.flush().context("couldn't flush stdout")?;
    Ok(())
}
