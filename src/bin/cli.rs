//! redwire CLI Client
//!
//! Command-line interface for talking to a RESP server.

use std::io::{self, BufRead};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use redwire::{encode_command, Config, Connection, PubSubEvent, ReplyValue};
use tracing_subscriber::{fmt, EnvFilter};

/// redwire CLI
#[derive(Parser, Debug)]
#[command(name = "redwire-cli")]
#[command(about = "Blocking RESP client")]
#[command(version)]
struct Args {
    /// Server URL: redis://[[user]:password@]host[:port][/db]
    #[arg(short, long, default_value = "redis://127.0.0.1:6379")]
    url: String,

    /// Connect timeout in milliseconds (0 disables it)
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single command
    Exec {
        /// Command name followed by its arguments
        #[arg(required = true, num_args = 1..)]
        args: Vec<String>,
    },

    /// Read one command per stdin line and send them all as one pipeline
    Pipeline,

    /// Read one command per stdin line and run them in a MULTI/EXEC block
    Multi,

    /// Print messages published to the given channels
    Subscribe {
        /// Channels (or patterns with --pattern)
        #[arg(required = true, num_args = 1..)]
        channels: Vec<String>,

        /// Treat the arguments as glob-style patterns
        #[arg(short, long)]
        pattern: bool,

        /// Stop after this many milliseconds without a message (0 waits forever)
        #[arg(short, long, default_value = "0")]
        timeout_ms: u64,
    },
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,redwire=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("(error) {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> redwire::Result<()> {
    let mut config = Config::from_url(&args.url)?;
    config.connect_timeout_ms = args.connect_timeout_ms;

    let mut conn = Connection::open(&config)?;

    match args.command {
        Commands::Exec { args } => {
            let reply = conn.execute(encode_command(&args[..]))?;
            println!("{}", reply);
        }
        Commands::Pipeline => {
            let lines = read_commands()?;
            let mut pipe = conn.start_pipeline()?;
            for line in &lines {
                pipe.append_with(encode_command(&line[..]), Ok)?;
            }
            print_results(pipe.resolve()?);
        }
        Commands::Multi => {
            let lines = read_commands()?;
            let mut tx = conn.start_transaction()?;
            for line in &lines {
                tx.append_with(encode_command(&line[..]), Ok)?;
            }
            print_results(tx.resolve()?);
        }
        Commands::Subscribe {
            channels,
            pattern,
            timeout_ms,
        } => {
            let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
            let mut subscriber = conn.subscriber()?;
            if pattern {
                subscriber.psubscribe(&channels)?;
            } else {
                subscriber.subscribe(&channels)?;
            }

            while let Some(event) = subscriber.next_event(timeout)? {
                match event {
                    PubSubEvent::Message(message) => match &message.pattern {
                        Some(pattern) => println!(
                            "{} {} {}",
                            pattern,
                            message.channel,
                            String::from_utf8_lossy(&message.payload)
                        ),
                        None => println!(
                            "{} {}",
                            message.channel,
                            String::from_utf8_lossy(&message.payload)
                        ),
                    },
                    PubSubEvent::Control {
                        kind,
                        channel,
                        count,
                    } => {
                        tracing::info!(
                            "{} {} ({} active)",
                            kind.as_str(),
                            channel.unwrap_or_default(),
                            count
                        );
                    }
                    PubSubEvent::Unknown(_) => {}
                }
            }
            tracing::info!("No message within {} ms, exiting", timeout_ms);
        }
    }

    Ok(())
}

/// One whitespace-separated command per non-empty stdin line
fn read_commands() -> redwire::Result<Vec<Vec<String>>> {
    let mut commands = Vec::new();
    for line in io::stdin().lock().lines() {
        let words: Vec<String> = line?.split_whitespace().map(str::to_string).collect();
        if !words.is_empty() {
            commands.push(words);
        }
    }
    Ok(commands)
}

fn print_results(results: Vec<ReplyValue>) {
    for (i, reply) in results.iter().enumerate() {
        println!("{}) {}", i + 1, reply);
    }
}
