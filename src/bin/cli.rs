//! RowStore CLI Client
//!
//! Command-line interface for interacting with RowStore. Values given on the
//! command line are stored as envelopes whose payload is the raw text.

use clap::{Parser, Subcommand};
use rowstore::network::Client;
use rowstore::{Envelope, Result, RowError};

/// RowStore CLI
#[derive(Parser, Debug)]
#[command(name = "rowstore-cli")]
#[command(about = "CLI for the RowStore bucketed key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8234")]
    server: String,

    /// Bucket to operate on
    #[arg(short, long, default_value = "default")]
    bucket: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a record by key
    Get {
        key: String,
    },

    /// Store a text record
    Set {
        key: String,

        value: String,

        /// Type tag written into the envelope
        #[arg(short = 't', long, default_value = "text")]
        type_name: String,
    },

    /// List records with keys in [from, to]
    Scan {
        from: String,
        to: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        match e {
            RowError::KeyNotFound => println!("(nil)"),
            e => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(&args.server)?;
    let bucket = args.bucket.as_str();

    match args.command {
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Get { key } => {
            let envelope = Envelope::from_bytes(&client.get(bucket, key.as_bytes())?)?;
            println!("{}", describe(&envelope));
        }
        Commands::Set { key, value, type_name } => {
            let envelope = Envelope { type_name, payload: value.into_bytes() };
            client.set(bucket, key.as_bytes(), &envelope.to_bytes()?)?;
            println!("OK");
        }
        Commands::Scan { from, to } => {
            for (key, value) in client.scan(bucket, from.as_bytes(), to.as_bytes())? {
                let envelope = Envelope::from_bytes(&value)?;
                println!("{}\t{}", String::from_utf8_lossy(&key), describe(&envelope));
            }
        }
    }
    Ok(())
}

fn describe(envelope: &Envelope) -> String {
    format!(
        "[{}] {}",
        envelope.type_name,
        String::from_utf8_lossy(&envelope.payload)
    )
}
