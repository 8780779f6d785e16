use clap::{Parser, Subcommand};
use recordio::transform;
use recordio::{Reader, Writer, WriterOpts};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recordio")]
#[command(about = "Record-oriented binary container CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream every record to stdout.
    Cat { input: PathBuf },
    /// Print framing, header entries, trailer, and record count.
    Info { input: PathBuf },
    /// Pack input files into an archive, one record per file.
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        packed: bool,
        /// Transformer config, e.g. "flate" or "zstd 9".
        #[arg(short, long)]
        transformer: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Cat { input } => {
            let mut reader = Reader::open(input);
            let mut out = io::stdout().lock();
            while reader.scan() {
                out.write_all(reader.get())?;
            }
            if let Some(err) = reader.error() {
                return Err(format!("{}: {err}", input.display()).into());
            }
        }
        Commands::Info { input } => {
            let mut reader = Reader::open(input);
            println!("File: {}", input.display());
            println!("Kind: {:?}", recordio::names::classify(input));
            let mut records = 0u64;
            while reader.scan() {
                records += 1;
            }
            for entry in reader.header() {
                println!("Header: {} = {:?}", entry.key, entry.value);
            }
            if !reader.trailer().is_empty() {
                println!("Trailer: {} bytes", reader.trailer().len());
            }
            println!("Records: {records}");
            if let Some(err) = reader.error() {
                return Err(format!("{}: {err}", input.display()).into());
            }
        }
        Commands::Pack {
            output,
            inputs,
            packed,
            transformer,
        } => {
            let mut opts = WriterOpts {
                packed: *packed,
                ..WriterOpts::default()
            };
            if let Some(config) = transformer {
                opts.transformer = Some(transform::encoder(config)?);
            }
            let file = fs::File::create(output)?;
            let mut writer = Writer::new(io::BufWriter::new(file), opts);
            for input in inputs {
                let data = fs::read(input)?;
                if !writer.write(&data) {
                    break;
                }
            }
            writer.close();
            if let Some(err) = writer.error() {
                return Err(format!("{}: {err}", output.display()).into());
            }
            println!("Packed {} record(s) into {}", inputs.len(), output.display());
        }
    }
    Ok(())
}
