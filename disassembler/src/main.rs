use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use escr_nls::Encoding;
use escr_script::OpcodeTable;

mod config;
mod listing;

use crate::config::OpcodeConfig;
use crate::listing::{Disassembler, ListingOptions, OutputFormat};

/// Disassemble an ESCR1_00 script into an instruction listing.
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    input: PathBuf,

    /// Write the listing here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// User-opcode table for the game (YAML, or TOML by extension).
    #[arg(short = 't', long)]
    opcodes: Option<PathBuf>,

    /// Show the text of string-literal operands.
    #[arg(short, long)]
    strings: bool,

    /// Convert half-width kana to full-width in shown strings.
    #[arg(short, long)]
    kana: bool,

    #[arg(short, long, default_value = "sjis")]
    lang: Encoding,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// List the string table instead of the code.
    #[arg(long)]
    dump_strings: bool,
}

fn load_table(path: Option<&PathBuf>) -> Result<OpcodeTable> {
    match path {
        Some(path) => {
            let table = OpcodeConfig::load(path)?.into_table();
            log::info!("loaded {} user opcodes from {:?}", table.user_opcodes().len(), path);
            Ok(table)
        }
        None => {
            log::warn!("no opcode table given; user opcodes will decode without operands");
            Ok(OpcodeTable::default())
        }
    }
}

fn run(args: Args) -> Result<()> {
    let bytes = fs::read(&args.input).with_context(|| format!("read {:?}", args.input))?;
    let table = load_table(args.opcodes.as_ref())?;
    let options = ListingOptions { show_strings: args.strings, kana: args.kana, nls: args.lang };
    let disassembler = Disassembler::new(&bytes, &table, options)
        .with_context(|| format!("parse {:?}", args.input))?;

    let mut writer: BufWriter<Box<dyn Write>> = match &args.output {
        Some(path) => BufWriter::new(Box::new(
            fs::File::create(path).with_context(|| format!("create {:?}", path))?,
        )),
        None => BufWriter::new(Box::new(std::io::stdout().lock())),
    };

    if args.dump_strings {
        let strings = disassembler.dump_strings()?;
        match args.format {
            OutputFormat::Text => listing::write_strings(&mut writer, &strings)?,
            OutputFormat::Yaml => serde_yaml::to_writer(&mut writer, &strings)?,
        }
        writer.flush()?;
        return Ok(());
    }

    let result = disassembler.disassemble()?;
    match args.format {
        OutputFormat::Text => listing::write_text(&mut writer, &result.entries)?,
        OutputFormat::Yaml => listing::write_yaml(&mut writer, &result.entries)?,
    }
    writer.flush()?;

    if let Some(e) = result.truncated {
        log::error!("{e}; listing stops after {} instructions", result.entries.len());
    }
    if result.warnings > 0 {
        log::warn!("{} suspicious instructions; check the opcode table", result.warnings);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run(Args::parse())
}
