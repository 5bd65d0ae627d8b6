use std::fs;
use std::path::PathBuf;
use std::process::exit;

use anyhow::{bail, Context, Result};
use chain_lens_analysis::orchestrate::{self, Prevout};
use chain_lens_codec::{block, tx, undo, DecodeMode};
use chain_lens_types::{DecodeError, Network};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

const EXIT_BAD_INPUT: i32 = 2;
const EXIT_DECODE: i32 = 3;
const EXIT_PAIRING: i32 = 4;
const EXIT_MERKLE: i32 = 5;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum NetworkKind {
    Mainnet,
    Testnet,
}

impl From<NetworkKind> for Network {
    fn from(kind: NetworkKind) -> Self {
        match kind {
            NetworkKind::Mainnet => Network::Mainnet,
            NetworkKind::Testnet => Network::Testnet,
        }
    }
}

#[derive(Parser)]
#[command(name = "chain-lens")]
#[command(about = "Forensic analyzer for Bitcoin on-chain data")]
#[command(version)]
struct Args {
    /// Network for address derivation and file magic
    #[arg(long, global = true, value_enum, default_value = "mainnet")]
    network: NetworkKind,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Decode and analyze a single transaction
    Tx {
        /// Raw transaction hex
        #[arg(long)]
        hex: Option<String>,

        /// Fixture document with raw_hex and optional prevouts
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Analyze every block in a blk/rev file pair
    Block {
        /// Block file (blk*.dat)
        #[arg(long)]
        blk: PathBuf,

        /// Undo file (rev*.dat)
        #[arg(long)]
        rev: PathBuf,

        /// XOR key file (xor.dat); plaintext files need none
        #[arg(long)]
        xor: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct Fixture {
    raw_hex: String,
    #[serde(default)]
    prevouts: Option<Vec<FixturePrevout>>,
}

#[derive(Deserialize)]
struct FixturePrevout {
    value: u64,
    script_pubkey_hex: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            exit(classify_exit(&err));
        }
    }
}

/// Maps failures onto the exit-code contract: pairing failures are 4,
/// decoder failures 3, and anything before the decoders (I/O, hex, JSON) 2.
fn classify_exit(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DecodeError>() {
        Some(DecodeError::UndoMismatch { .. }) => EXIT_PAIRING,
        Some(_) => EXIT_DECODE,
        None => EXIT_BAD_INPUT,
    }
}

fn run(args: &Args) -> Result<i32> {
    let network = args.network.into();
    match &args.mode {
        Mode::Tx { hex, fixture } => run_tx(hex.as_deref(), fixture.as_deref(), network),
        Mode::Block { blk, rev, xor } => run_block(blk, rev, xor.as_deref(), network),
    }
}

fn run_tx(
    hex_arg: Option<&str>,
    fixture_path: Option<&std::path::Path>,
    network: Network,
) -> Result<i32> {
    let (raw_hex, fixture_prevouts) = match (hex_arg, fixture_path) {
        (Some(hex), None) => (hex.to_string(), None),
        (None, Some(path)) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("couldn't read fixture {}", path.display()))?;
            let fixture: Fixture =
                serde_json::from_str(&text).context("fixture is not valid JSON")?;
            (fixture.raw_hex, fixture.prevouts)
        }
        _ => bail!("exactly one of --hex and --fixture is required"),
    };

    let raw = hex::decode(raw_hex.trim()).context("raw_hex is not valid hex")?;
    let record = tx::decode_transaction(&raw)?;

    let prevouts = fixture_prevouts
        .map(|list| {
            list.into_iter()
                .map(|p| {
                    Ok(Prevout {
                        value_sats: p.value,
                        script_pubkey: hex::decode(&p.script_pubkey_hex)
                            .context("prevout script_pubkey_hex is not valid hex")?,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    let report = orchestrate::transaction_report(&record, prevouts.as_deref(), network)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}

fn run_block(
    blk_path: &std::path::Path,
    rev_path: &std::path::Path,
    xor_path: Option<&std::path::Path>,
    network: Network,
) -> Result<i32> {
    let xor_key = match xor_path {
        Some(path) => fs::read(path)
            .with_context(|| format!("couldn't read XOR key {}", path.display()))?,
        None => Vec::new(),
    };

    let mut blk_buf = fs::read(blk_path)
        .with_context(|| format!("couldn't read block file {}", blk_path.display()))?;
    let mut rev_buf = fs::read(rev_path)
        .with_context(|| format!("couldn't read undo file {}", rev_path.display()))?;
    block::descramble(&mut blk_buf, &xor_key);
    block::descramble(&mut rev_buf, &xor_key);

    let magic = block::network_magic(network);

    let mut blocks = Vec::new();
    let mut last_decode_error = None;
    for region in block::enumerate_regions(&blk_buf, magic) {
        let payload = &blk_buf[region.offset..region.offset + region.size];
        // Taint stays local: one undecodable block does not sink the file.
        match block::decode_block(payload, region.offset as u64, DecodeMode::Summary) {
            Ok(block) => blocks.push(block),
            Err(err) => {
                log::warn!("skipping undecodable block at offset {}: {err}", region.offset);
                last_decode_error = Some(err);
            }
        }
    }
    if blocks.is_empty() {
        if let Some(err) = last_decode_error {
            return Err(err.into());
        }
        bail!("no blocks found in {}", blk_path.display());
    }
    log::info!("decoded {} block(s) from {}", blocks.len(), blk_path.display());

    let mut undos = Vec::new();
    for region in block::enumerate_regions(&rev_buf, magic) {
        let payload = &rev_buf[region.offset..region.offset + region.size];
        undos.push(undo::decode_undo_block(payload, region.offset as u64)?);
    }
    log::info!("decoded {} undo payload(s) from {}", undos.len(), rev_path.display());

    let reports =
        orchestrate::block_reports(&blk_path.display().to_string(), &blocks, &undos)?;
    println!("{}", serde_json::to_string_pretty(&reports)?);

    if reports.iter().any(|report| !report.merkle_ok) {
        return Ok(EXIT_MERKLE);
    }
    Ok(0)
}
