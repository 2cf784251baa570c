use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use osm_adiff_core::assemble::{DiffAssembler, MetaInfo};
use osm_adiff_core::mem_snapshot::MemSnapshot;
use osm_adiff_sink::{write_diff, Destination};

/// Generates an OSM Augmented Diff from an osmChange file and a snapshot
/// dump, writing the pretty-printed result (and its sequence-id sidecar)
/// to a local path or an `s3://` URI.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// osmChange (.osc) file to read
    osc: PathBuf,

    /// JSON snapshot dump consulted for reconstruction and augmentation
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Where the augmented diff document is written; `.gz` gzips it,
    /// an `s3://bucket/key` uri uploads it
    #[arg(short, long)]
    output: String,

    /// Directory (or `s3://bucket/prefix`) the `status.txt` sequence-id
    /// sidecar is written under
    #[arg(long)]
    status_dir: String,

    /// Minutely replication sequence id stamped into `<meta>`
    #[arg(long)]
    replication_id: Option<u64>,

    /// Replication URL stamped into `<meta>`
    #[arg(long)]
    replication_url: Option<String>,

    /// The timestamp of the end of the time range covered by the osmChange
    /// file (RFC 3339, e.g. `2024-01-01T00:00:00Z`), stamped into
    /// `<meta osm_base>`. Defaults to the current time if not given, which
    /// is only correct for a realtime (not backfill) run.
    #[arg(long)]
    end_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let snapshot_file = File::open(&cli.snapshot)
        .with_context(|| format!("opening snapshot {}", cli.snapshot.display()))?;
    let snapshot = MemSnapshot::from_reader(BufReader::new(snapshot_file))
        .with_context(|| format!("parsing snapshot {}", cli.snapshot.display()))?;

    let osc_file =
        File::open(&cli.osc).with_context(|| format!("opening osmChange {}", cli.osc.display()))?;

    let osm_base = cli.end_timestamp.unwrap_or_else(|| {
        log::warn!("--end-timestamp not given; stamping <meta osm_base> with wall-clock time");
        chrono::Utc::now()
    });
    let meta = MetaInfo {
        osm_base: Some(osm_base),
        replication_id: cli.replication_id,
        replication_url: cli.replication_url.clone(),
    };

    let assembler = DiffAssembler::new(&snapshot);
    let document = assembler
        .run(BufReader::new(osc_file), &meta)
        .context("assembling augmented diff")?;

    let Some(document) = document else {
        log::warn!("osmChange contained no operations; nothing written");
        return Ok(());
    };

    let sequence_id = cli
        .replication_id
        .map(|id| id as i64)
        .unwrap_or_else(|| osm_adiff_sink::datetime_to_adiff_sequence(chrono::Utc::now()));

    let destination = Destination {
        document_uri: cli.output,
        status_dir_uri: cli.status_dir,
    };
    write_diff(&destination, &document, sequence_id).await
}
