use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use packetview::app::{App, ViewerOptions, ViewerOutput};
use packetview::capture::{self, CaptureError, PacketSource, UdpLiveSocket};
use packetview::column::Column;
use packetview::config::{self, friendly_io_error_message, Config};
use packetview::craft::CraftContext;
use packetview::details::{DetailsView, EditView, StatisticsView};
use packetview::logging;
use packetview::packet::ClassCatalog;
use packetview::tui;

/// Width of a `--column` given without one
const DEFAULT_COLUMN_WIDTH: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "packetview", version, about = "Interactive terminal packet viewer")]
struct Args {
    /// JSON packet file to view
    file: Option<PathBuf>,

    /// Only list packets of this class
    #[arg(long)]
    basecls: Option<String>,

    /// Extra column FIELD[:WIDTH]; repeat for more
    #[arg(long = "column", value_name = "FIELD[:WIDTH]")]
    columns: Vec<String>,

    /// Capture UDP datagrams on this address instead of reading a file
    #[arg(long, value_name = "ADDR", conflicts_with = "file")]
    listen: Option<SocketAddr>,

    /// Peer that Re-Send and Craft&Send send to
    #[arg(long, value_name = "ADDR", requires = "listen")]
    send_to: Option<SocketAddr>,

    /// Disable Craft&Send
    #[arg(long, default_value_t = false)]
    no_craft: bool,

    /// Write the selected packets to this JSON file on exit
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure config directory exists (creates logs dir too)
    config::ensure_directories()?;

    // Initialize file logging BEFORE any tracing calls
    let (log_file_info, _guard) = logging::init_file_logging(config::logs_dir())?;

    // Clean up old logs (7-day retention)
    if let Ok(count) = logging::cleanup_old_logs(&config::logs_dir()) {
        if count > 0 {
            tracing::info!("Cleaned up {} old log files", count);
        }
    }
    tracing::info!("Logging to: {}", log_file_info.path.display());

    let config = Config::load()?;
    tui::init_theme(&config.theme_preset);

    let catalog = Arc::new(ClassCatalog::builtin());
    let source = packet_source(&args, &catalog)?;
    let options = viewer_options(&args, &config, &catalog)?;
    let views: Vec<Box<dyn DetailsView>> =
        vec![Box::new(EditView::new()), Box::new(StatisticsView::new())];

    let mut app = App::new(source, views, options)?;
    let output = app.run().await?;
    let fatal = app.coordinator().fatal_error().map(str::to_string);

    print_summary(&output);
    if let Some(path) = &args.save {
        save_selected(path, &output)?;
    }
    if let Some(error) = fatal {
        bail!("{}", error);
    }
    Ok(())
}

fn packet_source(args: &Args, catalog: &ClassCatalog) -> Result<PacketSource> {
    if let Some(addr) = args.listen {
        let raw = catalog.require("Raw")?;
        let socket = UdpLiveSocket::bind(addr, args.send_to, raw)
            .with_context(|| format!("Failed to listen on {}", addr))?;
        return Ok(PacketSource::Live(Arc::new(socket)));
    }

    let path = args
        .file
        .as_ref()
        .ok_or_else(|| anyhow!("Give a packet file or --listen ADDR"))?;
    let packets = capture::load_packets(path, catalog)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(PacketSource::List(packets))
}

fn viewer_options(args: &Args, config: &Config, catalog: &Arc<ClassCatalog>) -> Result<ViewerOptions> {
    let basecls = args
        .basecls
        .as_deref()
        .map(|name| catalog.require(name))
        .transpose()?;

    let columns = if args.columns.is_empty() {
        None
    } else {
        Some(
            args.columns
                .iter()
                .map(|spec| parse_column(spec))
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let craft = (!args.no_craft && args.listen.is_some()).then(|| CraftContext::new(Arc::clone(catalog)));

    Ok(ViewerOptions {
        basecls,
        columns,
        column_config: config.column_config(),
        craft,
        confirm_quit: config.confirm_quit,
        inbox_warn_depth: config.inbox_warn_depth,
        details_height_percent: config.details_height_percent,
    })
}

/// `FIELD[:WIDTH]` to a field column headed by the upper-cased field name
fn parse_column(spec: &str) -> Result<Column> {
    let (field, width) = match spec.split_once(':') {
        Some((field, width)) => {
            let width: usize = width
                .trim()
                .parse()
                .with_context(|| format!("Invalid column width in '{}'", spec))?;
            (field.trim(), width)
        }
        None => (spec.trim(), DEFAULT_COLUMN_WIDTH),
    };
    if field.is_empty() || width == 0 {
        bail!("Invalid column '{}'", spec);
    }
    Ok(Column::field(field.to_ascii_uppercase(), width, field))
}

fn print_summary(output: &ViewerOutput) {
    println!(
        "{} packets, {} selected",
        output.all.len(),
        output.selected.len()
    );
    for packet in &output.selected {
        println!("  {}", packet.repr());
    }
}

fn save_selected(path: &Path, output: &ViewerOutput) -> Result<()> {
    match capture::save_packets(path, &output.selected) {
        Ok(()) => {
            println!("Saved {} packets to {}", output.selected.len(), path.display());
            Ok(())
        }
        Err(CaptureError::Io(e)) => bail!("{}", friendly_io_error_message(&e, "Failed to save packets")),
        Err(e) => Err(e).context("Failed to save packets"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column() {
        let column = parse_column("sport:6").unwrap();
        assert_eq!(column.name, "SPORT");
        assert_eq!(column.width, 6);

        let column = parse_column("dport").unwrap();
        assert_eq!(column.width, DEFAULT_COLUMN_WIDTH);

        assert!(parse_column("sport:wide").is_err());
        assert!(parse_column(":4").is_err());
        assert!(parse_column("sport:0").is_err());
    }

    #[test]
    fn test_args_conflicts() {
        assert!(Args::try_parse_from(["packetview", "x.json", "--listen", "127.0.0.1:9"]).is_err());
        assert!(Args::try_parse_from(["packetview", "--send-to", "127.0.0.1:9"]).is_err());

        let args = Args::try_parse_from([
            "packetview",
            "--listen",
            "127.0.0.1:5000",
            "--send-to",
            "127.0.0.1:5001",
            "--column",
            "load:20",
        ])
        .unwrap();
        assert_eq!(args.columns, vec!["load:20"]);
        assert!(!args.no_craft);
    }
}
