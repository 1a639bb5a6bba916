use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};

#[derive(Parser, Debug)]
#[command(name = "tessera", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one channel of a graph file to a PNG.
    Render(RenderArgs),
    /// Load a graph file and report its structure.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input graph file (token text format).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Node index into the file's node list; defaults to the last node.
    #[arg(long)]
    node: Option<usize>,

    /// Output raster width and height in pixels.
    #[arg(long, default_value_t = 512)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Render through the tile cache instead of the direct path.
    #[arg(long, default_value_t = false)]
    tiled: bool,

    /// Tile edge length (tiled mode only).
    #[arg(long, default_value_t = 64)]
    tile_size: u32,

    /// Tile border width in pixels (tiled mode only).
    #[arg(long, default_value_t = 8)]
    border: u32,

    /// Write 8-bit grayscale (luminance) instead of RGBA.
    #[arg(long, default_value_t = false)]
    gray: bool,

    /// Print a SHA-256 checksum of the raster bytes to stdout.
    #[arg(long, default_value_t = false)]
    checksum: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input graph file (token text format).
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn load_graph_file(path: &PathBuf) -> anyhow::Result<tessera::TextureGraph> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read graph '{}'", path.display()))?;
    tessera::load_graph(&text).with_context(|| format!("parse graph '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut graph = load_graph_file(&args.in_path)?;
    let assets_root = args
        .in_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."));
    graph.prepare_assets(assets_root)?;

    let ids: Vec<tessera::NodeId> = graph.nodes().map(|n| n.id()).collect();
    let id = match args.node {
        Some(index) => *ids
            .get(index)
            .with_context(|| format!("node index {index} out of range ({} nodes)", ids.len()))?,
        None => *ids.last().context("graph has no nodes")?,
    };

    let frame = if args.tiled {
        let mut cache = tessera::CacheTileManager::new();
        tessera::render_frame_tiled(
            &graph,
            &mut cache,
            id,
            args.size,
            args.size,
            args.tile_size,
            args.border,
        )?
    } else {
        tessera::render_frame(&graph, id, args.size, args.size)?
    };

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let (bytes, color) = if args.gray {
        (frame.to_gray8(), image::ColorType::L8)
    } else {
        (frame.to_rgba8(), image::ColorType::Rgba8)
    };
    image::save_buffer_with_format(
        &args.out,
        &bytes,
        frame.width,
        frame.height,
        color,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    if args.checksum {
        let digest = Sha256::digest(&bytes);
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        println!("{hex}");
    }

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let graph = load_graph_file(&args.in_path)?;

    let nodes: Vec<serde_json::Value> = graph
        .nodes()
        .enumerate()
        .map(|(index, node)| {
            serde_json::json!({
                "index": index,
                "kind": node.channel().kind(),
                "inputs": node.inputs().iter().filter(|i| i.is_some()).count(),
                "arity": node.inputs().len(),
                "complete": graph.is_complete(node.id()),
            })
        })
        .collect();

    let summary = serde_json::json!({
        "nodes": graph.node_count(),
        "connections": graph.connection_count(),
        "channels": nodes,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
