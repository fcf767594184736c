use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use roadnet_core::{Coordinate, Graph, RouteComparison, Router, RouterConfig, SearchVariant};
use serde::Serialize;

/// Benchmark the routing engine on synthetic road networks.
#[derive(Parser)]
#[command(name = "roadnet-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Which generator to run
    #[arg(long, default_value = "all")]
    mode: Mode,

    /// Target node count per generated graph
    #[arg(long, short, default_value_t = 50_000)]
    nodes: usize,

    /// TOML file with router settings (variant, k, collect_memory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured search variant
    #[arg(long)]
    variant: Option<Variant>,

    /// Override the number of alternative paths
    #[arg(short)]
    k: Option<usize>,

    /// Print one JSON report instead of tables
    #[arg(long)]
    json: bool,

    /// Suppress info messages
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    All,
    Grid,
    Ring,
    Barbell,
    Chain,
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Dijkstra,
    Astar,
}

impl From<Variant> for SearchVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Dijkstra => SearchVariant::Dijkstra,
            Variant::Astar => SearchVariant::AStar,
        }
    }
}

type Generator = fn(usize) -> anyhow::Result<Graph>;

/// Root-node blocking in Yen's loop grows with the square of the route
/// length; past this the chain benchmark would dominate the run.
const MAX_ALTERNATIVE_HOPS: usize = 5_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphReport {
    name: &'static str,
    nodes: usize,
    edges: usize,
    approx_memory_bytes: usize,
    build_ms: f64,
    route: RouteComparison,
    /// `None` when the route was too long to enumerate alternatives.
    alternatives: Option<Vec<AlternativeSummary>>,
    alternatives_ms: f64,
    critical_points: usize,
    critical_points_ms: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlternativeSummary {
    hops: usize,
    length: f64,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    if cli.nodes < 4 {
        bail!("--nodes must be at least 4, got {}", cli.nodes);
    }

    let generators: Vec<(&'static str, Generator)> = match cli.mode {
        Mode::Grid => vec![("Street grid", gen_grid as Generator)],
        Mode::Ring => vec![("Ring road with spokes", gen_ring as Generator)],
        Mode::Barbell => vec![("Two towns, one bridge", gen_barbell as Generator)],
        Mode::Chain => vec![("Single winding road", gen_chain as Generator)],
        Mode::All => vec![
            ("Street grid", gen_grid as Generator),
            ("Ring road with spokes", gen_ring),
            ("Two towns, one bridge", gen_barbell),
            ("Single winding road", gen_chain),
        ],
    };

    tracing::info!(
        variant = config.variant.name(),
        k = config.k,
        nodes = cli.nodes,
        "starting benchmark"
    );

    let mut reports = Vec::with_capacity(generators.len());
    for (name, generator) in generators {
        let report = run_benchmark(name, generator, cli.nodes, &config)?;
        if !cli.json {
            print_report(&report);
        }
        reports.push(report);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<RouterConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            RouterConfig::from_toml_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => RouterConfig::default(),
    };
    if let Some(v) = cli.variant {
        config.variant = v.into();
    }
    if let Some(k) = cli.k {
        config.k = k;
    }
    config.validate()?;
    Ok(config)
}

fn run_benchmark(
    name: &'static str,
    generator: Generator,
    node_count: usize,
    config: &RouterConfig,
) -> anyhow::Result<GraphReport> {
    let t = Instant::now();
    let graph = generator(node_count).with_context(|| format!("generating {}", name))?;
    let build_ms = t.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        name,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "generated graph"
    );

    let router = Router::new(&graph, config.clone());

    // Route between the first and last node, usually opposite corners
    let far = graph.node_count() - 1;
    let from = graph.coordinate(0).context("graph has no node 0")?;
    let to = graph.coordinate(far).context("graph has no last node")?;

    let route = router.compare(from, to)?;
    let hops = route.dijkstra.path.len().saturating_sub(1);
    let alternatives = if hops <= MAX_ALTERNATIVE_HOPS {
        Some(router.alternatives(from, to)?)
    } else {
        tracing::info!(name, hops, "route too long, skipping alternatives");
        None
    };
    let critical = router.critical_points()?;

    Ok(GraphReport {
        name,
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        approx_memory_bytes: graph.memory_usage(),
        build_ms,
        route,
        alternatives_ms: alternatives.as_ref().map_or(0.0, |a| a.elapsed_ms),
        alternatives: alternatives.map(|a| {
            a.paths
                .iter()
                .map(|p| AlternativeSummary {
                    hops: p.path.len().saturating_sub(1),
                    length: p.length,
                })
                .collect()
        }),
        critical_points: critical.nodes.len(),
        critical_points_ms: critical.elapsed_ms,
    })
}

fn print_report(r: &GraphReport) {
    println!("--- {} ---", r.name);
    println!(
        "Generated in {:.2}s: {} nodes, {} directed edges, ~{:.1}MB",
        r.build_ms / 1000.0,
        r.nodes,
        r.edges,
        r.approx_memory_bytes as f64 / 1_048_576.0
    );

    println!();
    println!(
        "{:>10} {:>8} {:>14} {:>10} {:>10}",
        "search", "hops", "length (m)", "visited", "time"
    );
    println!("{:->10} {:->8} {:->14} {:->10} {:->10}", "", "", "", "", "");
    for (label, p) in [("dijkstra", &r.route.dijkstra), ("astar", &r.route.astar)] {
        println!(
            "{:>10} {:>8} {:>14.1} {:>10} {:>8.1}ms",
            label,
            p.path.len().saturating_sub(1),
            p.length,
            p.nodes_visited,
            p.elapsed_ms
        );
    }

    println!();
    match &r.alternatives {
        None => println!(
            "Alternatives {} → {}: skipped, route longer than {} hops",
            r.route.source, r.route.destination, MAX_ALTERNATIVE_HOPS
        ),
        Some(alts) if alts.is_empty() => println!(
            "Alternatives {} → {}: no path ({:.1}ms)",
            r.route.source, r.route.destination, r.alternatives_ms
        ),
        Some(alts) => {
            println!(
                "Alternatives {} → {}: {} found in {:.1}ms",
                r.route.source,
                r.route.destination,
                alts.len(),
                r.alternatives_ms
            );
            for (i, alt) in alts.iter().enumerate() {
                println!("  #{} {:>8} hops {:>14.1} m", i + 1, alt.hops, alt.length);
            }
        }
    }

    println!();
    println!(
        "Articulation points: {} ({:.1}ms)",
        r.critical_points, r.critical_points_ms
    );
    println!();
}

// ---------------------------------------------------------------------------
// Generators: deterministic, single-threaded, laid out around a city centre
// ---------------------------------------------------------------------------

const BASE_LAT: f64 = 30.30;
const BASE_LON: f64 = 78.00;
/// Roughly 100 m of latitude.
const STEP_DEG: f64 = 0.0009;

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Lay out a `rows x cols` street grid starting at `origin`, dropping ~10%
/// of segments. Returns the node index of each grid cell, row-major.
fn lay_grid(
    graph: &mut Graph,
    rng: &mut FastRng,
    origin: Coordinate,
    rows: usize,
    cols: usize,
) -> anyhow::Result<Vec<usize>> {
    let mut cells = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let jitter_lat = (rng.next_f64() - 0.5) * STEP_DEG * 0.3;
            let jitter_lon = (rng.next_f64() - 0.5) * STEP_DEG * 0.3;
            cells.push(graph.node_index(Coordinate::new(
                origin.lat + r as f64 * STEP_DEG + jitter_lat,
                origin.lon + c as f64 * STEP_DEG + jitter_lon,
            ))?);
        }
    }

    for r in 0..rows {
        for c in 0..cols {
            let u = cells[r * cols + c];
            // Keep the outer frame intact so the grid stays connected
            if c + 1 < cols && (r == 0 || r + 1 == rows || rng.next(10) != 0) {
                graph.connect(u, cells[r * cols + c + 1])?;
            }
            if r + 1 < rows && (c == 0 || c + 1 == cols || rng.next(10) != 0) {
                graph.connect(u, cells[(r + 1) * cols + c])?;
            }
        }
    }
    Ok(cells)
}

/// Manhattan-style street grid with some missing blocks.
fn gen_grid(node_count: usize) -> anyhow::Result<Graph> {
    let side = (node_count as f64).sqrt().ceil() as usize;
    let mut graph = Graph::with_capacity(side * side);
    let mut rng = FastRng::new(42);
    let origin = Coordinate::new(BASE_LAT, BASE_LON);
    lay_grid(&mut graph, &mut rng, origin, side, side).context("laying out street grid")?;
    Ok(graph)
}

/// Ring road around a hub, spokes every few nodes, and dead-end lanes
/// hanging off the ring (each lane junction is a cut vertex).
fn gen_ring(node_count: usize) -> anyhow::Result<Graph> {
    let ring = (node_count * 2 / 3).max(3);
    let lanes = node_count.saturating_sub(ring + 1);
    let radius = ring as f64 * STEP_DEG / std::f64::consts::TAU;
    let mut graph = Graph::with_capacity(node_count);
    let mut rng = FastRng::new(7);

    let hub = graph.node_index(Coordinate::new(BASE_LAT, BASE_LON))?;
    let mut ring_nodes = Vec::with_capacity(ring);
    for i in 0..ring {
        let angle = i as f64 / ring as f64 * std::f64::consts::TAU;
        ring_nodes.push(graph.node_index(Coordinate::new(
            BASE_LAT + radius * angle.sin(),
            BASE_LON + radius * angle.cos(),
        ))?);
    }

    for i in 0..ring {
        graph.connect(ring_nodes[i], ring_nodes[(i + 1) % ring])?;
    }
    let spoke_every = (ring / 16).max(1);
    for i in (0..ring).step_by(spoke_every) {
        graph.connect(hub, ring_nodes[i])?;
    }

    for _ in 0..lanes {
        let anchor = ring_nodes[rng.next(ring as u64) as usize];
        let at = graph.coordinate(anchor).context("ring node vanished")?;
        let end = graph.node_index(Coordinate::new(
            at.lat + (rng.next_f64() - 0.5) * STEP_DEG,
            at.lon + (rng.next_f64() - 0.5) * STEP_DEG,
        ))?;
        if end != anchor {
            graph.connect(anchor, end)?;
        }
    }
    Ok(graph)
}

/// Two street grids joined by a single bridge road.
fn gen_barbell(node_count: usize) -> anyhow::Result<Graph> {
    let side = ((node_count / 2) as f64).sqrt().ceil().max(2.0) as usize;
    let mut graph = Graph::with_capacity(node_count);
    let mut rng = FastRng::new(1234);

    let west_origin = Coordinate::new(BASE_LAT, BASE_LON);
    let west = lay_grid(&mut graph, &mut rng, west_origin, side, side)?;
    let east_origin = Coordinate::new(BASE_LAT, BASE_LON + (side as f64 + 5.0) * STEP_DEG);
    let east = lay_grid(&mut graph, &mut rng, east_origin, side, side)?;

    // Bridge from the west grid's north-east corner to the east grid's north-west corner
    let a = graph.coordinate(west[side - 1]).context("west grid is empty")?;
    let b = graph.coordinate(east[0]).context("east grid is empty")?;
    let bridge: Vec<Coordinate> = (0..=5)
        .map(|i| {
            let t = i as f64 / 5.0;
            Coordinate::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t)
        })
        .collect();
    graph.load_polylines([bridge]).context("building bridge road")?;
    Ok(graph)
}

/// Nodes per pass of the winding road before it turns back.
const CHAIN_ROW: usize = 10_000;

/// One long road winding back and forth: a deep DFS with every interior
/// node critical.
fn gen_chain(node_count: usize) -> anyhow::Result<Graph> {
    let mut graph = Graph::with_capacity(node_count);
    let mut rng = FastRng::new(99);
    let road: Vec<Coordinate> = (0..node_count)
        .map(|i| {
            let (row, along) = (i / CHAIN_ROW, i % CHAIN_ROW);
            let col = if row % 2 == 0 { along } else { CHAIN_ROW - 1 - along };
            let jitter = (rng.next_f64() - 0.5) * STEP_DEG * 0.2;
            Coordinate::new(
                BASE_LAT + row as f64 * STEP_DEG + jitter,
                BASE_LON + col as f64 * STEP_DEG * 0.5,
            )
        })
        .collect();
    graph.load_polylines([road]).context("building winding road")?;
    Ok(graph)
}
