use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use transit_router::domain::{Direction, SearchInterval, StationId, Time, parse_hhmm};
use transit_router::network::Schedule;
use transit_router::routing::{
    LowerBoundsStrategy, Router, RouterConfig, RoutingQuery, SearchType, Start,
};

/// Find Pareto-optimal journeys between two stations and print them as JSON
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the network JSON file
    network: PathBuf,

    /// Code of the station to travel from
    from: String,

    /// Code of the station to travel to
    to: String,

    /// Start of the search interval (HH:MM)
    #[arg(value_parser = parse_time)]
    begin: Time,

    /// End of the search interval (HH:MM), defaults to the start
    #[arg(value_parser = parse_time)]
    end: Option<Time>,

    /// Search backward: the interval holds arrival times at the destination
    #[arg(long)]
    backward: bool,

    /// Extend the interval until enough journeys are found
    #[arg(long)]
    extend: bool,

    /// Journeys to find before the interval stops growing
    #[arg(long)]
    min_journeys: Option<usize>,

    /// Criteria to optimise, e.g. "default" or "price"
    #[arg(long, value_parser = parse_search_type)]
    search_type: Option<SearchType>,

    /// Lower bounds strategy: none, cg, csa, mixed or optimality
    #[arg(long)]
    lower_bounds: Option<LowerBoundsStrategy>,

    /// Router configuration JSON; unset fields keep their defaults
    #[arg(long, env = "TRANSIT_ROUTER_CONFIG")]
    config: Option<PathBuf>,
}

fn parse_time(s: &str) -> Result<Time, String> {
    parse_hhmm(s).map_err(|e| e.to_string())
}

fn parse_search_type(s: &str) -> Result<SearchType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str::<RouterConfig>(&std::fs::read_to_string(path)?)?,
        None => RouterConfig::default(),
    };
    if let Some(strategy) = args.lower_bounds {
        config.lower_bounds = strategy;
    }

    let schedule = Schedule::from_json_file(&args.network)?;
    let lookup = |code: &str| {
        schedule
            .station_by_code(code)
            .ok_or_else(|| format!("unknown station {code}"))
    };
    let (from, to) = (lookup(&args.from)?, lookup(&args.to)?);

    let query = build_query(&args, from, to);
    let router = Router::new(Arc::new(schedule), config);
    let response = router.route(&query)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn build_query(args: &Args, from: StationId, to: StationId) -> RoutingQuery {
    // a backward search starts at the destination
    let (start, destination, dir) = if args.backward {
        (to, from, Direction::Backward)
    } else {
        (from, to, Direction::Forward)
    };
    let mut query = RoutingQuery::new(
        Start::Pretrip {
            station: start,
            interval: SearchInterval::new(args.begin, args.end.unwrap_or(args.begin)),
        },
        destination,
    );
    query.dir = dir;
    query.extend_interval_earlier = args.extend;
    query.extend_interval_later = args.extend;
    if let Some(n) = args.min_journeys {
        query.min_journey_count = n;
    }
    if let Some(search_type) = &args.search_type {
        query.search_type = search_type.clone();
    }
    query
}
