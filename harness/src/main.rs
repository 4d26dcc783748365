// Builds a BinaryFuse16 over a list of names, one per line, and reports its size, false-positive
// rate, and query and construction throughput.
//
//     benchmark data/top-1m.csv [queries.txt]

use bfuse::{BinaryFuse16, Filter};
use rand::{distributions::Alphanumeric, Rng};
use std::{env, fs, hint::black_box, io, process::ExitCode, time::Instant};
use tracing::{debug, error};

const BOGUS_QUERIES: usize = 100_000;
const ROUNDS: usize = 10;

/// Cheap string hash; the filter only needs distinct inputs to map to distinct-enough hashes.
fn simple_hash(name: &str) -> u64 {
    let h = name
        .bytes()
        .fold(0u64, |h, c| h.wrapping_mul(177).wrapping_add(u64::from(c)));
    h ^ name.len() as u64
}

fn load_lines(path: &str) -> io::Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(|line| line.trim_end().to_owned())
        .collect())
}

fn random_string(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(0..128);
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Fastest of several runs, in nanoseconds.
fn bench(mut f: impl FnMut()) -> f64 {
    (0..ROUNDS)
        .map(|_| {
            let start = Instant::now();
            f();
            start.elapsed().as_nanos() as f64
        })
        .fold(f64::INFINITY, f64::min)
}

fn pretty_print(volume: usize, bytes: usize, name: &str, fastest_ns: f64) {
    println!(
        "{:<30} :  {:5.2} GB/s  {:5.1} Ma/s  {:5.2} ns/d",
        name,
        bytes as f64 / fastest_ns,
        volume as f64 * 1000.0 / fastest_ns,
        fastest_ns / volume as f64
    );
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let Some(names_path) = args.get(1) else {
        println!("You must pass a list of URLs (one per line). For instance:");
        println!("./benchmark data/top-1m.csv");
        return ExitCode::FAILURE;
    };

    let mut inputs = match load_lines(names_path) {
        Ok(lines) => lines,
        Err(err) => {
            error!(path = %names_path, %err, "failed to read names");
            eprintln!("Could not open {}", names_path);
            return ExitCode::FAILURE;
        }
    };
    let bytes: usize = inputs.iter().map(String::len).sum();
    println!("loaded {} names", inputs.len());
    println!(
        "average length {} bytes/name",
        bytes as f64 / inputs.len() as f64
    );
    println!();

    // Many duplicates usually mean a malformed input file.
    inputs.sort_unstable();
    for pair in inputs.windows(2).filter(|pair| pair[0] == pair[1]) {
        println!("duplicated string {}", pair[0]);
    }
    println!("total volume {} bytes", bytes);

    let mut hashes: Vec<u64> = inputs.iter().map(|name| simple_hash(name)).collect();
    hashes.sort_unstable();
    let duplicates = hashes.windows(2).filter(|pair| pair[0] == pair[1]).count();
    println!("number of duplicates hashes {}", duplicates);
    println!(
        "ratio of duplicates  hashes {:.6}",
        duplicates as f64 / hashes.len() as f64
    );

    let mut filter = match BinaryFuse16::allocate(hashes.len()) {
        Ok(filter) => filter,
        Err(err) => {
            error!(%err, keys = hashes.len(), "allocation failed");
            println!("You probably ran out of memory. Try a smaller size.");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = filter.populate(&hashes) {
        error!(%err, "construction failed");
        println!("Construction failed. This should not happen.");
        return ExitCode::FAILURE;
    }
    debug!(seed = filter.seed(), layout = ?filter.layout(), "filter populated");

    let filter_volume = filter.size_in_bytes();
    println!(
        "\nfilter memory usage : {} bytes ({:.1} % of input)",
        filter_volume,
        100.0 * filter_volume as f64 / bytes as f64
    );
    println!(
        "\nfilter memory usage : {:.1} bits/entry\n",
        filter.bits_per_entry(hashes.len())
    );

    let mut rng = rand::thread_rng();
    let bogus: Vec<String> = (0..BOGUS_QUERIES)
        .map(|_| random_string(&mut rng))
        .collect();
    let bogus_volume: usize = bogus.iter().map(String::len).sum();
    let false_positives = bogus
        .iter()
        .filter(|name| filter.contains(&simple_hash(name)))
        .count();
    println!(
        "false-positive rate {:.6}",
        false_positives as f64 / bogus.len() as f64
    );

    println!("Benchmarking queries:");
    let fastest = bench(|| {
        let found = bogus
            .iter()
            .filter(|name| filter.contains(&simple_hash(name)))
            .count();
        black_box(found);
    });
    pretty_print(bogus.len(), bogus_volume, "BinaryFuse16::contains", fastest);

    match args.get(2) {
        Some(queries_path) => {
            let queries = match load_lines(queries_path) {
                Ok(lines) => lines,
                Err(err) => {
                    error!(path = %queries_path, %err, "failed to read queries");
                    eprintln!("Could not open {}", queries_path);
                    return ExitCode::FAILURE;
                }
            };
            let mut matches = 0usize;
            let mut filter_positives = 0usize;
            for query in &queries {
                let is_match = inputs.binary_search(query).is_ok();
                if is_match {
                    matches += 1;
                } else if filter.contains(&simple_hash(query)) {
                    filter_positives += 1;
                }
            }
            let total = queries.len();
            let percent = |n: usize| n as f64 * 100.0 / total as f64;
            println!(
                "\nnumber of false positives {} [{:.4}%] out of {}",
                filter_positives,
                percent(filter_positives),
                total
            );
            println!(
                "\nnumber of actual positives {} [{:.4}%] out of {}",
                matches,
                percent(matches),
                total
            );
        }
        None => println!("\nno secondary file with strings provided"),
    }

    println!("\nBenchmarking construction speed");
    let fastest = bench(|| {
        if let Err(err) = filter.populate(&hashes) {
            error!(%err, "construction failed");
        }
    });
    pretty_print(inputs.len(), bytes, "BinaryFuse16::populate", fastest);

    ExitCode::SUCCESS
}
