use clap::Parser;
use std::error::Error;
use std::io::{BufRead, BufReader};

use vitalsrelay::vitals::{normalize, parse_frame, FrameOutcome};

#[derive(Parser)]
#[command(name = "debug_frames")]
#[command(about = "Run a serial capture through the frame parser and normalizer", long_about = None)]
struct Args {
    /// Capture file, one sensor line per row ("-" for stdin)
    #[arg(default_value = "-")]
    input: String,

    /// Print every rejected line with its reason
    #[arg(short, long)]
    verbose: bool,

    /// Print samples as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        Box::new(BufReader::new(std::fs::File::open(&args.input)?))
    };

    println!("Frame Parser Debug Tool\n");
    println!("{}", "=".repeat(80));

    let mut parsed = 0usize;
    let mut rejected = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        match parse_frame(line) {
            FrameOutcome::Parsed(reading) => {
                parsed += 1;
                let sample = normalize(&reading);
                if args.json {
                    println!("{}", serde_json::to_string(&sample)?);
                } else {
                    let bp = sample.blood_pressure();
                    println!(
                        "{:>5}  SpO2 {:>5.1}%  HR {:>5.1}  avg {:>5.1}  BP {:>5.1}/{:<5.1}",
                        index + 1,
                        sample.oxygen(),
                        sample.heart_rate(),
                        sample.avg_heart_rate(),
                        bp.systolic,
                        bp.diastolic
                    );
                }
            }
            FrameOutcome::Rejected(reason) => {
                rejected += 1;
                if args.verbose {
                    println!("{:>5}  rejected ({}): {:?}", index + 1, reason, line);
                }
            }
        }
    }

    println!("\n{}", "=".repeat(80));
    println!("Parsed:   {}", parsed);
    println!("Rejected: {}", rejected);

    Ok(())
}
