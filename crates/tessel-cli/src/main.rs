use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossbeam_channel::{Receiver, unbounded};
use tessel_core::{
    AbortFlag, Axis, CallbackControl, DispatchOptions, DispatchReport, Dispatcher, Extent,
    SplitConfig, SplitMode, SplitPath, TesselError, Volume,
};

#[derive(Parser)]
#[command(
    name = "tessel",
    version,
    about = "Tessel extent decomposition CLI",
    long_about = "Inspect how an extent is split into pieces and run a synthetic kernel over them."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the piece table of a decomposition.
    Split {
        #[command(flatten)]
        split: SplitArgs,

        /// Number of pieces to request.
        #[arg(long, default_value_t = num_cpus::get())]
        pieces: usize,
    },
    /// Fill a synthetic volume through the dispatcher and verify coverage.
    Run {
        #[command(flatten)]
        split: SplitArgs,

        /// Worker threads for fixed dispatch.
        #[arg(long, default_value_t = num_cpus::get())]
        threads: usize,

        /// Run dynamic dispatch on a dedicated pool of this many threads.
        #[arg(long)]
        pool_threads: Option<usize>,

        /// Use dynamic work-stealing dispatch instead of fixed threads.
        #[arg(long, default_value_t = false)]
        smp: bool,

        /// Target bytes per dynamically scheduled piece (supports suffixes K/M/G).
        #[arg(long, default_value = "64K", value_parser = parse_size)]
        bytes_per_piece: usize,

        /// Bytes per output sample used for the dynamic estimate.
        #[arg(long, default_value_t = 4)]
        bytes_per_sample: usize,

        /// Request an abort after this many pieces have finished.
        #[arg(long)]
        abort_after: Option<usize>,

        /// Suppress the progress line.
        #[arg(long, default_value_t = false)]
        quiet: bool,
    },
}

#[derive(Args)]
struct SplitArgs {
    /// Whole extent as x0,x1,y0,y1,z0,z1 (inclusive).
    #[arg(long, value_parser = parse_extent)]
    extent: Extent,

    /// How many axes may be subdivided.
    #[arg(long, value_enum, default_value_t = ModeArg::Slab)]
    mode: ModeArg,

    /// Axis priority, e.g. z,y,x. An empty value disables splitting.
    #[arg(long, default_value = "z,y,x", value_parser = parse_path)]
    path: SplitPath,

    /// Minimum piece size per axis as x,y,z.
    #[arg(long, default_value = "16,1,1", value_parser = parse_min_size)]
    min_size: [i32; 3],
}

impl SplitArgs {
    fn config(&self) -> SplitConfig {
        SplitConfig::new(self.mode.into(), self.path).with_min_piece_size(self.min_size)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Slab,
    Beam,
    Block,
}

impl From<ModeArg> for SplitMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Slab => SplitMode::Slab,
            ModeArg::Beam => SplitMode::Beam,
            ModeArg::Block => SplitMode::Block,
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Split { split, pieces } => split_command(&split, pieces),
        Commands::Run {
            split,
            threads,
            pool_threads,
            smp,
            bytes_per_piece,
            bytes_per_sample,
            abort_after,
            quiet,
        } => {
            let options = DispatchOptions {
                split: split.config(),
                enable_smp: Some(smp),
                number_of_threads: threads,
                dynamic_pool_threads: pool_threads,
                desired_bytes_per_piece: bytes_per_piece as u64,
                bytes_per_sample,
            };
            run_command(split.extent, options, abort_after, quiet)?
        }
    }

    Ok(())
}

fn split_command(args: &SplitArgs, pieces: usize) {
    let config = args.config();
    let layout = config.layout(&args.extent, pieces);
    let [dx, dy, dz] = layout.divisions();
    let axes: Vec<String> = layout.split_axes().iter().map(Axis::to_string).collect();

    println!("whole: {} ({} samples)", args.extent, args.extent.num_samples());
    println!(
        "mode: {} | path: {} | min size: {:?}",
        config.mode, config.path, config.min_piece_size
    );
    println!(
        "pieces: {} of {} requested | divisions x{dx} y{dy} z{dz} | split axes: [{}]",
        layout.total(),
        pieces,
        axes.join(",")
    );

    for (piece, extent) in layout.pieces().enumerate() {
        let label = extent.to_string();
        println!("  {piece:>5}  {label:<36} {:>12} samples", extent.num_samples());
    }
}

fn run_command(
    whole: Extent,
    options: DispatchOptions,
    abort_after: Option<usize>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = Volume::new(whole, 1, 1u32);
    let mut output = Volume::new(whole, 1, 0u32);
    let dispatcher = Dispatcher::new(options);

    let (progress_tx, progress_rx) = unbounded::<f64>();
    let printer = (!quiet).then(|| thread::spawn(move || print_progress(progress_rx)));

    let abort = AbortFlag::new();
    let finished = AtomicUsize::new(0);
    let control = CallbackControl::with_abort(
        move |fraction| {
            let _ = progress_tx.send(fraction);
        },
        abort.clone(),
    );

    let result = dispatcher.run_with_output(
        whole,
        &input,
        &mut output,
        &control,
        |context, input, writer| {
            let [x0, x1, ..] = context.extent().as_array();
            let rows = (context.extent().len(Axis::Y) * context.extent().len(Axis::Z)) as u64;
            let mut ticker = context.row_ticker(rows);
            writer.for_each_row(|y, z, row| {
                if let Some(source) = input.row(x0, x1, y, z) {
                    for (out, value) in row.iter_mut().zip(source) {
                        *out += *value;
                    }
                }
                ticker.tick();
            });

            let done = finished.fetch_add(1, Ordering::AcqRel) + 1;
            if abort_after.is_some_and(|limit| done >= limit) {
                abort.abort();
            }
            Ok(())
        },
    );

    drop(control);
    if let Some(printer) = printer {
        let _ = printer.join();
    }

    let report = result?;
    print_report(&report);
    verify_coverage(&output, &report)?;
    Ok(())
}

fn print_progress(progress: Receiver<f64>) {
    let mut stderr = io::stderr();
    for fraction in progress {
        let _ = write!(stderr, "\rprogress {:>5.1}%", fraction * 100.0);
        let _ = stderr.flush();
    }
    let _ = writeln!(stderr);
}

fn verify_coverage(output: &Volume<u32>, report: &DispatchReport) -> Result<(), TesselError> {
    let mut unwritten = 0u64;
    for &count in output.as_slice() {
        match count {
            0 => unwritten += 1,
            1 => {}
            other => {
                return Err(TesselError::InvalidView(format!(
                    "sample written {other} times"
                )));
            }
        }
    }

    if unwritten > 0 && !report.aborted {
        return Err(TesselError::InvalidView(format!(
            "{unwritten} sample(s) never written"
        )));
    }

    println!(
        "  coverage: {} of {} samples written exactly once",
        output.extent().num_samples() - unwritten,
        output.extent().num_samples()
    );
    Ok(())
}

fn print_report(report: &DispatchReport) {
    println!("dispatch complete");
    println!("  strategy: {:?}", report.strategy);
    println!("  whole: {}", report.whole);
    println!("  elapsed: {}", format_duration(report.elapsed));
    println!(
        "  pieces: {} requested | {} produced | {} completed | {} failed | {} skipped",
        report.pieces_requested,
        report.pieces_total,
        report.pieces_completed,
        report.pieces_failed,
        report.pieces_skipped
    );
    if report.aborted {
        println!("  aborted: yes");
    }
    println!(
        "  mean utilization: {:.2}%",
        report.mean_utilization() * 100.0
    );
    println!("  worker runtime:");
    for worker in &report.workers {
        println!(
            "    w{:02} pieces {:>6} | uptime {:>8} | busy {:>8} | idle {:>8} | util {:>6.2}%",
            worker.worker_id,
            worker.pieces_processed,
            format_duration(worker.uptime),
            format_duration(worker.busy),
            format_duration(worker.idle),
            worker.utilization * 100.0,
        );
    }
}

fn parse_i32_list<const N: usize>(value: &str, what: &str) -> Result<[i32; N], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("{what} needs {N} comma-separated integers, got '{value}'"));
    }

    let mut out = [0i32; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("invalid integer '{part}' in {what} '{value}'"))?;
    }
    Ok(out)
}

fn parse_extent(value: &str) -> Result<Extent, String> {
    parse_i32_list::<6>(value, "extent").map(Extent::from_array)
}

fn parse_min_size(value: &str) -> Result<[i32; 3], String> {
    parse_i32_list::<3>(value, "min size")
}

fn parse_path(value: &str) -> Result<SplitPath, String> {
    let mut axes = Vec::new();
    for token in value.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let axis = match token.to_ascii_lowercase().as_str() {
            "x" => Axis::X,
            "y" => Axis::Y,
            "z" => Axis::Z,
            other => return Err(format!("unknown axis '{other}' in path '{value}'")),
        };
        axes.push(axis);
    }
    SplitPath::new(&axes).map_err(|err| err.to_string())
}

fn parse_size(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let split_at = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (num_part, suffix_part) = trimmed.split_at(split_at);
    if num_part.is_empty() {
        return Err(format!("invalid size: {value}"));
    }

    let base: usize = num_part
        .parse()
        .map_err(|_| format!("invalid size number: {value}"))?;

    let multiplier = match suffix_part.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1usize,
        "k" | "kb" => 1024usize,
        "m" | "mb" => 1024usize * 1024usize,
        "g" | "gb" => 1024usize * 1024usize * 1024usize,
        other => {
            return Err(format!("invalid size suffix '{other}' in '{value}'"));
        }
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: {value}"))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let millis = duration.subsec_millis();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        format!("{minutes:02}:{seconds:02}")
    } else if total_seconds > 0 || millis > 0 {
        format!("{seconds}.{millis:03}s")
    } else {
        format!("{}us", duration.as_micros())
    }
}
