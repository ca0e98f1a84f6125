use clap::Parser;
use nova16::{Machine, Options};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// The headless Nova-16 runner: loads a `.bin` image (with optional sibling
/// `.org` segment file), executes until HLT, a fault, or the step limit, then
/// reports the final machine state.
#[derive(Parser)]
#[command(name = "nova16", version, about)]
struct Args {
    /// Binary image to execute (.bin)
    file: PathBuf,
    /// JSON options file (see Options); defaults apply when absent
    #[arg(long)]
    options: Option<PathBuf>,
    /// Override the instruction budget from the options file
    #[arg(long)]
    steps: Option<u64>,
    /// Print the composited screen as an ASCII density map after the run
    #[arg(long)]
    screen: bool,
}

fn load_options(path: Option<&Path>) -> Result<Options, String> {
    match path {
        Some(path) => Options::load_from_file(path).map_err(|error| error.to_string()),
        None => Ok(Options::default()),
    }
}

fn build_machine(options: Options) -> Machine {
    #[cfg(feature = "audio")]
    if options.enable_audio {
        if let Some(audio) = nova16::RodioAudio::new() {
            return Machine::with_audio(options, Box::new(audio));
        }
        eprintln!("No audio output device available; continuing silent");
    }
    Machine::new(options)
}

fn print_registers(machine: &Machine) {
    let registers = &machine.registers;
    for (i, value) in registers.r.iter().enumerate() {
        print!("R{}={:02X} ", i, value);
    }
    println!();
    for (i, value) in registers.p.iter().enumerate() {
        print!("P{}={:04X} ", i, value);
    }
    println!();
    println!(
        "PC={:04X} SP={:04X} FP={:04X} FLAGS={:04X}",
        registers.pc,
        registers.sp(),
        registers.fp(),
        registers.flags.pack()
    );
}

/// Renders the 256x256 screen as a 64x64 ASCII density map.
fn print_screen(machine: &mut Machine) {
    let screen = machine.get_screen();
    let shades = [b' ', b'.', b':', b'*', b'#'];
    for block_y in 0..64 {
        let mut row = String::with_capacity(64);
        for block_x in 0..64 {
            let mut lit = 0usize;
            for y in 0..4 {
                for x in 0..4 {
                    if screen[block_y * 4 + y][block_x * 4 + x] != 0 {
                        lit += 1;
                    }
                }
            }
            row.push(shades[(lit * (shades.len() - 1) + 15) / 16] as char);
        }
        println!("{}", row);
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut options = match load_options(args.options.as_deref()) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    if let Some(steps) = args.steps {
        options.step_limit = steps;
    }
    let mut machine = build_machine(options);
    let entry = match machine.load(&args.file) {
        Ok(entry) => entry,
        Err(error) => {
            eprintln!("{}", error);
            return ExitCode::FAILURE;
        }
    };
    println!("Loaded {} (entry 0x{:04X})", args.file.display(), entry);
    for _ in 0..options.step_limit {
        if machine.halted() {
            break;
        }
        if let Err(error) = machine.step() {
            eprintln!("{}", error);
            print_registers(&machine);
            return ExitCode::FAILURE;
        }
    }
    if machine.halted() {
        println!("Halted after {} cycles", machine.cycles());
    } else {
        println!("Step limit reached after {} cycles", machine.cycles());
    }
    print_registers(&machine);
    if args.screen {
        print_screen(&mut machine);
    }
    ExitCode::SUCCESS
}
