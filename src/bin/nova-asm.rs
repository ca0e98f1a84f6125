use clap::Parser;
use nova16::Assembler;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// The Nova-16 two-pass assembler: translates `.asm` source into a `.bin` image
/// and, when the program uses ORG, a sibling `.org` segment file.
#[derive(Parser)]
#[command(name = "nova-asm", version, about)]
struct Args {
    /// Assembly source file (.asm)
    file: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Could not read {}: {}", args.file.display(), error);
            return ExitCode::FAILURE;
        }
    };
    let assembly = match Assembler::new().assemble(&source) {
        Ok(assembly) => assembly,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}", error);
            }
            eprintln!("Assembly failed with {} error(s)", errors.len());
            return ExitCode::FAILURE;
        }
    };
    let bin_path = args.file.with_extension("bin");
    if let Err(error) = fs::write(&bin_path, &assembly.binary) {
        eprintln!("Could not write {}: {}", bin_path.display(), error);
        return ExitCode::FAILURE;
    }
    if assembly.needs_org_file() {
        let org_path = args.file.with_extension("org");
        if let Err(error) = fs::write(&org_path, assembly.org_records()) {
            eprintln!("Could not write {}: {}", org_path.display(), error);
            return ExitCode::FAILURE;
        }
        println!("ORG information written to {}", org_path.display());
    }
    println!(
        "Assembly complete: {} bytes written to {}",
        assembly.binary.len(),
        bin_path.display()
    );
    ExitCode::SUCCESS
}
