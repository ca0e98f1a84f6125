use clap::Parser;
use nova16::disassemble;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// The Nova-16 disassembler: prints one formatted line per decoded instruction,
/// rendering detected string data as DEFSTR directives.
#[derive(Parser)]
#[command(name = "nova-dis", version, about)]
struct Args {
    /// Binary image to disassemble (.bin)
    file: PathBuf,
    /// Base address the image was assembled at, e.g. 0x1000
    #[arg(long, value_parser = parse_address, default_value = "0x0000")]
    org: u16,
}

/// Accepts `0x`-prefixed hex or plain decimal addresses.
fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|_| format!("invalid address: {}", text))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let image = match fs::read(&args.file) {
        Ok(image) => image,
        Err(error) => {
            eprintln!("Could not read {}: {}", args.file.display(), error);
            return ExitCode::FAILURE;
        }
    };
    for line in disassemble(&image, args.org) {
        println!("{}", line.formatted());
    }
    ExitCode::SUCCESS
}
