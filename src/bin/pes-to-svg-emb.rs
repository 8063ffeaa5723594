//! pes-to-svg-emb - convert a PES embroidery file to SVG embroidery text
//!
//! Usage:
//!   pes-to-svg-emb [PES file] [SVG embroidery file]
//!
//! Without arguments the PES file is read from standard input; without an
//! output argument the SVG text is printed to standard output.

use peslib::prelude::*;
use std::env;
use std::io::{Read, Write};
use std::process;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let valid = match args.len() {
        0 => transcode(None, None),
        1 if args[0] == "--help" => {
            print_usage();
            true
        }
        1 => transcode(Some(&args[0]), None),
        2 => transcode(Some(&args[0]), Some(&args[1])),
        _ => {
            eprintln!("pes-to-svg-emb: Invalid number of arguments");
            eprintln!("Try 'pes-to-svg-emb --help' for more information.");
            false
        }
    };

    if !valid {
        process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: pes-to-svg-emb [PES file] [SVG embroidery file]");
    println!();
    println!("The pes-to-svg-emb tool converts a PES embroidery file to a primitive form");
    println!("of SVG. Without arguments the PES file is read from standard input and the");
    println!("SVG text is printed to standard output.");
    println!();
    println!("Options:");
    println!();
    println!("  --help  Print this help text and exit.");
}

fn valid_svg_extension(path: &str) -> bool {
    path.len() >= 4 && path.to_ascii_lowercase().ends_with(".svg")
}

fn transcode(pes_path: Option<&str>, svg_path: Option<&str>) -> bool {
    if let Some(path) = svg_path {
        if path != "-" && !valid_svg_extension(path) {
            eprintln!("{}: Invalid SVG extension", path);
            return false;
        }
    }

    let pes_name = match pes_path {
        Some(path) if path != "-" => path,
        _ => "stdin",
    };

    let mut pes = Vec::new();
    let read = match pes_path {
        Some(path) if path != "-" => std::fs::read(path).map(|data| pes = data),
        _ => std::io::stdin().read_to_end(&mut pes).map(|_| ()),
    };
    if let Err(error) = read {
        eprintln!("{}: {}", pes_name, error);
        return false;
    }

    let mut svg = Vec::new();
    if let Err(error) = pes_to_svg_emb(&pes, |chunk| {
        svg.extend_from_slice(chunk);
        true
    }) {
        eprintln!("{}: PES to SVG embroidery transcoding failed: {}", pes_name, error);
        return false;
    }

    let written = match svg_path {
        Some(path) if path != "-" => std::fs::write(path, &svg),
        _ => std::io::stdout().write_all(&svg),
    };
    if let Err(error) = written {
        eprintln!("{}: {}", svg_path.unwrap_or("stdout"), error);
        return false;
    }

    true
}
