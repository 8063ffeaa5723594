//! svg-emb-to-pes - convert SVG embroidery text to a PES embroidery file
//!
//! Usage:
//!   svg-emb-to-pes [SVG embroidery file] [PES file]
//!
//! Without arguments the SVG text is read from standard input; without an
//! output argument the PES file is written to standard output.

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
            eprintln!("svg-emb-to-pes: Invalid number of arguments");
            eprintln!("Try 'svg-emb-to-pes --help' for more information.");
            false
        }
    };

    if !valid {
        process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: svg-emb-to-pes [SVG embroidery file] [PES file]");
    println!();
    println!("The svg-emb-to-pes tool converts a primitive form of SVG to a version 1 PES");
    println!("embroidery file. Without arguments the SVG text is read from standard input");
    println!("and the PES file is written to standard output.");
    println!();
    println!("Options:");
    println!();
    println!("  --help  Print this help text and exit.");
}

fn valid_pes_extension(path: &str) -> bool {
    path.len() >= 4 && path.to_ascii_lowercase().ends_with(".pes")
}

fn transcode(svg_path: Option<&str>, pes_path: Option<&str>) -> bool {
    if let Some(path) = pes_path {
        if path != "-" && !valid_pes_extension(path) {
            eprintln!("{}: Invalid PES extension", path);
            return false;
        }
    }

    let svg_name = match svg_path {
        Some(path) if path != "-" => path,
        _ => "stdin",
    };

    let mut svg = String::new();
    let read = match svg_path {
        Some(path) if path != "-" => std::fs::read_to_string(path).map(|text| svg = text),
        _ => std::io::stdin().read_to_string(&mut svg).map(|_| ()),
    };
    if let Err(error) = read {
        eprintln!("{}: {}", svg_name, error);
        return false;
    }

    let mut pes = Vec::new();
    if let Err(error) = svg_emb_to_pes1(&svg, |chunk| {
        pes.extend_from_slice(chunk);
        true
    }) {
        eprintln!(
            "{}: SVG embroidery to PES transcoding failed: {}",
            svg_name, error
        );
        return false;
    }

    let written = match pes_path {
        Some(path) if path != "-" => std::fs::write(path, &pes),
        _ => std::io::stdout().write_all(&pes),
    };
    if let Err(error) = written {
        eprintln!("{}: {}", pes_path.unwrap_or("stdout"), error);
        return false;
    }

    true
}
