//! pes-info - print the content of PES embroidery files
//!
//! Usage:
//!   pes-info [PES file]...
//!
//! Without arguments the PES file is read from standard input.

use peslib::prelude::*;
use std::env;
use std::io::Read;
use std::process;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--help") {
        print_usage();
        return;
    }

    let mut valid = true;

    if args.is_empty() {
        valid = print_path("-");
    } else {
        for path in &args {
            if !print_path(path) {
                valid = false;
            }
        }
    }

    if !valid {
        process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: pes-info [PES file]...");
    println!();
    println!("The pes-info tool prints content of PES embroidery files. Without arguments");
    println!("the PES file is read from standard input.");
    println!();
    println!("Options:");
    println!();
    println!("  --help  Print this help text and exit.");
}

fn read_input(path: &str) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    if path == "-" {
        std::io::stdin().read_to_end(&mut data)?;
    } else {
        data = std::fs::read(path)?;
    }
    Ok(data)
}

fn print_path(path: &str) -> bool {
    let name = if path == "-" { "stdin" } else { path };

    let data = match read_input(path) {
        Ok(data) => data,
        Err(error) => {
            eprintln!("{}: {}", name, error);
            return false;
        }
    };

    if data.len() < 8 {
        eprintln!("{}: File too short", name);
        return false;
    }

    println!("header id {}", String::from_utf8_lossy(&data[0..4]));
    println!("header version {}", String::from_utf8_lossy(&data[4..8]));

    let decoder = match PesDecoder::new(&data) {
        Ok(decoder) => decoder,
        Err(error) => {
            eprintln!("{}: {}", name, error);
            return false;
        }
    };

    let mut valid = print_pes(name, &decoder);
    if !print_pec(name, decoder.pec()) {
        valid = false;
    }

    valid
}

fn stitch_type_name(stitch_type: u16) -> String {
    match StitchKind::from_code(stitch_type) {
        Some(StitchKind::Normal) => "NORMAL".to_string(),
        Some(StitchKind::Jump) => "JUMP".to_string(),
        Some(StitchKind::Trim) => "TRIM".to_string(),
        Some(StitchKind::Stop) => "STOP".to_string(),
        None => stitch_type.to_string(),
    }
}

fn thread_description(thread: &PecThread) -> String {
    format!(
        " {} {} {} {:>4} {:>2} {}",
        thread.index,
        thread.rgb.hex(),
        thread.type_tag,
        thread.code,
        thread.id,
        thread.name
    )
}

fn print_pes(name: &str, decoder: &PesDecoder) -> bool {
    println!("header name {}", decoder.name());

    if decoder.hoop_width() != 0.0 || decoder.hoop_height() != 0.0 {
        println!(
            "header hoop size {:.0} {:.0}",
            decoder.hoop_width(),
            decoder.hoop_height()
        );
    }

    for i in 0..decoder.thread_count() {
        println!("thread{}", thread_description(&decoder.thread(i)));
    }

    let transform = decoder.affine_transform();
    let m = &transform.matrix;
    println!(
        "CEmbOne transform {} {} {} {} {} {}",
        m[0][0], m[0][1], m[1][0], m[1][1], m[2][0], m[2][1]
    );

    println!(
        "CEmbOne translation {:.1} {:.1}",
        decoder.translation_x(),
        decoder.translation_y()
    );
    println!("CEmbOne size {:.1} {:.1}", decoder.width(), decoder.height());

    let bounds1 = decoder.bounds1();
    println!(
        "CEmbOne bounds1 {:.1} {:.1} {:.1} {:.1}",
        bounds1.0, bounds1.1, bounds1.2, bounds1.3
    );
    let bounds2 = decoder.bounds2();
    println!(
        "CEmbOne bounds2 {:.1} {:.1} {:.1} {:.1}",
        bounds2.0, bounds2.1, bounds2.2, bounds2.3
    );

    println!("CSewSeg stitch_count {}", decoder.stitch_count());

    let walked = decoder.for_each_stitch(|event| {
        match event {
            PesStitchEvent::Block {
                thread,
                stitch_count,
                stitch_type,
            } => println!(
                "CSewSeg block {} {} {}",
                thread.index,
                stitch_count,
                stitch_type_name(stitch_type)
            ),
            PesStitchEvent::Stitch { stitch_index, x, y } => {
                println!("CSewSeg stitch {:4} {:6.1} {:6.1}", stitch_index, x, y)
            }
        }
        true
    });

    if walked.is_err() {
        eprintln!("{}: PES stitch iterator error", name);
        return false;
    }

    true
}

fn print_pec(name: &str, decoder: &PecDecoder) -> bool {
    println!("PEC label {}", decoder.label());

    for i in 0..decoder.thread_count() {
        println!("PEC thread{}", thread_description(&decoder.thread(i)));
    }

    println!("PEC stitch_count {}", decoder.stitch_count());

    let walked = decoder.for_each_stitch(|stitch_index, x, y, kind| {
        println!(
            "PEC stitch {:4} {:6.1} {:6.1} {}",
            stitch_index,
            x,
            y,
            stitch_type_name(kind.code())
        );
        true
    });

    if walked.is_err() {
        eprintln!("{}: PEC stitch iterator error", name);
        return false;
    }

    println!(
        "PEC thumbnail size {} {}",
        decoder.thumbnail_width(),
        decoder.thumbnail_height()
    );

    print_thumbnails(decoder);

    true
}

fn print_thumbnail(decoder: &PecDecoder, thumbnail_index: usize) {
    for y in 0..decoder.thumbnail_height() {
        let mut line = String::from("  ");
        for x in 0..decoder.thumbnail_width() {
            line.push(if decoder.thumbnail_pixel(thumbnail_index, x, y) {
                '#'
            } else {
                '.'
            });
        }
        println!("{}", line);
    }
}

fn print_thumbnails(decoder: &PecDecoder) {
    println!("PEC thumbnail index 0");
    print_thumbnail(decoder, 0);

    for i in 0..decoder.thread_count() {
        let thread = decoder.thread(i);

        println!("PEC thumbnail index {} {}", i + 1, thread.name);
        print_thumbnail(decoder, i + 1);
    }
}
