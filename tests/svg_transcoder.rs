// Transcoder round-trip tests
//
// The fixture is a six-path, two-color SVG embroidery document spanning
// (28.5, 7.4) to (49.4, 42.9) millimeters. Both stroke colors are exact
// palette colors, so the round trip through PES version 1 reproduces the
// text byte for byte.

use peslib::prelude::*;

const XML: &str = "<?xml version=\"1.0\"?>\n\
<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\"\n\
\x20 \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n\
<svg width=\"20.9mm\" height=\"35.5mm\" version=\"1.1\"\n\
\x20    viewBox=\"28.5 7.4 20.9 35.5\" xmlns=\"http://www.w3.org/2000/svg\">\n\
\x20 <path stroke=\"#feca15\" fill=\"none\" stroke-width=\"0.2\"\n\
\x20       d=\"M  30.5  23.7 L  30.5  23.7 L  30.4  24.1 L  30.3  24.5\n\
\x20          L  30.3  24.9 L  29.5  25.3 L  28.9  24.3 L  29.5  23.2\n\
\x20          L  30.8  23.8 L  29.6  24.9 L  28.5  24.9 L  29.0  23.8\" />\n\
\x20 <path stroke=\"#feca15\" fill=\"none\" stroke-width=\"0.2\"\n\
\x20       d=\"M  40.6  26.9 L  45.9  10.5\" />\n\
\x20 <path stroke=\"#feca15\" fill=\"none\" stroke-width=\"0.2\"\n\
\x20       d=\"M  45.9  10.5 L  45.9  10.5 L  45.6  10.7 L  45.2  10.9\n\
\x20          L  44.9  11.1 L  44.3  11.3 L  43.3  11.9 L  41.6  12.7\n\
\x20          L  43.3  11.2 L  45.4   9.9 L  47.7   8.4 L  49.4   7.4\" />\n\
\x20 <path stroke=\"#96aa02\" fill=\"none\" stroke-width=\"0.2\"\n\
\x20       d=\"M  42.3   8.3 L  29.8  42.9\" />\n\
\x20 <path stroke=\"#96aa02\" fill=\"none\" stroke-width=\"0.2\"\n\
\x20       d=\"M  29.8  42.9 L  29.8  42.9 L  29.9  42.4 L  29.9  42.1\n\
\x20          L  30.0  41.6 L  29.4  41.2 L  28.8  39.8 L  28.8  37.9\" />\n\
\x20 <path stroke=\"#96aa02\" fill=\"none\" stroke-width=\"0.2\"\n\
\x20       d=\"M  39.4  36.8 L  40.6  27.3\" />\n\
</svg>\n";

fn svg_to_pes(text: &str) -> Vec<u8> {
    let mut pes = Vec::new();
    svg_emb_to_pes1(text, |chunk| {
        pes.extend_from_slice(chunk);
        true
    })
    .unwrap();
    pes
}

fn pes_to_svg(data: &[u8]) -> String {
    let mut svg = Vec::new();
    pes_to_svg_emb(data, |chunk| {
        svg.extend_from_slice(chunk);
        true
    })
    .unwrap();
    String::from_utf8(svg).unwrap()
}

#[test]
fn test_svg_to_pes_magic() {
    let pes = svg_to_pes(XML);
    assert!(pes.len() >= 8);
    assert_eq!(&pes[..8], b"#PES0001");
}

#[test]
fn test_svg_round_trip_is_byte_identical() {
    let pes = svg_to_pes(XML);
    let svg = pes_to_svg(&pes);
    assert_eq!(svg, XML);
}

#[test]
fn test_pes_round_trip_is_byte_identical() {
    let pes = svg_to_pes(XML);
    let svg = pes_to_svg(&pes);
    let pes_again = svg_to_pes(&svg);
    assert_eq!(pes_again, pes);
}

#[test]
fn test_decoded_structure() {
    let pes = svg_to_pes(XML);
    let decoder = PesDecoder::new(&pes).unwrap();

    assert_eq!(decoder.version(), "0001");
    assert_eq!(decoder.thread_count(), 2);
    assert_eq!(decoder.thread(0).rgb, Rgb::new(0xfe, 0xca, 0x15));
    assert_eq!(decoder.thread(1).rgb, Rgb::new(0x96, 0xaa, 0x02));

    // Six paths, five of them preceded by a two-stitch jump block.
    let mut normal_blocks = 0;
    let mut jump_blocks = 0;
    decoder
        .for_each_stitch(|event| {
            if let PesStitchEvent::Block { stitch_type, .. } = event {
                if stitch_type == StitchKind::Normal.code() {
                    normal_blocks += 1;
                } else {
                    jump_blocks += 1;
                }
            }
            true
        })
        .unwrap();
    assert_eq!(normal_blocks, 6);
    assert_eq!(jump_blocks, 5);

    // 38 path coordinates plus two stitches per jump block.
    assert_eq!(decoder.stitch_count(), 38 + 2 * 5);

    // The embedded PEC section carries both color runs.
    assert_eq!(decoder.pec().thread_count(), 2);
    assert_eq!(decoder.pec().label(), "LA:                ");
}

#[test]
fn test_manual_transcode_matches_and_size_probes() {
    // Rebuild the same document by hand from decoder events; the emitted
    // bytes and the size probe must both agree with the transcoder.
    let pes = svg_to_pes(XML);

    let decoder = SvgEmbDecoder::new(XML).unwrap();
    let mut encoder = PesEncoder::new();
    for i in 0..decoder.thread_count() {
        encoder.append_thread(decoder.thread(i)).unwrap();
    }
    encoder.set_transform(decoder.affine_transform());

    let mut thread_index = 0;
    let mut jump = false;
    decoder
        .for_each_stitch(|event| {
            match event {
                SvgEmbStitchEvent::Block {
                    block_index,
                    thread,
                    ..
                } => {
                    thread_index = thread.index;
                    jump = block_index != 0;
                }
                SvgEmbStitchEvent::Stitch { x, y, .. } => {
                    if jump {
                        encoder.append_jump_stitch(thread_index, x, y).unwrap();
                    } else {
                        encoder.append_stitch(thread_index, x, y).unwrap();
                    }
                    jump = false;
                }
            }
            true
        })
        .unwrap();

    let mut emitted = Vec::new();
    encoder
        .emit1(|chunk| {
            emitted.extend_from_slice(chunk);
            true
        })
        .unwrap();

    assert_eq!(emitted, pes);
    assert_eq!(encoder.size_1().unwrap(), pes.len());
}
