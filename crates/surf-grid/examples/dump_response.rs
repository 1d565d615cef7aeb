use anyhow::Context;
use image::ImageReader;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use surf_grid::app::{draw_keypoints, write_json, KeypointOut};
use surf_grid::{
    build_scale_space, find_keypoints_scale_space, gray_from_grid, grid_from_gray, ChunkConfig,
    HessianParams, ScaleSpaceParams,
};

#[derive(Serialize)]
struct ResponseDump {
    image: String,
    width: u32,
    height: u32,
    chunk: usize,
    keypoints: Vec<KeypointOut>,
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let input: PathBuf = args
        .next()
        .context("usage: dump_response <image> [--chunk N]")?
        .into();

    let mut chunk: usize = 0;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--chunk" => {
                let v = args.next().context("expected an integer after --chunk")?;
                chunk = v
                    .parse()
                    .context("could not parse chunk size (use integer >= 0)")?;
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let img = ImageReader::open(&input)?.decode()?.to_luma8();
    let source = grid_from_gray(&img);

    let scale = ScaleSpaceParams::default().with_chunk(ChunkConfig::new(chunk));
    let started = Instant::now();
    let space = build_scale_space(&source, &scale)?;
    let build_ms = started.elapsed().as_secs_f64() * 1000.0;

    let started = Instant::now();
    let keypoints = find_keypoints_scale_space(&space, &HessianParams::default(), 2.0);
    let detect_ms = started.elapsed().as_secs_f64() * 1000.0;

    println!("image {}x{} pixels", img.width(), img.height());
    println!("layers: {:5.2} ms ({} layers, chunk={})", build_ms, space.layers.len(), chunk);
    println!("detect: {:5.2} ms", detect_ms);
    println!("Detected {} keypoints", keypoints.len());

    let json_out = input.with_extension("response.json");
    let dump = ResponseDump {
        image: input.to_string_lossy().into_owned(),
        width: img.width(),
        height: img.height(),
        chunk,
        keypoints: keypoints.iter().map(KeypointOut::from).collect(),
    };
    write_json(&json_out, &dump)?;
    println!("Saved JSON dump to {}", json_out.display());

    // first layer response, normalized to 8 bits
    if let Some(first) = space.layers.first() {
        let out = input.with_extension("response.png");
        gray_from_grid(&first.response).save(&out)?;
        println!("Saved response map to {}", out.display());
    }

    let mut vis = img.clone();
    draw_keypoints(&mut vis, &dump.keypoints);
    let out = input.with_extension("keypoints.png");
    vis.save(&out)?;
    println!("Saved visualization to {}", out.display());

    Ok(())
}
