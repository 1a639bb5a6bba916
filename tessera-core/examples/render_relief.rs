//! Build a small graph (noise -> normal map) and write it as a PNG.
//!
//! ```sh
//! cargo run -p tessera-core --example render_relief
//! ```

use tessera::{NormalMap, ParamValue, Point, TextureGraph, ValueNoise};

fn main() -> anyhow::Result<()> {
    let mut graph = TextureGraph::new();
    let noise = graph.add_node(Box::new(ValueNoise::new()), Point::ZERO);
    let relief = graph.add_node(Box::new(NormalMap::new()), Point::new(180.0, 0.0));
    assert!(graph.connect(noise, relief, 0));

    graph.set_param(noise, "octaves", ParamValue::Int(4))?;
    graph.set_param(relief, "strength", ParamValue::Float(0.02))?;

    let frame = tessera::render_frame(&graph, relief, 256, 256)?;
    image::save_buffer_with_format(
        "relief.png",
        &frame.to_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    eprintln!("wrote relief.png");

    // The graph round-trips through the text format.
    let text = tessera::save_graph(&graph);
    println!("{text}");
    Ok(())
}
