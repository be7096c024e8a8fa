//! Cross Stencil Example
//!
//! Runs a 5-point cross stencil over an image with every buffering scheme
//! and checks the result against a direct computation.
//!
//! # Key Concepts
//!
//! 1. **TilingConfig::stencil**: input tiles grown by the kernel radius,
//!    with a zero halo around the image
//! 2. **Schedulers**: double, simplex and duplex buffering over small
//!    working buffers
//! 3. **TracingEngine**: counts what each scheme transferred
//!
//! # Run
//!
//! ```bash
//! cargo run --example stencil
//! ```

use tilestream::{
    DeferredEngine, DuplexBuffering, ExportDoubleBuffering, ImportDoubleBuffering, Region, Shape, SimplexBuffering,
    SubTensor, Tensor, TileResult, Tiler, TilingConfig, TracingEngine, TransferStats,
};

const IMAGE: Shape = Shape::new_2d(128, 96);
const CORE: Shape = Shape::new_2d(32, 16);
const RADIUS: usize = 1;

fn make_image() -> Vec<u32> {
    (0..IMAGE.num_elements() as u32).map(|i| i.wrapping_mul(2_654_435_761) >> 24).collect()
}

fn cross(input: &SubTensor<'_, u32>, output: &SubTensor<'_, u32>) {
    let shape = output.shape();
    for y in 0..shape.height {
        for x in 0..shape.width {
            let sum = input.read(x + 1, y + 1, 0)
                + input.read(x, y + 1, 0)
                + input.read(x + 2, y + 1, 0)
                + input.read(x + 1, y, 0)
                + input.read(x + 1, y + 2, 0);
            output.write(sum, x, y, 0);
        }
    }
}

fn result_check(input: &[u32], output: &[u32]) -> usize {
    let (w, h) = (IMAGE.width as isize, IMAGE.height as isize);
    let at = |x: isize, y: isize| {
        if x < 0 || y < 0 || x >= w || y >= h {
            0
        } else {
            input[(y * w + x) as usize]
        }
    };
    let mut errors = 0;
    for y in 0..h {
        for x in 0..w {
            let expected = at(x, y) + at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1);
            if output[(y * w + x) as usize] != expected {
                errors += 1;
            }
        }
    }
    errors
}

fn tilers() -> (Tiler, Tiler) {
    (
        TilingConfig::stencil(IMAGE, CORE, RADIUS).build(),
        TilingConfig::new(IMAGE, CORE).build(),
    )
}

fn in_tile_len() -> usize {
    (CORE.width + 2 * RADIUS) * (CORE.height + 2 * RADIUS)
}

fn run_double(input: &mut [u32], output: &mut [u32]) -> TileResult<TransferStats> {
    let (in_tiler, out_tiler) = tilers();
    let (mut a, mut b) = (vec![0u32; in_tile_len()], vec![0u32; in_tile_len()]);
    let (mut c, mut d) = (vec![0u32; CORE.num_elements()], vec![0u32; CORE.num_elements()]);
    let ext_in = Tensor::dense(Region::new(input), IMAGE);
    let ext_out = Tensor::dense(Region::new(output), IMAGE);

    let mut import_engine = TracingEngine::new(DeferredEngine::new());
    let mut export_engine = TracingEngine::new(DeferredEngine::new());
    let mut import = ImportDoubleBuffering::new(
        Region::new(&mut a),
        Region::new(&mut b),
        ext_in,
        &mut import_engine,
        in_tiler.get_tile(0),
    )?;
    let mut export = ExportDoubleBuffering::new(Region::new(&mut c), Region::new(&mut d), ext_out, &mut export_engine);

    for i in 0..out_tiler.tile_count() as isize {
        let tile_in = import.step_buffering(in_tiler.get_tile(i + 1))?;
        let tile_out = export.step_buffering(out_tiler.get_tile(i))?;
        cross(&tile_in, &tile_out);
    }
    import.finish_buffering()?;
    export.finish_buffering()?;

    let (i, e) = (import_engine.stats(), export_engine.stats());
    Ok(TransferStats {
        imports: i.imports,
        exports: e.exports,
        fills: i.fills,
        waits: i.waits + e.waits,
        elements: i.elements + e.elements,
    })
}

fn run_simplex(input: &mut [u32], output: &mut [u32]) -> TileResult<TransferStats> {
    let (in_tiler, out_tiler) = tilers();
    let mut bufs = [vec![0u32; in_tile_len()], vec![0u32; in_tile_len()], vec![0u32; in_tile_len()]];
    let [a, b, c] = &mut bufs;
    let ext_in = Tensor::dense(Region::new(input), IMAGE);
    let ext_out = Tensor::dense(Region::new(output), IMAGE);

    let mut engine = TracingEngine::new(DeferredEngine::new());
    let mut pipeline = SimplexBuffering::new(
        Region::new(a),
        Region::new(b),
        Region::new(c),
        ext_in,
        ext_out,
        &mut engine,
        in_tiler.get_tile(0),
    )?;
    for i in 0..out_tiler.tile_count() as isize {
        let io = pipeline.step_buffering(in_tiler.get_tile(i + 1), out_tiler.get_tile(i))?;
        cross(&io.imported_to, &io.to_export_from);
    }
    pipeline.finish_buffering()?;
    Ok(engine.stats())
}

fn run_duplex(input: &mut [u32], output: &mut [u32]) -> TileResult<TransferStats> {
    let (in_tiler, out_tiler) = tilers();
    let mut import_buffer = vec![0u32; in_tile_len()];
    let mut export_buffer = vec![0u32; CORE.num_elements()];
    let ext_in = Tensor::dense(Region::new(input), IMAGE);
    let ext_out = Tensor::dense(Region::new(output), IMAGE);

    let mut engine = TracingEngine::new(DeferredEngine::new());
    let mut pipeline = DuplexBuffering::new(
        ext_in,
        Region::new(&mut import_buffer),
        ext_out,
        Region::new(&mut export_buffer),
        &mut engine,
        in_tiler.get_tile(0),
    )?;
    for i in 0..out_tiler.tile_count() as isize {
        let io = pipeline.step_buffering(in_tiler.get_tile(i), out_tiler.get_tile(i))?;
        cross(&io.imported_to, &io.to_export_from);
    }
    pipeline.finish_buffering()?;
    Ok(engine.stats())
}

fn main() -> TileResult<()> {
    println!("=== tilestream Cross Stencil Example ===\n");

    let (in_tiler, out_tiler) = tilers();
    println!("Image:        {}", IMAGE);
    println!("Input tiler:  {}", in_tiler);
    println!("Output tiler: {}", out_tiler);
    println!();

    let source = make_image();
    let runs: [(&str, fn(&mut [u32], &mut [u32]) -> TileResult<TransferStats>); 3] =
        [("double", run_double), ("simplex", run_simplex), ("duplex", run_duplex)];

    for (name, run) in runs {
        let mut input = source.clone();
        let mut output = vec![0u32; IMAGE.num_elements()];
        let stats = run(&mut input, &mut output)?;
        let errors = result_check(&source, &output);
        println!("{:<8} {} -> {}", name, stats, if errors == 0 { "OK".to_string() } else { format!("{} errors", errors) });
    }

    Ok(())
}
