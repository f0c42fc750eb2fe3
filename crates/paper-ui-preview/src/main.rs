//! Desktop preview for paper-ui layouts.
//!
//! Builds a sample 800×480 dashboard and writes every finished pass to a PNG
//! through `embedded-graphics-simulator`, so layouts can be checked without
//! a panel attached.
//!
//! # Usage
//!
//! | Argument            | Effect                                        |
//! |---------------------|-----------------------------------------------|
//! | `--passes N`        | Run the scheduling loop for N passes (def. 1) |
//! | `--out DIR`         | Directory for `pass-N.png` files (def. `.`)   |
//! | `--debug-bounds`    | Outline every view frame                      |
//!
//! With one pass the dashboard is rendered with `redraw_once`. With more, a
//! background thread updates the clock through a `ContextHandle` and the
//! loop stops itself after the requested number of passes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use log::{error, info};

use paper_ui::ui::{
    Align, Alignment, ImageView, Margin, Preference, SizePolicy, Surface, TextSize, TextView,
    ViewId, ViewTree,
};
use paper_ui::{Bitmap, Context, ContextConfig, Error, FrameBuffer, MemoryResources, Redraw};

/// Interval between simulated clock updates in loop mode.
const CLOCK_INTERVAL: Duration = Duration::from_millis(1500);

struct Options {
    passes: u64,
    out_dir: PathBuf,
    debug_bounds: bool,
}

impl Options {
    fn parse() -> Result<Self, String> {
        let mut options = Self {
            passes: 1,
            out_dir: PathBuf::from("."),
            debug_bounds: false,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--passes" => {
                    let value = args.next().ok_or("--passes needs a value")?;
                    options.passes = value
                        .parse()
                        .map_err(|_| format!("invalid pass count: {value}"))?;
                }
                "--out" => {
                    options.out_dir = PathBuf::from(args.next().ok_or("--out needs a value")?);
                }
                "--debug-bounds" => options.debug_bounds = true,
                other => return Err(format!("unknown argument: {other}")),
            }
        }
        if options.passes == 0 {
            return Err(String::from("--passes must be at least 1"));
        }
        Ok(options)
    }
}

// ---------------------------------------------------------------------------
// Sample content
// ---------------------------------------------------------------------------

/// A 32×32 sun icon: filled disc with a transparent background.
fn sun_icon() -> Result<Bitmap, Error> {
    const SIDE: i32 = 32;
    let luma = (0..SIDE * SIDE)
        .map(|i| {
            let (x, y) = (i % SIDE - SIDE / 2, i / SIDE - SIDE / 2);
            match x * x + y * y {
                d if d <= 64 => 0x20,
                d if d <= 100 => 0xFF,
                d if d <= 196 && (x == 0 || y == 0 || x == y || x == -y) => 0x40,
                _ => 0xFF,
            }
        })
        .collect();
    Ok(Bitmap::new(SIDE as u32, luma)?.with_transparent(0xFF))
}

struct Dashboard {
    clock: ViewId,
}

fn build_dashboard(tree: &mut ViewTree) -> Result<Dashboard, Error> {
    let root = tree.root();
    let column = tree.vgroup(Align::Start, Preference::fill());

    // Header: dark band with a centered title
    let header = tree.group(
        Alignment::new(Align::Center, Align::Start),
        Preference::fill().with_height(SizePolicy::Fixed(70)),
    );
    let band = tree.leaf(Surface::filled(Gray8::new(0x30)), Preference::fill());
    let title = tree.leaf(
        TextView::new("Living Room", TextSize::Large).with_color(Gray8::WHITE),
        Preference::wrap().with_margin(Margin::new(24, 0, 0, 0)),
    );
    tree.add_views(header, &[band, title])?;

    // Body: weather on the left, agenda on the right
    let body = tree.hgroup(
        Align::Start,
        Preference::fill().with_height(SizePolicy::weighted(1.0)?),
    );
    let weather = tree.vgroup(
        Align::Center,
        Preference::fill()
            .with_width(SizePolicy::weighted(0.5)?)
            .with_margin(Margin::all(12)),
    );
    tree.set_background(weather, Surface::outlined(Gray8::BLACK, 2).with_radius(8))?;
    let icon = tree.leaf(
        ImageView::new("weather-sunny"),
        Preference::wrap().with_margin(Margin::new(40, 0, 8, 0)),
    );
    let temperature = tree.leaf(
        TextView::new("21.5 C", TextSize::Large),
        Preference::wrap(),
    );
    let summary = tree.leaf(
        TextView::new("Clear skies\nWind 8 km/h", TextSize::Medium)
            .with_align(Align::Center, Align::Start),
        Preference::wrap().with_margin(Margin::new(8, 0, 0, 0)),
    );
    tree.add_views(weather, &[icon, temperature, summary])?;

    let agenda = tree.vgroup(
        Align::Start,
        Preference::fill()
            .with_width(SizePolicy::weighted(0.5)?)
            .with_margin(Margin::all(12)),
    );
    let heading = tree.leaf(
        TextView::new("Today", TextSize::Large),
        Preference::wrap().with_margin(Margin::new(8, 0, 12, 8)),
    );
    tree.add_view(agenda, heading)?;
    for entry in ["09:00  Standup", "12:30  Lunch", "15:00  Design review"] {
        let row = tree.leaf(
            TextView::new(entry, TextSize::Medium),
            Preference::wrap().with_margin(Margin::new(4, 0, 4, 8)),
        );
        tree.add_view(agenda, row)?;
    }
    tree.add_views(body, &[weather, agenda])?;

    // Footer: right-aligned clock
    let footer = tree.group(
        Alignment::new(Align::End, Align::Center),
        Preference::fill().with_height(SizePolicy::Fixed(28)),
    );
    let clock = tree.leaf(
        TextView::new("12:00:00", TextSize::Medium),
        Preference::wrap().with_margin(Margin::symmetric(0, 12)),
    );
    tree.add_view(footer, clock)?;

    tree.add_views(column, &[header, body, footer])?;
    tree.add_view(root, column)?;
    Ok(Dashboard { clock })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn save_png(buffer: &FrameBuffer, path: &Path) -> Result<(), Error> {
    let mut display = SimulatorDisplay::<Gray8>::new(buffer.size());
    let width = buffer.width() as usize;
    display.draw_iter(buffer.pixels().iter().enumerate().map(|(i, &color)| {
        Pixel(Point::new((i % width) as i32, (i / width) as i32), color)
    }))?;

    let settings = OutputSettingsBuilder::new().scale(1).build();
    display
        .to_grayscale_output_image(&settings)
        .save_png(path)
        .map_err(|err| Error::Display(err.to_string()))
}

fn on_pass(redraw: &Redraw<'_>, out_dir: &Path) -> Result<(), Error> {
    if redraw.hint.is_skip() {
        info!("Pass {}: unchanged, nothing written", redraw.pass);
        return Ok(());
    }
    let path = out_dir.join(format!("pass-{}.png", redraw.pass));
    save_png(redraw.buffer, &path)?;
    info!(
        "Pass {}: {:?}, changed {:?} -> {}",
        redraw.pass,
        redraw.hint,
        redraw.changed,
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn run(options: Options) -> Result<(), Error> {
    let resources = MemoryResources::new().with_image("weather-sunny", sun_icon()?);
    let config = ContextConfig::default()
        .with_settle_ms(200)
        .with_debug_bounds(options.debug_bounds);
    let mut ctx = Context::with_resources(config, resources)?;
    let dashboard = build_dashboard(ctx.tree_mut())?;

    if options.passes == 1 {
        let out_dir = options.out_dir.clone();
        ctx.on_redraw(move |redraw| on_pass(redraw, &out_dir));
        return ctx.redraw_once();
    }

    let handle = ctx.handle();
    let stopper = ctx.handle();
    let out_dir = options.out_dir.clone();
    let passes = options.passes;
    ctx.on_redraw(move |redraw| {
        on_pass(redraw, &out_dir)?;
        if redraw.pass >= passes {
            stopper.stop()?;
        }
        Ok(())
    });

    let clock = dashboard.clock;
    std::thread::spawn(move || {
        for tick in 1u32.. {
            std::thread::sleep(CLOCK_INTERVAL);
            let label = format!("12:00:{:02}", tick % 60);
            let queued = handle.mutate(move |tree| {
                if let Some(text) = tree.widget_mut::<TextView>(clock) {
                    text.set_text(&label);
                }
            });
            if let Err(err) = queued {
                error!("Clock update dropped: {}", err);
            }
        }
    });

    ctx.start()
}

fn main() {
    env_logger::init();
    let options = match Options::parse() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };
    info!(
        "Rendering {} pass(es) into {}",
        options.passes,
        options.out_dir.display()
    );

    if let Err(err) = run(options) {
        error!("Preview failed: {}", err);
        std::process::exit(1);
    }
    info!("Preview finished");
}
