mod cli;

use anyhow::Result;
use clap::Parser;

use prism_engine::core::{App, AppControl, FrameCtx};
use prism_engine::input::Key;
use prism_engine::logging::init_logging;
use prism_engine::time::FpsCounter;
use prism_engine::window::Runtime;

use cli::Args;

const BINDINGS: &[(&str, &str)] = &[
    ("W/A/S/D, arrows", "move camera"),
    ("Q/E", "move down/up"),
    ("Shift", "move faster"),
    ("right mouse drag", "look around"),
    ("mouse wheel", "move along the view direction"),
    ("F4", "cycle texture filtering"),
    ("F5", "toggle rotation"),
    ("Escape", "quit"),
];

struct Viewer {
    fps: FpsCounter,
}

impl App for Viewer {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.key_pressed(Key::Escape) {
            return AppControl::Exit;
        }
        if ctx.key_pressed(Key::F4) {
            ctx.renderer.toggle_filtering_method();
        }
        if ctx.key_pressed(Key::F5) {
            ctx.renderer.toggle_rotation();
        }

        let control = ctx.update_and_render();

        if let Some(fps) = self.fps.record(ctx.time.dt) {
            ctx.window.set_title(&format!(
                "prism | {fps:.0} fps | {}",
                ctx.renderer.filtering_method()
            ));
            log::debug!("{fps:.1} fps");
        }

        control
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.logging_config());

    println!();
    println!("  prism viewer");
    for (keys, action) in BINDINGS {
        println!("  {keys:<18} {action}");
    }
    println!();

    Runtime::run(
        args.runtime_config(),
        args.renderer_config(),
        Viewer {
            fps: FpsCounter::new(),
        },
    )
}
