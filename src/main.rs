//! overlay-labels - render Girder annotations onto their overlay image

use std::process::ExitCode;

use overlay_labels::cli;

fn main() -> ExitCode {
    cli::run()
}
