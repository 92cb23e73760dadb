// src/errors/report.rs
//! Diagnostic rendering for the command line.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, ThemeCharacters, ThemeStyles};
use std::io::Write as IoWrite;

/// Unicode and ANSI colors when `fancy`, plain ASCII otherwise.
pub fn handler(fancy: bool) -> GraphicalReportHandler {
    let theme = if fancy {
        GraphicalTheme {
            characters: ThemeCharacters::unicode(),
            styles: ThemeStyles::ansi(),
        }
    } else {
        GraphicalTheme {
            characters: ThemeCharacters::ascii(),
            styles: ThemeStyles::none(),
        }
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Render a diagnostic to a string.
pub fn render_to_string(report: &dyn Diagnostic, fancy: bool) -> String {
    let mut output = String::new();
    if handler(fancy).render_report(&mut output, report).is_err() {
        // fall back to the bare message
        output = format!("error: {report}\n");
    }
    output
}

/// Render a diagnostic into `writer`.
pub fn render_to_writer<W: IoWrite>(
    report: &dyn Diagnostic,
    mut writer: W,
    fancy: bool,
) -> std::io::Result<()> {
    writer.write_all(render_to_string(report, fancy).as_bytes())
}
