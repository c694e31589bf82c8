//! # matexd
//!
//! Stdio daemon for the matex pipeline. Reads one JSON request per line,
//! writes one JSON response per line, and keeps serving across request
//! failures — an error is fatal only to the request that raised it.
//!
//! Selectors: `el_ops`, `simplify`, `matrix_info`, `transpose`, `inverse`,
//! `ref`, `rref`.

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use log::{debug, warn};

use matex_algebra::SymbolicEngine;
use matex_core::{Error, Session};
use matex_syntax::MacroTable;

pub mod protocol;

pub use protocol::{Request, Response};

/// The daemon's concrete session type.
pub type MatexSession = Session<SymbolicEngine>;

/// Builds the macro table from the user's definitions file. A missing or
/// unreadable file logs a warning and yields an empty table; the daemon
/// still starts.
pub fn load_table(path: &Path) -> MacroTable {
    match fs::read_to_string(path) {
        Ok(text) => MacroTable::parse(&text),
        Err(err) => {
            warn!("unable to read command file {}: {err}", path.display());
            MacroTable::new()
        }
    }
}

/// Serves requests from `input` until end of stream. Blank lines are
/// skipped; every other line produces exactly one response line.
pub fn serve<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    session: &MatexSession,
) -> std::io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_request(session, &line);
        let encoded = serde_json::to_string(&response)?;
        writeln!(output, "{encoded}")?;
        output.flush()?;
    }
    Ok(())
}

/// Parses and dispatches one request line.
pub fn handle_request(session: &MatexSession, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => return Response::error(format!("malformed request: {err}")),
    };
    debug!("request {} ({})", request.id, request.command);
    match dispatch(session, &request.command, &request.text) {
        Ok(res) => Response::success(request.command, request.id, res),
        Err(err) => Response::error(err),
    }
}

fn dispatch(session: &MatexSession, command: &str, text: &str) -> Result<String, String> {
    let result: Result<String, Error> = match command {
        // The applied result goes below the original text, which stays in
        // the document.
        "el_ops" => session
            .apply_elementary_operations(text)
            .map(|res| format!("{text}\n{res}")),
        "simplify" => session.simplify_expression(text),
        "matrix_info" => session.matrix_info(text),
        "transpose" => session.transpose(text),
        "inverse" => session.inverse(text),
        "ref" => session.echelon_form(text, false),
        "rref" => session.echelon_form(text, true),
        other => return Err(format!("unknown command: {other}")),
    };
    result.map_err(|err| err.to_string())
}
