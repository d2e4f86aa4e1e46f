use std::io::Write;

use crate::error::CliError;
use crate::metadata::Envelope;

/// Print `envelope` as one JSON document on stdout.
pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    write_envelope(&mut stdout.lock(), envelope, pretty)
}

pub fn write_envelope<W: Write>(
    writer: &mut W,
    envelope: &Envelope,
    pretty: bool,
) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, envelope)?;
    } else {
        serde_json::to_writer(&mut *writer, envelope)?;
    }
    writeln!(writer)?;
    Ok(())
}
