use crate::artifacts::pack::PackIndex;
use std::io::Write;
use std::path::Path;

/// Dump a pack index: `<offset> <id> (<crc32>)` per object, in id order
pub fn show_index(index_path: &Path, writer: &mut dyn Write) -> anyhow::Result<()> {
    let index = PackIndex::read(index_path)?;

    for entry in index.entries() {
        writeln!(writer, "{} {} ({:08x})", entry.offset, entry.oid, entry.crc32)?;
    }

    Ok(())
}
