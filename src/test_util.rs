use crate::{DosDatetime, Writer};

/// Reads a little endian u16 at `offset`.
pub fn le_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Reads a little endian u32 at `offset`.
pub fn le_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Runs the whole call sequence over `entries` and returns the concatenated
/// archive bytes.
pub fn assemble<'a>(
    writer: &mut Writer<'a>,
    entries: &[(&'a str, &[u8])],
    alignment: u16,
) -> Vec<u8> {
    let max_name_len = entries
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    let mut buf = vec![0u8; Writer::buffer_size(max_name_len, alignment)];
    let mut archive = Vec::new();

    for &(name, content) in entries {
        let written = writer
            .start_file(name, DosDatetime::default(), alignment, &mut buf)
            .unwrap();
        archive.extend_from_slice(&buf[..written]);

        writer.file_data(content).unwrap();
        archive.extend_from_slice(content);

        let written = writer.end_file(&mut buf).unwrap();
        archive.extend_from_slice(&buf[..written]);
    }

    loop {
        let written = writer.central_directory_entry(&mut buf).unwrap();
        if written == 0 {
            break;
        }
        archive.extend_from_slice(&buf[..written]);
    }

    let written = writer.central_directory_end(&mut buf).unwrap();
    archive.extend_from_slice(&buf[..written]);

    archive
}
