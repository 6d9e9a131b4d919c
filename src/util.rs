use std::io::{self, Read, Seek, SeekFrom};

/// Read `len` bytes at `offset`. The buffer grows with what the reader
/// actually yields, so a bogus length fails with `UnexpectedEof` instead of
/// allocating up front.
pub fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    let got = r.by_ref().take(len).read_to_end(&mut buf)?;
    if (got as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted {len} bytes at offset {offset}, got {got}"),
        ));
    }
    Ok(buf)
}

/// ISO-639-2/T language code packed as three 5-bit letters.
pub fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    [(code >> 10) & 0x1F, (code >> 5) & 0x1F, code & 0x1F]
        .iter()
        .map(|&c| (c as u8 + 0x60) as char)
        .collect()
}
