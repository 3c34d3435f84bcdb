//! Fixture builders shared by integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

const SECTOR: usize = 512;
const MINI_CUTOFF: usize = 4096;
const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FATSECT: u32 = 0xFFFF_FFFD;
const FREESECT: u32 = 0xFFFF_FFFF;
const NOSTREAM: u32 = 0xFFFF_FFFF;

fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

fn dir_entry(name: &str, kind: u8, child: u32, right: u32, start: u32, size: usize) -> Vec<u8> {
    let mut raw = vec![0u8; 128];
    let units = utf16le(name);
    raw[..units.len()].copy_from_slice(&units);
    raw[0x40..0x42].copy_from_slice(&((units.len() + 2) as u16).to_le_bytes());
    raw[0x42] = kind;
    raw[0x43] = 1;
    raw[0x44..0x48].copy_from_slice(&NOSTREAM.to_le_bytes());
    raw[0x48..0x4C].copy_from_slice(&right.to_le_bytes());
    raw[0x4C..0x50].copy_from_slice(&child.to_le_bytes());
    raw[0x74..0x78].copy_from_slice(&start.to_le_bytes());
    raw[0x78..0x80].copy_from_slice(&(size as u64).to_le_bytes());
    raw
}

/// OLE compound file with `streams` under the root storage.
///
/// Every stream is padded to the mini-stream cutoff so all of them live in
/// regular sectors.
pub fn compound_file(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut sectors: Vec<Vec<u8>> = Vec::new();
    let mut fat: Vec<u32> = Vec::new();

    let mut push_chain = |bytes: &[u8], sectors: &mut Vec<Vec<u8>>| -> u32 {
        let first = sectors.len() as u32;
        let count = bytes.len().div_ceil(SECTOR);
        for (i, chunk) in bytes.chunks(SECTOR).enumerate() {
            let mut sector = chunk.to_vec();
            sector.resize(SECTOR, 0);
            sectors.push(sector);
            fat.push(if i + 1 == count { ENDOFCHAIN } else { first + i as u32 + 1 });
        }
        first
    };

    let mut entries = Vec::new();
    for (i, (name, data)) in streams.iter().enumerate() {
        let mut padded = data.clone();
        padded.resize(padded.len().max(MINI_CUTOFF), 0);
        let start = push_chain(&padded, &mut sectors);
        let right = if i + 1 < streams.len() { i as u32 + 2 } else { NOSTREAM };
        entries.push(dir_entry(name, 2, NOSTREAM, right, start, padded.len()));
    }

    let mut directory = dir_entry("Root Entry", 5, 1, NOSTREAM, ENDOFCHAIN, 0);
    for entry in entries {
        directory.extend(entry);
    }
    let first_dir = push_chain(&directory, &mut sectors);

    let mut fat_count = 1;
    while sectors.len() + fat_count > fat_count * (SECTOR / 4) {
        fat_count += 1;
    }
    let first_fat = sectors.len() as u32;
    fat.extend(std::iter::repeat_n(FATSECT, fat_count));
    fat.resize(fat_count * SECTOR / 4, FREESECT);

    let mut out = vec![0u8; SECTOR];
    out[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    for (offset, value) in [(0x18, 0x003Eu16), (0x1A, 3), (0x1C, 0xFFFE), (0x1E, 9), (0x20, 6)] {
        out[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }
    for (offset, value) in [
        (0x2C, fat_count as u32),
        (0x30, first_dir),
        (0x38, MINI_CUTOFF as u32),
        (0x3C, ENDOFCHAIN),
        (0x44, ENDOFCHAIN),
    ] {
        out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
    for i in 0..109 {
        let id = if i < fat_count { first_fat + i as u32 } else { FREESECT };
        out[0x4C + i * 4..0x50 + i * 4].copy_from_slice(&id.to_le_bytes());
    }

    for sector in sectors {
        out.extend(sector);
    }
    out.extend(fat.iter().flat_map(|v| v.to_le_bytes()));
    out
}

/// Agile-encrypted OOXML container.
pub fn encrypted_ooxml() -> Vec<u8> {
    compound_file(&[
        ("EncryptionInfo", vec![4, 0, 4, 0, 0x40, 0, 0, 0]),
        ("EncryptedPackage", vec![0u8; 1024]),
    ])
}

/// Word 97-2003 document whose FIB has `fEncrypted` set.
pub fn encrypted_doc() -> Vec<u8> {
    let mut fib = vec![0u8; 0x20];
    fib[0..2].copy_from_slice(&0xA5ECu16.to_le_bytes());
    fib[2..4].copy_from_slice(&0x00C1u16.to_le_bytes());
    fib[0x0B] |= 0x01;
    compound_file(&[("WordDocument", fib), ("1Table", vec![0u8; 64])])
}

/// Excel 97-2003 workbook with a FILEPASS record after BOF.
pub fn encrypted_xls() -> Vec<u8> {
    let mut workbook = Vec::new();
    for (kind, len) in [(0x0809u16, 16usize), (0x002F, 54), (0x000A, 0)] {
        workbook.extend_from_slice(&kind.to_le_bytes());
        workbook.extend_from_slice(&(len as u16).to_le_bytes());
        workbook.resize(workbook.len() + len, 0);
    }
    compound_file(&[("Workbook", workbook)])
}

/// PowerPoint 97-2003 presentation carrying an `EncryptedSummary` stream.
pub fn encrypted_ppt() -> Vec<u8> {
    compound_file(&[
        ("Current User", vec![0u8; 32]),
        ("PowerPoint Document", vec![0u8; 256]),
        ("EncryptedSummary", vec![0u8; 128]),
    ])
}

/// ODF package whose manifest declares encrypted entries.
pub fn encrypted_odf(mimetype: &str) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("mimetype", options).unwrap();
        writer.write_all(mimetype.as_bytes()).unwrap();
        writer.start_file("META-INF/manifest.xml", options).unwrap();
        writer
            .write_all(
                br#"<manifest:manifest><manifest:file-entry manifest:full-path="content.xml"><manifest:encryption-data/></manifest:file-entry></manifest:manifest>"#,
            )
            .unwrap();
        writer.finish().unwrap();
    }
    buffer.into_inner()
}
