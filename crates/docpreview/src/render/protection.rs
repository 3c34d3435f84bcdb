//! Password protection sniffing.
//!
//! Encrypted sources are recognised before the renderer runs so they fail with
//! `PasswordProtected` instead of an opaque conversion error:
//!
//! - Encrypted OOXML (`.docx`, `.xlsx`, `.pptx`) is stored as an OLE compound
//!   file holding an `EncryptedPackage` stream.
//! - Word 97-2003 (`.doc`) sets `fEncrypted` in the FIB at the head of the
//!   `WordDocument` stream.
//! - Excel 97-2003 (`.xls`) puts a FILEPASS record in the workbook globals.
//! - PowerPoint 97-2003 (`.ppt`) adds an `EncryptedSummary` stream.
//! - Encrypted ODF (`.odt`, `.ods`) is a ZIP whose manifest lists
//!   `manifest:encryption-data` entries.
//!
//! Only directory entries and stream headers are inspected, never document
//! text. Anything missed is caught afterwards from the renderer's diagnostics
//! via [`mentions_password`].

use super::compound::{self, CompoundFile, u16_at};
use std::io::{Cursor, Read};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ODF_MANIFEST: &str = "META-INF/manifest.xml";
const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;

const WORD_FIB_IDENT: u16 = 0xA5EC;
const WORD_FLAGS_OFFSET: usize = 0x0A;
const WORD_ENCRYPTED_FLAG: u16 = 0x0100;

const BIFF_EOF: u16 = 0x000A;
const BIFF_FILEPASS: u16 = 0x002F;
const WORKBOOK_SCAN_BYTES: usize = 64 * 1024;

/// Return a reason string if `input` is recognisably password protected.
pub fn detect_password_protection(input: &[u8]) -> Option<&'static str> {
    if input.starts_with(&compound::SIGNATURE) {
        return detect_encrypted_compound(input);
    }
    if input.starts_with(ZIP_MAGIC) {
        return detect_encrypted_odf(input);
    }
    None
}

fn detect_encrypted_compound(input: &[u8]) -> Option<&'static str> {
    let file = CompoundFile::parse(input)?;

    if file.contains("EncryptedPackage") {
        return Some("encrypted Office Open XML package");
    }

    if let Some(entry) = file.find_stream("WordDocument")
        && let Some(fib) = file.read_stream(entry, 32)
        && word_fib_encrypted(&fib)
    {
        return Some("encrypted Word 97-2003 document");
    }

    for name in ["Workbook", "Book"] {
        if let Some(entry) = file.find_stream(name)
            && let Some(stream) = file.read_stream(entry, WORKBOOK_SCAN_BYTES)
            && workbook_has_filepass(&stream)
        {
            return Some("encrypted Excel 97-2003 workbook");
        }
    }

    if file.contains("EncryptedSummary") {
        return Some("encrypted PowerPoint 97-2003 presentation");
    }

    None
}

fn word_fib_encrypted(fib: &[u8]) -> bool {
    u16_at(fib, 0) == Some(WORD_FIB_IDENT)
        && u16_at(fib, WORD_FLAGS_OFFSET).is_some_and(|flags| flags & WORD_ENCRYPTED_FLAG != 0)
}

/// Walk BIFF records of the globals substream looking for FILEPASS.
fn workbook_has_filepass(stream: &[u8]) -> bool {
    let mut offset = 0;
    while let (Some(kind), Some(len)) = (u16_at(stream, offset), u16_at(stream, offset + 2)) {
        match kind {
            BIFF_FILEPASS => return true,
            BIFF_EOF => return false,
            _ => offset += 4 + usize::from(len),
        }
    }
    false
}

fn detect_encrypted_odf(input: &[u8]) -> Option<&'static str> {
    let mut archive = zip::ZipArchive::new(Cursor::new(input)).ok()?;
    let manifest = archive.by_name(ODF_MANIFEST).ok()?;

    let mut content = String::new();
    manifest.take(MAX_MANIFEST_BYTES).read_to_string(&mut content).ok()?;

    if content.contains("encryption-data") {
        Some("encrypted OpenDocument package")
    } else {
        None
    }
}

/// Whether renderer diagnostics point at a password prompt or wrong password.
pub fn mentions_password(diagnostics: &str) -> bool {
    let lower = diagnostics.to_lowercase();
    lower.contains("password") || lower.contains("encrypted")
}
